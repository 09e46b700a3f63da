//! In-process scene graph standing in for the external 3D engine: named
//! nodes with transforms, parenting, material assignment, per-node override
//! metadata, and hierarchy bounding-box queries. Rendering, picking, and
//! gizmo manipulation live outside this crate; the graph only tracks the
//! state those collaborators need.

pub mod material;

use glam::{EulerRot, Quat, Vec3};
use std::collections::BTreeMap;

pub use material::{Material, MaterialCatalog, MaterialId};

/// Handle to a node owned by a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

/// Local transform: position, rotation (Euler radians unless a quaternion
/// has been set), scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub rotation_quaternion: Option<Quat>,
    pub scaling: Vec3,
}

impl Transform {
    /// Effective rotation: the quaternion when set, else the Euler angles
    /// (YXZ order).
    pub fn rotation_quat(&self) -> Quat {
        self.rotation_quaternion.unwrap_or_else(|| {
            Quat::from_euler(
                EulerRot::YXZ,
                self.rotation.y,
                self.rotation.x,
                self.rotation.z,
            )
        })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            rotation_quaternion: None,
            scaling: Vec3::ONE,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const ZERO: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn depth(&self) -> f32 {
        self.max.z - self.min.z
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }
}

/// Per-part override record. Survives serialization so that an exported
/// scene can restore the same material/color/texture state on import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartMetadata {
    pub model_file: Option<String>,
    pub custom_material_applied: bool,
    pub applied_material_name: Option<String>,
    pub custom_color_applied: bool,
    pub applied_color_hex: Option<String>,
    pub texture_name: Option<String>,
}

/// One scene-graph node. Pure transform nodes (containers, model roots)
/// carry no local bounds; mesh parts do.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub material: Option<MaterialId>,
    pub local_bounds: Option<Aabb>,
    pub metadata: PartMetadata,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            transform: Transform::default(),
            material: None,
            local_bounds: None,
            metadata: PartMetadata::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Owns all nodes and materials. Ids are never reused; lookups on disposed
/// handles return `None`.
#[derive(Default)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, Node>,
    materials: BTreeMap<MaterialId, Material>,
    next_node: u64,
    next_material: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, Node::new(name.into()));
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next_material);
        self.next_material += 1;
        self.materials.insert(id, material);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// First node with the given name, in creation order.
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(&id, _)| id)
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.name = name.into();
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    /// Re-parent `child`, detaching it from any previous parent. `None`
    /// detaches without re-attaching.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) {
        if !self.nodes.contains_key(&child) {
            return;
        }
        if parent.is_some_and(|id| !self.nodes.contains_key(&id)) {
            return;
        }
        if let Some(previous) = self.nodes.get(&child).and_then(|node| node.parent) {
            if let Some(node) = self.nodes.get_mut(&previous) {
                node.children.retain(|&c| c != child);
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = parent;
        }
        if let Some(parent_id) = parent {
            if let Some(node) = self.nodes.get_mut(&parent_id) {
                node.children.push(child);
            }
        }
    }

    /// All descendants of `id` in depth-first order.
    pub fn child_meshes(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return result,
        };
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        result
    }

    /// Remove the node, detach it from its parent, and orphan its children.
    /// Callers that want a full teardown dispose children first.
    pub fn dispose(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        if let Some(parent) = node.parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|&c| c != id);
            }
        }
        for child in node.children {
            if let Some(child_node) = self.nodes.get_mut(&child) {
                child_node.parent = None;
            }
        }
    }

    /// World-space translation, rotation, and scale of `id`, composed
    /// root-down through the parent chain.
    pub fn world_trs(&self, id: NodeId) -> (Vec3, Quat, Vec3) {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get(&node_id) else {
                break;
            };
            chain.push(node_id);
            current = node.parent;
        }
        let mut position = Vec3::ZERO;
        let mut rotation = Quat::IDENTITY;
        let mut scale = Vec3::ONE;
        for node_id in chain.into_iter().rev() {
            let Some(node) = self.nodes.get(&node_id) else {
                continue;
            };
            let local = &node.transform;
            position += rotation * (scale * local.position);
            rotation *= local.rotation_quat();
            scale *= local.scaling;
        }
        (position, rotation, scale)
    }

    /// World-space position through the parent chain, with ancestor rotation
    /// and scale applied.
    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_trs(id).0
    }

    /// Union of the world-space bounds of `id` and all its descendants.
    /// `None` when the hierarchy carries no geometry.
    pub fn hierarchy_bounds(&self, id: NodeId) -> Option<Aabb> {
        let mut ids = vec![id];
        ids.extend(self.child_meshes(id));
        let mut bounds: Option<Aabb> = None;
        for node_id in ids {
            let Some(node) = self.nodes.get(&node_id) else {
                continue;
            };
            let Some(local) = node.local_bounds else {
                continue;
            };
            let (position, rotation, scale) = self.world_trs(node_id);
            for corner in local.corners() {
                let world = position + rotation * (scale * corner);
                let corner_bounds = Aabb::new(world, world);
                bounds = Some(match bounds {
                    Some(existing) => existing.union(&corner_bounds),
                    None => corner_bounds,
                });
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parenting_maintains_both_sides() {
        let mut graph = SceneGraph::new();
        let container = graph.create_node("parentContainer");
        let root = graph.create_node("chair1_1");
        let child = graph.create_node("chair1_1_child_1");
        graph.set_parent(child, Some(root));
        graph.set_parent(root, Some(container));

        assert_eq!(graph.parent(child), Some(root));
        assert_eq!(graph.child_meshes(container), vec![root, child]);

        graph.set_parent(root, None);
        assert_eq!(graph.parent(root), None);
        assert!(graph.child_meshes(container).is_empty());
    }

    #[test]
    fn dispose_detaches_and_orphans() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node("vase1_1");
        let child = graph.create_node("vase1_1_child_1");
        graph.set_parent(child, Some(root));

        graph.dispose(root);
        assert!(!graph.contains(root));
        assert!(graph.contains(child));
        assert_eq!(graph.parent(child), None);
        assert_eq!(graph.find_node_by_name("vase1_1"), None);
    }

    #[test]
    fn hierarchy_bounds_accumulates_positions_and_scale() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node("table1_1");
        let child = graph.create_node("table1_1_child_1");
        graph.set_parent(child, Some(root));

        if let Some(node) = graph.node_mut(root) {
            node.transform.position = Vec3::new(2.0, 0.0, 0.0);
        }
        if let Some(node) = graph.node_mut(child) {
            node.transform.scaling = Vec3::splat(2.0);
            node.local_bounds = Some(Aabb::new(
                Vec3::new(-0.5, 0.0, -0.5),
                Vec3::new(0.5, 1.0, 0.5),
            ));
        }

        let bounds = graph.hierarchy_bounds(root).expect("bounds");
        assert_eq!(bounds.min, Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 2.0, 1.0));
        assert_eq!(bounds.width(), 2.0);
        assert_eq!(bounds.depth(), 2.0);

        // Pure transform nodes have no bounds of their own.
        let empty = graph.create_node("empty");
        assert_eq!(graph.hierarchy_bounds(empty), None);
    }

    #[test]
    fn hierarchy_bounds_applies_ancestor_scale_and_rotation() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node("chair1_1");
        let child = graph.create_node("chair1_1_child_1");
        graph.set_parent(child, Some(root));

        if let Some(node) = graph.node_mut(root) {
            node.transform.scaling = Vec3::splat(2.0);
        }
        if let Some(node) = graph.node_mut(child) {
            node.transform.position = Vec3::new(1.0, 0.0, 0.0);
            node.local_bounds = Some(Aabb::new(
                Vec3::new(-0.5, 0.0, -0.5),
                Vec3::new(0.5, 1.0, 0.5),
            ));
        }

        // The root's scale doubles both the child's offset and its extents.
        let bounds = graph.hierarchy_bounds(root).expect("bounds");
        assert_eq!(bounds.min, Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 2.0, 1.0));
        assert_eq!(graph.world_position(child), Vec3::new(2.0, 0.0, 0.0));

        // A quarter turn about y swaps the footprint axes.
        if let Some(node) = graph.node_mut(root) {
            node.transform.scaling = Vec3::ONE;
            node.transform.rotation_quaternion =
                Some(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        }
        let bounds = graph.hierarchy_bounds(root).expect("bounds");
        assert!((bounds.min - Vec3::new(-0.5, 0.0, -1.5)).length() < 1e-5);
        assert!((bounds.max - Vec3::new(0.5, 1.0, -0.5)).length() < 1e-5);
    }
}
