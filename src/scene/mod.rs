//! The editing core: instance identity, the model registry, selection state,
//! and the [`Session`] context object shared by every operation.

pub mod apply;
pub mod lifecycle;
pub mod placement;
pub mod serialization;

use crate::engine::{MaterialCatalog, NodeId, SceneGraph};
use glam::Vec3;

/// Name of the transform node every model root is parented under.
pub const CONTAINER_NAME: &str = "parentContainer";

/// Validation rejection: user-facing, non-fatal, raised before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("nothing is selected")]
    NoSelection,
    #[error("only the entire model can be replaced, not an individual part")]
    PartSelected,
    #[error("only a model of the same category can replace the selected one")]
    CategoryMismatch,
    #[error("the selected model has no category")]
    Uncategorized,
    #[error("original model file not found in metadata")]
    MissingModelFile,
    #[error("selected element is not tracked by the registry")]
    NotRegistered,
    #[error("invalid color string: {0}")]
    InvalidColor(String),
}

/// Category of an asset or instance name: the leading alphabetic run,
/// lower-cased. `"chair1.glb"` and `"chair3_17"` are both `"chair"`; a name
/// with no leading letters is uncategorized (empty string).
pub fn base_type(name: &str) -> String {
    name.chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Asset file name without its model extension: `"chair1.glb"` -> `"chair1"`.
pub fn model_stem(file: &str) -> &str {
    file.strip_suffix(".glb")
        .or_else(|| file.strip_suffix(".gltf"))
        .unwrap_or(file)
}

/// The stable `child_<index>` tail of a part name, or the full name when the
/// part was never renamed by the identity scheme.
pub fn child_suffix(name: &str) -> &str {
    if let Some(pos) = name.rfind("child_") {
        let digits = &name[pos + "child_".len()..];
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return &name[pos..];
        }
    }
    name
}

/// Instance identifier -> ordered parts (root first). Insertion-ordered so
/// that export walks instances in the order they entered the scene.
/// Registering a key again replaces its entry; a part is never listed under
/// two keys.
#[derive(Default)]
pub struct ModelRegistry {
    entries: Vec<(String, Vec<NodeId>)>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, parts: Vec<NodeId>) {
        let id = id.into();
        for (key, entry) in &mut self.entries {
            if *key != id {
                entry.retain(|part| !parts.contains(part));
            }
        }
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some((_, entry)) => *entry = parts,
            None => self.entries.push((id, parts)),
        }
    }

    pub fn unregister(&mut self, id: &str) -> Option<Vec<NodeId>> {
        let index = self.entries.iter().position(|(key, _)| key == id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn lookup(&self, id: &str) -> Option<&[NodeId]> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, parts)| parts.as_slice())
    }

    pub fn find_owner(&self, part: NodeId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, parts)| parts.contains(&part))
            .map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.entries
            .iter()
            .map(|(key, parts)| (key.as_str(), parts.as_slice()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// At most one selected element: a whole instance (its root) or one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Instance(NodeId),
    Part(NodeId),
}

impl Selection {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Selection::None => None,
            Selection::Instance(id) | Selection::Part(id) => Some(*id),
        }
    }
}

/// The one session state every command observes and mutates: scene graph,
/// registry, material catalog, selection, gizmo attachment. Created once and
/// passed by reference to each operation.
pub struct Session {
    pub graph: SceneGraph,
    pub registry: ModelRegistry,
    pub materials: MaterialCatalog,
    selection: Selection,
    gizmo_target: Option<NodeId>,
    highlighted: Vec<NodeId>,
    container: NodeId,
    next_instance: u64,
}

impl Session {
    pub fn new() -> Self {
        let mut graph = SceneGraph::new();
        let container = graph.create_node(CONTAINER_NAME);
        let materials = MaterialCatalog::standard(&mut graph);
        Self {
            graph,
            registry: ModelRegistry::new(),
            materials,
            selection: Selection::None,
            gizmo_target: None,
            highlighted: Vec::new(),
            container,
            next_instance: 1,
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn gizmo_target(&self) -> Option<NodeId> {
        self.gizmo_target
    }

    pub fn highlighted(&self) -> &[NodeId] {
        &self.highlighted
    }

    /// Unique instance identifier: asset stem plus a session-monotonic
    /// counter.
    pub fn next_instance_id(&mut self, file: &str) -> String {
        let id = format!("{}_{}", model_stem(file), self.next_instance);
        self.next_instance += 1;
        id
    }

    /// Select a single picked part. Returns false when the pick does not
    /// belong to any registered instance.
    pub fn select_part(&mut self, picked: NodeId) -> bool {
        if self.registry.find_owner(picked).is_none() {
            return false;
        }
        self.clear_selection();
        self.highlighted = vec![picked];
        self.selection = Selection::Part(picked);
        self.gizmo_target = Some(picked);
        true
    }

    /// Select the whole instance owning the picked part: highlight every
    /// part, attach the gizmo to the root, and bring a stray root back under
    /// the session container.
    pub fn select_instance(&mut self, picked: NodeId) -> bool {
        let Some(owner) = self.registry.find_owner(picked).map(str::to_string) else {
            return false;
        };
        let Some(parts) = self.registry.lookup(&owner).map(<[NodeId]>::to_vec) else {
            return false;
        };
        let Some(&root) = parts.first() else {
            return false;
        };
        self.clear_selection();
        self.highlighted = parts;
        self.selection = Selection::Instance(root);
        self.gizmo_target = Some(root);
        if self.graph.parent(root) != Some(self.container) {
            self.graph.set_parent(root, Some(self.container));
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
        self.gizmo_target = None;
        self.highlighted.clear();
    }

    pub fn clear_gizmo(&mut self) {
        self.gizmo_target = None;
    }

    /// Lift any instance whose hierarchy bounds dip below the ground plane.
    pub fn settle_to_ground(&mut self) {
        let min_y = 0.0;
        let roots: Vec<NodeId> = self
            .registry
            .iter()
            .filter_map(|(_, parts)| parts.first().copied())
            .collect();
        for root in roots {
            let Some(bounds) = self.graph.hierarchy_bounds(root) else {
                continue;
            };
            if bounds.min.y < min_y {
                let diff = min_y - bounds.min.y;
                if let Some(node) = self.graph.node_mut(root) {
                    node.transform.position.y += diff;
                }
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_type_takes_leading_alphabetic_run() {
        assert_eq!(base_type("chair1.glb"), "chair");
        assert_eq!(base_type("Table2"), "table");
        assert_eq!(base_type("vase1_1699999999"), "vase");
        assert_eq!(base_type("123model"), "");
        assert_eq!(base_type(""), "");
    }

    #[test]
    fn model_stem_strips_known_extensions() {
        assert_eq!(model_stem("chair1.glb"), "chair1");
        assert_eq!(model_stem("wall.gltf"), "wall");
        assert_eq!(model_stem("chair1"), "chair1");
    }

    #[test]
    fn child_suffix_matches_trailing_index() {
        assert_eq!(child_suffix("chair1_5_child_2"), "child_2");
        assert_eq!(child_suffix("vase1_1_child_10"), "child_10");
        assert_eq!(child_suffix("chair1_5_child_"), "chair1_5_child_");
        assert_eq!(child_suffix("loosePart"), "loosePart");
    }

    #[test]
    fn registry_keeps_parts_exclusive() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let c = graph.create_node("c");

        let mut registry = ModelRegistry::new();
        registry.register("chair1_1", vec![a, b]);
        registry.register("vase1_2", vec![b, c]);

        assert_eq!(registry.lookup("chair1_1"), Some(&[a][..]));
        assert_eq!(registry.lookup("vase1_2"), Some(&[b, c][..]));
        assert_eq!(registry.find_owner(b), Some("vase1_2"));
    }

    #[test]
    fn registry_register_is_idempotent_per_key() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node("a");
        let b = graph.create_node("b");

        let mut registry = ModelRegistry::new();
        registry.register("chair1_1", vec![a]);
        registry.register("chair1_1", vec![a, b]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("chair1_1"), Some(&[a, b][..]));

        assert_eq!(registry.unregister("chair1_1"), Some(vec![a, b]));
        assert!(registry.is_empty());
        assert_eq!(registry.unregister("chair1_1"), None);
    }

    #[test]
    fn selection_clears_previous_highlight() {
        let mut session = Session::new();
        let root = session.graph.create_node("chair1_1");
        let part = session.graph.create_node("chair1_1_child_1");
        session.graph.set_parent(part, Some(root));
        session.registry.register("chair1_1", vec![root, part]);

        assert!(session.select_instance(part));
        assert_eq!(session.selection(), Selection::Instance(root));
        assert_eq!(session.highlighted(), &[root, part]);
        assert_eq!(session.gizmo_target(), Some(root));
        // Stray root is brought back under the container.
        assert_eq!(session.graph.parent(root), Some(session.container()));

        assert!(session.select_part(part));
        assert_eq!(session.selection(), Selection::Part(part));
        assert_eq!(session.highlighted(), &[part]);

        let outsider = session.graph.create_node("outsider");
        assert!(!session.select_part(outsider));
        // Failed pick leaves the previous selection untouched.
        assert_eq!(session.selection(), Selection::Part(part));

        session.clear_selection();
        assert_eq!(session.selection(), Selection::None);
        assert_eq!(session.gizmo_target(), None);
        assert!(session.highlighted().is_empty());
    }
}
