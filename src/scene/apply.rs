//! Material, color, and texture applicators. Material and color fan out to
//! every child part when the target has children; texture applies to a
//! single part only. Each applicator records what it did in the part's
//! metadata so the state survives export/import.

use super::EditError;
use crate::engine::{Material, MaterialId, NodeId, SceneGraph};
use glam::Vec3;

/// Sentinel texture name meaning "no texture".
pub const TEXTURE_NONE: &str = "None";

fn fan_out(graph: &SceneGraph, target: NodeId) -> Vec<NodeId> {
    let children = graph.child_meshes(target);
    if children.is_empty() {
        vec![target]
    } else {
        children
    }
}

/// Assign a catalog material to the target (or to each of its child parts)
/// and record the applied material name.
pub fn apply_material(graph: &mut SceneGraph, target: NodeId, material: MaterialId) {
    let Some(material_name) = graph.material(material).map(|m| m.name.clone()) else {
        return;
    };
    for part in fan_out(graph, target) {
        if let Some(node) = graph.node_mut(part) {
            node.material = Some(material);
            node.metadata.custom_material_applied = true;
            node.metadata.applied_material_name = Some(material_name.clone());
        }
    }
}

/// Recolor the target's parts. A part whose material is still shared (its
/// name does not carry the part's own name) gets a private clone first, so
/// the edit never bleeds into siblings or the catalog. Parts without a
/// material are skipped.
pub fn apply_color(graph: &mut SceneGraph, target: NodeId, hex: &str) -> Result<(), EditError> {
    let color = parse_hex_color(hex).ok_or_else(|| EditError::InvalidColor(hex.to_string()))?;
    for part in fan_out(graph, target) {
        let (part_name, material_id) = match graph.node(part) {
            Some(node) => match node.material {
                Some(material) => (node.name.clone(), material),
                None => continue,
            },
            None => continue,
        };
        let mut material_id = material_id;
        let needs_clone = match graph.material(material_id) {
            Some(material) => !material.name.contains(&part_name),
            None => continue,
        };
        if needs_clone {
            let clone = match graph.material(material_id) {
                Some(material) => {
                    let clone_name = format!("{}_{}", material.name, part_name);
                    material.clone_as(clone_name)
                }
                None => continue,
            };
            material_id = graph.add_material(clone);
            if let Some(node) = graph.node_mut(part) {
                node.material = Some(material_id);
            }
        }
        if let Some(material) = graph.material_mut(material_id) {
            material.set_all_colors(color);
        }
        if let Some(node) = graph.node_mut(part) {
            node.metadata.custom_color_applied = true;
            node.metadata.applied_color_hex = Some(hex.to_string());
        }
    }
    Ok(())
}

/// Wrap a single part in a fresh textured material. The "None" sentinel is a
/// no-op. Never fans out to children.
pub fn apply_texture(graph: &mut SceneGraph, target: NodeId, texture_name: &str) {
    if texture_name == TEXTURE_NONE || !graph.contains(target) {
        return;
    }
    let material = graph.add_material(Material::textured("textureMat", texture_name));
    if let Some(node) = graph.node_mut(target) {
        node.material = Some(material);
        node.metadata.texture_name = Some(texture_name.to_string());
    }
}

/// Parse `#rrggbb` (the `#` is optional) into linear 0..1 components.
pub fn parse_hex_color(hex: &str) -> Option<Vec3> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .ok()
            .map(|value| value as f32 / 255.0)
    };
    Some(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
