//! Model lifecycle: load, duplicate, replace, remove. Each operation mutates
//! the registry and the scene graph in the same synchronous step so neither
//! side can dangle.

use super::placement::{self, GroundRect};
use super::{apply, base_type, EditError, Selection, Session};
use crate::assets::{AssetError, ModelLoader, ModelPrototype};
use crate::engine::{Aabb, MaterialId, NodeId};
use glam::Vec3;

/// Offset gap used when positioning a duplicate next to its original.
pub const DUPLICATE_PADDING: f32 = 0.3;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// A freshly instantiated model: registry key, root node, all parts in order
/// (root first).
#[derive(Debug, Clone)]
pub struct LoadedInstance {
    pub id: String,
    pub root: NodeId,
    pub parts: Vec<NodeId>,
}

/// Load an asset into the scene: rename root and parts per the identity
/// scheme, pick a free ground position (origin when the scene is empty),
/// parent the root under the session container, and register the instance.
/// A loader failure mutates nothing.
pub fn load_model(
    session: &mut Session,
    loader: &mut dyn ModelLoader,
    file: &str,
) -> Result<LoadedInstance, AssetError> {
    let prototype = loader.load_model(file)?;
    if prototype.meshes.is_empty() {
        return Err(AssetError::Empty {
            path: file.to_string(),
        });
    }
    log::info!("loading model {file}");
    Ok(instantiate(session, &prototype, file))
}

fn instantiate(session: &mut Session, prototype: &ModelPrototype, file: &str) -> LoadedInstance {
    let id = session.next_instance_id(file);
    let material_ids: Vec<MaterialId> = prototype
        .materials
        .iter()
        .map(|material| session.graph.add_material(material.clone()))
        .collect();

    let mut parts: Vec<NodeId> = Vec::with_capacity(prototype.meshes.len());
    for (index, mesh) in prototype.meshes.iter().enumerate() {
        let name = if index == 0 {
            id.clone()
        } else {
            format!("{}_child_{}", id, index)
        };
        let node_id = session.graph.create_node(name);
        if let Some(node) = session.graph.node_mut(node_id) {
            node.transform = mesh.transform;
            node.local_bounds = mesh.bounds;
            node.material = mesh.material.and_then(|slot| material_ids.get(slot).copied());
            if index == 0 {
                node.metadata.model_file = Some(file.to_string());
            }
        }
        if index > 0 {
            session.graph.set_parent(node_id, Some(parts[0]));
        }
        parts.push(node_id);
    }
    let root = parts[0];

    let position = if session.registry.is_empty() {
        Vec3::ZERO
    } else {
        let footprint = session.graph.hierarchy_bounds(root).unwrap_or(Aabb::ZERO);
        let existing: Vec<GroundRect> = session
            .registry
            .iter()
            .filter_map(|(_, entry)| entry.first().copied())
            .filter_map(|entry_root| session.graph.hierarchy_bounds(entry_root))
            .map(|bounds| GroundRect::from_bounds(&bounds))
            .collect();
        placement::choose_position(&footprint, &existing)
    };
    if let Some(node) = session.graph.node_mut(root) {
        node.transform.position = position;
    }

    let container = session.container();
    session.graph.set_parent(root, Some(container));
    session.registry.register(id.clone(), parts.clone());
    log::info!("registered model instance {id} ({} parts)", parts.len());
    LoadedInstance { id, root, parts }
}

/// Duplicate the selected instance: a fresh load of the same asset,
/// positioned immediately to the left of the original regardless of what the
/// placement grid would choose. Selects the copy.
pub fn duplicate(
    session: &mut Session,
    loader: &mut dyn ModelLoader,
) -> Result<LoadedInstance, LifecycleError> {
    let root = match session.selection() {
        Selection::None => return Err(EditError::NoSelection.into()),
        Selection::Part(_) => return Err(EditError::PartSelected.into()),
        Selection::Instance(root) => root,
    };
    let file = session
        .graph
        .node(root)
        .and_then(|node| node.metadata.model_file.clone())
        .ok_or(EditError::MissingModelFile)?;
    let width = session
        .graph
        .hierarchy_bounds(root)
        .map(|bounds| bounds.width())
        .unwrap_or(0.0);
    let origin = session.graph.world_position(root);

    let loaded = load_model(session, loader, &file)?;
    let position = origin + Vec3::new(-(width + DUPLICATE_PADDING), 0.0, 0.0);
    if let Some(node) = session.graph.node_mut(loaded.root) {
        node.transform.position = position;
    }
    session.select_instance(loaded.root);
    log::info!("duplicated {file} as {}", loaded.id);
    Ok(loaded)
}

/// Replace the selected instance with a same-category asset, carrying over
/// its transform and any custom material/color state. Rejections are
/// user-visible validation errors and mutate nothing; a load failure leaves
/// the old instance in place.
pub fn replace(
    session: &mut Session,
    loader: &mut dyn ModelLoader,
    new_file: &str,
) -> Result<LoadedInstance, LifecycleError> {
    let root = match session.selection() {
        Selection::None => return Err(EditError::NoSelection.into()),
        Selection::Part(_) => return Err(EditError::PartSelected.into()),
        Selection::Instance(root) => root,
    };
    let owner = session
        .registry
        .find_owner(root)
        .map(str::to_string)
        .ok_or(EditError::NotRegistered)?;
    let old_parts = session
        .registry
        .lookup(&owner)
        .map(<[NodeId]>::to_vec)
        .ok_or(EditError::NotRegistered)?;
    if old_parts.first() != Some(&root) {
        return Err(EditError::PartSelected.into());
    }

    let old_base = base_type(&owner);
    let new_base = base_type(new_file);
    if old_base.is_empty() || new_base.is_empty() {
        return Err(EditError::Uncategorized.into());
    }
    if old_base != new_base {
        return Err(EditError::CategoryMismatch.into());
    }

    let old_transform = session
        .graph
        .node(root)
        .map(|node| node.transform)
        .ok_or(EditError::NotRegistered)?;

    // Prefer the root's own material state, else the first child carrying
    // one.
    let (old_material, material_applied, material_name) = match session.graph.node(root) {
        Some(node) if node.material.is_some() => (
            node.material,
            node.metadata.custom_material_applied,
            node.metadata.applied_material_name.clone(),
        ),
        _ => {
            let mut captured = (None, false, None);
            for child in session.graph.child_meshes(root) {
                if let Some(node) = session.graph.node(child) {
                    if node.material.is_some() {
                        captured = (
                            node.material,
                            node.metadata.custom_material_applied,
                            node.metadata.applied_material_name.clone(),
                        );
                        break;
                    }
                }
            }
            captured
        }
    };
    let old_color = {
        let mut hex = None;
        for child in session.graph.child_meshes(root) {
            if let Some(node) = session.graph.node(child) {
                if node.metadata.custom_color_applied {
                    hex = node.metadata.applied_color_hex.clone();
                    break;
                }
            }
        }
        if hex.is_none() {
            if let Some(node) = session.graph.node(root) {
                if node.metadata.custom_color_applied {
                    hex = node.metadata.applied_color_hex.clone();
                }
            }
        }
        hex
    };

    let loaded = load_model(session, loader, new_file)?;

    if let Some(node) = session.graph.node_mut(loaded.root) {
        node.transform = old_transform;
    }
    if material_applied {
        if let Some(material_id) = old_material {
            for &part in &loaded.parts {
                if let Some(node) = session.graph.node_mut(part) {
                    node.material = Some(material_id);
                    node.metadata.custom_material_applied = true;
                    node.metadata.applied_material_name = material_name.clone();
                }
            }
        }
    }
    if let Some(hex) = &old_color {
        for &part in &loaded.parts {
            apply::apply_color(&mut session.graph, part, hex)?;
        }
    }

    for child in session.graph.child_meshes(root) {
        session.graph.dispose(child);
    }
    session.graph.dispose(root);
    session.registry.unregister(&owner);
    session.clear_gizmo();
    session.select_instance(loaded.root);
    log::info!("replaced {owner} with {}", loaded.id);
    Ok(loaded)
}

/// Remove the selected instance: detach from its parent, dispose children
/// then root, drop the registry entry, clear selection and gizmo. A no-op
/// when nothing (or a lone part) is selected.
pub fn remove(session: &mut Session) {
    let root = match session.selection() {
        Selection::Instance(root) => root,
        _ => return,
    };
    let Some(owner) = session.registry.find_owner(root).map(str::to_string) else {
        session.clear_selection();
        return;
    };
    session.graph.set_parent(root, None);
    for child in session.graph.child_meshes(root) {
        session.graph.dispose(child);
    }
    session.graph.dispose(root);
    session.registry.unregister(&owner);
    session.clear_selection();
    log::info!("removed model instance {owner}");
}
