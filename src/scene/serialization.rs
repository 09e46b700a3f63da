//! Scene document export/import. The document (conventionally written as
//! `scene.json`) is an ordered list of model records: asset name, root
//! transform, applied material/color, parent container, and per-child
//! override records keyed by the stable `child_<n>` suffix.
//!
//! Import is strictly sequential so that parent-by-name references only
//! resolve against nodes that already exist. A malformed document is fatal
//! before anything loads; one record's load failure is logged and skipped,
//! and records processed earlier in the same import remain.

use super::{apply, child_suffix, lifecycle, Session};
use crate::assets::ModelLoader;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scene format: 'models' must be an array")]
    InvalidModels,
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serialized form of the whole scene.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    pub models: Vec<ModelRecord>,
}

/// One model instance: asset base name (no extension), root transform,
/// applied material/color, parent container, child overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecord {
    pub model_name: String,
    pub position: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Quat>,
    pub scaling: Vec3,
    #[serde(default = "material_name_none")]
    pub material_name: String,
    #[serde(default)]
    pub color_hex: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<ChildRecord>>,
}

/// Override record for one child part, identified by its stable name suffix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRecord {
    pub mesh_suffix: String,
    pub position: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Quat>,
    pub scaling: Vec3,
    #[serde(default = "material_name_none")]
    pub material_name: String,
    #[serde(default)]
    pub color_hex: Option<String>,
    #[serde(default)]
    pub texture_name: Option<String>,
}

fn material_name_none() -> String {
    "None".to_string()
}

/// What an import actually did: instance ids that materialized, files that
/// failed to load and were skipped.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
}

/// Walk the registry in insertion order and emit one record per instance.
pub fn export_document(session: &Session) -> SceneDocument {
    let mut models = Vec::new();
    for (id, parts) in session.registry.iter() {
        let Some(&root) = parts.first() else {
            continue;
        };
        let Some(root_node) = session.graph.node(root) else {
            continue;
        };
        let model_name = id
            .trim_start_matches('/')
            .split('_')
            .next()
            .unwrap_or_default()
            .to_string();
        let parent_name = session
            .graph
            .parent(root)
            .and_then(|parent| session.graph.node(parent))
            .map(|node| node.name.clone());

        let children_ids = session.graph.child_meshes(root);

        // Material preference: the root's metadata when the root carries a
        // material, else the metadata of the first child that does. The
        // chosen node's metadata may still be empty, which exports as "None"
        // even if a later sibling has a named material.
        let material_name = if root_node.material.is_some() {
            root_node.metadata.applied_material_name.clone()
        } else {
            children_ids
                .iter()
                .filter_map(|&child| session.graph.node(child))
                .find(|node| node.material.is_some())
                .and_then(|node| node.metadata.applied_material_name.clone())
        };
        let color_hex = children_ids
            .iter()
            .find_map(|&child| {
                session
                    .graph
                    .node(child)
                    .filter(|node| node.metadata.custom_color_applied)
                    .and_then(|node| node.metadata.applied_color_hex.clone())
            })
            .or_else(|| {
                if root_node.metadata.custom_color_applied {
                    root_node.metadata.applied_color_hex.clone()
                } else {
                    None
                }
            });

        let children = children_ids
            .iter()
            .filter_map(|&child| {
                let node = session.graph.node(child)?;
                Some(ChildRecord {
                    mesh_suffix: child_suffix(&node.name).to_string(),
                    position: node.transform.position,
                    rotation: node.transform.rotation_quaternion,
                    scaling: node.transform.scaling,
                    material_name: node
                        .metadata
                        .applied_material_name
                        .clone()
                        .unwrap_or_else(material_name_none),
                    color_hex: node.metadata.applied_color_hex.clone(),
                    texture_name: node.metadata.texture_name.clone(),
                })
            })
            .collect();

        models.push(ModelRecord {
            model_name,
            position: root_node.transform.position,
            rotation: root_node.transform.rotation_quaternion,
            scaling: root_node.transform.scaling,
            material_name: material_name.unwrap_or_else(material_name_none),
            color_hex,
            parent_name,
            children: Some(children),
        });
    }
    SceneDocument { models }
}

/// Parse a document, rejecting a malformed top level before anything else
/// happens.
pub fn parse_document(text: &str) -> Result<SceneDocument> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let models_is_array = value
        .get("models")
        .map(serde_json::Value::is_array)
        .unwrap_or(false);
    if !models_is_array {
        return Err(SerializationError::InvalidModels);
    }
    Ok(serde_json::from_value(value)?)
}

/// Rebuild the scene from a document, one record at a time. Each record's
/// load completes before the next starts so that `parentName` references
/// resolve against earlier records. Load failures are logged and skipped.
pub fn import_document(
    session: &mut Session,
    loader: &mut dyn ModelLoader,
    document: &SceneDocument,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for record in &document.models {
        let file = format!("{}.glb", record.model_name);
        let loaded = match lifecycle::load_model(session, loader, &file) {
            Ok(loaded) => loaded,
            Err(err) => {
                log::warn!("skipping model {file}: {err}");
                summary.skipped.push(file);
                continue;
            }
        };

        if let Some(node) = session.graph.node_mut(loaded.root) {
            node.transform.position = record.position;
            node.transform.scaling = record.scaling;
            if record.rotation.is_some() {
                node.transform.rotation_quaternion = record.rotation;
            }
        }
        if let Some(parent_name) = &record.parent_name {
            if let Some(parent) = session.graph.find_node_by_name(parent_name) {
                session.graph.set_parent(loaded.root, Some(parent));
            }
        }
        if let Some(material) = session.materials.get(&record.material_name) {
            apply::apply_material(&mut session.graph, loaded.root, material);
        }
        if let Some(hex) = &record.color_hex {
            if let Err(err) = apply::apply_color(&mut session.graph, loaded.root, hex) {
                log::warn!("color {hex} rejected for {}: {err}", loaded.id);
            }
        }

        for child_record in record.children.iter().flatten() {
            let target = loaded.parts.iter().copied().find(|&part| {
                session
                    .graph
                    .node(part)
                    .is_some_and(|node| node.name.ends_with(&child_record.mesh_suffix))
            });
            let Some(target) = target else {
                continue;
            };
            if let Some(node) = session.graph.node_mut(target) {
                node.transform.position = child_record.position;
                node.transform.scaling = child_record.scaling;
                if child_record.rotation.is_some() {
                    node.transform.rotation_quaternion = child_record.rotation;
                }
            }
            if let Some(material) = session.materials.get(&child_record.material_name) {
                apply::apply_material(&mut session.graph, target, material);
            }
            if let Some(hex) = &child_record.color_hex {
                if let Err(err) = apply::apply_color(&mut session.graph, target, hex) {
                    log::warn!("color {hex} rejected for {}: {err}", loaded.id);
                }
            }
            if let Some(texture) = &child_record.texture_name {
                apply::apply_texture(&mut session.graph, target, texture);
            }
        }

        summary.loaded.push(loaded.id.clone());
    }
    summary
}

/// Parse-then-import in one step; the parse error is fatal and reaches the
/// caller before any load starts.
pub fn import_from_str(
    session: &mut Session,
    loader: &mut dyn ModelLoader,
    text: &str,
) -> Result<ImportSummary> {
    let document = parse_document(text)?;
    Ok(import_document(session, loader, &document))
}

pub fn save_document_to_file(document: &SceneDocument, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_document_from_file(path: &Path) -> Result<SceneDocument> {
    let json = std::fs::read_to_string(path)?;
    parse_document(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::fixtures;
    use crate::scene::lifecycle::load_model;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn export_import_round_trip_preserves_the_scene() {
        let mut session = Session::new();
        let mut loader = fixtures::loader();

        let chair = load_model(&mut session, &mut loader, "chair1.glb").expect("load");
        let vase = load_model(&mut session, &mut loader, "vase1.glb").expect("load");
        if let Some(node) = session.graph.node_mut(chair.root) {
            node.transform.position = Vec3::new(1.0, 0.0, 2.0);
            node.transform.rotation_quaternion = Some(Quat::from_rotation_y(0.5));
        }
        // Custom color on one child of the chair; the vase stays plain.
        apply::apply_color(&mut session.graph, chair.parts[1], "#ff0000").expect("color");
        let _ = vase;

        let document = export_document(&session);
        assert_eq!(document.models.len(), 2);
        assert_eq!(document.models[0].model_name, "chair1");
        assert_eq!(document.models[0].color_hex.as_deref(), Some("#ff0000"));
        assert_eq!(
            document.models[0].parent_name.as_deref(),
            Some("parentContainer")
        );
        assert_eq!(document.models[1].color_hex, None);

        let mut fresh = Session::new();
        let mut fresh_loader = fixtures::loader();
        let summary = import_document(&mut fresh, &mut fresh_loader, &document);
        assert_eq!(summary.loaded.len(), 2);
        assert!(summary.skipped.is_empty());
        assert_eq!(fresh.registry.len(), 2);

        let (chair_id, chair_parts) = fresh.registry.iter().next().expect("entry");
        assert!(chair_id.starts_with("chair1_"));
        let root = fresh.graph.node(chair_parts[0]).expect("root");
        assert!(approx(root.transform.position, Vec3::new(1.0, 0.0, 2.0)));
        assert!(root.transform.rotation_quaternion.is_some());
        assert_eq!(fresh.graph.parent(chair_parts[0]), Some(fresh.container()));

        // The same child suffix carries the same color.
        let colored = chair_parts
            .iter()
            .find(|&&part| {
                fresh
                    .graph
                    .node(part)
                    .is_some_and(|node| node.name.ends_with("child_1"))
            })
            .expect("child_1");
        let node = fresh.graph.node(*colored).expect("node");
        assert!(node.metadata.custom_color_applied);
        assert_eq!(node.metadata.applied_color_hex.as_deref(), Some("#ff0000"));

        // Record-level color fans out to every part on import, so the
        // sibling comes back colored too (the document does not remember
        // which single part was edited at the instance level).
        let sibling = chair_parts
            .iter()
            .find(|&&part| {
                fresh
                    .graph
                    .node(part)
                    .is_some_and(|node| node.name.ends_with("child_2"))
            })
            .expect("child_2");
        assert!(fresh
            .graph
            .node(*sibling)
            .map(|n| n.metadata.custom_color_applied)
            .unwrap_or(false));
    }

    #[test]
    fn export_records_material_and_texture_overrides() {
        let mut session = Session::new();
        let mut loader = fixtures::loader();

        let chair = load_model(&mut session, &mut loader, "chair1.glb").expect("load");
        let gold = session.materials.get("gold").expect("gold");
        apply::apply_material(&mut session.graph, chair.root, gold);
        apply::apply_texture(&mut session.graph, chair.parts[2], "monalisa.jpg");

        let document = export_document(&session);
        let record = &document.models[0];
        assert_eq!(record.material_name, "gold");
        let children = record.children.as_ref().expect("children");
        assert_eq!(children[0].mesh_suffix, "child_1");
        assert_eq!(children[1].mesh_suffix, "child_2");
        assert_eq!(children[1].texture_name.as_deref(), Some("monalisa.jpg"));
        assert_eq!(children[0].texture_name, None);
    }

    #[test]
    fn export_material_reads_the_first_child_with_a_material() {
        let mut session = Session::new();
        let mut loader = fixtures::loader();

        let chair = load_model(&mut session, &mut loader, "chair1.glb").expect("load");
        let gold = session.materials.get("gold").expect("gold");
        apply::apply_material(&mut session.graph, chair.parts[2], gold);

        // child_1 carries the prototype material with empty metadata and is
        // scanned first, so the record shows no applied material even though
        // a later sibling carries a named one.
        let document = export_document(&session);
        assert_eq!(document.models[0].material_name, "None");
        let children = document.models[0].children.as_ref().expect("children");
        assert_eq!(children[0].material_name, "None");
        assert_eq!(children[1].material_name, "gold");
    }

    #[test]
    fn malformed_models_field_is_fatal_before_any_load() {
        let mut session = Session::new();
        let mut loader = fixtures::loader();

        let err = import_from_str(&mut session, &mut loader, r#"{"models": 42}"#).unwrap_err();
        assert!(matches!(err, SerializationError::InvalidModels));
        assert!(session.registry.is_empty());

        let err = import_from_str(&mut session, &mut loader, r#"{"other": []}"#).unwrap_err();
        assert!(matches!(err, SerializationError::InvalidModels));

        let err = import_from_str(&mut session, &mut loader, "not json").unwrap_err();
        assert!(matches!(err, SerializationError::Json(_)));
        assert!(session.registry.is_empty());
    }

    #[test]
    fn one_bad_record_is_skipped_and_earlier_records_remain() {
        let mut session = Session::new();
        let mut loader = fixtures::loader();

        let chair = load_model(&mut session, &mut loader, "chair1.glb").expect("load");
        load_model(&mut session, &mut loader, "vase1.glb").expect("load");
        let mut document = export_document(&session);
        // Splice an unknown model between the two good records.
        let mut ghost = document.models[0].clone();
        ghost.model_name = "ghost".to_string();
        document.models.insert(1, ghost);
        let _ = chair;

        let mut fresh = Session::new();
        let mut fresh_loader = fixtures::loader();
        let summary = import_document(&mut fresh, &mut fresh_loader, &document);

        assert_eq!(summary.loaded.len(), 2);
        assert_eq!(summary.skipped, vec!["ghost.glb".to_string()]);
        assert_eq!(fresh.registry.len(), 2);
    }

    #[test]
    fn empty_scene_round_trips() {
        let session = Session::new();
        let document = export_document(&session);
        let json = serde_json::to_string_pretty(&document).expect("serialize");
        let parsed = parse_document(&json).expect("parse");
        assert!(parsed.models.is_empty());
    }

    #[test]
    fn save_and_load_document_via_file() {
        let mut session = Session::new();
        let mut loader = fixtures::loader();
        load_model(&mut session, &mut loader, "table1.glb").expect("load");
        let document = export_document(&session);

        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        path.push(format!(
            "stagecraft_scene_{}_{}.json",
            std::process::id(),
            nonce
        ));

        save_document_to_file(&document, &path).expect("save");
        let loaded = load_document_from_file(&path).expect("load");
        assert_eq!(loaded.models.len(), 1);
        assert_eq!(loaded.models[0].model_name, "table1");

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn quaternion_rotation_survives_json() {
        let record = ModelRecord {
            model_name: "chair1".to_string(),
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Some(Quat::from_rotation_y(1.0)),
            scaling: Vec3::ONE,
            material_name: "None".to_string(),
            color_hex: None,
            parent_name: None,
            children: None,
        };
        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: ModelRecord = serde_json::from_str(&json).expect("parse");
        let original = record.rotation.expect("quat");
        let round_tripped = parsed.rotation.expect("quat");
        assert!((original.dot(round_tripped) - 1.0).abs() < 1e-6);

        // Records without rotation omit the field entirely.
        let plain = ModelRecord {
            rotation: None,
            ..record
        };
        let json = serde_json::to_string(&plain).expect("serialize");
        assert!(!json.contains("rotation"));
    }
}
