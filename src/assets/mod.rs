//! The model-loader seam. The editor core never touches asset files
//! directly: lifecycle operations go through [`ModelLoader`], which yields a
//! [`ModelPrototype`] describing the meshes and materials to instantiate.
//! [`GltfModelLoader`] is the file-backed implementation;
//! [`StaticModelLoader`] serves canned prototypes for tests and headless
//! sessions.

use crate::engine::{Aabb, Material, Transform};
use glam::{Mat4, Vec3};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to import model {path}: {source}")]
    Import {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("model {path} contains no meshes")]
    Empty { path: String },
    #[error("unknown model {name}")]
    Unknown { name: String },
}

/// One mesh of a model prototype: its transform relative to the model root,
/// its local bounds, and an index into the prototype's material list.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub transform: Transform,
    pub bounds: Option<Aabb>,
    pub material: Option<usize>,
}

/// A loaded model before instantiation. `meshes[0]` is the root (a pure
/// transform node); the rest become child parts in order. Materials are
/// instantiated once per model instance and shared by the meshes that
/// reference them.
#[derive(Debug, Clone)]
pub struct ModelPrototype {
    pub file: String,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<Material>,
}

/// Asynchronous loader keyed by file name. Loads are I/O-bound; callers that
/// need ordering (import) await each result before issuing the next.
pub trait ModelLoader {
    fn load_model(&mut self, file: &str) -> Result<ModelPrototype, AssetError>;
}

/// Reads `.glb`/`.gltf` files from a root directory.
pub struct GltfModelLoader {
    root_dir: PathBuf,
}

impl GltfModelLoader {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }
}

impl ModelLoader for GltfModelLoader {
    fn load_model(&mut self, file: &str) -> Result<ModelPrototype, AssetError> {
        let path = self.root_dir.join(file.trim_start_matches('/'));
        let display = path.display().to_string();
        let (document, _buffers, _images) =
            gltf::import(&path).map_err(|source| AssetError::Import {
                path: display.clone(),
                source,
            })?;

        let materials: Vec<Material> = document
            .materials()
            .map(|material| {
                let pbr = material.pbr_metallic_roughness();
                let base = pbr.base_color_factor();
                Material::pbr(
                    material.name().unwrap_or("material"),
                    Vec3::new(base[0], base[1], base[2]),
                    pbr.metallic_factor(),
                    pbr.roughness_factor(),
                )
            })
            .collect();

        // Synthetic root, then one entry per mesh-bearing node, walked from
        // the scene roots so nested nodes keep their ancestors' transforms.
        let mut meshes = vec![MeshData {
            transform: Transform::default(),
            bounds: None,
            material: None,
        }];
        if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
            for node in scene.nodes() {
                collect_meshes(&node, Mat4::IDENTITY, &mut meshes);
            }
        }

        if meshes.len() == 1 {
            return Err(AssetError::Empty { path: display });
        }
        Ok(ModelPrototype {
            file: file.to_string(),
            meshes,
            materials,
        })
    }
}

/// Depth-first walk accumulating the world transform of every mesh-bearing
/// node under `parent`.
fn collect_meshes(node: &gltf::Node<'_>, parent: Mat4, meshes: &mut Vec<MeshData>) {
    let local = Mat4::from_cols_array_2d(&node.transform().matrix());
    let global = parent * local;
    if let Some(mesh) = node.mesh() {
        let (scaling, rotation, position) = global.to_scale_rotation_translation();
        let mut bounds: Option<Aabb> = None;
        let mut material = None;
        for primitive in mesh.primitives() {
            let bb = primitive.bounding_box();
            let primitive_bounds = Aabb::new(Vec3::from(bb.min), Vec3::from(bb.max));
            bounds = Some(match bounds {
                Some(existing) => existing.union(&primitive_bounds),
                None => primitive_bounds,
            });
            if material.is_none() {
                material = primitive.material().index();
            }
        }
        meshes.push(MeshData {
            transform: Transform {
                position,
                rotation: Vec3::ZERO,
                rotation_quaternion: Some(rotation),
                scaling,
            },
            bounds,
            material,
        });
    }
    for child in node.children() {
        collect_meshes(&child, global, meshes);
    }
}

/// In-memory loader serving pre-registered prototypes.
#[derive(Default)]
pub struct StaticModelLoader {
    prototypes: HashMap<String, ModelPrototype>,
}

impl StaticModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prototype: ModelPrototype) {
        self.prototypes.insert(prototype.file.clone(), prototype);
    }
}

impl ModelLoader for StaticModelLoader {
    fn load_model(&mut self, file: &str) -> Result<ModelPrototype, AssetError> {
        self.prototypes
            .get(file)
            .cloned()
            .ok_or_else(|| AssetError::Unknown {
                name: file.to_string(),
            })
    }
}
