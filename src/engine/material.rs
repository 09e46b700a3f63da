use glam::{Vec2, Vec3};

use super::SceneGraph;

/// Handle to a material owned by a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub(super) u64);

/// A material with optional color-bearing slots. Which slots are populated
/// depends on how the material was built: PBR materials carry `albedo`,
/// textured standard materials carry `diffuse`. Color edits overwrite every
/// populated slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub albedo: Option<Vec3>,
    pub diffuse: Option<Vec3>,
    pub base: Option<Vec3>,
    pub emissive: Option<Vec3>,
    pub metallic: f32,
    pub roughness: f32,
    pub specular: Vec3,
    pub diffuse_texture: Option<String>,
    pub uv_scale: Vec2,
    pub backface_culling: bool,
    pub dirty: bool,
}

impl Material {
    /// Metallic/roughness material with an albedo color slot.
    pub fn pbr(name: impl Into<String>, albedo: Vec3, metallic: f32, roughness: f32) -> Self {
        Self {
            name: name.into(),
            albedo: Some(albedo),
            diffuse: None,
            base: None,
            emissive: None,
            metallic,
            roughness,
            specular: Vec3::ONE,
            diffuse_texture: None,
            uv_scale: Vec2::ONE,
            backface_culling: true,
            dirty: false,
        }
    }

    /// Unlit-style material carrying an image as its diffuse map: 1x1 tiling,
    /// no specular, double-sided.
    pub fn textured(name: impl Into<String>, texture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            albedo: None,
            diffuse: Some(Vec3::ONE),
            base: None,
            emissive: None,
            metallic: 0.0,
            roughness: 1.0,
            specular: Vec3::ZERO,
            diffuse_texture: Some(texture.into()),
            uv_scale: Vec2::ONE,
            backface_culling: false,
            dirty: false,
        }
    }

    /// Unshared copy under a new name, for per-part color overrides.
    pub fn clone_as(&self, name: impl Into<String>) -> Self {
        let mut clone = self.clone();
        clone.name = name.into();
        clone.dirty = false;
        clone
    }

    /// Overwrite every populated color slot and mark the material for
    /// re-render.
    pub fn set_all_colors(&mut self, color: Vec3) {
        for slot in [
            &mut self.albedo,
            &mut self.diffuse,
            &mut self.base,
            &mut self.emissive,
        ] {
            if slot.is_some() {
                *slot = Some(color);
            }
        }
        self.dirty = true;
    }
}

/// Fixed name -> material mapping created once at session start. Catalog
/// entries are shared by every part that uses them until a color edit clones
/// one for a specific part.
pub struct MaterialCatalog {
    entries: Vec<(String, MaterialId)>,
}

impl MaterialCatalog {
    pub fn standard(graph: &mut SceneGraph) -> Self {
        let mut entries = Vec::new();
        for (name, albedo, metallic, roughness) in [
            ("gold", Vec3::new(1.0, 0.788, 0.2), 1.0, 0.2),
            ("silver", Vec3::new(0.75, 0.75, 0.75), 1.0, 0.3),
            ("copper", Vec3::new(0.72, 0.45, 0.20), 1.0, 0.4),
            ("carbon", Vec3::new(0.1, 0.1, 0.1), 1.0, 0.6),
        ] {
            let id = graph.add_material(Material::pbr(name, albedo, metallic, roughness));
            entries.push((name.to_string(), id));
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<MaterialId> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, id)| *id)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
