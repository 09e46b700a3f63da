//! Interactive scene editor core: load glTF models into a scene graph, place
//! them on the ground plane without overlaps, restyle parts with catalog
//! materials, colors, and textures, and round-trip the whole arrangement
//! through a JSON scene document.
//!
//! Rendering, windowing, and file dialogs live outside this crate; callers
//! drive a [`scene::Session`] and read the graph back out for display.

pub mod assets;
pub mod engine;
pub mod scene;

pub use assets::{AssetError, GltfModelLoader, ModelLoader, ModelPrototype, StaticModelLoader};
pub use engine::{Aabb, Material, MaterialCatalog, MaterialId, NodeId, SceneGraph, Transform};
pub use scene::serialization::{SceneDocument, SerializationError};
pub use scene::{base_type, EditError, ModelRegistry, Selection, Session};
