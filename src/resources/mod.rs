//! Loading meshes, textures and raw files from the asset directory, and the
//! arena that owns the loaded meshes.

use std::path::{Path, PathBuf};

use slotmap::SlotMap;

use crate::data_structures::model::Mesh;

pub mod mesh;
pub mod texture;

/// Directory relative file names are resolved against.
pub const ASSET_DIR: &str = "assets";

slotmap::new_key_type! {
    /// Handle of a mesh in [`Assets`].
    pub struct MeshId;
}

/// Owner of all loaded meshes. Components only hold [`MeshId`]s.
#[derive(Debug, Default)]
pub struct Assets {
    meshes: SlotMap<MeshId, Mesh>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.insert(mesh)
    }

    /// `None` once the mesh has been removed.
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    pub fn remove_mesh(&mut self, id: MeshId) -> Option<Mesh> {
        self.meshes.remove(id)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}

/// Resolve `file_name` inside the asset directory. Absolute paths are kept.
pub fn asset_path(file_name: &str) -> PathBuf {
    Path::new("./").join(ASSET_DIR).join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(file_name);
    let txt = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    let data = tokio::fs::read(&path)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    Ok(data)
}
