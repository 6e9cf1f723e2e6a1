use cgmath::{InnerSpace, Zero};

use crate::{
    data_structures::model::{Mesh, ModelVertex},
    math::{NormalizeOrZero, Vector2f, Vector3f},
    resources::{Assets, MeshId, load_string},
};

/// UV triangles with a smaller absolute determinant do not contribute a tangent.
const DEGENERATE_UV_EPSILON: f32 = 1e-10;

/// Load an OBJ file, bake tangents and upload the geometry as one mesh.
///
/// All objects in the file are merged. Materials referenced by the file are
/// ignored, textures are attached through material components instead.
pub async fn load_mesh_obj(
    file_name: &str,
    device: &wgpu::Device,
    assets: &mut Assets,
) -> anyhow::Result<MeshId> {
    let obj_text = load_string(file_name).await?;
    let (vertices, indices) = parse_obj(&obj_text)
        .await
        .map_err(|e| e.context(format!("Cannot parse {file_name}")))?;
    log::debug!(
        "Loaded {file_name}: {} vertices, {} triangles",
        vertices.len(),
        indices.len() / 3
    );
    let mesh = Mesh::new(device, file_name, &vertices, &indices);
    Ok(assets.add_mesh(mesh))
}

/// Parse OBJ text into tangent-baked vertices and triangle indices.
pub async fn parse_obj(obj_text: &str) -> anyhow::Result<(Vec<ModelVertex>, Vec<u32>)> {
    let (models, _) = tobj::tokio::load_obj_buf(
        obj_text.as_bytes(),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            log::debug!("Ignoring material library {}", p.display());
            Err(tobj::LoadError::OpenFileFailed)
        },
    )
    .await?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for m in &models {
        let base = u32::try_from(vertices.len())?;
        vertices.extend((0..m.mesh.positions.len() / 3).map(|i| ModelVertex {
            position: [
                m.mesh.positions[i * 3],
                m.mesh.positions[i * 3 + 1],
                m.mesh.positions[i * 3 + 2],
            ],
            tex_coords: [
                m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
            // We'll calculate these later
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
        }));
        indices.extend(m.mesh.indices.iter().map(|i| base + i));
    }
    if indices.is_empty() {
        anyhow::bail!("no triangles found");
    }

    compute_tangents(&mut vertices, &indices);
    Ok((vertices, indices))
}

/// Bake per-vertex tangents and bitangents from UV gradients.
///
/// Tangents of all triangles sharing a vertex are summed, then made
/// orthogonal to the vertex normal. The bitangent is `normal × tangent`.
/// Triangles with degenerate UVs are skipped; a vertex left without a tangent
/// gets an arbitrary unit vector perpendicular to its normal.
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut tangents = vec![Vector3f::zero(); vertices.len()];

    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let (v0, v1, v2) = (vertices[i0], vertices[i1], vertices[i2]);

        let pos0: Vector3f = v0.position.into();
        let pos1: Vector3f = v1.position.into();
        let pos2: Vector3f = v2.position.into();

        let uv0: Vector2f = v0.tex_coords.into();
        let uv1: Vector2f = v1.tex_coords.into();
        let uv2: Vector2f = v2.tex_coords.into();

        // Calculate the edges of the triangle
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solves
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        // for T.
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < DEGENERATE_UV_EPSILON {
            continue;
        }
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) / det;

        tangents[i0] += tangent;
        tangents[i1] += tangent;
        tangents[i2] += tangent;
    }

    for (vertex, tangent) in vertices.iter_mut().zip(tangents) {
        let normal = Vector3f::from(vertex.normal).normalize_or_zero();
        // Gram-Schmidt
        let mut tangent = (tangent - normal * normal.dot(tangent)).normalize_or_zero();
        if tangent.is_zero() {
            tangent = any_perpendicular(normal);
        }
        vertex.tangent = tangent.into();
        vertex.bitangent = normal.cross(tangent).into();
    }
}

fn any_perpendicular(normal: Vector3f) -> Vector3f {
    if normal.is_zero() {
        return Vector3f::unit_x();
    }
    let axis = if normal.x.abs() < 0.9 {
        Vector3f::unit_x()
    } else {
        Vector3f::unit_y()
    };
    (axis - normal * normal.dot(axis)).normalize()
}
