//! Model, mesh, material and light descriptors

use bytemuck::{Pod, Zeroable};
use kiln_core::{Aabb, Color, Vec3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Opaque handle to a mesh uploaded to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// A vertex with position, normal, color, UV and bone skinning data.
/// Static meshes leave the joint weights at zero.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
    pub joint_indices: [u32; 4],
    pub joint_weights: [f32; 4],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, color: Color) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            color: color.to_array(),
            uv: [0.0, 0.0],
            joint_indices: [0; 4],
            joint_weights: [0.0; 4],
        }
    }

    pub fn with_uv(mut self, u: f32, v: f32) -> Self {
        self.uv = [u, v];
        self
    }

    pub fn with_joints(mut self, indices: [u32; 4], weights: [f32; 4]) -> Self {
        self.joint_indices = indices;
        self.joint_weights = weights;
        self
    }

    pub fn is_skinned(&self) -> bool {
        self.joint_weights.iter().any(|w| *w > 0.0)
    }
}

/// CPU-side mesh ready for upload
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_skinned(&self) -> bool {
        self.vertices.iter().any(Vertex::is_skinned)
    }

    /// Axis-aligned bounds of all vertex positions
    pub fn bounds(&self) -> Option<Aabb> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from_array(v.position));
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Aabb::from_min_max(min, max))
    }

    /// Axis-aligned box centered at the origin
    pub fn cuboid(half: Vec3, color: Color) -> Self {
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (-Vec3::X, Vec3::Y, -Vec3::Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (-Vec3::Y, Vec3::Z, -Vec3::X),
            (Vec3::Z, Vec3::Y, -Vec3::X),
            (-Vec3::Z, Vec3::Y, Vec3::X),
        ];

        let mut mesh = MeshData::default();
        for (normal, up, right) in faces {
            let base = mesh.vertices.len() as u32;
            let center = normal * half;
            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
            for (sx, sy) in corners {
                let p = center + right * half * sx + up * half * sy;
                mesh.vertices.push(
                    Vertex::new(p, normal, color).with_uv((sx + 1.0) * 0.5, (1.0 - sy) * 0.5),
                );
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }
}

/// A loaded model: renderer-side meshes plus bounds used for picking and framing
#[derive(Debug, Clone)]
pub struct Model {
    /// Source path, persisted in scene documents
    pub path: String,
    pub meshes: Vec<MeshHandle>,
    pub center: Vec3,
    pub radius: f32,
    pub skinned: bool,
}

impl Model {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            meshes: Vec::new(),
            center: Vec3::ZERO,
            radius: 1.0,
            skinned: false,
        }
    }

    pub fn with_bounds(mut self, center: Vec3, radius: f32) -> Self {
        self.center = center;
        self.radius = radius.max(0.0);
        self
    }

    pub fn with_mesh(mut self, mesh: MeshHandle) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_skinning(mut self, skinned: bool) -> Self {
        self.skinned = skinned;
        self
    }

    /// Fit center and radius to a set of meshes
    pub fn fit_bounds<'a>(&mut self, meshes: impl IntoIterator<Item = &'a MeshData>) {
        let bounds = meshes
            .into_iter()
            .filter_map(MeshData::bounds)
            .reduce(|a, b| Aabb::from_min_max(a.min.min(b.min), a.max.max(b.max)));
        if let Some(bounds) = bounds {
            self.center = bounds.center();
            self.radius = bounds.half_extents().length();
        }
    }

    /// Local bounds as a symmetric box of half-size `radius`
    pub fn local_bounds(&self) -> Aabb {
        Aabb::from_center_radius(self.center, self.radius)
    }
}

/// PBR material parameters. Entities share materials through `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Material {
    pub name: String,
    pub base_color: Color,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: Color,
    pub base_color_texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            base_color: Color::WHITE,
            metallic: 0.0,
            roughness: 0.5,
            emissive: Color::BLACK,
            base_color_texture: None,
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>, base_color: Color) -> Self {
        Self {
            name: name.into(),
            base_color,
            ..Default::default()
        }
    }

    pub fn shared(self) -> Arc<Material> {
        Arc::new(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

/// Light descriptor attached to an entity; position and direction come
/// from the entity's world matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    pub range: f32,
    /// Spot cone half-angle in degrees
    pub spot_angle: f32,
    pub cast_shadows: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            color: Color::WHITE,
            intensity: 1.0,
            range: 10.0,
            spot_angle: 30.0,
            cast_shadows: false,
        }
    }
}

impl Light {
    pub fn directional(color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
            cast_shadows: true,
            ..Default::default()
        }
    }

    pub fn point(color: Color, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            intensity,
            range,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_bounds() {
        let mesh = MeshData::cuboid(Vec3::new(1.0, 2.0, 3.0), Color::WHITE);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        let bounds = mesh.bounds().unwrap();
        assert!(bounds.min.abs_diff_eq(Vec3::new(-1.0, -2.0, -3.0), 1e-6));
        assert!(bounds.max.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
        assert!(!mesh.is_skinned());
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(MeshData::default().bounds().is_none());
    }

    #[test]
    fn model_fits_bounds() {
        let a = MeshData::cuboid(Vec3::ONE, Color::WHITE);
        let mut model = Model::new("box.glb");
        model.fit_bounds([&a]);
        assert!(model.center.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!((model.radius - 3f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn vertex_layout_is_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 80);
        let v = Vertex::new(Vec3::ZERO, Vec3::Y, Color::WHITE).with_joints([1, 0, 0, 0], [1.0, 0.0, 0.0, 0.0]);
        assert!(v.is_skinned());
        assert_eq!(bytemuck::bytes_of(&v).len(), 80);
    }

    #[test]
    fn light_defaults_from_partial_json() {
        let light: Light = serde_json::from_str(r#"{"kind":"spot","range":4.0}"#).unwrap();
        assert_eq!(light.kind, LightKind::Spot);
        assert_eq!(light.intensity, 1.0);
        assert_eq!(light.range, 4.0);
    }
}
