use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::scene::{PrimitiveMode, Shape};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12, // [f32; 3] is 12 bytes
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Geometry that can upload itself and record its own draw.
pub trait Drawable {
    /// Create GPU buffers. Called once; later calls are no-ops.
    fn init(&mut self, device: &wgpu::Device);

    /// Record the draw with `pipeline`. Does nothing before `init`.
    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, pipeline: &wgpu::RenderPipeline, primitive: PrimitiveMode);
}

struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

/// CPU geometry plus its buffers once initialized.
pub struct GpuMesh {
    label: String,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    buffers: Option<MeshBuffers>,
}

impl GpuMesh {
    pub fn new(label: impl Into<String>, (vertices, indices): (Vec<Vertex>, Vec<u16>)) -> Self {
        Self {
            label: label.into(),
            vertices,
            indices,
            buffers: None,
        }
    }

    pub fn for_shape(shape: Shape) -> Self {
        match shape {
            Shape::Plane => Self::new("Plane", create_plane_geometry()),
            Shape::Cube => Self::new("Cube", create_cube_geometry()),
            Shape::Sphere => Self::new("Sphere", create_sphere_geometry(24, 48)),
            Shape::Disc => Self::new("Disc", create_disc_geometry(64)),
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }
}

impl Drawable for GpuMesh {
    fn init(&mut self, device: &wgpu::Device) {
        if self.buffers.is_some() {
            return;
        }
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", self.label)),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", self.label)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.buffers = Some(MeshBuffers {
            vertex_buffer,
            index_buffer,
        });
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, pipeline: &wgpu::RenderPipeline, primitive: PrimitiveMode) {
        let Some(buffers) = &self.buffers else {
            log::warn!("{} drawn before init, skipping", self.label);
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        match primitive {
            PrimitiveMode::Triangles => {
                pass.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..self.indices.len() as u32, 0, 0..1);
            }
            PrimitiveMode::Points => {
                pass.draw(0..self.vertices.len() as u32, 0..1);
            }
        }
    }
}

/// Unit cube centered at the origin, flat normals, counter-clockwise faces.
pub fn create_cube_geometry() -> (Vec<Vertex>, Vec<u16>) {
    const FRONT: [f32; 3] = [0.0, 0.0, 1.0];
    const BACK: [f32; 3] = [0.0, 0.0, -1.0];
    const TOP: [f32; 3] = [0.0, 1.0, 0.0];
    const BOTTOM: [f32; 3] = [0.0, -1.0, 0.0];
    const RIGHT: [f32; 3] = [1.0, 0.0, 0.0];
    const LEFT: [f32; 3] = [-1.0, 0.0, 0.0];

    let vertices = vec![
        // Front face (Z+)
        Vertex::new([-0.5, -0.5, 0.5], FRONT),
        Vertex::new([0.5, -0.5, 0.5], FRONT),
        Vertex::new([0.5, 0.5, 0.5], FRONT),
        Vertex::new([-0.5, 0.5, 0.5], FRONT),
        // Back face (Z-)
        Vertex::new([-0.5, -0.5, -0.5], BACK),
        Vertex::new([-0.5, 0.5, -0.5], BACK),
        Vertex::new([0.5, 0.5, -0.5], BACK),
        Vertex::new([0.5, -0.5, -0.5], BACK),
        // Top face (Y+)
        Vertex::new([-0.5, 0.5, -0.5], TOP),
        Vertex::new([-0.5, 0.5, 0.5], TOP),
        Vertex::new([0.5, 0.5, 0.5], TOP),
        Vertex::new([0.5, 0.5, -0.5], TOP),
        // Bottom face (Y-)
        Vertex::new([-0.5, -0.5, -0.5], BOTTOM),
        Vertex::new([0.5, -0.5, -0.5], BOTTOM),
        Vertex::new([0.5, -0.5, 0.5], BOTTOM),
        Vertex::new([-0.5, -0.5, 0.5], BOTTOM),
        // Right face (X+)
        Vertex::new([0.5, -0.5, -0.5], RIGHT),
        Vertex::new([0.5, 0.5, -0.5], RIGHT),
        Vertex::new([0.5, 0.5, 0.5], RIGHT),
        Vertex::new([0.5, -0.5, 0.5], RIGHT),
        // Left face (X-)
        Vertex::new([-0.5, -0.5, -0.5], LEFT),
        Vertex::new([-0.5, -0.5, 0.5], LEFT),
        Vertex::new([-0.5, 0.5, 0.5], LEFT),
        Vertex::new([-0.5, 0.5, -0.5], LEFT),
    ];

    let indices = vec![
        0, 1, 2, 2, 3, 0, // Front
        4, 5, 6, 6, 7, 4, // Back
        8, 9, 10, 10, 11, 8, // Top
        12, 13, 14, 14, 15, 12, // Bottom
        16, 17, 18, 18, 19, 16, // Right
        20, 21, 22, 22, 23, 20, // Left
    ];

    (vertices, indices)
}

/// Unit square in the XZ plane facing +Y, centered at the origin.
pub fn create_plane_geometry() -> (Vec<Vertex>, Vec<u16>) {
    const UP: [f32; 3] = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex::new([-0.5, 0.0, -0.5], UP),
        Vertex::new([0.5, 0.0, -0.5], UP),
        Vertex::new([0.5, 0.0, 0.5], UP),
        Vertex::new([-0.5, 0.0, 0.5], UP),
    ];
    let indices = vec![0, 3, 2, 2, 1, 0];
    (vertices, indices)
}

/// UV sphere of radius 1; normals equal positions.
pub fn create_sphere_geometry(lat_segments: u16, lon_segments: u16) -> (Vec<Vertex>, Vec<u16>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for lat in 0..=lat_segments {
        let theta = std::f32::consts::PI * (lat as f32) / (lat_segments as f32);
        let (sin_theta, cos_theta) = theta.sin_cos();

        for lon in 0..=lon_segments {
            let phi = 2.0 * std::f32::consts::PI * (lon as f32) / (lon_segments as f32);
            let (sin_phi, cos_phi) = phi.sin_cos();
            let p = [cos_phi * sin_theta, cos_theta, sin_phi * sin_theta];
            vertices.push(Vertex::new(p, p));
        }
    }

    for lat in 0..lat_segments {
        for lon in 0..lon_segments {
            let first = lat * (lon_segments + 1) + lon;
            let second = first + lon_segments + 1;

            indices.extend_from_slice(&[first, first + 1, second]);
            indices.extend_from_slice(&[second, first + 1, second + 1]);
        }
    }

    (vertices, indices)
}

/// Disc of radius 1 in the XZ plane facing +Y, as a triangle fan.
pub fn create_disc_geometry(segments: u16) -> (Vec<Vertex>, Vec<u16>) {
    const UP: [f32; 3] = [0.0, 1.0, 0.0];
    let mut vertices = vec![Vertex::new([0.0, 0.0, 0.0], UP)];
    for i in 0..=segments {
        let phi = 2.0 * std::f32::consts::PI * (i as f32) / (segments as f32);
        let (sin_phi, cos_phi) = phi.sin_cos();
        vertices.push(Vertex::new([cos_phi, 0.0, sin_phi], UP));
    }

    let mut indices = Vec::with_capacity(segments as usize * 3);
    for i in 1..=segments {
        indices.extend_from_slice(&[0, i + 1, i]);
    }
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    /// Face normals from counter-clockwise winding, skipping degenerate
    /// triangles (sphere poles).
    fn face_normals(vertices: &[Vertex], indices: &[u16]) -> Vec<(Vec3, Vec3)> {
        indices
            .chunks(3)
            .filter_map(|tri| {
                let p = |i: u16| Vec3::from_array(vertices[i as usize].position);
                let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
                let n = (b - a).cross(c - a).try_normalize()?;
                let vertex_normal = Vec3::from_array(vertices[tri[0] as usize].normal);
                Some((n, vertex_normal))
            })
            .collect()
    }

    #[test]
    fn test_winding_matches_normals() {
        for shape in Shape::ALL {
            let mesh = GpuMesh::for_shape(shape);
            let normals = face_normals(mesh.vertices(), mesh.indices());
            assert!(!normals.is_empty());
            for (face, vertex) in normals {
                assert!(face.dot(vertex) > 0.0, "{:?}: {:?} vs {:?}", shape, face, vertex);
            }
        }
    }

    #[test]
    fn test_normals_are_unit() {
        for shape in Shape::ALL {
            let mesh = GpuMesh::for_shape(shape);
            for v in mesh.vertices() {
                let n = Vec3::from_array(v.normal);
                assert!((n.length() - 1.0).abs() < 1e-5, "{:?}", shape);
            }
        }
    }

    #[test]
    fn test_indices_in_range() {
        for shape in Shape::ALL {
            let mesh = GpuMesh::for_shape(shape);
            assert_eq!(mesh.indices().len() % 3, 0);
            assert!(mesh
                .indices()
                .iter()
                .all(|i| (*i as usize) < mesh.vertices().len()));
            assert!(!mesh.is_initialized());
        }
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
    }
}
