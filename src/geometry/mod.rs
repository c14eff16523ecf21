pub mod primitives;
pub mod vertex;

use vertex::Vertex;

/// CPU-side indexed triangle list.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry
{
        pub name: String,
        pub vertices: Vec<Vertex>,
        pub indices: Vec<u16>,
}

impl Geometry
{
        pub fn new(
                name: impl Into<String>,
                vertices: Vec<Vertex>,
                indices: Vec<u16>,
        ) -> Self
        {
                Self {
                        name: name.into(),
                        vertices,
                        indices,
                }
        }

        /// An axis-aligned box centered at the origin.
        pub fn cuboid(
                width: f32,
                height: f32,
                depth: f32,
        ) -> Self
        {
                primitives::cuboid(width, height, depth)
        }

        pub fn get_vertex_count(&self) -> u32
        {
                self.vertices.len() as u32
        }

        pub fn get_index_count(&self) -> u32
        {
                self.indices.len() as u32
        }

        pub fn triangles(&self) -> impl Iterator<Item = [&Vertex; 3]>
        {
                self.indices.chunks_exact(3).map(|t| {
                        [
                                &self.vertices[t[0] as usize],
                                &self.vertices[t[1] as usize],
                                &self.vertices[t[2] as usize],
                        ]
                })
        }
}
