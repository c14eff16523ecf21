/// Vertex struct.
///
/// Uses C-compatible memory layout (`#[repr(C)]`)
/// so it can be safely shared with GPU graphics APIs.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex
{
        pub position: [f32; 3],
        pub normal: [f32; 3],
}

impl Vertex
{
        pub fn desc() -> wgpu::VertexBufferLayout<'static>
        {
                wgpu::VertexBufferLayout {
                        array_stride: size_of::<Vertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[
                                wgpu::VertexAttribute {
                                        offset: 0,
                                        shader_location: 0,
                                        format: wgpu::VertexFormat::Float32x3,
                                },
                                wgpu::VertexAttribute {
                                        offset: size_of::<[f32; 3]>() as wgpu::BufferAddress,
                                        shader_location: 1,
                                        format: wgpu::VertexFormat::Float32x3,
                                },
                        ],
                }
        }
}
