use std::collections::HashMap;

use crate::geometry::vertex::Vertex;
use crate::scene::Material;
use crate::texture::Texture;

/// One render pipeline per [`Material`], all sharing the same bind group
/// layouts: the camera at group 0 and the object transform at group 1.
#[derive(Debug)]
pub struct PipelineManager
{
        pipelines: HashMap<Material, wgpu::RenderPipeline>,
}

impl PipelineManager
{
        pub fn new(
                device: &wgpu::Device,
                format: wgpu::TextureFormat,
                bind_groups: &[&wgpu::BindGroupLayout],
        ) -> Self
        {
                let layout = Self::get_render_pipeline_layout(device, bind_groups);

                let mut pipelines = HashMap::new();

                pipelines.insert(
                        Material::Normal,
                        Self::normal_pipeline(device, format, &layout),
                );

                Self {
                        pipelines,
                }
        }

        pub fn get(
                &self,
                material: Material,
        ) -> Option<&wgpu::RenderPipeline>
        {
                self.pipelines.get(&material)
        }

        fn normal_pipeline(
                device: &wgpu::Device,
                format: wgpu::TextureFormat,
                layout: &wgpu::PipelineLayout,
        ) -> wgpu::RenderPipeline
        {
                let shader = Self::load_shader_module(device);

                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some("Normal Material Pipeline"),
                        layout: Some(layout),
                        vertex: wgpu::VertexState {
                                module: &shader,
                                entry_point: Some("vs_main"),
                                buffers: &[Vertex::desc()],
                                compilation_options: wgpu::PipelineCompilationOptions::default(),
                        },
                        fragment: Some(wgpu::FragmentState {
                                module: &shader,
                                entry_point: Some("fs_main"),
                                targets: &[Some(wgpu::ColorTargetState {
                                        format,
                                        blend: Some(wgpu::BlendState::REPLACE),
                                        write_mask: wgpu::ColorWrites::ALL,
                                })],
                                compilation_options: wgpu::PipelineCompilationOptions::default(),
                        }),
                        primitive: wgpu::PrimitiveState {
                                topology: wgpu::PrimitiveTopology::TriangleList,
                                strip_index_format: None,
                                front_face: wgpu::FrontFace::Ccw,
                                cull_mode: Some(wgpu::Face::Back),
                                polygon_mode: wgpu::PolygonMode::Fill,
                                // Requires Features::DEPTH_CLIP_CONTROL
                                unclipped_depth: false,
                                // Requires Features::CONSERVATIVE_RASTERIZATION
                                conservative: false,
                        },
                        depth_stencil: Some(wgpu::DepthStencilState {
                                format: Texture::DEPTH_FORMAT,
                                depth_write_enabled: true,
                                depth_compare: wgpu::CompareFunction::Less,
                                stencil: wgpu::StencilState::default(),
                                bias: wgpu::DepthBiasState::default(),
                        }),
                        multisample: wgpu::MultisampleState {
                                count: 1,
                                mask: !0,
                                alpha_to_coverage_enabled: false,
                        },
                        multiview: None,
                        cache: None,
                })
        }

        /// Loads the shader module data from the `wgsl` file.
        fn load_shader_module(device: &wgpu::Device) -> wgpu::ShaderModule
        {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some("Normal Material Shader"),
                        source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
                })
        }

        fn get_render_pipeline_layout(
                device: &wgpu::Device,
                bind_groups: &[&wgpu::BindGroupLayout],
        ) -> wgpu::PipelineLayout
        {
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("Scene Pipeline Layout"),
                        bind_group_layouts: bind_groups,
                        push_constant_ranges: &[],
                })
        }
}
