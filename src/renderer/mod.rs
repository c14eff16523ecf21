//! wgpu backend shared by every platform.
//!
//! [`GpuRenderer`] owns the device, one pipeline per material, the camera
//! uniform and per-object buffers. Object buffers are created the first time
//! an object is drawn and released once it is no longer part of the scene.

use std::collections::HashMap;

use anyhow::Context;
use wgpu::util::DeviceExt;

use crate::camera::{CameraUniform, PerspectiveCamera};
use crate::color::Color;
use crate::config::Dimensions;
use crate::scene::{ObjectId, Scene, SceneObject};
use crate::texture::Texture;

pub mod pipeline;
pub mod target;

use pipeline::PipelineManager;
use target::RenderTarget;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct TransformUniform
{
        model: [[f32; 4]; 4],
}

/// GPU buffers for one scene object.
#[derive(Debug)]
struct GpuObject
{
        vertex_buffer: wgpu::Buffer,
        index_buffer: wgpu::Buffer,
        index_count: u32,
        transform_buffer: wgpu::Buffer,
        transform_bind_group: wgpu::BindGroup,
}

impl GpuObject
{
        fn new(
                device: &wgpu::Device,
                layout: &wgpu::BindGroupLayout,
                object: &SceneObject,
        ) -> Self
        {
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Vertex Buffer"),
                        contents: bytemuck::cast_slice(&object.geometry.vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                });

                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Index Buffer"),
                        contents: bytemuck::cast_slice(&object.geometry.indices),
                        usage: wgpu::BufferUsages::INDEX,
                });

                let transform_buffer =
                        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some("Transform Buffer"),
                                contents: bytemuck::cast_slice(&[TransformUniform {
                                        model: object.model_matrix().into(),
                                }]),
                                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        });

                let transform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        layout,
                        entries: &[wgpu::BindGroupEntry {
                                binding: 0,
                                resource: transform_buffer.as_entire_binding(),
                        }],
                        label: Some("transform_bind_group"),
                });

                Self {
                        vertex_buffer,
                        index_buffer,
                        index_count: object.geometry.get_index_count(),
                        transform_buffer,
                        transform_bind_group,
                }
        }

        fn destroy(&self)
        {
                self.vertex_buffer.destroy();
                self.index_buffer.destroy();
                self.transform_buffer.destroy();
        }
}

#[derive(Debug)]
pub struct GpuRenderer
{
        device: wgpu::Device,
        queue: wgpu::Queue,

        target: RenderTarget,
        depth: Texture,
        pipelines: PipelineManager,

        camera_uniform: CameraUniform,
        camera_buffer: wgpu::Buffer,
        camera_bind_group: wgpu::BindGroup,

        transform_layout: wgpu::BindGroupLayout,
        objects: HashMap<ObjectId, GpuObject>,

        disposed: bool,
}

impl GpuRenderer
{
        /// ```text
        /// BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU.
        /// ```
        pub fn new_instance() -> wgpu::Instance
        {
                wgpu::Instance::new(&wgpu::InstanceDescriptor {
                        #[cfg(not(target_arch = "wasm32"))]
                        backends: wgpu::Backends::PRIMARY,
                        #[cfg(target_arch = "wasm32")]
                        backends: wgpu::Backends::GL,
                        ..Default::default()
                })
        }

        /// Renders into an offscreen texture. Used natively, where there is no
        /// document to put a canvas in.
        pub async fn offscreen(size: Dimensions) -> anyhow::Result<Self>
        {
                let instance = Self::new_instance();

                let adapter = Self::get_adapter(&instance, None).await?;
                let (device, queue) = Self::get_device_and_queue(&adapter).await?;

                let size = Self::clamp_to_limits(&device, size);
                let target = RenderTarget::offscreen(&device, size);

                Ok(Self::with_target(device, queue, target))
        }

        /// Renders into a presentable surface created from `instance`.
        pub async fn for_surface(
                instance: &wgpu::Instance,
                surface: wgpu::Surface<'static>,
                size: Dimensions,
        ) -> anyhow::Result<Self>
        {
                let adapter = Self::get_adapter(instance, Some(&surface)).await?;
                let (device, queue) = Self::get_device_and_queue(&adapter).await?;

                let size = Self::clamp_to_limits(&device, size);
                let target = RenderTarget::surface(surface, &adapter, &device, size)?;

                Ok(Self::with_target(device, queue, target))
        }

        async fn get_adapter(
                instance: &wgpu::Instance,
                surface: Option<&wgpu::Surface<'static>>,
        ) -> anyhow::Result<wgpu::Adapter>
        {
                let adapter = instance
                        .request_adapter(&wgpu::RequestAdapterOptions {
                                power_preference: wgpu::PowerPreference::HighPerformance,
                                compatible_surface: surface,
                                force_fallback_adapter: false,
                        })
                        .await
                        .context("no suitable graphics adapter")?;

                let info = adapter.get_info();
                log::info!("Adapter: {} ({:?})", info.name, info.backend);

                Ok(adapter)
        }

        async fn get_device_and_queue(
                adapter: &wgpu::Adapter
        ) -> anyhow::Result<(wgpu::Device, wgpu::Queue)>
        {
                let device_and_queue = adapter
                        .request_device(&wgpu::DeviceDescriptor {
                                label: Some("Scene Device"),
                                required_features: wgpu::Features::empty(),
                                // WebGL doesn't support all of wgpu's features.
                                required_limits: if cfg!(target_arch = "wasm32")
                                {
                                        wgpu::Limits::downlevel_webgl2_defaults()
                                                .using_resolution(adapter.limits())
                                }
                                else
                                {
                                        wgpu::Limits::default().using_resolution(adapter.limits())
                                },
                                memory_hints: Default::default(),
                                trace: wgpu::Trace::Off,
                        })
                        .await
                        .context("failed to open graphics device")?;

                Ok(device_and_queue)
        }

        fn with_target(
                device: wgpu::Device,
                queue: wgpu::Queue,
                target: RenderTarget,
        ) -> Self
        {
                let camera_uniform = CameraUniform::new();

                let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Camera Buffer"),
                        contents: bytemuck::cast_slice(&[camera_uniform]),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });

                let camera_layout = Self::uniform_layout(&device, "camera_bind_group_layout");
                let transform_layout = Self::uniform_layout(&device, "transform_bind_group_layout");

                let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        layout: &camera_layout,
                        entries: &[wgpu::BindGroupEntry {
                                binding: 0,
                                resource: camera_buffer.as_entire_binding(),
                        }],
                        label: Some("camera_bind_group"),
                });

                let pipelines = PipelineManager::new(
                        &device,
                        target.format(),
                        &[&camera_layout, &transform_layout],
                );

                let depth = Texture::create_depth_texture(&device, target.size(), "Depth Texture");

                log::debug!("Renderer ready: {} {:?}", target.size(), target.format());

                Self {
                        device,
                        queue,
                        target,
                        depth,
                        pipelines,
                        camera_uniform,
                        camera_buffer,
                        camera_bind_group,
                        transform_layout,
                        objects: HashMap::new(),
                        disposed: false,
                }
        }

        fn uniform_layout(
                device: &wgpu::Device,
                label: &str,
        ) -> wgpu::BindGroupLayout
        {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        entries: &[wgpu::BindGroupLayoutEntry {
                                binding: 0,
                                visibility: wgpu::ShaderStages::VERTEX,
                                ty: wgpu::BindingType::Buffer {
                                        ty: wgpu::BufferBindingType::Uniform,
                                        has_dynamic_offset: false,
                                        min_binding_size: None,
                                },
                                count: None,
                        }],
                        label: Some(label),
                })
        }

        /// Clamping to max dim to prevent panic!
        fn clamp_to_limits(
                device: &wgpu::Device,
                size: Dimensions,
        ) -> Dimensions
        {
                size.clamped(device.limits().max_texture_dimension_2d)
        }

        pub fn size(&self) -> Dimensions
        {
                self.target.size()
        }

        pub fn format(&self) -> wgpu::TextureFormat
        {
                self.target.format()
        }

        pub fn is_disposed(&self) -> bool
        {
                self.disposed
        }

        /// Number of objects that currently own GPU buffers.
        pub fn resident_objects(&self) -> usize
        {
                self.objects.len()
        }

        pub fn resize(
                &mut self,
                size: Dimensions,
        )
        {
                if self.disposed
                {
                        return;
                }

                let size = Self::clamp_to_limits(&self.device, size);

                if size == self.target.size()
                {
                        return;
                }

                log::info!("Resizing render target -> {size}");

                self.target.resize(&self.device, size);

                self.depth.destroy();
                self.depth = Texture::create_depth_texture(&self.device, size, "Depth Texture");
        }

        /// Draws every object of `scene` as seen from `camera`.
        ///
        /// A lost or outdated surface is reconfigured and the frame skipped.
        pub fn render(
                &mut self,
                scene: &Scene,
                camera: &PerspectiveCamera,
        ) -> anyhow::Result<()>
        {
                anyhow::ensure!(!self.disposed, "renderer has been disposed");

                let frame = match self.target.acquire()
                {
                        Ok(frame) => frame,
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) =>
                        {
                                log::warn!("Surface lost or outdated, reconfiguring");
                                self.target.reconfigure(&self.device);
                                return Ok(());
                        }
                        Err(e) => return Err(e).context("failed to acquire surface texture"),
                };

                self.sync_objects(scene);

                self.camera_uniform.update(camera);
                self.queue.write_buffer(
                        &self.camera_buffer,
                        0,
                        bytemuck::cast_slice(&[self.camera_uniform]),
                );

                let clear = scene
                        .background
                        .unwrap_or(Color::BLACK)
                        .to_wgpu(self.target.format().is_srgb());

                let mut encoder = self
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                                label: Some("Scene Render Encoder"),
                        });

                {
                        let mut render_pass =
                                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                                        label: Some("Scene Pass"),
                                        color_attachments: &[Some(
                                                wgpu::RenderPassColorAttachment {
                                                        view: &frame.view,
                                                        resolve_target: None,
                                                        ops: wgpu::Operations {
                                                                load: wgpu::LoadOp::Clear(clear),
                                                                store: wgpu::StoreOp::Store,
                                                        },
                                                },
                                        )],
                                        depth_stencil_attachment: Some(
                                                wgpu::RenderPassDepthStencilAttachment {
                                                        view: &self.depth.view,
                                                        depth_ops: Some(wgpu::Operations {
                                                                load: wgpu::LoadOp::Clear(1.0),
                                                                store: wgpu::StoreOp::Store,
                                                        }),
                                                        stencil_ops: None,
                                                },
                                        ),
                                        occlusion_query_set: None,
                                        timestamp_writes: None,
                                });

                        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

                        for object in scene.objects()
                        {
                                let (Some(gpu), Some(pipeline)) = (
                                        self.objects.get(&object.id),
                                        self.pipelines.get(object.material),
                                )
                                else
                                {
                                        continue;
                                };

                                render_pass.set_pipeline(pipeline);
                                render_pass.set_bind_group(1, &gpu.transform_bind_group, &[]);
                                render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                                render_pass.set_index_buffer(
                                        gpu.index_buffer.slice(..),
                                        wgpu::IndexFormat::Uint16,
                                );
                                render_pass.draw_indexed(0..gpu.index_count, 0, 0..1);
                        }
                }

                self.queue.submit(std::iter::once(encoder.finish()));

                frame.present();

                Ok(())
        }

        /// Uploads transforms, creating buffers for new objects and dropping
        /// those of removed ones.
        fn sync_objects(
                &mut self,
                scene: &Scene,
        )
        {
                self.objects.retain(|id, gpu| {
                        let alive = scene.get(*id).is_some();
                        if !alive
                        {
                                gpu.destroy();
                        }
                        alive
                });

                for object in scene.objects()
                {
                        let gpu = self.objects.entry(object.id).or_insert_with(|| {
                                GpuObject::new(&self.device, &self.transform_layout, object)
                        });

                        self.queue.write_buffer(
                                &gpu.transform_buffer,
                                0,
                                bytemuck::cast_slice(&[TransformUniform {
                                        model: object.model_matrix().into(),
                                }]),
                        );
                }
        }

        /// Releases every GPU resource. Calling it again does nothing.
        pub fn dispose(&mut self)
        {
                if self.disposed
                {
                        return;
                }

                for (_, gpu) in self.objects.drain()
                {
                        gpu.destroy();
                }

                self.camera_buffer.destroy();
                self.depth.destroy();
                self.target.destroy();
                self.device.destroy();

                self.disposed = true;

                log::debug!("Renderer disposed");
        }

        /// Copies the last rendered frame of an offscreen target back to the
        /// CPU.
        #[cfg(not(target_arch = "wasm32"))]
        pub fn snapshot(&self) -> anyhow::Result<image::RgbaImage>
        {
                anyhow::ensure!(!self.disposed, "renderer has been disposed");

                let RenderTarget::Offscreen {
                        color,
                } = &self.target
                else
                {
                        anyhow::bail!("snapshots are only available for offscreen targets");
                };

                let Dimensions {
                        width,
                        height,
                } = color.size();

                let unpadded_row = width * 4;
                let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
                let padded_row = unpadded_row.div_ceil(align) * align;

                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some("Snapshot Buffer"),
                        size: padded_row as u64 * height as u64,
                        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                        mapped_at_creation: false,
                });

                let mut encoder = self
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                                label: Some("Snapshot Encoder"),
                        });

                encoder.copy_texture_to_buffer(
                        wgpu::TexelCopyTextureInfo {
                                aspect: wgpu::TextureAspect::All,
                                texture: &color.texture,
                                mip_level: 0,
                                origin: wgpu::Origin3d::ZERO,
                        },
                        wgpu::TexelCopyBufferInfo {
                                buffer: &buffer,
                                layout: wgpu::TexelCopyBufferLayout {
                                        offset: 0,
                                        bytes_per_row: Some(padded_row),
                                        rows_per_image: Some(height),
                                },
                        },
                        wgpu::Extent3d {
                                width,
                                height,
                                depth_or_array_layers: 1,
                        },
                );

                self.queue.submit(std::iter::once(encoder.finish()));

                let slice = buffer.slice(..);
                let (sender, receiver) = std::sync::mpsc::channel();
                slice.map_async(wgpu::MapMode::Read, move |result| {
                        let _ = sender.send(result);
                });

                self.device.poll(wgpu::PollType::Wait)?;
                receiver.recv()??;

                let mut pixels = Vec::with_capacity((unpadded_row * height) as usize);
                {
                        let data = slice.get_mapped_range();
                        for row in data.chunks(padded_row as usize)
                        {
                                pixels.extend_from_slice(&row[..unpadded_row as usize]);
                        }
                }
                buffer.unmap();
                buffer.destroy();

                image::RgbaImage::from_raw(width, height, pixels)
                        .context("snapshot buffer does not match the target size")
        }
}
