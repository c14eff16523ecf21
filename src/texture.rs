use crate::config::Dimensions;

/// A GPU texture together with its default view.
#[derive(Debug)]
pub struct Texture
{
        pub texture: wgpu::Texture,
        pub view: wgpu::TextureView,
}

impl Texture
{
        pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

        /// Offscreen targets are always sRGB so snapshots can be written out as
        /// they are.
        pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

        /// Depth buffer matching a color target of the given size.
        pub fn create_depth_texture(
                device: &wgpu::Device,
                size: Dimensions,
                label: &str,
        ) -> Self
        {
                let texture = Self::create_texture(
                        device,
                        size,
                        Self::DEPTH_FORMAT,
                        wgpu::TextureUsages::RENDER_ATTACHMENT,
                        label,
                );

                Self::from_texture(texture)
        }

        /// Color target that can be copied back to the CPU.
        pub fn create_color_target(
                device: &wgpu::Device,
                size: Dimensions,
                label: &str,
        ) -> Self
        {
                let texture = Self::create_texture(
                        device,
                        size,
                        Self::OFFSCREEN_FORMAT,
                        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                        label,
                );

                Self::from_texture(texture)
        }

        pub fn size(&self) -> Dimensions
        {
                Dimensions {
                        width: self.texture.width(),
                        height: self.texture.height(),
                }
        }

        pub fn destroy(&self)
        {
                self.texture.destroy();
        }

        fn from_texture(texture: wgpu::Texture) -> Self
        {
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

                Self {
                        texture,
                        view,
                }
        }

        fn create_texture(
                device: &wgpu::Device,
                size: Dimensions,
                format: wgpu::TextureFormat,
                usage: wgpu::TextureUsages,
                label: &str,
        ) -> wgpu::Texture
        {
                device.create_texture(&wgpu::TextureDescriptor {
                        label: Some(label),
                        size: wgpu::Extent3d {
                                width: size.width,
                                height: size.height,
                                depth_or_array_layers: 1,
                        },
                        mip_level_count: 1,
                        sample_count: 1,
                        dimension: wgpu::TextureDimension::D2,
                        format,
                        usage,
                        view_formats: &[],
                })
        }
}
