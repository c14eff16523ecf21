use anyhow::Context;

use crate::config::Dimensions;
use crate::texture::Texture;

/// Where the renderer's color output goes.
#[derive(Debug)]
pub enum RenderTarget
{
        /// A presentable surface, e.g. a browser canvas.
        Surface
        {
                surface: wgpu::Surface<'static>,
                configuration: wgpu::SurfaceConfiguration,
        },

        /// A plain texture that can be read back with a snapshot.
        Offscreen
        {
                color: Texture
        },
}

/// The color view for one frame. Surface frames must be presented.
#[derive(Debug)]
pub struct Frame
{
        pub view: wgpu::TextureView,
        output: Option<wgpu::SurfaceTexture>,
}

impl Frame
{
        pub fn present(self)
        {
                if let Some(output) = self.output
                {
                        output.present();
                }
        }
}

impl RenderTarget
{
        /// Configures `surface` for `device`, preferring an sRGB format.
        pub fn surface(
                surface: wgpu::Surface<'static>,
                adapter: &wgpu::Adapter,
                device: &wgpu::Device,
                size: Dimensions,
        ) -> anyhow::Result<Self>
        {
                let caps = surface.get_capabilities(adapter);

                caps.present_modes
                        .iter()
                        .for_each(|m| log::debug!("PRESENT_MODE: {:?}", m));

                let format = caps
                        .formats
                        .iter()
                        .find(|f| f.is_srgb())
                        .or(caps.formats.first())
                        .copied()
                        .context("surface is not supported by the adapter")?;

                let configuration = wgpu::SurfaceConfiguration {
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                        format,
                        width: size.width,
                        height: size.height,
                        present_mode: caps
                                .present_modes
                                .first()
                                .copied()
                                .unwrap_or(wgpu::PresentMode::Fifo),
                        alpha_mode: caps
                                .alpha_modes
                                .first()
                                .copied()
                                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                        view_formats: vec![],
                        desired_maximum_frame_latency: 2,
                };

                surface.configure(device, &configuration);

                Ok(Self::Surface {
                        surface,
                        configuration,
                })
        }

        pub fn offscreen(
                device: &wgpu::Device,
                size: Dimensions,
        ) -> Self
        {
                Self::Offscreen {
                        color: Texture::create_color_target(device, size, "Offscreen Color Target"),
                }
        }

        pub fn format(&self) -> wgpu::TextureFormat
        {
                match self
                {
                        Self::Surface {
                                configuration, ..
                        } => configuration.format,
                        Self::Offscreen {
                                ..
                        } => Texture::OFFSCREEN_FORMAT,
                }
        }

        pub fn size(&self) -> Dimensions
        {
                match self
                {
                        Self::Surface {
                                configuration, ..
                        } => Dimensions {
                                width: configuration.width,
                                height: configuration.height,
                        },
                        Self::Offscreen {
                                color,
                        } => color.size(),
                }
        }

        /// `size` must already be clamped to the device limits.
        pub fn resize(
                &mut self,
                device: &wgpu::Device,
                size: Dimensions,
        )
        {
                match self
                {
                        Self::Surface {
                                surface,
                                configuration,
                        } =>
                        {
                                configuration.width = size.width;
                                configuration.height = size.height;
                                surface.configure(device, configuration);
                        }
                        Self::Offscreen {
                                color,
                        } =>
                        {
                                color.destroy();
                                *color = Texture::create_color_target(
                                        device,
                                        size,
                                        "Offscreen Color Target",
                                );
                        }
                }
        }

        /// Applies the current configuration again, after the surface was lost.
        pub fn reconfigure(
                &self,
                device: &wgpu::Device,
        )
        {
                if let Self::Surface {
                        surface,
                        configuration,
                } = self
                {
                        surface.configure(device, configuration);
                }
        }

        pub fn acquire(&self) -> Result<Frame, wgpu::SurfaceError>
        {
                match self
                {
                        Self::Surface {
                                surface, ..
                        } =>
                        {
                                let output = surface.get_current_texture()?;
                                let view = output
                                        .texture
                                        .create_view(&wgpu::TextureViewDescriptor::default());

                                Ok(Frame {
                                        view,
                                        output: Some(output),
                                })
                        }
                        Self::Offscreen {
                                color,
                        } => Ok(Frame {
                                view: color
                                        .texture
                                        .create_view(&wgpu::TextureViewDescriptor::default()),
                                output: None,
                        }),
                }
        }

        pub fn destroy(&self)
        {
                if let Self::Offscreen {
                        color,
                } = self
                {
                        color.destroy();
                }
        }
}
