//! Native demo: mounts a scene into a headless viewport, pumps a number of
//! frames and optionally writes the last one to an image.

use anyhow::Context;

use crate::bootstrap::{SceneHandle, create_scene};
use crate::config::{Config, ViewportConfig};
use crate::error::SceneError;
use crate::platform::headless::{HeadlessElement, HeadlessPlatform};
use crate::platform::{Element, Platform, Renderer};

/// Creates the element the scene is mounted into, as a page would.
pub fn mount_viewport(
        platform: &HeadlessPlatform,
        viewport: &ViewportConfig,
) -> anyhow::Result<HeadlessElement>
{
        let element = platform.create_element("div");

        let selector = viewport.selector.trim();

        if let Some(id) = selector.strip_prefix('#')
        {
                element.set_id(id);
        }
        else if let Some(class) = selector.strip_prefix('.')
        {
                element.add_class(class);
        }
        else
        {
                log::warn!("Viewport selector `{selector}` is neither an id nor a class");
        }

        element.set_client_size(viewport.width, viewport.height);

        platform.body().append_child(&element)?;

        Ok(element)
}

fn mount(
        config: &Config,
        gpu: bool,
) -> anyhow::Result<(HeadlessPlatform, SceneHandle<HeadlessPlatform>)>
{
        let platform = if gpu
        {
                HeadlessPlatform::with_gpu()
        }
        else
        {
                HeadlessPlatform::new()
        };

        mount_viewport(&platform, &config.viewport)?;

        let handle = pollster::block_on(create_scene(&platform, config.scene.to_scene_config()))?;

        Ok((platform, handle))
}

pub fn run(config: &Config) -> anyhow::Result<()>
{
        let (platform, handle) = match mount(config, config.gpu)
        {
                Err(err)
                        if config.gpu
                                && matches!(
                                        err.downcast_ref::<SceneError>(),
                                        Some(SceneError::Renderer(_))
                                ) =>
                {
                        log::warn!("{err:#}, continuing without a GPU");
                        mount(config, false)?
                }
                result => result?,
        };

        log::info!("Scene mounted at {} into {:?}", handle.size(), handle.container());

        handle.start();

        let started = instant::Instant::now();
        let mut frames = 0;

        for _ in 0..config.frames
        {
                frames += platform.advance_frame();
        }

        let elapsed = started.elapsed();

        if frames > 0
        {
                log::info!(
                        "Rendered {frames} frames in {:.1}ms ({:.2}ms per frame)",
                        elapsed.as_secs_f64() * 1000.0,
                        elapsed.as_secs_f64() * 1000.0 / frames as f64,
                );
        }

        if let Some(cube) = handle.scene().get(handle.demo_object())
        {
                log::info!(
                        "Cube rotation: x = {:.2} rad, y = {:.2} rad",
                        cube.rotation.x.0,
                        cube.rotation.y.0
                );
        }

        handle.stop();

        if let Some(path) = &config.snapshot
        {
                let renderer = handle.renderer();

                if renderer.gpu().is_some()
                {
                        renderer
                                .snapshot()?
                                .save(path)
                                .with_context(|| format!("writing snapshot to {path}"))?;

                        log::info!("Saved {} snapshot to {path}", renderer.size());
                }
                else
                {
                        log::warn!("Skipping snapshot: the scene was rendered without a GPU");
                }
        }

        handle.dispose();

        log::debug!("Resize listeners left: {}", platform.resize_listener_count());

        Ok(())
}
