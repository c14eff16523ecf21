//! Mounts a small 3D scene (renderer, perspective camera, scene graph and a
//! rotating cube) into a container element and hands back a
//! [`SceneHandle`] with `start`, `stop` and `dispose`.
//!
//! The host environment is abstracted by [`platform::Platform`]. The browser
//! implementation lives in `platform::web` and is exported to JavaScript as
//! `createScene`; [`platform::headless::HeadlessPlatform`] is an in-memory
//! stand-in used by the native demo and the tests.
//!
//! ```no_run
//! use scenemount::platform::headless::HeadlessPlatform;
//! use scenemount::{SceneConfig, create_scene};
//!
//! let platform = HeadlessPlatform::new();
//! let config = SceneConfig::new().with_size(400, 300).with_background("#1e1e2e");
//!
//! let handle = pollster::block_on(create_scene(&platform, config))?;
//! handle.start();
//! platform.advance_frames(3);
//! handle.dispose();
//! # Ok::<(), scenemount::SceneError>(())
//! ```

pub mod bootstrap;
pub mod camera;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod platform;
pub mod renderer;
pub mod scene;
pub mod texture;
pub mod utils;

#[cfg(not(target_arch = "wasm32"))]
pub mod demo;

/// WebAssembly (WASM) architecture note:
///
/// We explicitly target `wasm32` instead of `wasm64`: browsers only support a
/// 32-bit memory model, and `wgpu`, `web-sys` and `wasm-bindgen` are only
/// stable on 32-bit targets.
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub use bootstrap::{SceneHandle, create_scene};
pub use color::{Background, Color};
pub use config::{Config, Container, Dimensions, SceneConfig};
pub use error::{ColorParseError, SceneError};

/// Native entry point of `scenemount_bin`.
///
/// Reads the configuration from the first command line argument, or
/// [`Config::DEFAULT_PATH`], then runs the headless demo.
#[cfg(not(target_arch = "wasm32"))]
pub fn run() -> anyhow::Result<()>
{
        utils::bootstrap::config_logging();

        let path = std::env::args()
                .nth(1)
                .unwrap_or_else(|| Config::DEFAULT_PATH.to_string());

        let config = utils::bootstrap::create_config(&path);

        utils::bootstrap::show_start_message(&config);

        demo::run(&config)?;

        let msg = utils::exit::get_exit_message(&config);

        if !msg.is_empty()
        {
                log::info!("{msg}");
        }

        Ok(())
}

/// WebAssembly entry point.
///
/// The browser calls this when the module is initialized, thanks to the
/// [`wasm_bindgen(start)`] attribute. It only installs the panic hook and the
/// console logger; scenes are created from JavaScript through `createScene`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_wasm() -> Result<(), JsValue>
{
        utils::bootstrap::config_logging();

        Ok(())
}
