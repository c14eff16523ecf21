use crate::config::Config;

pub fn show_start_message(config: &Config)
{
        if !config.show_start_message
        {
                return;
        }

        let banner = r#"

     ___  ___ ___ _ __   ___ _ __ ___   ___  _   _ _ __ | |_
    / __|/ __/ _ \ '_ \ / _ \ '_ ` _ \ / _ \| | | | '_ \| __|
    \__ \ (_|  __/ | | |  __/ | | | | | (_) | |_| | | | | |_
    |___/\___\___|_| |_|\___|_| |_| |_|\___/ \__,_|_| |_|\__|

 Mounts a wgpu scene with one spinning cube into a container.

            "#;

        log::info!("{banner}")
}

/// Installs the logger once. Later calls are ignored, so tests and the
/// binary can both call it.
pub fn config_logging()
{
        #[cfg(not(target_arch = "wasm32"))]
        {
                if env_logger::builder()
                        .filter_level(log::LevelFilter::Info)
                        .parse_default_env()
                        .try_init()
                        .is_ok()
                {
                        log::info!("Running on native.");
                }
        }

        #[cfg(target_arch = "wasm32")]
        {
                console_error_panic_hook::set_once();

                if console_log::init_with_level(log::Level::Info).is_ok()
                {
                        log::info!("Running on wasm32.");
                }
        }
}

/// Loads the demo configuration from `path`, falling back to defaults.
pub fn create_config(path: impl AsRef<std::path::Path>) -> Config
{
        let path = path.as_ref();

        Config::from_file(path).unwrap_or_else(|err| {
                log::warn!("Failed to load config: {err}, falling back to default");
                Config::default()
        })
}

/// Logs a fatal JS-facing error and converts it for `wasm_bindgen`.
#[cfg(target_arch = "wasm32")]
pub fn to_js_error(err: impl std::fmt::Display) -> wasm_bindgen::JsValue
{
        let message = err.to_string();
        log::error!("{message}");
        js_sys::Error::new(&message).into()
}

