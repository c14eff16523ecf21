use serde::{Deserialize, Serialize};

use crate::color::Background;

/// Where the drawing surface is mounted.
#[derive(Debug, Clone, PartialEq)]
pub enum Container<E>
{
        /// The document body.
        Body,

        /// Resolved once through the document at construction.
        Selector(String),

        /// Used as-is.
        Element(E),
}

impl<E> Default for Container<E>
{
        fn default() -> Self
        {
                Container::Body
        }
}

/// Width and height in pixels. Both are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions
{
        pub width: u32,
        pub height: u32,
}

impl Dimensions
{
        pub const DEFAULT: Dimensions = Dimensions {
                width: 800,
                height: 600,
        };

        /// Returns `None` when either side is zero.
        pub fn new(
                width: u32,
                height: u32,
        ) -> Option<Self>
        {
                (width > 0 && height > 0).then_some(Self {
                        width,
                        height,
                })
        }

        /// Resolves each axis independently: explicit value, then measured
        /// value, then the default. Zero counts as missing at every step.
        pub fn resolve(
                width: Option<u32>,
                height: Option<u32>,
                measured: (u32, u32),
        ) -> Self
        {
                let pick = |explicit: Option<u32>, measured: u32, fallback: u32| {
                        explicit
                                .filter(|v| *v > 0)
                                .or((measured > 0).then_some(measured))
                                .unwrap_or(fallback)
                };

                Self {
                        width: pick(width, measured.0, Self::DEFAULT.width),
                        height: pick(height, measured.1, Self::DEFAULT.height),
                }
        }

        /// Converts a numeric side given by a script host. Non-finite values
        /// and values below one are treated as missing.
        pub fn side_from_number(value: f64) -> Option<u32>
        {
                (value.is_finite() && value >= 1.0).then(|| value.round().min(u32::MAX as f64) as u32)
        }

        pub fn aspect(&self) -> f32
        {
                self.width as f32 / self.height as f32
        }

        /// Clamps both sides to `max`, keeping them positive.
        pub fn clamped(
                &self,
                max: u32,
        ) -> Self
        {
                Self {
                        width: self.width.clamp(1, max.max(1)),
                        height: self.height.clamp(1, max.max(1)),
                }
        }
}

impl Default for Dimensions
{
        fn default() -> Self
        {
                Self::DEFAULT
        }
}

impl std::fmt::Display for Dimensions
{
        fn fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result
        {
                write!(f, "{}x{}", self.width, self.height)
        }
}

/// Options for [`crate::create_scene`]. Every field is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig<E>
{
        pub container: Container<E>,
        pub width: Option<u32>,
        pub height: Option<u32>,
        pub background: Option<Background>,
}

impl<E> Default for SceneConfig<E>
{
        fn default() -> Self
        {
                Self {
                        container: Container::Body,
                        width: None,
                        height: None,
                        background: None,
                }
        }
}

impl<E> SceneConfig<E>
{
        pub fn new() -> Self
        {
                Self::default()
        }

        pub fn with_selector(
                mut self,
                selector: impl Into<String>,
        ) -> Self
        {
                self.container = Container::Selector(selector.into());
                self
        }

        pub fn with_element(
                mut self,
                element: E,
        ) -> Self
        {
                self.container = Container::Element(element);
                self
        }

        pub fn with_width(
                mut self,
                width: u32,
        ) -> Self
        {
                self.width = Some(width);
                self
        }

        pub fn with_height(
                mut self,
                height: u32,
        ) -> Self
        {
                self.height = Some(height);
                self
        }

        pub fn with_size(
                self,
                width: u32,
                height: u32,
        ) -> Self
        {
                self.with_width(width).with_height(height)
        }

        pub fn with_background(
                mut self,
                background: impl Into<Background>,
        ) -> Self
        {
                self.background = Some(background.into());
                self
        }
}

/// Configuration file of the native demo binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
        pub show_start_message: bool,
        pub show_exit_message: bool,

        /// Frames pumped before the scene is disposed.
        pub frames: u32,

        /// Render through an offscreen GPU target instead of bookkeeping only.
        pub gpu: bool,

        /// Where to write the last rendered frame. Requires `gpu`.
        pub snapshot: Option<String>,

        pub viewport: ViewportConfig,
        pub scene: SceneSection,
}

impl Default for Config
{
        fn default() -> Self
        {
                Self {
                        show_start_message: true,
                        show_exit_message: true,
                        frames: 120,
                        gpu: true,
                        snapshot: None,
                        viewport: ViewportConfig::default(),
                        scene: SceneSection::default(),
                }
        }
}

impl Config
{
        pub const DEFAULT_PATH: &'static str = "Scene.toml";

        pub fn from_toml(source: &str) -> anyhow::Result<Self>
        {
                Ok(toml::from_str(source)?)
        }

        pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self>
        {
                let path = path.as_ref();

                let source = std::fs::read_to_string(path)
                        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;

                Self::from_toml(&source)
        }
}

/// The element the demo creates in the headless document to mount into.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig
{
        /// `#id` or `.class` given to the element.
        pub selector: String,
        pub width: u32,
        pub height: u32,
}

impl Default for ViewportConfig
{
        fn default() -> Self
        {
                Self {
                        selector: "#viewport".to_string(),
                        width: 1024,
                        height: 768,
                }
        }
}

/// The [`SceneConfig`] part of the demo configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSection
{
        /// Selector to mount into. The document body when absent.
        pub container: Option<String>,
        pub width: Option<u32>,
        pub height: Option<u32>,
        pub background: Option<Background>,
}

impl SceneSection
{
        pub fn to_scene_config<E>(&self) -> SceneConfig<E>
        {
                SceneConfig {
                        container: match &self.container
                        {
                                Some(selector) => Container::Selector(selector.clone()),
                                None => Container::Body,
                        },
                        width: self.width,
                        height: self.height,
                        background: self.background.clone(),
                }
        }
}
