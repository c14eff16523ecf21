use std::fmt;
use std::str::FromStr;

use palette::{FromColor, Hsl, LinSrgb, Srgb};
use serde::{Deserialize, Serialize};

use crate::error::ColorParseError;

/// An sRGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color
{
        pub r: f32,
        pub g: f32,
        pub b: f32,
}

impl Color
{
        pub const BLACK: Color = Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
        };

        pub const WHITE: Color = Color {
                r: 1.0,
                g: 1.0,
                b: 1.0,
        };

        pub fn new(
                r: f32,
                g: f32,
                b: f32,
        ) -> Self
        {
                Self {
                        r: r.clamp(0.0, 1.0),
                        g: g.clamp(0.0, 1.0),
                        b: b.clamp(0.0, 1.0),
                }
        }

        pub fn from_rgb8(
                r: u8,
                g: u8,
                b: u8,
        ) -> Self
        {
                Self::from(Srgb::new(r, g, b).into_format::<f32>())
        }

        /// Builds a color from a packed `0xRRGGBB` value. Bits above the
        /// lower 24 are ignored.
        pub fn from_hex(hex: u32) -> Self
        {
                let hex = hex & 0xff_ffff;

                Self::from_rgb8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
        }

        pub fn to_hex(&self) -> u32
        {
                let [r, g, b] = self.to_rgb8();

                (r as u32) << 16 | (g as u32) << 8 | b as u32
        }

        pub fn to_rgb8(&self) -> [u8; 3]
        {
                let c: Srgb<u8> = Srgb::new(self.r, self.g, self.b).into_format();

                [c.red, c.green, c.blue]
        }

        pub fn is_black(&self) -> bool
        {
                self.to_hex() == 0
        }

        /// Parses a CSS color: `#rgb`, `#rrggbb`, `rgb()`/`rgba()`,
        /// `hsl()`/`hsla()` or a named color.
        pub fn parse(style: &str) -> Result<Self, ColorParseError>
        {
                let style = style.trim();

                if style.is_empty()
                {
                        return Err(ColorParseError::Empty);
                }

                if style.starts_with('#')
                {
                        return Srgb::<u8>::from_str(style)
                                .map(|c| Self::from_rgb8(c.red, c.green, c.blue))
                                .map_err(|_| ColorParseError::InvalidHex(style.to_string()));
                }

                let lower = style.to_ascii_lowercase();

                if let Some((function, rest)) = lower.split_once('(')
                {
                        return Self::parse_function(function.trim(), rest)
                                .ok_or_else(|| ColorParseError::InvalidFunction(style.to_string()));
                }

                palette::named::from_str(&lower)
                        .map(|c| Self::from_rgb8(c.red, c.green, c.blue))
                        .ok_or_else(|| ColorParseError::UnknownName(style.to_string()))
        }

        fn parse_function(
                function: &str,
                rest: &str,
        ) -> Option<Self>
        {
                let inner = rest.strip_suffix(')')?.trim();

                // Legacy `rgb(r, g, b)` or modern `rgb(r g b / a)`.
                let args: Vec<&str> = if inner.contains(',')
                {
                        inner.split(',').map(str::trim).collect()
                }
                else
                {
                        let (channels, alpha) = match inner.split_once('/')
                        {
                                Some((channels, alpha)) => (channels, Some(alpha.trim())),
                                None => (inner, None),
                        };

                        channels.split_whitespace().chain(alpha).collect()
                };

                if args.iter().any(|a| a.is_empty()) || (args.len() != 3 && args.len() != 4)
                {
                        return None;
                }

                let color = match function
                {
                        "rgb" | "rgba" => Some(Self::new(
                                parse_unit(args[0], 255.0)?,
                                parse_unit(args[1], 255.0)?,
                                parse_unit(args[2], 255.0)?,
                        )),
                        "hsl" | "hsla" =>
                        {
                                let hue = args[0].trim_end_matches("deg").parse::<f32>().ok()?;

                                if !hue.is_finite()
                                {
                                        return None;
                                }

                                let saturation = parse_percent(args[1])?;
                                let lightness = parse_percent(args[2])?;

                                let hsl: Hsl = Hsl::new(hue, saturation, lightness);
                                let rgb: Srgb = Srgb::from_color(hsl);

                                Some(Self::from(rgb))
                        }
                        _ => None,
                }?;

                if let Some(alpha) = args.get(3)
                {
                        let alpha = parse_unit(alpha, 1.0)?;

                        if alpha < 1.0
                        {
                                log::warn!("Alpha component {alpha} of `{function}(...)` ignored.");
                        }
                }

                Some(color)
        }

        /// Converts to a clear color for a target of the given encoding.
        ///
        /// sRGB render targets expect linear values and encode on write.
        pub fn to_wgpu(
                &self,
                srgb_target: bool,
        ) -> wgpu::Color
        {
                let (r, g, b) = if srgb_target
                {
                        let lin: LinSrgb = Srgb::new(self.r, self.g, self.b).into_linear();
                        (lin.red, lin.green, lin.blue)
                }
                else
                {
                        (self.r, self.g, self.b)
                };

                wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: 1.0,
                }
        }
}

impl From<Srgb<f32>> for Color
{
        fn from(c: Srgb<f32>) -> Self
        {
                Self::new(c.red, c.green, c.blue)
        }
}

impl FromStr for Color
{
        type Err = ColorParseError;

        fn from_str(s: &str) -> Result<Self, Self::Err>
        {
                Self::parse(s)
        }
}

/// Either an absolute number scaled by `max`, or a percentage.
fn parse_unit(
        value: &str,
        max: f32,
) -> Option<f32>
{
        let v = match value.strip_suffix('%')
        {
                Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                None => value.parse::<f32>().ok()? / max,
        };

        v.is_finite().then(|| v.clamp(0.0, 1.0))
}

fn parse_percent(value: &str) -> Option<f32>
{
        let v = value.strip_suffix('%')?.parse::<f32>().ok()? / 100.0;

        v.is_finite().then(|| v.clamp(0.0, 1.0))
}

/// A requested scene background, as given by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Background
{
        /// Packed `0xRRGGBB`.
        Packed(u32),

        /// Any CSS color string understood by [`Color::parse`].
        Css(String),
}

impl Background
{
        pub fn parse(&self) -> Result<Color, ColorParseError>
        {
                match self
                {
                        Background::Packed(hex) => Ok(Color::from_hex(*hex)),
                        Background::Css(style) => Color::parse(style),
                }
        }

        /// Converts a packed color given as a script number. Only non-negative
        /// integers that fit in 32 bits are accepted.
        pub fn from_number(value: f64) -> Option<Self>
        {
                let valid = value.is_finite()
                        && value >= 0.0
                        && value.fract() == 0.0
                        && value <= u32::MAX as f64;

                valid.then(|| Background::Packed(value as u32))
        }

        /// Best-effort conversion. Never fails: an unparseable value logs a
        /// warning and resolves to black.
        pub fn resolve(&self) -> Color
        {
                if let Background::Packed(hex) = self
                {
                        if *hex > 0xff_ffff
                        {
                                log::warn!(
                                        "Background {self} has bits above 0xffffff, they are ignored."
                                );
                        }
                }

                match self.parse()
                {
                        Ok(color) => color,
                        Err(e) =>
                        {
                                log::warn!("Background {self} could not be parsed ({e}), using black.");

                                Color::BLACK
                        }
                }
        }
}

impl fmt::Display for Background
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                match self
                {
                        Background::Packed(hex) => write!(f, "0x{hex:06x}"),
                        Background::Css(style) => write!(f, "`{style}`"),
                }
        }
}

impl From<u32> for Background
{
        fn from(hex: u32) -> Self
        {
                Background::Packed(hex)
        }
}

impl From<&str> for Background
{
        fn from(style: &str) -> Self
        {
                Background::Css(style.to_string())
        }
}

impl From<String> for Background
{
        fn from(style: String) -> Self
        {
                Background::Css(style)
        }
}

impl From<Color> for Background
{
        fn from(color: Color) -> Self
        {
                Background::Packed(color.to_hex())
        }
}
