//! Geometry, color and interval value types.
//!
//! These are the structured targets of string coercion. Each type's `Display`
//! output is accepted back by its `FromStr` implementation, so a value written
//! to a configuration file can be read back unchanged.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::coerce::{decode_color, parse_tuple, CoercionError};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLUE: Self = Self::from_rgb(0, 0, 255);
    pub const BLACK: Self = Self::from_rgb(0, 0, 0);
    pub const RED: Self = Self::from_rgb(255, 0, 0);
    pub const GRAY: Self = Self::from_rgb(128, 128, 128);
    pub const LIGHT_GRAY: Self = Self::from_rgb(192, 192, 192);
    pub const WHITE: Self = Self::from_rgb(255, 255, 255);
    pub const GREEN: Self = Self::from_rgb(0, 255, 0);
    pub const ORANGE: Self = Self::from_rgb(255, 200, 0);
    pub const CYAN: Self = Self::from_rgb(0, 255, 255);
    pub const MAGENTA: Self = Self::from_rgb(255, 0, 255);
    pub const PINK: Self = Self::from_rgb(255, 175, 175);
    pub const YELLOW: Self = Self::from_rgb(255, 255, 0);

    /// The named color table used by string coercion.
    pub const NAMED: [(&'static str, Color); 12] = [
        ("blue", Self::BLUE),
        ("black", Self::BLACK),
        ("red", Self::RED),
        ("gray", Self::GRAY),
        ("light gray", Self::LIGHT_GRAY),
        ("white", Self::WHITE),
        ("green", Self::GREEN),
        ("orange", Self::ORANGE),
        ("cyan", Self::CYAN),
        ("magenta", Self::MAGENTA),
        ("pink", Self::PINK),
        ("yellow", Self::YELLOW),
    ];

    /// Create an opaque color from 8-bit components.
    #[inline]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color from 8-bit components including alpha.
    #[inline]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color from a packed `0xRRGGBB` value.
    ///
    /// Bits above the low 24 are ignored.
    pub const fn from_packed(rgb: u32) -> Self {
        Self::from_rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Look up a color by its (lowercase) name.
    pub fn named(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, color)| *color)
    }

    /// Whether the color is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            write!(f, "{},{},{}", self.r, self.g, self.b)
        } else {
            write!(f, "{},{},{},{}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = CoercionError;

    /// Strict parse: unlike coercion there is no fallback color.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_color(s).ok_or_else(|| CoercionError::parse("color", s, "unrecognized color"))
    }
}

impl TryFrom<String> for Color {
    type Error = CoercionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A point in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Point {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y] = parse_tuple::<f64, 2>(s, &[',', ':'], "point")?;
        Ok(Self::new(x, y))
    }
}

/// An integer width and height, as used for preferred component sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [width, height] = parse_tuple::<i32, 2>(s, &[':', ','], "size")?;
        Ok(Self::new(width, height))
    }
}

/// An axis-aligned rectangle given by origin and extent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for Rect {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y, width, height] = parse_tuple::<f64, 4>(s, &[','], "rect")?;
        Ok(Self::new(x, y, width, height))
    }
}

/// A closed numeric interval.
///
/// The bounds are kept as given; `min > max` is not normalized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    /// Create a new range.
    #[inline]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.min, self.max)
    }
}

impl FromStr for Range {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [min, max] = parse_tuple::<f64, 2>(s, &[':', ','], "range")?;
        Ok(Self::new(min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_packing() {
        let color = Color::from_packed(0x12_34_56);
        assert_eq!(color, Color::from_rgb(0x12, 0x34, 0x56));
        assert!(color.is_opaque());

        // High bits are not part of the color
        assert_eq!(Color::from_packed(0xFF_00_00_FF), Color::BLUE);
    }

    #[test]
    fn test_color_names() {
        assert_eq!(Color::named("light gray"), Some(Color::LIGHT_GRAY));
        assert_eq!(Color::named("chartreuse"), None);
    }

    #[test]
    fn test_color_display_round_trip() {
        let opaque = Color::from_rgb(10, 20, 30);
        assert_eq!(opaque.to_string(), "10,20,30");
        assert_eq!(opaque.to_string().parse::<Color>().unwrap(), opaque);

        let translucent = Color::from_rgba(10, 20, 30, 40);
        assert_eq!(translucent.to_string(), "10,20,30,40");
        assert_eq!(translucent.to_string().parse::<Color>().unwrap(), translucent);
    }

    #[test]
    fn test_color_strict_parse_rejects_unknown() {
        assert!("not a color".parse::<Color>().is_err());
    }

    #[test]
    fn test_geometry_from_str() {
        assert_eq!("1,2,3,4".parse::<Rect>().unwrap(), Rect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!("3:4".parse::<Point>().unwrap(), Point::new(3.0, 4.0));
        assert_eq!("640:480".parse::<Size>().unwrap(), Size::new(640, 480));
        assert_eq!("-5:5".parse::<Range>().unwrap(), Range::new(-5.0, 5.0));
        assert!(matches!(
            "1,2,3".parse::<Rect>(),
            Err(CoercionError::Arity { expected: 4, found: 3, .. })
        ));
        // Reversed bounds are kept as given.
        assert_eq!("10:0".parse::<Range>().unwrap(), Range::new(10.0, 0.0));
    }
}
