//! RGB color type with hex string conversions
//!
//! Operators edit colors as `#rrggbb` strings; exported literals use the
//! `0xrrggbb` form. Components are stored as floats in [0, 1].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::math::Vec3;

/// Error parsing a hex color string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid color '{0}': expected #rrggbb, 0xrrggbb or rrggbb")]
pub struct ColorParseError(pub String);

/// Linear RGB color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red component
    pub r: f32,
    /// Green component
    pub g: f32,
    /// Blue component
    pub b: f32,
}

impl Color {
    /// Pure white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Pure black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a color from float components
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from 8-bit components
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0)
    }

    /// Create a color from a packed `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        Self::from_rgb8(
            ((hex >> 16) & 0xff) as u8,
            ((hex >> 8) & 0xff) as u8,
            (hex & 0xff) as u8,
        )
    }

    /// Parse `#rrggbb`, `0xrrggbb` or bare `rrggbb`
    pub fn parse(text: &str) -> Result<Self, ColorParseError> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError(text.to_string()));
        }

        u32::from_str_radix(digits, 16)
            .map(Self::from_hex)
            .map_err(|_| ColorParseError(text.to_string()))
    }

    /// Pack into `0xRRGGBB`, clamping out-of-range components
    pub fn to_hex(&self) -> u32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// `#rrggbb` form used by the parameter snapshot
    pub fn to_hex_string(&self) -> String {
        format!("#{:06x}", self.to_hex())
    }

    /// `0xrrggbb` form used by exported literals
    pub fn to_hex_literal(&self) -> String {
        format!("0x{:06x}", self.to_hex())
    }

    /// Components as a vector
    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    /// Build from a vector, no clamping
    pub fn from_vec3(v: &Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    /// Components padded with alpha for uniform upload
    pub fn to_rgba_array(&self, alpha: f32) -> [f32; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
