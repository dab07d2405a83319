// src/color.rs

//! Defines the color model used by scenes (`NamedColor`, `Color`) and the
//! concrete pixel value (`Rgba`) the renderer writes into frame buffers.

use serde::{Deserialize, Serialize};

/// A small palette of named colors understood by the painter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedColor {
    Black,
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
}

impl NamedColor {
    /// Returns the opaque pixel value for this named color.
    pub fn to_rgba(self) -> Rgba {
        match self {
            NamedColor::Black => Rgba::opaque(0, 0, 0),
            NamedColor::White => Rgba::opaque(255, 255, 255),
            NamedColor::Red => Rgba::opaque(255, 0, 0),
            NamedColor::Green => Rgba::opaque(0, 255, 0),
            NamedColor::Blue => Rgba::opaque(0, 0, 255),
            NamedColor::Yellow => Rgba::opaque(255, 255, 0),
            NamedColor::Cyan => Rgba::opaque(0, 255, 255),
            NamedColor::Magenta => Rgba::opaque(255, 0, 255),
        }
    }
}

/// A color as stored in a `Scene` or in configuration.
///
/// Either a named palette entry or an explicit RGB triple. Colors are always
/// opaque once resolved to an [`Rgba`] pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Named(NamedColor),
    Rgb(u8, u8, u8),
}

impl Color {
    pub const WHITE: Color = Color::Named(NamedColor::White);
    pub const BLACK: Color = Color::Named(NamedColor::Black);
    pub const GREEN: Color = Color::Named(NamedColor::Green);
    pub const YELLOW: Color = Color::Named(NamedColor::Yellow);

    /// Resolves this color to a concrete pixel value.
    pub fn to_rgba(self) -> Rgba {
        match self {
            Color::Named(named) => named.to_rgba(),
            Color::Rgb(r, g, b) => Rgba::opaque(r, g, b),
        }
    }
}

impl From<NamedColor> for Color {
    fn from(named: NamedColor) -> Self {
        Color::Named(named)
    }
}

/// RGBA color in 32-bit format (8 bits per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to RGBA byte array
    pub fn to_bytes(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Build from the first four bytes of a pixel slice.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

impl From<Color> for Rgba {
    fn from(color: Color) -> Self {
        color.to_rgba()
    }
}
