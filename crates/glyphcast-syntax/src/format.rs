//! Named text formats and their colors.

use std::fmt;

/// An 8-bit RGBA color as written in rule set documents.
///
/// Components are straight (not premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Create a color from its components.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`. The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }

        let short = |i: usize| -> Option<u8> {
            let v = u8::from_str_radix(&hex[i..i + 1], 16).ok()?;
            Some(v * 17)
        };
        let long = |i: usize| -> Option<u8> { u8::from_str_radix(&hex[i..i + 2], 16).ok() };

        match hex.len() {
            3 => Some(Self::rgb(short(0)?, short(1)?, short(2)?)),
            4 => Some(Self::new(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgb(long(0)?, long(2)?, long(4)?)),
            8 => Some(Self::new(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Components as floats in the 0.0-1.0 range.
    pub fn to_f32_array(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Visual style applied to a span of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Format {
    /// Foreground color.
    pub foreground: Rgba,
    /// Bold text.
    pub bold: bool,
    /// Italic text.
    pub italic: bool,
}

impl Format {
    /// Create a format with just a foreground color.
    pub fn fg(color: Rgba) -> Self {
        Self {
            foreground: color,
            ..Default::default()
        }
    }

    /// Builder: set bold.
    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Builder: set italic.
    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Check if this is the plain default format.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Index of a named format inside its [`RuleSet`](crate::RuleSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatId(pub(crate) u16);

impl FormatId {
    /// Position of the format in the rule set's format table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
