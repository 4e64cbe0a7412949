use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Result<Self, AppError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::InvalidColorFormat(hex.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| AppError::InvalidColorFormat(hex.to_string()))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn distance_squared(&self, other: &Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

pub struct PaletteColor {
    pub name: &'static str,
    pub rgb: Rgb,
}

/// Declaration order breaks distance ties.
pub const PALETTE: &[PaletteColor] = &[
    PaletteColor { name: "rouge", rgb: Rgb::new(255, 0, 0) },
    PaletteColor { name: "vert", rgb: Rgb::new(0, 255, 0) },
    PaletteColor { name: "bleu", rgb: Rgb::new(0, 0, 255) },
    PaletteColor { name: "jaune", rgb: Rgb::new(255, 255, 0) },
    PaletteColor { name: "orange", rgb: Rgb::new(255, 165, 0) },
    PaletteColor { name: "violet", rgb: Rgb::new(128, 0, 128) },
    PaletteColor { name: "rose", rgb: Rgb::new(255, 192, 203) },
    PaletteColor { name: "marron", rgb: Rgb::new(165, 42, 42) },
    PaletteColor { name: "gris", rgb: Rgb::new(128, 128, 128) },
    PaletteColor { name: "noir", rgb: Rgb::new(0, 0, 0) },
    PaletteColor { name: "blanc", rgb: Rgb::new(255, 255, 255) },
];

/// Returns the name of the palette entry closest to `rgb` in RGB space.
pub fn color_name(rgb: Rgb) -> &'static str {
    nearest(PALETTE, rgb).name
}

fn nearest(palette: &[PaletteColor], rgb: Rgb) -> &PaletteColor {
    let mut closest = &palette[0];
    let mut min_dist = u32::MAX;

    for entry in palette {
        // squared distance preserves the ordering of euclidean distance
        let dist = rgb.distance_squared(&entry.rgb);
        if dist < min_dist {
            min_dist = dist;
            closest = entry;
        }
    }

    closest
}

pub fn color_name_for_hex(hex: &str) -> Result<&'static str, AppError> {
    Rgb::from_hex(hex).map(color_name)
}
