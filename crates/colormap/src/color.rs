//! RGBA quadruplets and the named color table.

use serde::{Deserialize, Serialize};

/// RGBA color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
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

    /// Fully opaque color
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Result of a query that matched no breakpoint.
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0 };

    /// Channel by index: 0 = red, 1 = green, 2 = blue, 3 = alpha.
    ///
    /// Indices past 3 read as 0.
    #[inline]
    pub fn channel(&self, index: usize) -> u8 {
        match index {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            3 => self.a,
            _ => 0,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for Rgba {
    fn from(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

// ─── Named colors ──────────────────────────────────────────────────────

struct NamedColor {
    name: &'static str,
    r: f32,
    g: f32,
    b: f32,
}

const fn named(name: &'static str, r: f32, g: f32, b: f32) -> NamedColor {
    NamedColor { name, r, g, b }
}

const NAMED_COLORS: &[NamedColor] = &[
    named("white", 1.00, 1.00, 1.00),
    named("black", 0.00, 0.00, 0.00),
    named("red", 1.00, 0.00, 0.00),
    named("green", 0.00, 1.00, 0.00),
    named("blue", 0.00, 0.00, 1.00),
    named("yellow", 1.00, 1.00, 0.00),
    named("magenta", 1.00, 0.00, 1.00),
    named("cyan", 0.00, 1.00, 1.00),
    named("aqua", 0.00, 0.75, 0.75),
    named("grey", 0.75, 0.75, 0.75),
    named("gray", 0.75, 0.75, 0.75),
    named("orange", 1.00, 0.50, 0.00),
    named("brown", 0.75, 0.50, 0.25),
    named("purple", 0.50, 0.00, 1.00),
    named("violet", 0.50, 0.00, 1.00),
    named("indigo", 0.00, 0.50, 1.00),
];

/// Fraction to byte, truncating: 0.75 gives 191.
fn component(f: f32) -> u8 {
    (255.0 * f as f64) as u8
}

/// Look up a color by name, case-insensitively. Alpha is 255.
pub fn named_color(name: &str) -> Option<Rgba> {
    NAMED_COLORS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .map(|c| Rgba::opaque(component(c.r), component(c.g), component(c.b)))
}

/// Every recognized color name, in table order.
pub fn color_names() -> impl Iterator<Item = &'static str> {
    NAMED_COLORS.iter().map(|c| c.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_colors_truncate() {
        assert_eq!(named_color("aqua"), Some(Rgba::opaque(0, 191, 191)));
        assert_eq!(named_color("brown"), Some(Rgba::opaque(191, 127, 63)));
        assert_eq!(named_color("white"), Some(Rgba::opaque(255, 255, 255)));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(named_color("BLACK"), Some(Rgba::opaque(0, 0, 0)));
        assert_eq!(named_color("Gray"), named_color("grey"));
        assert_eq!(named_color("chartreuse"), None);
    }

    #[test]
    fn channel_indexing() {
        let c = Rgba::new(1, 2, 3, 4);
        assert_eq!((0..5).map(|i| c.channel(i)).collect::<Vec<_>>(), vec![1, 2, 3, 4, 0]);
        assert_eq!(Rgba::from(c.to_array()), c);
        assert_eq!(color_names().count(), 16);
    }
}
