use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::Band;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct `#rrggbb` colours using evenly spaced
/// hues, starting at `hue_offset` degrees.
pub fn generate_palette(n: usize, hue_offset: f32) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = hue_offset + (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            format!(
                "#{:02x}{:02x}{:02x}",
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Band colours
// ---------------------------------------------------------------------------

/// Trace colours per band. Bands run blue → red → infrared, so hues are
/// spread backwards from blue.
#[derive(Debug, Clone)]
pub struct BandColors {
    mapping: BTreeMap<Band, String>,
    noise: String,
}

impl Default for BandColors {
    fn default() -> Self {
        let palette = generate_palette(Band::ALL.len(), 0.0);
        // palette hues: 0 (red), 120 (green), 240 (blue)
        let mapping = Band::ALL
            .iter()
            .zip(palette.into_iter().rev())
            .map(|(&band, color)| (band, color))
            .collect();
        BandColors {
            mapping,
            noise: "#888888".to_string(),
        }
    }
}

impl BandColors {
    pub fn color_for(&self, band: Band) -> &str {
        self.mapping
            .get(&band)
            .map(String::as_str)
            .unwrap_or(&self.noise)
    }

    pub fn noise(&self) -> &str {
        &self.noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_hex_and_distinct() {
        let colors = generate_palette(5, 30.0);
        assert_eq!(colors.len(), 5);
        for c in &colors {
            assert!(c.starts_with('#') && c.len() == 7, "{c}");
        }
        let unique: std::collections::BTreeSet<_> = colors.iter().collect();
        assert_eq!(unique.len(), 5);
        assert!(generate_palette(0, 0.0).is_empty());
    }

    #[test]
    fn bands_run_blue_to_red() {
        let colors = BandColors::default();
        let b = colors.color_for(Band::B);
        let z = colors.color_for(Band::Z);
        // blue channel dominates for b, red channel for z
        assert!(b[5..7] > b[1..3], "{b}");
        assert!(z[1..3] > z[5..7], "{z}");
        assert_ne!(colors.color_for(Band::R), colors.noise());
    }
}
