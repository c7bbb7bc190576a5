use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::features::{ChurnRisk, ChurnStatus};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Category colours: group label → Color32
// ---------------------------------------------------------------------------

/// Maps the labels of one categorical chart axis to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the labels, in the order given.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let palette = generate_palette(labels.len());
        ColorMap {
            mapping: labels.into_iter().zip(palette).collect(),
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

/// Fixed colours for the churn split so every chart agrees.
pub fn status_color(status: ChurnStatus) -> Color32 {
    match status {
        ChurnStatus::Churned => Color32::from_rgb(239, 85, 59),
        ChurnStatus::Retained => Color32::from_rgb(99, 110, 250),
    }
}

pub fn risk_color(risk: ChurnRisk) -> Color32 {
    match risk {
        ChurnRisk::High => Color32::from_rgb(214, 39, 40),
        ChurnRisk::Medium => Color32::from_rgb(255, 160, 40),
        ChurnRisk::Low => Color32::from_rgb(44, 160, 44),
    }
}
