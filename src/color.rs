use std::collections::HashMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use rnaseq_viz::data::Statistic;
use rnaseq_viz::tasks::TaskStatus;

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
            let hue = 210.0 + (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
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
// Color mapping: statistic → Color32
// ---------------------------------------------------------------------------

/// One distinct colour per statistic, shared by the histogram and the table
/// headers.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: HashMap<Statistic, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn for_statistics() -> Self {
        let palette = generate_palette(Statistic::ALL.len());
        ColorMap {
            mapping: Statistic::ALL.into_iter().zip(palette).collect(),
            default_color: Color32::LIGHT_BLUE,
        }
    }

    pub fn color_for(&self, stat: Statistic) -> Color32 {
        self.mapping
            .get(&stat)
            .copied()
            .unwrap_or(self.default_color)
    }
}

pub fn status_color(status: TaskStatus) -> Color32 {
    match status {
        TaskStatus::Processing => Color32::from_rgb(230, 180, 60),
        TaskStatus::Completed => Color32::from_rgb(90, 190, 110),
        TaskStatus::Failed => Color32::RED,
    }
}
