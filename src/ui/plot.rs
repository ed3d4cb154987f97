use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Plot};

use crate::state::{AppState, Stage};

// ---------------------------------------------------------------------------
// Statistic histogram (central panel)
// ---------------------------------------------------------------------------

/// Render the histogram of the selected statistic in the central panel.
pub fn statistic_histogram(ui: &mut Ui, state: &AppState) {
    let hist = match &state.histogram {
        Some(h) if !h.bins.is_empty() => h,
        Some(_) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading(format!("No {} values to plot", state.statistic));
            });
            return;
        }
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                let hint = match state.stage {
                    Stage::Working => "Processing…",
                    _ => "Choose a file and press “Upload & process”",
                };
                ui.heading(hint);
            });
            return;
        }
    };

    let color = state.colors.color_for(state.statistic);
    let bars: Vec<Bar> = hist
        .bins
        .iter()
        .map(|bin| {
            Bar::new(bin.center(), bin.count as f64)
                .width(bin.width())
                .name(format!("{:.2} – {:.2}", bin.start, bin.end))
        })
        .collect();

    let chart = BarChart::new(bars)
        .color(color)
        .name(state.statistic.to_string());

    Plot::new("statistic_histogram")
        .legend(egui_plot::Legend::default())
        .x_axis_label(state.statistic.to_string())
        .y_axis_label("Count")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
        });
}
