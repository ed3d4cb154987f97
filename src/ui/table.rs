use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use rnaseq_viz::data::Statistic;

use crate::state::AppState;

const ROW_HEIGHT: f32 = 18.0;

/// Render the processed dataset: identifier, statistics, then samples.
pub fn summary_table(ui: &mut Ui, state: &AppState) {
    let Some(summary) = &state.summary else {
        return;
    };

    egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::auto().at_least(90.0))
            .columns(Column::auto().at_least(70.0), Statistic::ALL.len())
            .columns(Column::auto().at_least(60.0), summary.sample_names.len())
            .header(ROW_HEIGHT + 4.0, |mut header| {
                header.col(|ui| {
                    ui.strong(&summary.identifier_column);
                });
                for stat in Statistic::ALL {
                    header.col(|ui| {
                        let color = state.colors.color_for(stat);
                        ui.label(RichText::new(stat.header()).strong().color(color));
                    });
                }
                for name in &summary.sample_names {
                    header.col(|ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, summary.len(), |mut row| {
                    let r = &summary.rows[row.index()];
                    row.col(|ui| {
                        ui.label(&r.identifier);
                    });
                    for stat in Statistic::ALL {
                        row.col(|ui| {
                            ui.label(format_value(r.statistic(stat)));
                        });
                    }
                    for value in &r.samples {
                        row.col(|ui| {
                            ui.label(format_value(Some(*value)));
                        });
                    }
                });
            });
    });
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{v:.0}"),
        Some(v) => format!("{v:.3}"),
        None => "–".to_string(),
    }
}
