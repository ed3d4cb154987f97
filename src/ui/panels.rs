use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use rnaseq_viz::data::Statistic;

use crate::color::status_color;
use crate::state::{AppState, Stage, CUTOFF_PERCENTILE};

/// What the user asked for this frame; handled by the app after rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Login,
    Logout,
    Start,
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

pub fn login_view(ui: &mut Ui, state: &mut AppState) -> Action {
    let mut action = Action::None;
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add_space(ui.available_height() * 0.25);
        ui.heading("RNA-Seq Data Visualization");
        ui.add_space(12.0);

        ui.add(
            egui::TextEdit::singleline(&mut state.username)
                .hint_text("Username")
                .desired_width(240.0),
        );
        let password = ui.add(
            egui::TextEdit::singleline(&mut state.password)
                .password(true)
                .hint_text("Password")
                .desired_width(240.0),
        );
        let submitted = password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        ui.add_space(8.0);
        if ui.button("Log in").clicked() || submitted {
            action = Action::Login;
        }
        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
    action
}

// ---------------------------------------------------------------------------
// Left side panel – upload, progress, statistic
// ---------------------------------------------------------------------------

/// Render the left run panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) -> Action {
    let mut action = Action::None;

    ui.heading("Dataset");
    ui.separator();

    let working = state.stage == Stage::Working;
    ui.add_enabled_ui(!working, |ui: &mut Ui| {
        if ui.button("Choose file…").clicked() {
            open_file_dialog(state);
        }
    });
    match &state.selected_file {
        Some(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            ui.label(name);
        }
        None => {
            ui.label(RichText::new("No file selected.").weak());
        }
    }

    ui.add_space(4.0);
    if ui
        .add_enabled(state.can_start(), egui::Button::new("Upload & process"))
        .clicked()
    {
        action = Action::Start;
    }

    ui.separator();
    ui.strong("Progress");
    if let Some(status) = state.last_status {
        ui.horizontal(|ui: &mut Ui| {
            if working {
                ui.spinner();
            }
            ui.label(RichText::new(status.to_string()).color(status_color(status)));
        });
    }
    ScrollArea::vertical()
        .id_salt("progress")
        .max_height(180.0)
        .stick_to_bottom(true)
        .show(ui, |ui: &mut Ui| {
            for line in &state.progress {
                ui.label(RichText::new(line).small());
            }
        });

    ui.separator();
    ui.strong("Histogram of");
    let current = state.statistic;
    egui::ComboBox::from_id_salt("statistic")
        .selected_text(current.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for stat in Statistic::ALL {
                let text = RichText::new(stat.to_string()).color(state.colors.color_for(stat));
                if ui.selectable_label(current == stat, text).clicked() {
                    state.set_statistic(stat);
                }
            }
        });

    if let Some(hist) = &state.histogram {
        ui.label(format!("{} values plotted", hist.total()));
        if hist.clipped > 0 {
            ui.label(
                RichText::new(format!(
                    "{} above the {CUTOFF_PERCENTILE}th percentile not shown",
                    hist.clipped
                ))
                .weak(),
            );
        }
    }

    action
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) -> Action {
    let mut action = Action::None;
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Log out").clicked() {
                action = Action::Logout;
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(format!("Signed in as {}", state.username));

        if let Some(summary) = &state.summary {
            ui.separator();
            ui.label(format!(
                "{} rows, {} samples",
                summary.len(),
                summary.sample_names.len()
            ));
        }

        if let Some(id) = &state.task_id {
            ui.separator();
            ui.label(RichText::new(id.to_string()).monospace().weak());
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
    action
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Choose a count matrix")
        .add_filter("Supported files", &["csv", "tsv", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("TSV", &["tsv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Selected {}", path.display());
        state.selected_file = Some(path);
        state.status_message = None;
    }
}
