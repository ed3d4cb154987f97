use std::sync::Arc;

use eframe::egui;

use rnaseq_viz::auth::Authenticator;

use crate::state::{AppState, Stage};
use crate::ui::{panels, plot, table};
use crate::worker::{self, Services, WorkerHandle};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
    auth: Arc<dyn Authenticator>,
    services: Services,
    worker: Option<WorkerHandle>,
}

impl DashboardApp {
    pub fn new(auth: Arc<dyn Authenticator>, services: Services) -> Self {
        Self {
            state: AppState::default(),
            auth,
            services,
            worker: None,
        }
    }

    fn poll_worker(&mut self) {
        let Some(worker) = &self.worker else {
            return;
        };
        for event in worker.drain() {
            self.state.apply(event);
        }
        if matches!(self.state.stage, Stage::Done | Stage::Failed) {
            self.worker = None;
        }
    }

    fn handle(&mut self, action: panels::Action, ctx: &egui::Context) {
        match action {
            panels::Action::None => {}
            panels::Action::Login => self.login(),
            panels::Action::Logout => {
                self.worker = None;
                self.state.log_out();
            }
            panels::Action::Start => {
                if let Some(file) = self.state.selected_file.clone() {
                    log::info!("Starting run for {}", file.display());
                    self.state.begin_run();
                    self.worker = Some(worker::spawn_run(
                        self.services.clone(),
                        file,
                        ctx.clone(),
                    ));
                }
            }
        }
    }

    fn login(&mut self) {
        match self
            .auth
            .authenticate(&self.state.username, &self.state.password)
        {
            Ok(Some(token)) => {
                log::info!("Logged in as {}", self.state.username);
                self.state.logged_in(token.as_str().to_string());
            }
            Ok(None) => {
                self.state.status_message = Some("Invalid username or password".to_string());
            }
            Err(e) => self.state.status_message = Some(e.to_string()),
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_worker();

        if self.state.stage == Stage::Login {
            let mut action = panels::Action::None;
            egui::CentralPanel::default().show(ctx, |ui| {
                action = panels::login_view(ui, &mut self.state);
            });
            self.handle(action, ctx);
            return;
        }

        let mut action = panels::Action::None;

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            action = panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: upload and progress ----
        egui::SidePanel::left("run_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                if let panels::Action::Start = panels::side_panel(ui, &mut self.state) {
                    action = panels::Action::Start;
                }
            });

        // ---- Bottom panel: processed table ----
        if self.state.summary.is_some() {
            egui::TopBottomPanel::bottom("table_panel")
                .default_height(280.0)
                .resizable(true)
                .show(ctx, |ui| {
                    table::summary_table(ui, &self.state);
                });
        }

        // ---- Central panel: histogram ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::statistic_histogram(ui, &self.state);
        });

        self.handle(action, ctx);
    }
}
