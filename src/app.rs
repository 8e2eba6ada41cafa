use std::path::PathBuf;

use eframe::egui;

use crate::state::AppState;
use crate::ui::panels;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct KeywordFilterApp {
    pub state: AppState,
}

impl KeywordFilterApp {
    /// Start with `path` already opened; a failure lands in the status line.
    pub fn with_file(path: PathBuf) -> Self {
        let mut state = AppState::default();
        if let Err(e) = state.open_path(&path) {
            state.report_error(e);
        }
        Self { state }
    }
}

impl eframe::App for KeywordFilterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filter controls ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: preview and results ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::central_panel(ui, &mut self.state);
        });
    }
}
