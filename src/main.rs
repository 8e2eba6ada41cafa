mod app;
mod state;
mod ui;

use std::path::PathBuf;

use app::KeywordFilterApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // Optional file to open on start-up.
    let initial = std::env::args_os().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Keyword Filter – CSV & Excel",
        options,
        Box::new(|_cc| {
            let app = match initial {
                Some(path) => KeywordFilterApp::with_file(path),
                None => KeywordFilterApp::default(),
            };
            Ok(Box::new(app))
        }),
    )
}
