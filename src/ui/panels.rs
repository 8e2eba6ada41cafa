use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use keyword_filter::data::export::ExportFormat;
use keyword_filter::data::filter::MatchMode;
use keyword_filter::data::loader::SourceFormat;

use crate::state::{AppState, PREVIEW_ROWS};
use crate::ui::table_view::table_grid;

const INSTRUCTIONS: &str = "\
1. Open a file (CSV or Excel) with File → Open…
2. Select a column from your data that you want to filter on.
3. Enter keywords separated by commas (e.g., apple,orange,banana).
4. Choose a filter method:
   • Contains any keyword: rows that contain at least one of your keywords
   • Contains all keywords: only rows that contain all of your keywords
5. Click \"Filter Data\" to see your filtered results.
6. Download the filtered data as CSV or Excel.

All filtering is case-insensitive, so \"Apple\" will match \"apple\" or \"APPLE\".";

// ---------------------------------------------------------------------------
// Left side panel – filter controls
// ---------------------------------------------------------------------------

/// Render the left panel: sheet, column, keywords, mode and the filter button.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filter");
    ui.separator();

    // Clone what we need so we can mutate state below.
    let Some(columns) = state.table.as_ref().map(|t| t.columns().to_vec()) else {
        ui.label("No file loaded.");
        if ui.button("Open…").clicked() {
            open_file_dialog(state);
        }
        return;
    };
    let sheet_names = state.sheet_names.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Sheet selector (multi-sheet workbooks only) ----
            if sheet_names.len() > 1 {
                ui.strong("Sheet");
                let current = state.selected_sheet.clone().unwrap_or_default();
                let mut chosen = current.clone();
                egui::ComboBox::from_id_salt("sheet")
                    .selected_text(&current)
                    .show_ui(ui, |ui: &mut Ui| {
                        for name in &sheet_names {
                            ui.selectable_value(&mut chosen, name.clone(), name);
                        }
                    });
                if chosen != current {
                    match state.select_sheet(&chosen) {
                        Ok(()) => state.status_message = Some(format!("Loaded sheet: {chosen}")),
                        Err(e) => state.report_error(e),
                    }
                }
                ui.separator();
            }

            // ---- Column selector ----
            ui.strong("Column to filter");
            let current = state.column.clone().unwrap_or_default();
            let mut chosen = current.clone();
            egui::ComboBox::from_id_salt("filter_column")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &columns {
                        ui.selectable_value(&mut chosen, col.clone(), col);
                    }
                });
            if chosen != current {
                state.set_column(chosen);
            }
            if let Some(sample) = state.column_sample() {
                ui.label(
                    RichText::new(format!("Sample values in this column: {sample}"))
                        .small()
                        .weak(),
                );
            }
            ui.separator();

            // ---- Keywords ----
            ui.strong("Keywords");
            let edit = ui.add(
                egui::TextEdit::singleline(&mut state.keyword_input)
                    .hint_text("e.g., apple,orange,banana"),
            );
            if edit.changed() {
                state.invalidate_result();
            }
            let keywords = state.keywords();
            if let Some(keywords) = &keywords {
                ui.label(
                    RichText::new(format!(
                        "You've entered {} keywords: {keywords}",
                        keywords.len()
                    ))
                    .small()
                    .weak(),
                );
            }
            ui.separator();

            // ---- Match mode ----
            ui.strong("Filter method");
            let mut mode = state.mode;
            for candidate in MatchMode::ALL {
                ui.radio_value(&mut mode, candidate, candidate.label());
            }
            state.set_mode(mode);
            ui.label(
                RichText::new("'Any' is more inclusive, 'All' is more restrictive")
                    .small()
                    .weak(),
            );
            ui.separator();

            // ---- Apply ----
            let button = egui::Button::new("🔍 Filter Data")
                .min_size([ui.available_width(), 28.0].into());
            if ui.add_enabled(keywords.is_some(), button).clicked() {
                if let Err(e) = state.apply_filter() {
                    state.report_error(e);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Central panel – instructions, preview and results
// ---------------------------------------------------------------------------

pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    egui::CollapsingHeader::new(RichText::new("📋 How to use").strong())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.label(INSTRUCTIONS);
        });
    ui.separator();

    let Some(table) = &state.table else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a CSV or Excel file to get started  (File → Open…)");
        });
        return;
    };

    ui.heading("Preview of your data");
    table_grid(ui, "preview", &table.head(PREVIEW_ROWS), 140.0);
    ui.label(
        RichText::new(format!(
            "Showing first {} rows of {} total rows and {} columns",
            PREVIEW_ROWS.min(table.len()),
            table.len(),
            table.width()
        ))
        .small()
        .weak(),
    );
    ui.separator();

    let Some(result) = &state.result else {
        return;
    };

    ui.heading("Filtered results");
    if result.is_empty() {
        ui.colored_label(
            Color32::from_rgb(0xE0, 0xA0, 0x20),
            "No matching rows found. Try different keywords or another column.",
        );
        return;
    }

    ui.label(RichText::new(format!("✅ {}", result.stats)).strong());
    let mut save_as = None;
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("💾 Download as CSV").clicked() {
            save_as = Some(ExportFormat::Csv);
        }
        if ui.button("📊 Download as Excel").clicked() {
            save_as = Some(ExportFormat::Xlsx);
        }
    });
    let height = ui.available_height();
    table_grid(ui, "results", &result.table, height);

    if let Some(format) = save_as {
        save_file_dialog(state, format);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(source), Some(table)) = (&state.source, &state.table) {
            ui.label(format!(
                "{}: {} rows loaded, {} matched",
                source.name(),
                table.len(),
                state
                    .result
                    .as_ref()
                    .map_or(0, |r| r.stats.matched_count)
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::GREEN
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open a CSV or Excel file")
        .add_filter("Supported files", SourceFormat::EXTENSIONS)
        .add_filter("CSV", &["csv"])
        .add_filter("Excel", &["xlsx", "xlsm", "xlsb", "xls", "ods"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        match state.open_path(&path) {
            Ok(()) => {
                state.status_message = Some(format!("File successfully loaded: {}", path.display()));
            }
            Err(e) => {
                state.report_error(e.context("please make sure you've opened a valid file"));
            }
        }
    }
}

fn save_file_dialog(state: &mut AppState, format: ExportFormat) {
    let file = rfd::FileDialog::new()
        .set_title("Save filtered data")
        .set_file_name(format.default_file_name())
        .add_filter(format.extension().to_uppercase(), &[format.extension()])
        .save_file();

    if let Some(path) = file {
        match state.save_result(format, &path) {
            Ok(()) => state.status_message = Some(format!("Saved {}", path.display())),
            Err(e) => state.report_error(e),
        }
    }
}
