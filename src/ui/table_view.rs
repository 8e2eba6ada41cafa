use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use keyword_filter::data::model::Table;

const ROW_HEIGHT: f32 = 18.0;
const HEADER_HEIGHT: f32 = 22.0;

// ---------------------------------------------------------------------------
// Table grid (preview + results)
// ---------------------------------------------------------------------------

/// Render `table` as a striped, resizable grid.
///
/// `id_salt` keeps the column widths of different grids apart.
pub fn table_grid(ui: &mut Ui, id_salt: &str, table: &Table, max_height: f32) {
    if table.width() == 0 {
        ui.label(RichText::new("The table has no columns.").weak());
        return;
    }

    ui.push_id(id_salt, |ui: &mut Ui| {
        ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .max_scroll_height(max_height)
                .columns(Column::auto().at_least(60.0).clip(true), table.width())
                .header(HEADER_HEIGHT, |mut header| {
                    for name in table.columns() {
                        header.col(|ui: &mut Ui| {
                            ui.strong(name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(ROW_HEIGHT, table.len(), |mut row| {
                        let Some(cells) = table.row(row.index()) else {
                            return;
                        };
                        for cell in cells {
                            row.col(|ui: &mut Ui| {
                                if cell.is_null() {
                                    ui.label(RichText::new("—").weak());
                                } else {
                                    ui.add(egui::Label::new(cell.to_string()).truncate());
                                }
                            });
                        }
                    });
                });
        });
    });
}
