use std::path::Path;

use anyhow::{Context, Result};

use keyword_filter::data::export::{write_file_as, ExportFormat};
use keyword_filter::data::filter::{filter_rows, FilterResult, Keywords, MatchMode};
use keyword_filter::data::loader::SourceFile;
use keyword_filter::data::model::{SampleValues, Table};

/// Rows shown in the data preview.
pub const PREVIEW_ROWS: usize = 5;
/// Distinct values listed under the column selector.
pub const SAMPLE_VALUES: usize = 5;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Opened file (None until user opens one).
    pub source: Option<SourceFile>,

    /// Sheet names of the opened workbook; empty for other formats.
    pub sheet_names: Vec<String>,

    /// Sheet the current table was read from.
    pub selected_sheet: Option<String>,

    /// Loaded table.
    pub table: Option<Table>,

    /// Column the keywords are matched against.
    pub column: Option<String>,

    /// Raw comma-separated keyword input.
    pub keyword_input: String,

    pub mode: MatchMode,

    /// Result of the last "Filter Data" click, cleared when inputs change.
    pub result: Option<FilterResult>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Open a file and load its first sheet.
    pub fn open_path(&mut self, path: &Path) -> Result<()> {
        let source =
            SourceFile::open(path).with_context(|| format!("opening {}", path.display()))?;
        let sheet_names = source.sheet_names().context("listing sheets")?;
        let selected_sheet = sheet_names.first().cloned();
        let table = source
            .load(selected_sheet.as_deref())
            .with_context(|| format!("reading {}", source.name()))?;

        self.sheet_names = sheet_names;
        self.selected_sheet = selected_sheet;
        self.source = Some(source);
        self.set_table(table);
        Ok(())
    }

    /// Re-read the opened workbook from another sheet.
    pub fn select_sheet(&mut self, sheet: &str) -> Result<()> {
        let Some(source) = &self.source else {
            return Ok(());
        };
        let table = source
            .load(Some(sheet))
            .with_context(|| format!("reading sheet {sheet}"))?;
        self.selected_sheet = Some(sheet.to_string());
        self.set_table(table);
        Ok(())
    }

    /// Ingest a newly loaded table and default the column selection.
    fn set_table(&mut self, table: Table) {
        let keep_column = self
            .column
            .as_deref()
            .is_some_and(|c| table.column_index(c).is_some());
        if !keep_column {
            self.column = table.columns().first().cloned();
        }
        self.table = Some(table);
        self.result = None;
        self.status_message = None;
    }

    pub fn set_column(&mut self, column: String) {
        if self.column.as_deref() != Some(column.as_str()) {
            self.column = Some(column);
            self.invalidate_result();
        }
    }

    pub fn set_mode(&mut self, mode: MatchMode) {
        if self.mode != mode {
            self.mode = mode;
            self.invalidate_result();
        }
    }

    /// Drop a result computed from stale inputs.
    pub fn invalidate_result(&mut self) {
        self.result = None;
    }

    /// Keywords parsed from the input box; `None` while it holds no keyword.
    pub fn keywords(&self) -> Option<Keywords> {
        Keywords::parse(&self.keyword_input)
    }

    /// Sample of distinct values in the selected column.
    pub fn column_sample(&self) -> Option<SampleValues> {
        let table = self.table.as_ref()?;
        let index = table.column_index(self.column.as_deref()?)?;
        Some(table.sample_values(index, SAMPLE_VALUES))
    }

    /// Run the filter with the current inputs.
    ///
    /// Does nothing without a table, a column or at least one keyword.
    pub fn apply_filter(&mut self) -> Result<()> {
        let (Some(table), Some(column), Some(keywords)) =
            (&self.table, &self.column, self.keywords())
        else {
            return Ok(());
        };
        let result = filter_rows(table, column, &keywords, self.mode)?;
        self.result = Some(result);
        self.status_message = None;
        Ok(())
    }

    /// Serialize the current result to `path`.
    pub fn save_result(&self, format: ExportFormat, path: &Path) -> Result<()> {
        let result = self.result.as_ref().context("no filtered data to save")?;
        write_file_as(&result.table, path, format)
            .with_context(|| format!("saving {}", path.display()))
    }

    /// Log an error and surface it in the status line.
    pub fn report_error(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        self.status_message = Some(format!("Error: {err:#}"));
    }
}
