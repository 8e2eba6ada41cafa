use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Table;

// ---------------------------------------------------------------------------
// Match mode
// ---------------------------------------------------------------------------

/// How a row's text must relate to the keyword list to be retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// At least one keyword occurs in the text.
    #[default]
    Any,
    /// Every keyword occurs in the text.
    All,
}

impl MatchMode {
    pub const ALL: [MatchMode; 2] = [MatchMode::Any, MatchMode::All];

    /// Human-readable label used by the viewer.
    pub fn label(self) -> &'static str {
        match self {
            MatchMode::Any => "Contains any keyword",
            MatchMode::All => "Contains all keywords",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchMode::Any => "any",
            MatchMode::All => "all",
        })
    }
}

impl FromStr for MatchMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(MatchMode::Any),
            "all" => Ok(MatchMode::All),
            _ => Err(FilterError::InvalidMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

/// A non-empty, ordered list of trimmed keywords.
///
/// Empty tokens (`"apple,,banana"`, a trailing comma) are dropped, so a
/// `Keywords` value never contains the empty string and is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keywords {
    raw: Vec<String>,
    /// Lower-cased copies, index-aligned with `raw`.
    folded: Vec<String>,
}

impl Keywords {
    /// Split comma-separated user input into keywords.
    ///
    /// Returns `None` when the input holds no keyword at all; callers treat
    /// that as "no filter requested" and skip the engine.
    pub fn parse(input: &str) -> Option<Self> {
        Self::new(input.split(','))
    }

    /// Build from already-split tokens, trimming each and dropping blanks.
    pub fn new<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if raw.is_empty() {
            return None;
        }
        let folded = raw.iter().map(|k| fold_case(k)).collect();
        Some(Self { raw, folded })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Never true for a parsed list.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.raw.iter().map(String::as_str)
    }
}

impl fmt::Display for Keywords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Case-insensitive literal substring predicate over one row's text.
///
/// Keywords are plain strings: `a.b` only matches the three characters
/// `a`, `.`, `b` in sequence. Both modes share the same containment test.
#[derive(Debug, Clone, Copy)]
pub struct KeywordMatcher<'k> {
    folded: &'k [String],
    mode: MatchMode,
}

impl<'k> KeywordMatcher<'k> {
    pub fn new(keywords: &'k Keywords, mode: MatchMode) -> Self {
        Self {
            folded: &keywords.folded,
            mode,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = fold_case(text);
        match self.mode {
            MatchMode::Any => self.folded.iter().any(|k| text.contains(k.as_str())),
            MatchMode::All => self.folded.iter().all(|k| text.contains(k.as_str())),
        }
    }
}

/// Lower-case `text` one char at a time, with final sigma folded to `σ`.
///
/// `str::to_lowercase` is context-sensitive for `Σ`, so a keyword and a cell
/// equal up to case could fold to different strings.
pub fn fold_case(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ς' { 'σ' } else { c })
        .collect()
}

// ---------------------------------------------------------------------------
// Result & statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterStats {
    pub matched_count: usize,
    pub total_count: usize,
    /// `matched / total * 100`, or `0.0` for an empty table.
    pub match_percentage: f64,
}

impl FilterStats {
    pub fn new(matched_count: usize, total_count: usize) -> Self {
        let match_percentage = if total_count == 0 {
            0.0
        } else {
            matched_count as f64 / total_count as f64 * 100.0
        };
        Self {
            matched_count,
            total_count,
            match_percentage,
        }
    }
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {} rows matching your keywords ({:.1}% of your data)",
            self.matched_count, self.match_percentage
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    /// Retained rows, in source order.
    pub table: Table,
    /// Source row index of each retained row.
    pub indices: Vec<usize>,
    pub stats: FilterStats,
}

impl FilterResult {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("column `{0}` not found in table")]
    ColumnNotFound(String),
    #[error("unknown match mode `{0}` (expected `any` or `all`)")]
    InvalidMode(String),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Return indices of rows whose `column` text satisfies `matcher`, ascending.
pub fn filtered_indices(table: &Table, column: usize, matcher: &KeywordMatcher<'_>) -> Vec<usize> {
    table
        .column(column)
        .enumerate()
        .filter(|(_, cell)| matcher.matches(&cell.render()))
        .map(|(i, _)| i)
        .collect()
}

/// Keep the rows of `table` whose `column_name` cell matches `keywords`
/// under `mode`.
///
/// Pure function of its inputs: the source table is only read, and the
/// returned table keeps the original typed cells.
pub fn filter_rows(
    table: &Table,
    column_name: &str,
    keywords: &Keywords,
    mode: MatchMode,
) -> Result<FilterResult, FilterError> {
    let column = table
        .column_index(column_name)
        .ok_or_else(|| FilterError::ColumnNotFound(column_name.to_string()))?;

    log::debug!(
        "Filtering {} rows on column {column_name:?} with keywords [{keywords}] (mode: {mode})",
        table.len()
    );

    let matcher = KeywordMatcher::new(keywords, mode);
    let indices = filtered_indices(table, column, &matcher);
    let stats = FilterStats::new(indices.len(), table.len());

    log::info!(
        "{} of {} rows matched on column {column_name:?}",
        stats.matched_count,
        stats.total_count
    );

    Ok(FilterResult {
        table: table.select_rows(&indices),
        indices,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    fn fruit_table() -> Table {
        single_column(
            "fruit",
            &["apple pie", "orange juice", "banana split", "grape soda"],
        )
    }

    fn single_column(name: &str, cells: &[&str]) -> Table {
        Table::new(
            vec![name.to_string()],
            cells.iter().map(|c| vec![CellValue::from(*c)]).collect(),
        )
        .unwrap()
    }

    fn kw(input: &str) -> Keywords {
        Keywords::parse(input).unwrap()
    }

    fn texts(table: &Table) -> Vec<String> {
        table.column(0).map(|c| c.to_string()).collect()
    }

    #[test]
    fn any_mode_keeps_rows_with_at_least_one_keyword() {
        let result = filter_rows(&fruit_table(), "fruit", &kw("apple, grape"), MatchMode::Any).unwrap();

        assert_eq!(texts(&result.table), vec!["apple pie", "grape soda"]);
        assert_eq!(result.indices, vec![0, 3]);
        assert_eq!(result.stats.matched_count, 2);
        assert_eq!(result.stats.total_count, 4);
        assert_eq!(result.stats.match_percentage, 50.0);
    }

    #[test]
    fn all_mode_requires_every_keyword() {
        let result = filter_rows(&fruit_table(), "fruit", &kw("a,e"), MatchMode::All).unwrap();

        assert_eq!(
            texts(&result.table),
            vec!["apple pie", "orange juice", "grape soda"]
        );
        assert_eq!(result.stats.matched_count, 3);
    }

    #[test]
    fn matching_ignores_case_in_both_modes() {
        let table = single_column("dish", &["APPLE PIE"]);
        for mode in MatchMode::ALL {
            let result = filter_rows(&table, "dish", &kw("apple"), mode).unwrap();
            assert_eq!(result.stats.matched_count, 1, "mode {mode}");
        }
        let result = filter_rows(&table, "dish", &kw("PiE"), MatchMode::Any).unwrap();
        assert_eq!(result.stats.matched_count, 1);
    }

    #[test]
    fn keywords_are_literal_not_patterns() {
        let table = single_column("v", &["a.b", "axb", "a+b", "aab", "(x)", "x"]);

        let dot = filter_rows(&table, "v", &kw("a.b"), MatchMode::Any).unwrap();
        assert_eq!(texts(&dot.table), vec!["a.b"]);

        let plus = filter_rows(&table, "v", &kw("a+b"), MatchMode::Any).unwrap();
        assert_eq!(texts(&plus.table), vec!["a+b"]);

        let paren = filter_rows(&table, "v", &kw("(x), [y]"), MatchMode::Any).unwrap();
        assert_eq!(texts(&paren.table), vec!["(x)"]);
    }

    #[test]
    fn greek_sigma_matches_in_any_position() {
        let table = single_column("word", &["ΟΣΑ", "ΟΔΟΣ", "οδός"]);

        let upper = filter_rows(&table, "word", &kw("ΟΣ"), MatchMode::Any).unwrap();
        assert_eq!(upper.indices, vec![0, 1]);

        let lower = filter_rows(&table, "word", &kw("σ"), MatchMode::Any).unwrap();
        assert_eq!(lower.indices, vec![0, 1, 2]);

        let final_form = filter_rows(&table, "word", &kw("ς"), MatchMode::All).unwrap();
        assert_eq!(final_form.indices, vec![0, 1, 2]);
    }

    #[test]
    fn fold_case_is_position_independent() {
        assert_eq!(fold_case("ΟΔΟΣ"), "οδοσ");
        assert_eq!(fold_case("ΣΑ"), "σα");
        assert_eq!(fold_case("Straße"), "straße");
    }

    #[test]
    fn containment_is_not_word_bounded() {
        let table = single_column("v", &["category", "dog"]);
        let result = filter_rows(&table, "v", &kw("cat"), MatchMode::Any).unwrap();
        assert_eq!(texts(&result.table), vec!["category"]);
    }

    #[test]
    fn empty_table_reports_zero_percent() {
        let table = Table::new(vec!["fruit".into()], Vec::new()).unwrap();
        let result = filter_rows(&table, "fruit", &kw("apple"), MatchMode::Any).unwrap();
        assert_eq!(result.stats, FilterStats::new(0, 0));
        assert_eq!(result.stats.match_percentage, 0.0);
        assert!(result.is_empty());
    }

    #[test]
    fn unknown_column_is_an_error() {
        let err = filter_rows(&fruit_table(), "veg", &kw("apple"), MatchMode::Any).unwrap_err();
        assert_eq!(err, FilterError::ColumnNotFound("veg".into()));
        assert_eq!(err.to_string(), "column `veg` not found in table");
    }

    #[test]
    fn non_text_cells_match_their_rendering() {
        let table = Table::new(
            vec!["id".into(), "note".into()],
            vec![
                vec![CellValue::Integer(42), CellValue::Null],
                vec![CellValue::Float(4.5), CellValue::from("None")],
                vec![CellValue::Bool(true), CellValue::from("nan")],
            ],
        )
        .unwrap();

        let ids = filter_rows(&table, "id", &kw("4"), MatchMode::Any).unwrap();
        assert_eq!(ids.indices, vec![0, 1]);

        let truthy = filter_rows(&table, "id", &kw("TRUE"), MatchMode::Any).unwrap();
        assert_eq!(truthy.indices, vec![2]);

        // A missing cell is not the word "None" or "nan".
        let none = filter_rows(&table, "note", &kw("none"), MatchMode::Any).unwrap();
        assert_eq!(none.indices, vec![1]);
        let nan = filter_rows(&table, "note", &kw("nan"), MatchMode::Any).unwrap();
        assert_eq!(nan.indices, vec![2]);
    }

    #[test]
    fn result_keeps_every_column_of_retained_rows() {
        let table = Table::new(
            vec!["name".into(), "qty".into()],
            vec![
                vec!["pear".into(), CellValue::Integer(3)],
                vec!["plum".into(), CellValue::Integer(7)],
            ],
        )
        .unwrap();
        let result = filter_rows(&table, "name", &kw("plum"), MatchMode::All).unwrap();
        assert_eq!(
            result.table.row(0),
            Some(&[CellValue::from("plum"), CellValue::Integer(7)][..])
        );
    }

    #[test]
    fn parse_trims_and_drops_empty_tokens() {
        let keywords = kw("  apple ,, banana ,");
        assert_eq!(keywords.as_slice(), ["apple", "banana"]);
        assert_eq!(keywords.to_string(), "apple, banana");

        assert_eq!(Keywords::parse(""), None);
        assert_eq!(Keywords::parse(" , ,, "), None);
    }

    #[test]
    fn empty_tokens_do_not_make_every_row_match() {
        let result = filter_rows(&fruit_table(), "fruit", &kw("apple,,"), MatchMode::Any).unwrap();
        assert_eq!(result.stats.matched_count, 1);
    }

    #[test]
    fn match_mode_parses_and_displays() {
        assert_eq!("any".parse::<MatchMode>(), Ok(MatchMode::Any));
        assert_eq!(" ALL ".parse::<MatchMode>(), Ok(MatchMode::All));
        assert_eq!(
            "some".parse::<MatchMode>(),
            Err(FilterError::InvalidMode("some".into()))
        );
        assert_eq!(MatchMode::default(), MatchMode::Any);
        assert_eq!(MatchMode::All.to_string(), "all");
    }

    #[test]
    fn stats_line_uses_one_decimal() {
        let stats = FilterStats::new(1, 3);
        assert_eq!(
            stats.to_string(),
            "Found 1 rows matching your keywords (33.3% of your data)"
        );
        assert_eq!(
            serde_json::to_value(stats).unwrap()["matched_count"],
            serde_json::json!(1)
        );
    }
}
