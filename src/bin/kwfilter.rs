//! kwfilter CLI
//!
//! Command-line interface for keyword row filtering.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use keyword_filter::data::export::{to_csv, write_file};
use keyword_filter::data::filter::{filter_rows, Keywords, MatchMode};
use keyword_filter::data::loader::SourceFile;

#[derive(Parser)]
#[command(name = "kwfilter")]
#[command(version)]
#[command(about = "Keep the rows of a CSV/Excel file whose column contains your keywords")]
#[command(long_about = r#"
kwfilter: keyword row filtering for CSV and Excel files

  input file → pick a column → comma-separated keywords
    → any: row kept if at least one keyword occurs
    → all: row kept only if every keyword occurs

Matching is case-insensitive plain substring search ("cat" matches "category").
The filtered table is written as CSV to stdout unless --output is given.
"#)]
struct Cli {
    /// Input file (.csv, .xlsx, .xls, .ods, .parquet, .json)
    input: PathBuf,

    /// Column whose text is searched
    #[arg(short, long, required_unless_present_any = ["list_sheets", "list_columns"])]
    column: Option<String>,

    /// Comma-separated keywords, e.g. "apple,orange,banana"
    #[arg(short, long, required_unless_present_any = ["list_sheets", "list_columns"])]
    keywords: Option<String>,

    /// Match mode: any, all
    #[arg(short, long, default_value_t = MatchMode::Any)]
    mode: MatchMode,

    /// Workbook sheet to read (default: first sheet)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Output file, .csv or .xlsx (default: CSV on stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print match statistics as JSON on stderr
    #[arg(long)]
    stats_json: bool,

    /// List workbook sheet names and exit
    #[arg(long)]
    list_sheets: bool,

    /// List column names and exit
    #[arg(long)]
    list_columns: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    run(Cli::parse(), &mut io::stdout().lock(), &mut io::stderr().lock())
}

/// Filtered CSV and listings go to `out`; statistics and notices go to `err`.
fn run(cli: Cli, out: &mut impl Write, err: &mut impl Write) -> Result<()> {
    let source = SourceFile::open(&cli.input)
        .with_context(|| format!("opening {}", cli.input.display()))?;

    if cli.list_sheets {
        for name in source.sheet_names()? {
            writeln!(out, "{name}")?;
        }
        return Ok(());
    }

    let table = source
        .load(cli.sheet.as_deref())
        .with_context(|| format!("reading {}", source.name()))?;

    if cli.list_columns {
        for name in table.columns() {
            writeln!(out, "{name}")?;
        }
        return Ok(());
    }

    let column = cli.column.context("--column is required")?;
    let Some(keywords) = cli.keywords.as_deref().and_then(Keywords::parse) else {
        bail!("no keywords given; pass a comma-separated list with --keywords");
    };

    let result = filter_rows(&table, &column, &keywords, cli.mode)?;

    if cli.stats_json {
        writeln!(err, "{}", serde_json::to_string(&result.stats)?)?;
    } else if result.is_empty() {
        writeln!(err, "No matching rows found. Try different keywords or another column.")?;
    } else {
        writeln!(err, "{}", result.stats)?;
    }

    match cli.output {
        Some(path) => write_file(&result.table, &path)
            .with_context(|| format!("writing {}", path.display()))?,
        None => out.write_all(&to_csv(&result.table)?)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use keyword_filter::data::export::to_xlsx_sheets;
    use keyword_filter::data::model::{CellValue, Table};

    const MENU: &str = "dish,price\nApple Pie,4.5\nGrape Soda,2\nBanana Split,6\n";

    fn menu_csv(dir: &Path) -> PathBuf {
        let path = dir.join("menu.csv");
        std::fs::write(&path, MENU).unwrap();
        path
    }

    /// Parse `args` after the program name and run, returning (stdout, stderr).
    fn kwfilter(args: &[&str]) -> Result<(String, String)> {
        let cli = Cli::try_parse_from(std::iter::once("kwfilter").chain(args.iter().copied()))?;
        let (mut out, mut err) = (Vec::new(), Vec::new());
        run(cli, &mut out, &mut err)?;
        Ok((String::from_utf8(out)?, String::from_utf8(err)?))
    }

    #[test]
    fn filters_to_csv_on_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let input = menu_csv(dir.path());
        let (out, err) =
            kwfilter(&[input.to_str().unwrap(), "-c", "dish", "-k", "apple, soda"]).unwrap();
        assert_eq!(out, "dish,price\nApple Pie,4.5\nGrape Soda,2\n");
        assert_eq!(err.trim_end(), "Found 2 rows matching your keywords (66.7% of your data)");
    }

    #[test]
    fn blank_keywords_fail_before_filtering() {
        let dir = tempfile::tempdir().unwrap();
        let input = menu_csv(dir.path());
        let output = dir.path().join("out.csv");
        let err = kwfilter(&[
            input.to_str().unwrap(),
            "--column",
            "no-such-column",
            "--keywords",
            " , ,",
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap_err();
        assert!(err.to_string().starts_with("no keywords given"), "{err}");
        assert!(!output.exists());
    }

    #[test]
    fn stats_json_goes_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let input = menu_csv(dir.path());
        let (out, err) = kwfilter(&[
            input.to_str().unwrap(),
            "-c",
            "dish",
            "-k",
            "a,e",
            "-m",
            "all",
            "--stats-json",
        ])
        .unwrap();
        let stats: serde_json::Value = serde_json::from_str(err.trim_end()).unwrap();
        assert_eq!(stats["matched_count"], 2);
        assert_eq!(stats["total_count"], 3);
        assert!(out.starts_with("dish,price\n"));
    }

    #[test]
    fn no_match_prints_notice_and_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let input = menu_csv(dir.path());
        let (out, err) = kwfilter(&[input.to_str().unwrap(), "-c", "dish", "-k", "kiwi"]).unwrap();
        assert_eq!(out, "dish,price\n");
        assert!(err.starts_with("No matching rows found"), "{err}");
    }

    #[test]
    fn output_extension_selects_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let input = menu_csv(dir.path());
        let output = dir.path().join("filtered.xlsx");
        let (out, _) = kwfilter(&[
            input.to_str().unwrap(),
            "-c",
            "dish",
            "-k",
            "banana",
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        assert!(out.is_empty());

        let back = SourceFile::open(&output).unwrap().load(None).unwrap();
        assert_eq!(back.columns(), ["dish", "price"]);
        assert_eq!(back.row(0), Some(&[CellValue::from("Banana Split"), CellValue::Integer(6)][..]));
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn unknown_output_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = menu_csv(dir.path());
        let output = dir.path().join("filtered.txt");
        let args = [input.to_str().unwrap(), "-c", "dish", "-k", "apple", "-o", output.to_str().unwrap()];
        assert!(kwfilter(&args).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn lists_sheets_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let fruit = Table::new(vec!["fruit".into()], vec![vec!["apple".into()]]).unwrap();
        let drinks = Table::new(
            vec!["drink".into(), "size".into()],
            vec![vec!["soda".into(), CellValue::Integer(330)]],
        )
        .unwrap();
        let path = dir.path().join("menu.xlsx");
        std::fs::write(&path, to_xlsx_sheets(&[("Fruit", &fruit), ("Drinks", &drinks)]).unwrap())
            .unwrap();
        let input = path.to_str().unwrap();

        let (sheets, _) = kwfilter(&[input, "--list-sheets"]).unwrap();
        assert_eq!(sheets, "Fruit\nDrinks\n");

        let (columns, _) = kwfilter(&[input, "--list-columns", "--sheet", "Drinks"]).unwrap();
        assert_eq!(columns, "drink\nsize\n");
    }

    #[test]
    fn mode_flag_rejects_unknown_values() {
        assert!(Cli::try_parse_from(["kwfilter", "in.csv", "-c", "a", "-k", "b", "-m", "some"]).is_err());
    }
}
