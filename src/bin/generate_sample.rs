use anyhow::{Context, Result};
use keyword_filter::data::export::{to_csv, to_xlsx_sheets};
use keyword_filter::data::model::{CellValue, Table};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// `rows` random "<style> <item>" products with a price and stock flag.
fn product_table(rng: &mut SimpleRng, styles: &[&str], items: &[&str], rows: usize) -> Result<Table> {
    let columns = ["id", "product", "price", "in_stock", "notes"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let notes = ["organic", "on sale", "", "imported", "local farm"];

    let rows = (0..rows)
        .map(|i| {
            let product = format!("{} {}", rng.pick(styles), rng.pick(items));
            let price = (rng.next_f64() * 900.0).round() / 100.0 + 0.5;
            let in_stock = rng.next_f64() > 0.25;
            let note = rng.pick(&notes);
            vec![
                CellValue::Integer(i as i64 + 1),
                CellValue::Text(product),
                CellValue::Float(price),
                CellValue::Bool(in_stock),
                if note.is_empty() {
                    CellValue::Null
                } else {
                    CellValue::from(note)
                },
            ]
        })
        .collect();

    Ok(Table::new(columns, rows)?)
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let produce = product_table(
        &mut rng,
        &["Fresh", "Dried", "Frozen", "Sliced", "Whole"],
        &["apple", "orange", "banana", "grape", "pear", "mango"],
        40,
    )?;
    let beverages = product_table(
        &mut rng,
        &["Sparkling", "Cold-pressed", "Iced", "Hot"],
        &["apple juice", "orange juice", "grape soda", "lemon tea", "banana smoothie"],
        25,
    )?;

    let csv_path = "sample_data.csv";
    std::fs::write(csv_path, to_csv(&produce)?).with_context(|| format!("writing {csv_path}"))?;

    let xlsx_path = "sample_data.xlsx";
    let workbook = to_xlsx_sheets(&[("Produce", &produce), ("Beverages", &beverages)])?;
    std::fs::write(xlsx_path, workbook).with_context(|| format!("writing {xlsx_path}"))?;

    println!(
        "Wrote {} rows to {csv_path} and {} rows across 2 sheets to {xlsx_path}",
        produce.len(),
        produce.len() + beverages.len()
    );
    Ok(())
}
