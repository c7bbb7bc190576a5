//! Writes a synthetic bank churn table with the standard column layout.
//!
//! Usage:
//!   generate_sample [OUTPUT] [ROWS]
//!
//! OUTPUT defaults to `Churn_Modelling.csv`; a `.parquet` extension writes
//! Parquet instead.  ROWS defaults to 10000.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;

const HEADER: [&str; 14] = [
    "RowNumber",
    "CustomerId",
    "Surname",
    "CreditScore",
    "Geography",
    "Gender",
    "Age",
    "Tenure",
    "Balance",
    "NumOfProducts",
    "HasCrCard",
    "IsActiveMember",
    "EstimatedSalary",
    "Exited",
];

const SURNAMES: [&str; 12] = [
    "Hargrave", "Hill", "Onio", "Boni", "Mitchell", "Chu", "Bartlett", "Obinna", "He", "Hsu",
    "Kay", "Chin",
];

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

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One synthetic customer, columns in [`HEADER`] order.
struct Customer {
    row_number: i64,
    customer_id: i64,
    surname: String,
    credit_score: i64,
    geography: String,
    gender: String,
    age: i64,
    tenure: i64,
    balance: f64,
    products: i64,
    has_cr_card: i64,
    active: i64,
    salary: f64,
    exited: i64,
}

fn generate(rows: usize, rng: &mut SimpleRng) -> Vec<Customer> {
    (0..rows)
        .map(|i| {
            let geography = match rng.next_f64() {
                p if p < 0.5 => "France",
                p if p < 0.75 => "Germany",
                _ => "Spain",
            };
            let age = rng.gauss(39.0, 10.5).round().clamp(18.0, 92.0) as i64;
            let balance = if geography != "Germany" && rng.chance(0.45) {
                0.0
            } else {
                (rng.gauss(119_000.0, 30_000.0).clamp(3_000.0, 251_000.0) * 100.0).round() / 100.0
            };
            let products = match rng.next_f64() {
                p if p < 0.51 => 1,
                p if p < 0.97 => 2,
                p if p < 0.994 => 3,
                _ => 4,
            };
            let active = i64::from(rng.chance(0.52));

            // Older, inactive, German and many-product customers leave more often.
            let mut p_exit: f64 = 0.06;
            if active == 0 {
                p_exit += 0.08;
            }
            if age > 40 {
                p_exit += 0.17;
            }
            if geography == "Germany" {
                p_exit += 0.1;
            }
            match products {
                2 => p_exit -= 0.05,
                3 | 4 => p_exit += 0.55,
                _ => {}
            }

            Customer {
                row_number: i as i64 + 1,
                customer_id: 15_565_701 + (rng.next_u64() % 250_000) as i64,
                surname: rng.pick(&SURNAMES).to_string(),
                credit_score: rng.gauss(650.0, 96.0).round().clamp(350.0, 850.0) as i64,
                geography: geography.to_string(),
                gender: rng.pick(&["Male", "Female"]).to_string(),
                age,
                tenure: (rng.next_u64() % 11) as i64,
                balance,
                products,
                has_cr_card: i64::from(rng.chance(0.7)),
                active,
                salary: (rng.next_f64() * 199_980.0 * 100.0).round() / 100.0 + 11.58,
                exited: i64::from(rng.chance(p_exit.clamp(0.0, 1.0))),
            }
        })
        .collect()
}

fn to_batch(customers: &[Customer]) -> Result<RecordBatch> {
    let int = |f: fn(&Customer) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(customers.iter().map(f)))
    };
    let float = |f: fn(&Customer) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(customers.iter().map(f)))
    };
    let text = |f: fn(&Customer) -> &str| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(customers.iter().map(f)))
    };

    let columns: Vec<ArrayRef> = vec![
        int(|c| c.row_number),
        int(|c| c.customer_id),
        text(|c| c.surname.as_str()),
        int(|c| c.credit_score),
        text(|c| c.geography.as_str()),
        text(|c| c.gender.as_str()),
        int(|c| c.age),
        int(|c| c.tenure),
        float(|c| c.balance),
        int(|c| c.products),
        int(|c| c.has_cr_card),
        int(|c| c.active),
        float(|c| c.salary),
        int(|c| c.exited),
    ];
    let fields: Vec<Field> = HEADER
        .iter()
        .zip(&columns)
        .map(|(name, col)| Field::new(*name, col.data_type().clone(), false))
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context("building record batch")
}

fn write_csv(path: &Path, customers: &[Customer]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(HEADER)?;
    for c in customers {
        writer.write_record([
            c.row_number.to_string(),
            c.customer_id.to_string(),
            c.surname.clone(),
            c.credit_score.to_string(),
            c.geography.clone(),
            c.gender.clone(),
            c.age.to_string(),
            c.tenure.to_string(),
            format!("{:.2}", c.balance),
            c.products.to_string(),
            c.has_cr_card.to_string(),
            c.active.to_string(),
            format!("{:.2}", c.salary),
            c.exited.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "Churn_Modelling.csv".to_string());
    let rows: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid row count '{n}'"))?,
        None => 10_000,
    };
    if rows == 0 {
        bail!("row count must be positive");
    }

    let mut rng = SimpleRng::new(42);
    let customers = generate(rows, &mut rng);
    let batch = to_batch(&customers)?;

    let path = Path::new(&output);
    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") | Some("pq") => write_parquet(path, &batch)?,
        _ => write_csv(path, &customers)?,
    }

    let churned = customers.iter().filter(|c| c.exited == 1).count();
    println!("{}", pretty_format_batches(&[batch.slice(0, rows.min(5))])?);
    println!(
        "Wrote {rows} customers ({churned} churned, {:.2}%) to {output}",
        churned as f64 / rows as f64 * 100.0
    );
    Ok(())
}
