//! Writes a synthetic RNA-Seq count matrix for trying out the dashboard.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::{Parser, ValueEnum};
use parquet::arrow::ArrowWriter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Parquet,
}

/// Defects a generated matrix can carry, to exercise validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Inject {
    /// Repeat the first identifier on the last row.
    Duplicate,
    /// Blank out the identifier of the middle row.
    Null,
    /// Make one count negative.
    Negative,
}

#[derive(Debug, Parser)]
#[command(name = "generate_sample", about = "Generate a synthetic count matrix")]
struct Args {
    /// Number of genes (rows).
    #[arg(long, default_value_t = 2000)]
    rows: usize,

    /// Number of sample columns.
    #[arg(long, default_value_t = 6)]
    samples: usize,

    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Output path; defaults to `sample_counts.<ext>`.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, value_enum)]
    inject: Option<Inject>,
}

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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Matrix {
    symbols: Vec<Option<String>>,
    sample_names: Vec<String>,
    /// Column-major counts.
    counts: Vec<Vec<i64>>,
}

fn generate(args: &Args) -> Matrix {
    let mut rng = SimpleRng::new(args.seed);
    let symbols: Vec<Option<String>> = (1..=args.rows).map(|i| Some(format!("GENE{i:05}"))).collect();
    let sample_names: Vec<String> = (1..=args.samples).map(|i| format!("sample_{i}")).collect();

    // Log-normal gene expression level, per-sample multiplicative noise.
    let levels: Vec<f64> = (0..args.rows).map(|_| rng.gauss(4.0, 1.8).exp()).collect();
    let mut counts = vec![Vec::with_capacity(args.rows); args.samples];
    for level in &levels {
        for column in counts.iter_mut() {
            let noisy = level * rng.gauss(1.0, 0.25).max(0.0);
            column.push(noisy.round() as i64);
        }
    }

    let mut matrix = Matrix {
        symbols,
        sample_names,
        counts,
    };
    if let Some(defect) = args.inject {
        inject(&mut matrix, defect);
    }
    matrix
}

fn inject(matrix: &mut Matrix, defect: Inject) {
    let n = matrix.symbols.len();
    if n == 0 {
        return;
    }
    match defect {
        Inject::Duplicate if n >= 2 => matrix.symbols[n - 1] = matrix.symbols[0].clone(),
        Inject::Duplicate => {}
        Inject::Null => matrix.symbols[n / 2] = None,
        Inject::Negative => {
            if let Some(column) = matrix.counts.first_mut() {
                column[n / 2] = -column[n / 2].max(1);
            }
        }
    }
}

fn write_csv(matrix: &Matrix, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut header = vec!["SYMBOL".to_string()];
    header.extend(matrix.sample_names.iter().cloned());
    writer.write_record(&header)?;

    for (row, symbol) in matrix.symbols.iter().enumerate() {
        let mut record = vec![symbol.clone().unwrap_or_default()];
        record.extend(matrix.counts.iter().map(|c| c[row].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(matrix: &Matrix, path: &Path) -> Result<()> {
    let mut fields = vec![Field::new("SYMBOL", DataType::Utf8, true)];
    fields.extend(
        matrix
            .sample_names
            .iter()
            .map(|name| Field::new(name, DataType::Int64, false)),
    );
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(matrix.symbols.clone()))];
    columns.extend(
        matrix
            .counts
            .iter()
            .map(|c| Arc::new(Int64Array::from(c.clone())) as ArrayRef),
    );
    let batch = RecordBatch::try_new(schema.clone(), columns).context("Failed to create RecordBatch")?;
    let preview = batch.slice(0, batch.num_rows().min(5));
    log::debug!("First rows:\n{}", pretty_format_batches(&[preview])?);

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let out = args.out.clone().unwrap_or_else(|| {
        PathBuf::from(match args.format {
            Format::Csv => "sample_counts.csv",
            Format::Parquet => "sample_counts.parquet",
        })
    });

    let matrix = generate(&args);
    match args.format {
        Format::Csv => write_csv(&matrix, &out)?,
        Format::Parquet => write_parquet(&matrix, &out)?,
    }

    println!(
        "Wrote {} genes x {} samples to {}{}",
        args.rows,
        args.samples,
        out.display(),
        args.inject
            .map(|d| format!(" (injected defect: {d:?})"))
            .unwrap_or_default()
    );
    Ok(())
}
