//! vq CLI: inspect and create saved view files.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vq_core::context;
use vq_core::desc::parse_desc;
use vq_core::{EngineConfig, Item, View};

#[derive(Parser)]
#[command(name = "vq")]
#[command(about = "vq: inspect and create saved columnar views", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the description of a saved view
    Describe {
        /// Path to the view file
        file: PathBuf,
    },

    /// Print the rows of a saved view, tab separated
    Dump {
        /// Path to the view file
        file: PathBuf,

        /// Print at most this many rows
        #[arg(short, long)]
        limit: Option<usize>,

        /// Sort rows before printing
        #[arg(long)]
        sort: bool,

        /// Drop duplicate rows before printing
        #[arg(long)]
        unique: bool,
    },

    /// Show size, structure and content digest of a saved view
    Info {
        /// Path to the view file
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a view from row-major values and save it
    Make {
        /// Description, e.g. "id:I,name:S"
        desc: String,

        /// Output path
        out: PathBuf,

        /// Cell values, row by row
        values: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    context::set_config(EngineConfig::from_env());
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Describe { file } => describe(&file),
        Commands::Dump {
            file,
            limit,
            sort,
            unique,
        } => dump(&file, limit, sort, unique),
        Commands::Info { file, json } => info(&file, json),
        Commands::Make { desc, out, values } => make(&desc, &out, &values),
    };
    if let Err(e) = result {
        tracing::debug!("vq failed: {e}");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn describe(file: &Path) -> CliResult<()> {
    println!("{}", vq_io::open(file)?.describe());
    Ok(())
}

fn format_row(view: &View, row: usize) -> String {
    view.row(row)
        .iter()
        .map(|item| match item {
            Item::View(v) => format!("[{} rows]", v.size()),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\t")
}

fn dump(file: &Path, limit: Option<usize>, sort: bool, unique: bool) -> CliResult<()> {
    let mut view = vq_io::open(file)?;
    if unique {
        view = vq_ops::unique(&view);
    }
    if sort {
        view = vq_ops::sort(&view);
    }
    println!("{}", view.names().join("\t"));
    let rows = limit.map_or(view.size(), |n| n.min(view.size()));
    for r in 0..rows {
        println!("{}", format_row(&view, r));
    }
    if rows < view.size() {
        println!("... {} more rows", view.size() - rows);
    }
    Ok(())
}

fn info(file: &Path, json: bool) -> CliResult<()> {
    let view = vq_io::open(file)?;
    let bytes = std::fs::metadata(file)?.len();
    let digest = vq_io::digest_view(&view)?;
    if json {
        let doc = serde_json::json!({
            "file": file.display().to_string(),
            "bytes": bytes,
            "rows": view.size(),
            "width": view.width(),
            "description": view.describe(),
            "digest": digest.to_hex(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("File: {}", file.display());
        println!("  Bytes: {}", bytes);
        println!("  Rows: {}", view.size());
        println!("  Width: {}", view.width());
        println!("  Description: {}", view.describe());
        println!("  Digest: {}", digest);
    }
    Ok(())
}

/// Parse `values` into a view of structure `desc`.
fn build_view(desc: &str, values: &[String]) -> CliResult<View> {
    let meta = parse_desc(desc)?;
    let items: Vec<Item> = values.iter().map(|v| Item::from(v.as_str())).collect();
    Ok(View::from_items(&meta, &items)?)
}

fn make(desc: &str, out: &Path, values: &[String]) -> CliResult<()> {
    let view = build_view(desc, values)?;
    let bytes = vq_io::save_file(&view, out)?;
    println!("✓ Saved {} rows ({} bytes) to {}", view.size(), bytes, out.display());

    if context::config().verify_digest {
        let expected = vq_io::digest_view(&view)?;
        let actual = vq_io::digest_view(&vq_io::open(out)?)?;
        if expected != actual {
            return Err(format!("digest mismatch: {} vs {}", expected, actual).into());
        }
        println!("  Digest: {}", actual);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn values_are_converted_to_column_types() {
        let view = build_view("id:I,name:S,x:D", &strings(&["1", "a", "0.5", "2", "b", "1e3"])).unwrap();
        assert_eq!(view.size(), 2);
        assert_eq!(view.row(1), vec![Item::Int(2), Item::from("b"), Item::Double(1000.0)]);
        assert_eq!(format_row(&view, 0), "1\ta\t0.5");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(build_view("id:I", &strings(&["x"])).is_err());
        assert!(build_view("id:I,n:I", &strings(&["1"])).is_err());
        assert!(build_view("id:Q", &strings(&[])).is_err());
    }

    #[test]
    fn made_file_opens() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("made.vq");
        make("k:S,n:I", &out, &strings(&["a", "1", "b", "2"])).unwrap();
        let view = vq_io::open(&out).unwrap();
        assert_eq!(view.describe(), "k:S,n:I");
        assert_eq!(view.get(1, 1), Item::Int(2));
        info(&out, true).unwrap();
        dump(&out, Some(1), true, true).unwrap();
    }
}
