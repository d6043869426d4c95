use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use keyrank_core::export::{format_confidence, write_csv, CONFIDENCE_HEADER, KEYWORD_HEADER};
use keyrank_core::persist::{load_bundle_json, load_meta, load_model, save_model, ModelMeta, ModelPaths};
use keyrank_core::source::source_for_path;
use keyrank_core::{rank, RankError, RankedKeyword, TermWeightModel, DEFAULT_TOP_N};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "keyrank")]
#[command(about = "Extract top keywords from text or PDFs with a pretrained TF-IDF model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the keywords of a text, a file, or every .pdf/.txt under a directory
    Extract {
        /// Model directory (vocabulary.bin, idf.bin, meta.json)
        #[arg(long, default_value = "./model")]
        model: String,
        /// Text to rank; reads stdin when neither --text nor --input is given
        #[arg(long, conflicts_with = "input")]
        text: Option<String>,
        /// Input file or directory
        #[arg(long)]
        input: Option<PathBuf>,
        /// Number of keywords to return
        #[arg(long, default_value_t = DEFAULT_TOP_N, value_parser = parse_top_n)]
        top_n: usize,
        /// Write a CSV file (a directory of CSV files when --input is a directory)
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Convert an exported JSON bundle {vocabulary, idf, tokenizer?, weighting?} into a model directory
    Import {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: String,
    },
    /// Print model metadata
    Inspect {
        #[arg(long, default_value = "./model")]
        model: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { model, text, input, top_n, csv, json } => {
            let model = load_model(&ModelPaths::new(&model)).context("failed to load model")?;
            match (text, input) {
                (_, Some(input)) if input.is_dir() => extract_dir(&model, &input, top_n, csv.as_deref(), json),
                (Some(text), _) => extract_one(&model, &text, top_n, csv.as_deref(), json),
                (None, Some(input)) => {
                    let text = source_for_path(&input)
                        .extract_text()
                        .with_context(|| format!("failed to extract text from {}", input.display()))?;
                    extract_one(&model, &text, top_n, csv.as_deref(), json)
                }
                (None, None) => {
                    let mut text = String::new();
                    io::stdin().read_to_string(&mut text)?;
                    extract_one(&model, &text, top_n, csv.as_deref(), json)
                }
            }
        }
        Commands::Import { input, output } => import_bundle(&input, &output),
        Commands::Inspect { model } => inspect(&model),
    }
}

fn parse_top_n(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("`{s}` is not a positive integer"))?;
    if n == 0 {
        return Err("top-n must be at least 1".into());
    }
    Ok(n)
}

/// `Ok(None)` when nothing in the text is in the vocabulary.
fn rank_text(model: &TermWeightModel, text: &str, top_n: usize) -> Result<Option<Vec<RankedKeyword>>> {
    match rank(text, top_n, model) {
        Ok(keywords) => Ok(Some(keywords)),
        Err(RankError::EmptyResult) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn extract_one(model: &TermWeightModel, text: &str, top_n: usize, csv: Option<&Path>, json: bool) -> Result<()> {
    let Some(keywords) = rank_text(model, text, top_n)? else {
        eprintln!("no keywords found");
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&keywords)?);
    } else {
        print_table(&keywords);
    }
    if let Some(path) = csv {
        write_csv_file(path, &keywords)?;
    }
    Ok(())
}

fn extract_dir(model: &TermWeightModel, root: &Path, top_n: usize, csv_dir: Option<&Path>, json: bool) -> Result<()> {
    let files = collect_inputs(root);
    if files.is_empty() {
        bail!("no .pdf or .txt files under {}", root.display());
    }
    if let Some(dir) = csv_dir {
        fs::create_dir_all(dir)?;
    }

    let mut failures = 0usize;
    for file in &files {
        let text = match source_for_path(file).extract_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping unreadable input");
                failures += 1;
                continue;
            }
        };
        let keywords = match rank_text(model, &text, top_n) {
            Ok(Some(keywords)) => keywords,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping input");
                failures += 1;
                continue;
            }
        };
        if json {
            println!("{}", serde_json::json!({ "source": file, "keywords": keywords }));
        } else {
            println!("== {}", file.display());
            if keywords.is_empty() {
                println!("no keywords found");
            } else {
                print_table(&keywords);
            }
        }
        if let Some(dir) = csv_dir {
            let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("keywords");
            write_csv_file(&dir.join(format!("{stem}.csv")), &keywords)?;
        }
    }

    tracing::info!(files = files.len(), failures, "batch extraction complete");
    if failures == files.len() {
        bail!("all {} inputs failed", files.len());
    }
    Ok(())
}

fn collect_inputs(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if p.is_file() {
            if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                if matches!(ext.to_ascii_lowercase().as_str(), "pdf" | "txt") {
                    files.push(p.to_path_buf());
                }
            }
        }
    }
    files.sort();
    files
}

fn print_table(keywords: &[RankedKeyword]) {
    let width = keywords.iter().map(|k| k.term.chars().count()).max().unwrap_or(0).max(KEYWORD_HEADER.len());
    println!("{KEYWORD_HEADER:<width$}  {CONFIDENCE_HEADER}");
    for k in keywords {
        println!("{:<width$}  {:>14}", k.term, format_confidence(k.confidence));
    }
}

fn write_csv_file(path: &Path, keywords: &[RankedKeyword]) -> Result<()> {
    let f = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(keywords, f)?;
    tracing::info!(path = %path.display(), rows = keywords.len(), "wrote csv");
    Ok(())
}

fn import_bundle(input: &Path, output: &str) -> Result<()> {
    let model = load_bundle_json(input)?.into_model()?;
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into());
    save_model(&ModelPaths::new(output), &model, &created_at)?;
    tracing::info!(output, num_terms = model.len(), "model import complete");
    Ok(())
}

fn inspect(model_dir: &str) -> Result<()> {
    let paths = ModelPaths::new(model_dir);
    let model = load_model(&paths)?;
    let meta = load_meta(&paths)?.unwrap_or_else(|| ModelMeta::for_model(&model, ""));
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}
