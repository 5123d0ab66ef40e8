//! datasage CLI
//!
//! Command-line front end for the pipeline: one-shot subcommands plus an
//! interactive session that keeps running when a pipeline invocation fails.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::PathBuf;

use crate::eda::EdaSummary;
use crate::ingest::TabularIngestor;
use crate::pipeline::{Coordinator, PipelineContext};
use crate::report::ReportGenerator;
use crate::training::{AutomlConfig, AutomlResult, AutomlRunner};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn kv(key: &str, val: &str) {
    println!("  {:<24} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "datasage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Autonomous data-science pipeline: EDA, model comparison, and reporting")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline (load, EDA, train, report)
    Run {
        /// Input data file (CSV in UTF-8/UTF-16/Latin-1, or a spreadsheet)
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Directory the best-model artifact is written to
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,

        /// Random seed for the comparison
        #[arg(long, default_value = "123")]
        seed: u64,
    },

    /// Summarize a data file without training
    Eda {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Optional target column for class balance
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Train and rank candidate models without generating a report
    Train {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Directory the best-model artifact is written to
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,

        /// Random seed for the comparison
        #[arg(long, default_value = "123")]
        seed: u64,
    },
}

// ─── Rendering ─────────────────────────────────────────────────────────────────

fn render_eda(summary: &EdaSummary) {
    section("EDA Summary");
    kv("Shape", &format!("{} rows × {} cols", summary.shape.0, summary.shape.1));

    let with_missing: Vec<String> = summary
        .missing_values
        .iter()
        .filter(|(_, count)| *count > 0)
        .take(10)
        .map(|(name, count)| format!("{name}({count})"))
        .collect();
    if with_missing.is_empty() {
        kv("Missing values", "none");
    } else {
        kv("Missing values", &with_missing.join(", "));
    }

    if let Some(balance) = &summary.target_balance {
        let pairs: Vec<String> = balance
            .iter()
            .map(|(label, count)| format!("{label}: {count}"))
            .collect();
        kv("Target balance", &pairs.join(", "));
    }
}

fn render_comparison(result: &AutomlResult) {
    section("Model Comparison");
    println!(
        "  {:<24} {:>9} {:>9} {:>9} {:>9}",
        muted("Model"),
        muted("Accuracy"),
        muted("F1"),
        muted("AUC"),
        muted("Time")
    );
    println!("  {}", dim(&"─".repeat(64)));

    for row in &result.comparison {
        let fmt = |name: &str| {
            row.metric(name)
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "  {:<24} {:>9} {:>9} {:>9} {:>8.3}s",
            row.model_name,
            fmt("accuracy"),
            fmt("f1"),
            fmt("auc"),
            row.training_time_secs
        );
    }

    println!();
    kv("Model saved at", &result.model_path.display().to_string());
}

fn render_report(report: &str) {
    section("Report");
    for line in report.lines() {
        println!("  {line}");
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn coordinator_for(models_dir: PathBuf, seed: u64) -> Coordinator {
    Coordinator::with_components(
        TabularIngestor::new(),
        AutomlRunner::new(
            AutomlConfig::new()
                .with_models_dir(models_dir)
                .with_random_state(seed),
        ),
        ReportGenerator::new(),
    )
}

pub fn cmd_run(data: &PathBuf, target: &str, models_dir: PathBuf, seed: u64) -> anyhow::Result<()> {
    section("Pipeline");
    step_run("Running load → eda → train → report");

    let ctx = PipelineContext::from_path(data).with_target(target);
    let result = coordinator_for(models_dir, seed).run_pipeline(ctx)?;
    step_done("4 stages");

    if let Some(summary) = &result.eda {
        render_eda(summary);
    }
    if let Some(automl) = &result.automl {
        render_comparison(automl);
    }
    if let Some(report) = &result.report {
        render_report(report);
    }
    println!();
    Ok(())
}

pub fn cmd_eda(data: &PathBuf, target: Option<&str>) -> anyhow::Result<()> {
    step_run("Loading data");
    let df = TabularIngestor::new().load_path(data)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    let summary = crate::eda::summarize(&df, target)?;
    render_eda(&summary);
    println!();
    Ok(())
}

pub fn cmd_train(
    data: &PathBuf,
    target: &str,
    models_dir: PathBuf,
    seed: u64,
) -> anyhow::Result<()> {
    step_run("Loading data");
    let df = TabularIngestor::new().load_path(data)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Comparing candidate models");
    let runner = AutomlRunner::new(
        AutomlConfig::new()
            .with_models_dir(models_dir)
            .with_random_state(seed),
    );
    let result = runner.run(&df, target)?;
    step_done(&format!("{} candidates", result.comparison.len()));

    render_comparison(&result);
    println!();
    Ok(())
}

/// Interactive session: prompt, run, render, repeat. Pipeline errors are
/// rendered and the session keeps going.
pub fn cmd_interactive() -> anyhow::Result<()> {
    section("datasage");
    println!("  {}", dim("interactive mode, empty file path exits"));

    // One coordinator for the whole session: the text-model handle inside it
    // is the process-wide singleton and must not be rebuilt per invocation.
    let coordinator = Coordinator::new();

    loop {
        println!();
        let Some(path) = prompt("data file")? else {
            break;
        };
        let target = prompt("target column")?;

        let ctx = match target {
            Some(t) => PipelineContext::from_path(&path).with_target(t),
            None => PipelineContext::from_path(&path),
        };

        match coordinator.run_pipeline(ctx) {
            Ok(result) => {
                if let Some(summary) = &result.eda {
                    render_eda(summary);
                }
                if let Some(automl) = &result.automl {
                    render_comparison(automl);
                }
                if let Some(report) = &result.report {
                    render_report(report);
                }
            }
            Err(e) => {
                println!();
                println!("  {} {}", "✗".red(), e.to_string().red());
            }
        }
    }

    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<Option<String>> {
    print!("  {} {}: ", accent("?"), label);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}
