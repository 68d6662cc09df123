use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use schemars::schema_for;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Repo automation tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the "CI local" suite: fmt, clippy, test, schema drift.
    Ci,

    /// Generate JSON Schemas for the index, config and run metadata into `schemas/`.
    Schema {
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,

        /// Fail if the files on disk differ from the generated schemas instead of writing.
        #[arg(long)]
        check: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Ci => ci(),
        Cmd::Schema { out_dir, check } => schema(&out_dir, check),
    }
}

fn ci() -> Result<()> {
    run("cargo", &["fmt", "--check"])?;
    run(
        "cargo",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )?;
    run("cargo", &["test", "--workspace"])?;
    if Path::new("schemas").is_dir() {
        schema(Path::new("schemas"), true)?;
    }
    Ok(())
}

/// `(file name, pretty JSON)` for every published schema.
fn generated_schemas() -> Result<Vec<(&'static str, Vec<u8>)>> {
    let schemas = [
        (
            "qlreport.index.schema.json",
            serde_json::to_vec_pretty(&schema_for!(qlreport_types::ResultIndex)),
        ),
        (
            "qlreport.config.schema.json",
            serde_json::to_vec_pretty(&schema_for!(qlreport_types::ConfigFile)),
        ),
        (
            "qlreport.metadata.schema.json",
            serde_json::to_vec_pretty(&schema_for!(qlreport_types::QueryRunMetadata)),
        ),
    ];

    schemas
        .into_iter()
        .map(|(name, bytes)| Ok((name, bytes.with_context(|| format!("serialize {name}"))?)))
        .collect()
}

fn schema(out_dir: &Path, check: bool) -> Result<()> {
    let schemas = generated_schemas()?;

    if check {
        let mut stale = Vec::new();
        for (name, bytes) in &schemas {
            let path = out_dir.join(name);
            let on_disk = std::fs::read(&path).unwrap_or_default();
            if &on_disk != bytes {
                stale.push(path.display().to_string());
            }
        }
        if !stale.is_empty() {
            bail!(
                "schemas are out of date (run `cargo xtask schema`): {}",
                stale.join(", ")
            );
        }
        eprintln!("schemas up to date in {}", out_dir.display());
        return Ok(());
    }

    std::fs::create_dir_all(out_dir).context("create schema output dir")?;
    for (name, bytes) in schemas {
        let path = out_dir.join(name);
        std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn run(bin: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(bin)
        .args(args)
        .status()
        .with_context(|| format!("run {bin} {args:?}"))?;
    if !status.success() {
        bail!("command failed: {bin} {args:?}");
    }
    Ok(())
}
