//! kgprune CLI
//!
//! Prunes a Wikidata N-Triples dump in three stages:
//! - `classify`: find external-identifier and geo properties in the full dump
//! - `filter`: filter pre-split shards in parallel and build the side tables
//! - `resolve`: fold reified statements into direct relations
//!
//! `run` chains all three.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use kgprune_filter::{classify_dump, filter_shards};
use kgprune_qualifiers::QualifierResolver;
use kgprune_storage::SpecialPredicates;
use std::path::{Path, PathBuf};
use std::time::Instant;

mod config;
mod logger;
mod shards;

use config::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "kgprune")]
#[command(
    author,
    version,
    about = "Prune a Wikidata dump into a compact, qualifier-resolved graph"
)]
struct Cli {
    /// Pipeline configuration (JSON); defaults apply to missing fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect external-identifier and geo properties from a full dump.
    Classify {
        /// Raw N-Triples dump
        dump: PathBuf,
    },

    /// Filter every shard and merge the side tables.
    Filter {
        /// Directory holding the shard files [default: scratch_dir]
        #[arg(long)]
        shards_dir: Option<PathBuf>,
    },

    /// Resolve qualifiers in the filtered stream.
    Resolve {
        /// Filtered N-Triples [default: filtered_output]
        #[arg(long)]
        input: Option<PathBuf>,
        /// Final rows [default: resolved_output]
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// classify, filter and resolve in sequence.
    Run {
        /// Raw N-Triples dump
        dump: PathBuf,
        /// Directory holding the shard files [default: scratch_dir]
        #[arg(long)]
        shards_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(&cli.log_level)?;
    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify { dump } => cmd_classify(&config, &dump),
        Commands::Filter { shards_dir } => cmd_filter(&config, shards_dir.as_deref()),
        Commands::Resolve { input, output } => {
            cmd_resolve(&config, input.as_deref(), output.as_deref())
        }
        Commands::Run { dump, shards_dir } => {
            let started = Instant::now();
            cmd_classify(&config, &dump)?;
            cmd_filter(&config, shards_dir.as_deref())?;
            cmd_resolve(&config, None, None)?;
            tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "pipeline finished"
            );
            Ok(())
        }
    }
}

fn cmd_classify(config: &PipelineConfig, dump: &Path) -> Result<()> {
    let started = Instant::now();
    let (sets, _) = classify_dump(dump)?;
    let layout = config.layout();
    sets.save(&layout)
        .with_context(|| format!("saving classifier sets to {}", layout.dir.display()))?;

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "classify stage done"
    );
    eprintln!(
        "{} {} ({} external-id properties), {} ({} geo properties)",
        "wrote".green().bold(),
        layout.external_ids_path().display().to_string().bold(),
        sets.external_ids.len(),
        layout.geo_path().display().to_string().bold(),
        sets.geo.len(),
    );
    Ok(())
}

fn cmd_filter(config: &PipelineConfig, shards_dir: Option<&Path>) -> Result<()> {
    let started = Instant::now();
    let layout = config.layout();
    let special = SpecialPredicates::load(&layout)
        .context("loading classifier sets (run `kgprune classify` first)")?;

    let shards_dir = shards_dir.unwrap_or(config.scratch_dir.as_path());
    let shards = shards::discover_shards(shards_dir, &config.shard_prefix)?;
    if shards.is_empty() {
        bail!(
            "no shard files starting with `{}` in {}",
            config.shard_prefix,
            shards_dir.display()
        );
    }

    let run = filter_shards(
        &shards,
        &special,
        &layout,
        config.filter_config(),
        &config.filtered_output,
    )?;

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "filter stage done"
    );
    eprintln!(
        "{} {} ({} triples from {} shards)",
        "wrote".green().bold(),
        config.filtered_output.display().to_string().bold(),
        run.lines_written,
        run.reports.len(),
    );
    eprintln!(
        "{} side tables in {} ({} labelled entities)",
        "wrote".green().bold(),
        layout.dir.display().to_string().bold(),
        run.tables.labels.len(),
    );
    Ok(())
}

fn cmd_resolve(config: &PipelineConfig, input: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let started = Instant::now();
    let input = input.unwrap_or(config.filtered_output.as_path());
    let output = output.unwrap_or(config.resolved_output.as_path());

    let done = QualifierResolver::new(config.scratch())
        .run(input, output)
        .with_context(|| format!("resolving qualifiers in {}", input.display()))?;

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "resolve stage done"
    );
    eprintln!(
        "{} {} ({} rows, {} statements resolved, {} superseded)",
        "wrote".green().bold(),
        done.path.display().to_string().bold(),
        done.dedup.emitted,
        done.resolve.primary,
        done.dedup.superseded + done.dedup.type_aliases,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "kgprune",
            "resolve",
            "--output",
            "out.csv",
            "--config",
            "pipeline.json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("pipeline.json")));
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Resolve { input, output } => {
                assert_eq!(input, None);
                assert_eq!(output, Some(PathBuf::from("out.csv")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_requires_a_dump() {
        assert!(Cli::try_parse_from(["kgprune", "run"]).is_err());
        let cli = Cli::try_parse_from(["kgprune", "run", "latest-all.nt", "--shards-dir", "parts"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run { ref dump, shards_dir: Some(_) } if dump.as_path() == Path::new("latest-all.nt")
        ));
    }

    #[test]
    fn filter_without_classifier_sets_explains_itself() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            dicts_dir: dir.path().join("dicts"),
            ..PipelineConfig::default()
        };
        let err = cmd_filter(&config, Some(dir.path())).unwrap_err();
        assert!(format!("{err:#}").contains("kgprune classify"), "{err:#}");
    }
}
