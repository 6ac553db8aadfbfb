//! prefset - Preference dataset builder
//!
//! **Usage:**
//! ```bash
//! prefset build --positives liked.csv --pool catalog.csv --out dataset.json
//! prefset build --labeled tracks.csv --out dataset.json
//! prefset estimate --artist "Daft Punk" --title "Around the World" --tags house
//! prefset rank --user 42 --candidates catalog.csv --top-k 10
//! prefset evaluate --predictions preds.csv
//! ```
//!
//! JSON results go to stdout unless `--out` is given; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prefset_builder::dataset::DatasetBuilder;
use prefset_builder::encoder::encoder_from_config;
use prefset_builder::estimator::{RuleBasedEstimator, DEFAULT_DURATION_MS};
use prefset_builder::export::{DatasetExport, Split};
use prefset_builder::features::FeaturePipeline;
use prefset_builder::loader::{load_labeled_tracks, load_predictions, load_tracks, LabeledTracks};
use prefset_builder::metrics::MetricsSummary;
use prefset_builder::model::ModelStore;
use prefset_builder::ranking::{Recommender, DEFAULT_THRESHOLD, DEFAULT_TOP_K};
use prefset_common::config::TomlConfig;
use prefset_common::TrackRecord;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Preference dataset builder
#[derive(Parser, Debug)]
#[clap(name = "prefset")]
#[clap(about = "Build preference training sets, estimate audio descriptors and rank candidates")]
struct Args {
    /// Config file (overrides PREFSET_CONFIG and the per-user config)
    #[clap(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a labeled training set from liked tracks and a candidate pool
    Build {
        /// CSV of the user's liked tracks
        #[clap(long, value_name = "FILE", requires = "pool", required_unless_present = "labeled")]
        positives: Option<PathBuf>,

        /// CSV of candidate tracks to draw negatives from
        #[clap(long, value_name = "FILE", requires = "positives")]
        pool: Option<PathBuf>,

        /// Single CSV with a 0/1 `label` column, instead of --positives/--pool
        #[clap(long, value_name = "FILE", conflicts_with_all = ["positives", "pool"])]
        labeled: Option<PathBuf>,

        /// Output JSON file
        #[clap(long, value_name = "FILE")]
        out: PathBuf,

        /// Negatives per positive
        #[clap(long)]
        ratio: Option<usize>,

        /// Sampling and shuffle seed
        #[clap(long)]
        seed: Option<u64>,

        /// Skip feature vectors in the output
        #[clap(long)]
        no_features: bool,
    },

    /// Estimate audio descriptors for a track from its metadata
    Estimate {
        #[clap(long)]
        artist: String,

        #[clap(long)]
        title: String,

        #[clap(long, default_value = "")]
        album: String,

        /// Tags, `|` or `,` separated
        #[clap(long, default_value = "")]
        tags: String,

        #[clap(long, default_value_t = DEFAULT_DURATION_MS)]
        duration_ms: u64,
    },

    /// Rank candidate tracks for a user with their stored model
    Rank {
        #[clap(long)]
        user: String,

        /// CSV of candidate tracks
        #[clap(long, value_name = "FILE")]
        candidates: PathBuf,

        #[clap(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Minimum probability to recommend
        #[clap(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Model directory (overrides the configured one)
        #[clap(long, value_name = "DIR")]
        models_dir: Option<PathBuf>,

        #[clap(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Compute metrics from a `label,score` CSV
    Evaluate {
        #[clap(long, value_name = "FILE")]
        predictions: PathBuf,

        #[clap(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("prefset v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Build {
            positives,
            pool,
            labeled,
            out,
            ratio,
            seed,
            no_features,
        } => {
            let tracks = match (labeled, positives, pool) {
                (Some(labeled), _, _) => load_labeled_tracks(&labeled)?,
                (None, Some(positives), Some(pool)) => LabeledTracks {
                    positives: load_tracks(&positives)?,
                    pool: load_tracks(&pool)?,
                },
                _ => anyhow::bail!("build needs --labeled, or both --positives and --pool"),
            };
            run_build(config, tracks, &out, ratio, seed, no_features)
        }
        Command::Estimate {
            artist,
            title,
            album,
            tags,
            duration_ms,
        } => {
            let track = TrackRecord::new("cli", artist, title)
                .with_album(album)
                .with_tags(tags)
                .with_duration_ms(duration_ms);
            let descriptors = RuleBasedEstimator::new().estimate(&track);
            write_json(&descriptors, None)
        }
        Command::Rank {
            user,
            candidates,
            top_k,
            threshold,
            models_dir,
            out,
        } => {
            let candidates = load_tracks(&candidates)?;
            let pipeline = FeaturePipeline::select(encoder_from_config(&config.features));
            let store = ModelStore::new(models_dir.unwrap_or_else(|| config.models_dir()));
            let ranked = Recommender::new(&pipeline, &store).recommend(&user, &candidates, top_k, threshold)?;
            write_json(&ranked, out.as_deref())
        }
        Command::Evaluate { predictions, out } => {
            let (labels, scores) = load_predictions(&predictions)?;
            let summary = MetricsSummary::compute(&labels, &scores)?;
            info!(
                accuracy = summary.accuracy,
                f1 = summary.f1,
                auc = ?summary.auc,
                "Evaluation complete"
            );
            write_json(&summary, out.as_deref())
        }
    }
}

// ============================================================================
// build
// ============================================================================

fn run_build(
    mut config: TomlConfig,
    tracks: LabeledTracks,
    out: &Path,
    ratio: Option<usize>,
    seed: Option<u64>,
    no_features: bool,
) -> Result<()> {
    if let Some(ratio) = ratio {
        config.sampling.ratio = ratio;
    }
    if let Some(seed) = seed {
        config.sampling.seed = seed;
    }
    config.validate()?;

    let builder = DatasetBuilder::from_config(&config);
    let set = builder.build(&tracks.positives, &tracks.pool)?;
    let (train, test) = set.stratified_split(config.training.test_fraction, config.sampling.seed)?;

    let pipeline = if no_features {
        None
    } else {
        Some(FeaturePipeline::select(encoder_from_config(&config.features)))
    };

    let export = DatasetExport::assemble(&train, &test, builder.sampler(), pipeline.as_ref())?;
    write_json(&export, Some(out))?;
    info!(
        train = export.split_count(Split::Train),
        test = export.split_count(Split::Test),
        "Wrote dataset to {}",
        out.display()
    );
    Ok(())
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
