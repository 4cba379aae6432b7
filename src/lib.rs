//! Shardlabel: object detection annotations to TFRecord shards.
//!
//! Shardlabel turns a COCO-style annotation file plus its image directory
//! into a fixed number of evenly sized TFRecord files, one
//! `tf.train.Example` per image, ready for sequential reading by a training
//! pipeline.
//!
//! # Modules
//!
//! - [`ir`]: Typed annotation model and the COCO reader
//! - [`group`]: Groups annotations by image
//! - [`partition`]: Splits groups into contiguous shard chunks
//! - [`record`]: Normalizes, validates and serializes one image's record
//! - [`tfrecord`]: The length-delimited, checksummed container format
//! - [`shard`]: Writes one shard file
//! - [`pipeline`]: Runs a whole split on a worker pool
//! - [`verify`]: Reads shards back and checks them
//! - [`error`]: Error types for shardlabel operations

pub mod config;
pub mod error;
pub mod group;
pub mod images;
pub mod ir;
pub mod partition;
pub mod pipeline;
pub mod record;
pub mod shard;
pub mod source;
pub mod tfrecord;
pub mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::ConvertConfig;
pub use error::{FailureKind, ShardlabelError};

use images::{FsImageSource, ImageCodec};
use ir::io_coco_json::CocoAnnotationSource;
use ir::Split;

/// The shardlabel CLI application.
#[derive(Parser)]
#[command(name = "shardlabel")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert one split of a COCO annotation file into TFRecord shards.
    Convert(ConvertArgs),

    /// Convert the train and val splits of a COCO 2017 directory.
    Coco(CocoArgs),

    /// Check the shard files of a split for corruption.
    Verify(VerifyArgs),
}

/// Options shared by the converting subcommands.
#[derive(clap::Args)]
struct RunOptions {
    /// Directory receiving the shard files.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// JSON or YAML file with conversion settings (flags take precedence).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of worker threads (default: available CPUs).
    #[arg(long)]
    workers: Option<usize>,

    /// How images are stored: 'jpeg' (re-encode) or 'passthrough'.
    #[arg(long)]
    codec: Option<ImageCodec>,

    /// JPEG quality used when re-encoding.
    #[arg(long)]
    jpeg_quality: Option<u8>,
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// COCO instances JSON file.
    #[arg(long)]
    annotations: PathBuf,

    /// Directory holding the split's images.
    #[arg(long)]
    images: PathBuf,

    /// Split being converted ('train' or 'val').
    #[arg(long, default_value = "train")]
    split: Split,

    /// Number of shards (default: 64 for train, 8 for val).
    #[arg(long)]
    shards: Option<usize>,

    #[command(flatten)]
    run: RunOptions,
}

/// Arguments for the coco subcommand.
#[derive(clap::Args)]
struct CocoArgs {
    /// Dataset root containing annotations/, train2017/ and val2017/.
    #[arg(long)]
    root: PathBuf,

    /// Number of train shards.
    #[arg(long)]
    train_shards: Option<usize>,

    /// Number of val shards.
    #[arg(long)]
    val_shards: Option<usize>,

    #[command(flatten)]
    run: RunOptions,
}

/// Arguments for the verify subcommand.
#[derive(clap::Args)]
struct VerifyArgs {
    /// Directory holding the shard files.
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Split to verify ('train' or 'val').
    #[arg(long, default_value = "train")]
    split: Split,
}

/// Run the shardlabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), ShardlabelError> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Coco(args)) => run_coco(args),
        Some(Commands::Verify(args)) => run_verify(args),
        None => {
            println!("shardlabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Converts object detection annotations into TFRecord shards.");
            println!();
            println!("Run 'shardlabel --help' for usage information.");
            Ok(())
        }
    }
}

/// Installs a stderr log subscriber filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Builds the effective configuration: file values first, then flags.
fn build_config(opts: &RunOptions) -> Result<ConvertConfig, ShardlabelError> {
    let mut config = match &opts.config {
        Some(path) => config::load_config(path)?,
        None => ConvertConfig::default(),
    };
    if let Some(output) = &opts.output {
        config.output_directory = Some(output.clone());
    }
    if let Some(workers) = opts.workers {
        config.worker_pool_size = workers;
    }
    if let Some(codec) = opts.codec {
        config.image_codec = codec;
    }
    if let Some(quality) = opts.jpeg_quality {
        config.jpeg_quality = quality;
    }
    Ok(config)
}

fn image_source(config: &ConvertConfig) -> FsImageSource {
    FsImageSource::new(config.image_codec).with_jpeg_quality(config.jpeg_quality)
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs) -> Result<(), ShardlabelError> {
    let mut config = build_config(&args.run)?;
    if let Some(shards) = args.shards {
        config.set_shard_count(args.split, shards);
    }
    config.validate()?;
    if !args.images.is_dir() {
        return Err(ShardlabelError::MissingInput { path: args.images });
    }

    let annotations = CocoAnnotationSource::new().with_split(args.split, args.annotations, args.images);
    let report = pipeline::run_split(args.split, &config, &annotations, &image_source(&config))?;
    print!("{}", report);
    Ok(())
}

/// Execute the coco subcommand.
fn run_coco(args: CocoArgs) -> Result<(), ShardlabelError> {
    let mut config = build_config(&args.run)?;
    if let Some(shards) = args.train_shards {
        config.set_shard_count(Split::Train, shards);
    }
    if let Some(shards) = args.val_shards {
        config.set_shard_count(Split::Val, shards);
    }
    config.validate()?;

    let annotations = CocoAnnotationSource::coco2017(&args.root);
    for split in Split::ALL {
        if let Some(paths) = annotations.paths(split) {
            for path in [&paths.annotations, &paths.image_dir] {
                if !path.exists() {
                    return Err(ShardlabelError::MissingInput { path: path.clone() });
                }
            }
        }
    }

    for report in pipeline::run_all(&config, &annotations, &image_source(&config))? {
        print!("{}", report);
    }
    Ok(())
}

/// Execute the verify subcommand.
fn run_verify(args: VerifyArgs) -> Result<(), ShardlabelError> {
    let report = verify::verify_split(&args.output, args.split)?;
    print!("{}", report);
    Ok(())
}
