use clap::{Parser, Subcommand};
use imgbatch::batch::{BATCH_CAPACITY, BatchConfiguration, BatchController};
use imgbatch::config::{self, PipelineConfig};
use imgbatch::imaging::{ImageBackend, OutputFormat, RustBackend};
use imgbatch::inputs::collect_inputs;
use imgbatch::{export, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "imgbatch")]
#[command(about = "Batch resize, re-encode, and watermark images")]
#[command(long_about = "\
Batch resize, re-encode, and watermark images

Up to 20 images per run. Each image is processed independently: one
broken file is reported as failed and the rest still finish.

  imgbatch run photos/ --width 1200 --format webp --quality 75
  imgbatch run a.jpg b.png --watermark logo.png --out-dir small/

Settings come from imgbatch.toml (if present), overridden by flags.
Run 'imgbatch gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "imgbatch.toml", global = true)]
    config: PathBuf,

    /// Log debug output to stderr (otherwise RUST_LOG applies)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override the config file.
#[derive(clap::Args, Clone)]
struct TransformArgs {
    /// Target width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Use width and height exactly instead of keeping the aspect ratio
    #[arg(long)]
    no_lock_aspect: bool,

    /// Output format: jpeg, png, or webp
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Encoding quality, 0-100
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    quality: Option<u32>,

    /// Watermark image to overlay on every output
    #[arg(long)]
    watermark: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Process images and write the results
    Run {
        /// Image files or directories (read one level deep)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        transform: TransformArgs,

        /// Directory for processed images
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Validate config and inputs without processing
    Check {
        /// Image files or directories (read one level deep)
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        transform: TransformArgs,
    },
    /// Print a stock imgbatch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run {
            inputs,
            transform,
            out_dir,
            json,
        } => {
            let config = resolve_config(&cli.config, &transform)?;
            init_thread_pool(&config.processing);
            let batch_config = BatchConfiguration::from_pipeline_config(&config)?;

            let controller = BatchController::new(RustBackend::new());
            let intake = collect_inputs(&inputs, BATCH_CAPACITY).submit(&controller);
            if !json {
                output::print_intake(&intake);
            }
            if controller.is_empty() {
                return Err("no supported images to process".into());
            }
            controller.discover_dimensions();
            if !json {
                output::print_settings(&batch_config);
            }

            let result = if json {
                controller.process_all(&batch_config, None)
            } else {
                let (tx, rx) = std::sync::mpsc::channel();
                let printer = std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_batch_event(&event) {
                            println!("{}", line);
                        }
                    }
                });
                let result = controller.process_all(&batch_config, Some(tx));
                printer
                    .join()
                    .map_err(|_| "progress printer panicked")?;
                result
            };
            result?;

            let written = export::write_results(&controller.jobs(), &out_dir)?;
            let report = controller.report();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_written(&written);
                output::print_report(&report);
            }
        }
        Command::Check { inputs, transform } => {
            let config = resolve_config(&cli.config, &transform)?;
            let batch_config = BatchConfiguration::from_pipeline_config(&config)?;
            let backend = RustBackend::new();
            if let Some(wm) = &batch_config.watermark {
                backend.identify(&wm.image)?;
            }

            let controller = BatchController::new(backend);
            let intake = collect_inputs(&inputs, BATCH_CAPACITY).submit(&controller);
            output::print_intake(&intake);
            output::print_settings(&batch_config);
            let known = controller.discover_dimensions();
            if known < controller.len() {
                println!(
                    "==> {} of {} images have unreadable headers",
                    controller.len() - known,
                    controller.len()
                );
            }
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file and apply command-line overrides on top.
fn resolve_config(
    path: &Path,
    args: &TransformArgs,
) -> Result<PipelineConfig, config::ConfigError> {
    let mut config = config::load_config(path)?;
    if args.width.is_some() {
        config.resize.width = args.width;
    }
    if args.height.is_some() {
        config.resize.height = args.height;
    }
    if args.no_lock_aspect {
        config.resize.lock_aspect = false;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(quality) = args.quality {
        config.output.quality = quality;
    }
    if let Some(path) = &args.watermark {
        config.watermark.get_or_insert_with(Default::default).path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("imgbatch=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
