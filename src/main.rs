use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use ocrvote::core::model::{Detection, EnsembleResult, ImageRef};
use ocrvote::export::ExportFormat;
use ocrvote::pipeline::{export_result, replay, EnsemblePipeline};
use ocrvote::{logging, BboxPolicy, EnsembleConfig};

#[derive(Parser, Debug)]
#[command(name = "ocrvote")]
#[command(version, about = "Multi-engine OCR with spatial grouping and confidence-weighted voting", long_about = None)]
struct Cli {
    /// TOML configuration file (thresholds and [[engines]])
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log per-engine and per-run detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every configured engine on one image and vote
    Run {
        /// Input image path
        image: PathBuf,

        /// Output directory (default: ./<image_name>_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format(s) to generate
        #[arg(short, long, value_enum, default_values_t = vec![Format::Json, Format::Text])]
        format: Vec<Format>,

        #[command(flatten)]
        tuning: Tuning,

        /// Do not print progress or the transcription
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run several images, one output directory each
    Batch {
        /// Input image files
        inputs: Vec<PathBuf>,

        /// Output directory for all results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format(s) to generate
        #[arg(short, long, value_enum, default_values_t = vec![Format::Json, Format::Text])]
        format: Vec<Format>,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Vote over previously captured detections without calling any engine
    Replay {
        /// JSON array of detections
        detections: PathBuf,

        /// Output directory (default: ./<file_name>_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format(s) to generate
        #[arg(short, long, value_enum, default_values_t = vec![Format::Json])]
        format: Vec<Format>,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Validate configuration and list enabled engines
    CheckConfig,
}

#[derive(Args, Debug, Default)]
struct Tuning {
    /// Confidence floor for voting (0-1)
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Text similarity required to merge readings (0-100)
    #[arg(long)]
    similarity_threshold: Option<u32>,

    /// Vertical proximity for spatial grouping, in image units
    #[arg(long)]
    spatial_proximity: Option<f32>,

    /// What to do with detections that have no bbox
    #[arg(long, value_enum)]
    bbox_policy: Option<Policy>,

    /// Deadline for all engines on one image, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Format {
    Json,
    Text,
    Html,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ExportFormat::Json,
            Format::Text => ExportFormat::Text,
            Format::Html => ExportFormat::Html,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Policy {
    Fallback,
    Drop,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Run {
            image,
            output,
            format,
            tuning,
            quiet,
        } => {
            let config = load_config(cli.config.as_deref(), &tuning)?;
            let pipeline = EnsemblePipeline::from_config(&config)?;
            run_single(&pipeline, image, output, &export_formats(&format), quiet).await
        }
        Commands::Batch {
            inputs,
            output,
            format,
            tuning,
        } => {
            let config = load_config(cli.config.as_deref(), &tuning)?;
            run_batch(&config, inputs, output, &export_formats(&format)).await
        }
        Commands::Replay {
            detections,
            output,
            format,
            tuning,
        } => {
            let config = load_config(cli.config.as_deref(), &tuning)?;
            replay_detections(&config, detections, output, &export_formats(&format))
        }
        Commands::CheckConfig => check_config(cli.config.as_deref()),
    }
}

fn load_config(path: Option<&Path>, tuning: &Tuning) -> Result<EnsembleConfig> {
    let config = match path {
        Some(path) => EnsembleConfig::from_toml_file(path)?,
        None => EnsembleConfig::default(),
    };
    let mut config = config.with_env()?;

    if let Some(v) = tuning.min_confidence {
        config.min_confidence = v;
    }
    if let Some(v) = tuning.similarity_threshold {
        config.similarity_threshold = v;
    }
    if let Some(v) = tuning.spatial_proximity {
        config.spatial_proximity = v;
    }
    if let Some(policy) = tuning.bbox_policy {
        config.bbox_policy = match policy {
            Policy::Fallback => BboxPolicy::Fallback,
            Policy::Drop => BboxPolicy::Drop,
        };
    }
    if let Some(v) = tuning.timeout_ms {
        config.adapter_timeout_ms = v;
    }

    config.validate()?;
    Ok(config)
}

fn export_formats(formats: &[Format]) -> Vec<ExportFormat> {
    formats.iter().copied().map(ExportFormat::from).collect()
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ocrvote".to_string());
    PathBuf::from(format!("{}_output", stem))
}

async fn run_single(
    pipeline: &EnsemblePipeline,
    input: PathBuf,
    output: Option<PathBuf>,
    formats: &[ExportFormat],
    quiet: bool,
) -> Result<()> {
    let image = ImageRef::probe(&input)?;
    let output_dir = output.unwrap_or_else(|| default_output(&input));

    if !quiet {
        println!("[*] Processing: {}", input.display());
        println!("[*] Output: {}", output_dir.display());
        println!("[*] Engines: {}", pipeline.engines().join(", "));
    }

    let result = pipeline.run(&image).await;

    export_result(&result, &output_dir, formats)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    if !quiet {
        print_summary(&result);
        println!("\n[✓] Done! Results saved to: {}", output_dir.display());
    }

    Ok(())
}

async fn run_batch(
    config: &EnsembleConfig,
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    formats: &[ExportFormat],
) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    let pipeline = EnsemblePipeline::from_config(config)?;
    let base_output = output.unwrap_or_else(|| PathBuf::from("batch_output"));

    println!("[*] Batch processing {} file(s)", inputs.len());
    println!("[*] Base output: {}\n", base_output.display());

    let mut success = 0;
    let mut failed = 0;

    for (i, input) in inputs.iter().enumerate() {
        println!("[{}/{}] Processing: {}", i + 1, inputs.len(), input.display());

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("image_{}", i + 1));
        let output_dir = base_output.join(stem);

        match run_single(&pipeline, input.clone(), Some(output_dir), formats, true).await {
            Ok(_) => {
                println!("  [✓] Success");
                success += 1;
            }
            Err(e) => {
                eprintln!("  [✗] Failed: {:#}", e);
                failed += 1;
            }
        }
    }

    println!("\n[*] Summary: {} succeeded, {} failed", success, failed);

    if failed > 0 {
        anyhow::bail!("{} file(s) failed to process", failed);
    }

    Ok(())
}

fn replay_detections(
    config: &EnsembleConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    formats: &[ExportFormat],
) -> Result<()> {
    let data = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read detections: {}", input.display()))?;
    let detections: Vec<Detection> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse detections: {}", input.display()))?;

    let result = replay(config, detections)?;
    let output_dir = output.unwrap_or_else(|| default_output(&input));
    export_result(&result, &output_dir, formats)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    print_summary(&result);
    Ok(())
}

fn check_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path, &Tuning::default())?;
    let pipeline = EnsemblePipeline::from_config(&config)?;

    println!("Configuration");
    println!("=============");
    println!("min_confidence:       {}", config.min_confidence);
    println!("similarity_threshold: {}", config.similarity_threshold);
    println!("spatial_proximity:    {}", config.spatial_proximity);
    println!("agreement_bonus:      {}", config.agreement_bonus);
    println!("bbox_policy:          {:?}", config.bbox_policy);
    println!("adapter_timeout_ms:   {}", config.adapter_timeout_ms);
    println!("engines:              {}", pipeline.engines().join(", "));

    Ok(())
}

fn print_summary(result: &EnsembleResult) {
    for engine in &result.engines {
        match &engine.error {
            None => println!(
                "  [+] {}: {} detections ({} dropped) in {}ms",
                engine.engine, engine.detections, engine.dropped, engine.elapsed_ms
            ),
            Some(err) => println!("  [!] {}: {}", engine.engine, err),
        }
    }
    println!(
        "[*] {} word(s), confidence {:.3}, {:.3}s",
        result.word_count(),
        result.average_confidence(),
        result.processing_time
    );
    println!("{}", result.text());
}
