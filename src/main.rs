use anyhow::{Context, Result};
use clap::Parser;
use rice_classifier::{config::Config, image::Normalization, web::serve};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rice-classifier")]
#[command(about = "Rice grain type and quality classification service")]
struct Args {
    /// Server bind address
    #[arg(long, env = "RICE_BIND", default_value = "0.0.0.0:8501")]
    bind: String,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Model directory path
    #[arg(long, env = "RICE_MODELS_DIR", default_value = "models")]
    models_dir: String,

    /// Grain type model (defaults to <models-dir>/Resnet50.onnx)
    #[arg(long)]
    type_model: Option<PathBuf>,

    /// Quality grade model (defaults to <models-dir>/rice_grad_resnet50.onnx)
    #[arg(long)]
    grade_model: Option<PathBuf>,

    /// Input normalization expected by the models
    #[arg(long, value_enum, default_value_t = Normalization::Caffe)]
    normalization: Normalization,

    /// Enable development mode
    #[arg(long)]
    dev: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting rice classifier service...");
    tracing::info!("Bind address: {}", args.bind);
    tracing::info!("Models directory: {}", args.models_dir);
    tracing::info!("Normalization: {}", args.normalization.as_str());

    let config = Config::new(args.bind, args.models_dir, args.workers, args.dev)?
        .with_model_overrides(args.type_model, args.grade_model)
        .with_normalization(args.normalization);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(serve(config))?;

    Ok(())
}
