use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use occipital::server::{self, AppState};
use occipital::{BuiltinModel, Classifier, ModelInfo, ModelManager, MonitoringClient, Settings};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP classification service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Force a fresh download of the model files
        #[arg(short, long)]
        fresh: bool,
    },
    /// Classify a single image file
    Predict {
        image: PathBuf,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Download the built-in model into the cache
    Download {
        #[arg(short, long)]
        fresh: bool,
    },
    /// Summarize serving metrics from Prometheus
    Stats {
        #[arg(long)]
        prometheus_url: Option<String>,
    },
}

async fn ensure_model_downloaded(manager: &ModelManager, fresh: bool) -> anyhow::Result<()> {
    let model = BuiltinModel::SqueezeNet;

    if fresh {
        info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(model)?;
    }
    manager.ensure_model_downloaded(model).await?;
    Ok(())
}

fn uses_builtin_model(settings: &Settings) -> bool {
    settings.model_path.is_none() && settings.labels_path.is_none()
}

fn build_classifier(settings: &Settings, manager: &ModelManager) -> anyhow::Result<Classifier> {
    let start_time = Instant::now();
    info!("Building classifier...");

    let builder = Classifier::builder()
        .with_runtime_config(settings.runtime.clone())
        .with_input_size(settings.image_size)?
        .with_top_k(settings.top_k)?;

    let builder = if uses_builtin_model(settings) {
        builder.with_managed_model(manager, BuiltinModel::SqueezeNet)?
    } else {
        let (model_path, labels_path) = settings.resolved_paths(manager);
        builder.with_custom_model(&model_path, &labels_path)?
    };

    let classifier = builder.build()?;
    info!("Classifier built in {:.2?}", start_time.elapsed());
    Ok(classifier)
}

fn served_model_info(settings: &Settings) -> ModelInfo {
    let builtin = BuiltinModel::SqueezeNet.get_model_info();
    match &settings.model_path {
        None => builtin,
        Some(path) => ModelInfo {
            name: model_stem(path),
            display_name: model_stem(path),
            description: format!("Custom ONNX model loaded from {}", path.display()),
            ..builtin
        },
    }
}

fn model_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "custom".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut settings = Settings::from_env()?;
    let manager = ModelManager::new_default().context("Failed to create model cache")?;

    match args.command {
        Command::Serve { host, port, fresh } => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            if uses_builtin_model(&settings) {
                ensure_model_downloaded(&manager, fresh).await?;
            }

            let classifier = Arc::new(build_classifier(&settings, &manager)?);
            let model_info = served_model_info(&settings);
            let state = AppState::new(classifier, settings, model_info)?;
            server::serve(state).await?;
        }
        Command::Predict { image, top_k } => {
            if let Some(k) = top_k {
                settings.top_k = k;
            }
            if uses_builtin_model(&settings) {
                ensure_model_downloaded(&manager, false).await?;
            }

            let classifier = build_classifier(&settings, &manager)?;
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read {}", image.display()))?;

            let start_time = Instant::now();
            let predictions = classifier.predict_bytes(&bytes)?;
            info!("Prediction took {:.2?}", start_time.elapsed());

            println!("\nResults for {}:", image.display());
            for prediction in predictions {
                println!("  {:<40} {:.1}%", prediction.class_name, prediction.confidence * 100.0);
            }
        }
        Command::Download { fresh } => {
            ensure_model_downloaded(&manager, fresh).await?;
            println!(
                "Model available at {}",
                manager.get_model_path(BuiltinModel::SqueezeNet).display()
            );
        }
        Command::Stats { prometheus_url } => {
            let url = prometheus_url.unwrap_or(settings.prometheus_url);
            let client = MonitoringClient::new(url)?;
            let summary = client.fetch_summary().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
