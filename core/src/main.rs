use clap::Parser;
use log::{error, info};
use std::process;
use std::sync::Arc;
use tirads_core::cli::{Cli, ManualClassifier, ManualDetector, OutputFormat};
use tirads_core::{
    InferenceModels, InferencePipeline, PipelineConfig, PredictionResult, Result, TextGenerator,
    TextReport, TiradsError,
};

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    match run(&cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

/// Runs the pipeline for one image and renders the result
fn run(cli: &Cli) -> Result<String> {
    let config = cli.pipeline_config()?;
    let detector = ManualDetector::parse(&cli.rois)?;
    let classifier = ManualClassifier::parse(&cli.features)?;
    let models = InferenceModels::new(Arc::new(detector), Arc::new(classifier));
    let generator = text_generator(&config);

    let pipeline = InferencePipeline::with_text_generator(models, config, generator);

    info!("Processing image: {}", cli.image.display());
    let mut result = pipeline.run_path(&cli.image)?;
    if cli.explain {
        pipeline.explain(&mut result);
    }

    render(&result, &cli.format)
}

#[cfg(feature = "http")]
fn text_generator(config: &PipelineConfig) -> Option<Arc<dyn TextGenerator>> {
    use tirads_core::explain::{GeminiGenerator, GEMINI_API_KEY_ENV};

    if !config.llm_explanations {
        return None;
    }
    match GeminiGenerator::from_env(config.explanation_timeout()) {
        Some(generator) => Some(Arc::new(generator) as Arc<dyn TextGenerator>),
        None => {
            info!("{} not set, explanations use the rule-based template", GEMINI_API_KEY_ENV);
            None
        }
    }
}

#[cfg(not(feature = "http"))]
fn text_generator(_config: &PipelineConfig) -> Option<Arc<dyn TextGenerator>> {
    None
}

fn render(result: &PredictionResult, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(TextReport::new(result).to_string()),
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                serde_json::to_string_pretty(result).map_err(|e| {
                    TiradsError::InvalidConfig(format!("Failed to serialize to JSON: {}", e))
                })
            }
            #[cfg(not(feature = "json"))]
            {
                Err(TiradsError::InvalidConfig(
                    "JSON output requires the 'json' feature; rebuild with: cargo build --features json"
                        .to_string(),
                ))
            }
        }
    }
}
