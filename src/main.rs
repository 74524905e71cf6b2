use chrono::Local;
use log::{error, info, warn};
use std::path::Path;
use std::{fs, process};

use observation_extract::{
    config::{ApiConfig, ExtractConfig},
    export::write_extracted_sql,
    observation_source::HttpObservationSource,
    session::Session,
    DataExtractor, ExtractionResult, MetricConfig, SqlGenerationOptions,
};

fn load_metrics(path: &str) -> Result<Vec<MetricConfig>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let metrics: Vec<MetricConfig> = serde_json::from_str(&content)?;
    Ok(metrics)
}

/// Metric keys may carry path separators picked up from sheet headers
fn sql_filename(metric_key: &str) -> String {
    let key: String = metric_key
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}_{}.sql", key, Local::now().date_naive().format("%Y-%m-%d"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let api_config = ApiConfig::new().map_err(|e| {
        error!("Failed to initialize API config: {}", e);
        e
    })?;

    let extract_config = ExtractConfig::new().map_err(|e| {
        error!("Failed to initialize extract config: {}", e);
        e
    })?;

    let metrics = load_metrics(&extract_config.metrics_path).map_err(|e| {
        error!(
            "Failed to load metrics from {}: {}",
            extract_config.metrics_path, e
        );
        e
    })?;

    if metrics.is_empty() {
        error!("No metrics found in {}", extract_config.metrics_path);
        process::exit(1);
    }

    let session = match &api_config.token {
        Some(token) => Session::with_token(token.clone()),
        None => {
            warn!("API_TOKEN not set, querying without credentials");
            Session::new()
        }
    };

    let source = HttpObservationSource::new(&api_config, session).map_err(|e| {
        error!("Failed to create observation client: {}", e);
        e
    })?;

    let extractor = DataExtractor::new(source).with_query_limit(extract_config.query_limit);
    let options = SqlGenerationOptions::new(extract_config.start_date, extract_config.end_date)
        .with_sample_count(extract_config.sample_count)
        .with_batch_id(extract_config.batch_id);

    info!(
        "Extracting {} metrics from {} to {}",
        metrics.len(),
        options.start_date,
        options.end_date
    );

    let output_dir = Path::new(&extract_config.output_dir);
    let results = extractor.extract_batch(&metrics, &options).await;
    let mut failures = 0;

    for (metric, result) in metrics.iter().zip(results) {
        match result {
            Ok(result @ ExtractionResult::Data { .. }) => {
                info!("{}: {}", metric.metric_key(), result.message());
            }
            Ok(result) => {
                info!("{}: {}", metric.metric_key(), result.message());
                let filename = sql_filename(metric.metric_key());
                if let Err(e) = write_extracted_sql(output_dir, &result, Some(&filename)) {
                    error!("{}: {}", metric.metric_key(), e);
                    failures += 1;
                }
            }
            Err(e) => {
                error!("{}: {}", metric.metric_key(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        warn!("{} of {} metrics failed", failures, metrics.len());
    }

    Ok(())
}
