use chrono::NaiveDate;
use envconfig::Envconfig;
use log::debug;

#[derive(Envconfig, Clone)]
pub struct ApiConfig {
    #[envconfig(from = "API_BASE_URL", default = "http://127.0.0.1:8000/api")]
    pub base_url: String,

    #[envconfig(from = "API_TOKEN")]
    pub token: Option<String>,

    #[envconfig(from = "API_TIMEOUT_MS", default = "30000")]
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!(
            "ApiConfig loaded: base_url={}, token_set={}, timeout_ms={}",
            config.base_url,
            config.token.is_some(),
            config.timeout_ms
        );
        Ok(config)
    }
}

#[derive(Envconfig, Clone)]
pub struct ExtractConfig {
    #[envconfig(from = "METRICS_PATH", default = "metrics.json")]
    pub metrics_path: String,

    #[envconfig(from = "START_DATE")]
    pub start_date: NaiveDate,

    #[envconfig(from = "END_DATE")]
    pub end_date: NaiveDate,

    #[envconfig(from = "SAMPLE_COUNT", default = "10")]
    pub sample_count: u32,

    #[envconfig(from = "BATCH_ID", default = "1")]
    pub batch_id: u64,

    #[envconfig(from = "QUERY_LIMIT", default = "1000")]
    pub query_limit: u32,

    #[envconfig(from = "OUTPUT_DIR", default = ".")]
    pub output_dir: String,
}

impl ExtractConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!(
            "ExtractConfig loaded: metrics_path={}, start_date={}, end_date={}, sample_count={}, batch_id={}, query_limit={}, output_dir={}",
            config.metrics_path,
            config.start_date,
            config.end_date,
            config.sample_count,
            config.batch_id,
            config.query_limit,
            config.output_dir
        );
        Ok(config)
    }
}
