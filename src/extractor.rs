use crate::model::{ExtractionResult, FallbackReason, MetricConfig, SqlGenerationOptions};
use crate::observation_source::{ObservationQuery, ObservationSource};
use crate::sql_generator::{generate_insert_sql, validate_options, SqlGeneratorError};
use futures::future::join_all;
use log::{debug, error, info};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_QUERY_LIMIT: u32 = 1000;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("SQL generation error: {0}")]
    Generation(#[from] SqlGeneratorError),
}

/// Fetches observations for a metric, falling back to a synthetic insert
/// script when none are available.
///
/// Query failures are never returned as errors: they produce a fallback
/// result whose message carries the cause. Only invalid options are
/// reported as `Err`, before any query is sent.
pub struct DataExtractor<S> {
    source: S,
    query_limit: u32,
    request_timeout: Option<Duration>,
}

impl<S> DataExtractor<S>
where
    S: ObservationSource,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            query_limit: DEFAULT_QUERY_LIMIT,
            request_timeout: None,
        }
    }

    pub fn with_query_limit(mut self, query_limit: u32) -> Self {
        self.query_limit = query_limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn build_query(&self, config: &MetricConfig, options: &SqlGenerationOptions) -> ObservationQuery {
        let query = ObservationQuery::new(
            config.source_code.clone(),
            config.metric_key().to_string(),
            options.start_date,
            options.end_date,
        )
        .with_geo_code(config.geo_code.clone())
        .with_limit(self.query_limit);

        match self.request_timeout {
            Some(timeout) => query.with_timeout(timeout),
            None => query,
        }
    }

    pub async fn extract(
        &self,
        config: &MetricConfig,
        options: &SqlGenerationOptions,
    ) -> Result<ExtractionResult, ExtractError> {
        validate_options(options)?;

        let query = self.build_query(config, options);
        debug!("Querying observations for {}", config.metric_key());

        match self.source.query_observations(&query).await {
            Ok(observations) if !observations.is_empty() => {
                info!(
                    "Found {} observations for {}",
                    observations.len(),
                    config.metric_key()
                );
                Ok(ExtractionResult::Data {
                    message: format!("found {} observations", observations.len()),
                    observations,
                })
            }
            Ok(_) => {
                info!(
                    "No observations for {}, generating INSERT SQL",
                    config.metric_key()
                );
                self.fallback(config, options, FallbackReason::NoData)
            }
            Err(e) => {
                error!("Observation query for {} failed: {}", config.metric_key(), e);
                self.fallback(config, options, FallbackReason::QueryFailed(e.to_string()))
            }
        }
    }

    fn fallback(
        &self,
        config: &MetricConfig,
        options: &SqlGenerationOptions,
        reason: FallbackReason,
    ) -> Result<ExtractionResult, ExtractError> {
        let sql = generate_insert_sql(config, options)?;
        let message = match &reason {
            FallbackReason::NoData => "no observations found, generated INSERT SQL".to_string(),
            FallbackReason::QueryFailed(cause) => {
                format!("query failed: {}, generated INSERT SQL", cause)
            }
        };
        Ok(ExtractionResult::Fallback {
            sql,
            reason,
            message,
        })
    }

    /// Extracts every config concurrently.
    ///
    /// Results are in input order and each one is independent of the others.
    pub async fn extract_batch(
        &self,
        configs: &[MetricConfig],
        options: &SqlGenerationOptions,
    ) -> Vec<Result<ExtractionResult, ExtractError>> {
        join_all(configs.iter().map(|config| self.extract(config, options))).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::Observation;
    use crate::observation_source::ObservationSourceError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rstest::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    fn observation(id: i64, metric_name: &str) -> Observation {
        Observation {
            id,
            metric_name: metric_name.to_string(),
            obs_date: NaiveDate::from_ymd_opt(2024, 1, 2),
            period_type: Some("day".to_string()),
            period_start: None,
            period_end: None,
            value: Some(15.2),
            raw_value: None,
            geo_code: None,
            tags: Default::default(),
            unit: Some("yuan/kg".to_string()),
        }
    }

    enum Reply {
        Rows(usize),
        Fail(&'static str),
    }

    /// Replies per metric key after an optional delay, recording every query
    #[derive(Default)]
    struct StubSource {
        replies: HashMap<String, (Reply, u64)>,
        seen: Mutex<Vec<ObservationQuery>>,
    }

    impl StubSource {
        fn reply(mut self, metric_key: &str, reply: Reply, delay_ms: u64) -> Self {
            self.replies.insert(metric_key.to_string(), (reply, delay_ms));
            self
        }
    }

    #[async_trait]
    impl ObservationSource for StubSource {
        async fn query_observations(
            &self,
            query: &ObservationQuery,
        ) -> Result<Vec<Observation>, ObservationSourceError> {
            self.seen.lock().await.push(query.clone());
            match self.replies.get(&query.metric_key) {
                Some((reply, delay_ms)) => {
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                    match reply {
                        Reply::Rows(n) => Ok((0..*n as i64)
                            .map(|id| observation(id, &query.metric_key))
                            .collect()),
                        Reply::Fail(cause) => Err(ObservationSourceError::Decode(cause.to_string())),
                    }
                }
                None => Ok(vec![]),
            }
        }
    }

    #[fixture]
    fn options() -> SqlGenerationOptions {
        SqlGenerationOptions::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    fn config(metric_key: &str) -> MetricConfig {
        MetricConfig::new(metric_key, "metric", "GANGLIAN", "sheet").with_geo_code("HENAN")
    }

    #[rstest]
    #[tokio::test]
    async fn test_returns_data_when_found(options: SqlGenerationOptions) {
        let extractor = DataExtractor::new(StubSource::default().reply("HOG_PRICE", Reply::Rows(3), 0));

        let result = extractor.extract(&config("HOG_PRICE"), &options).await.unwrap();
        assert!(result.has_data());
        assert_eq!(3, result.data().len());
        assert_eq!(None, result.sql());
        assert_eq!("found 3 observations", result.message());
    }

    #[rstest]
    #[tokio::test]
    async fn test_query_carries_config_and_limit(options: SqlGenerationOptions) {
        let extractor = DataExtractor::new(StubSource::default())
            .with_query_limit(50)
            .with_request_timeout(Duration::from_secs(5));

        extractor.extract(&config("HOG_PRICE"), &options).await.unwrap();

        let seen = extractor.source().seen.lock().await;
        assert_eq!(1, seen.len());
        assert_eq!("GANGLIAN", seen[0].source_code);
        assert_eq!(Some("HENAN".to_string()), seen[0].geo_code);
        assert_eq!(options.start_date, seen[0].start_date);
        assert_eq!(options.end_date, seen[0].end_date);
        assert_eq!(Some(50), seen[0].limit);
        assert_eq!(Some(Duration::from_secs(5)), seen[0].timeout);
    }

    #[rstest]
    #[tokio::test]
    async fn test_empty_result_falls_back(options: SqlGenerationOptions) {
        let extractor = DataExtractor::new(StubSource::default());

        let result = extractor.extract(&config("HOG_PRICE"), &options).await.unwrap();
        assert!(!result.has_data());
        assert!(result.data().is_empty());
        let sql = result.sql().unwrap();
        assert!(sql.contains("HOG_PRICE"));
        assert!(sql.contains("INSERT INTO fact_observation ("));
        assert_eq!("no observations found, generated INSERT SQL", result.message());
        assert!(matches!(
            result,
            ExtractionResult::Fallback { reason: FallbackReason::NoData, .. }
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_query_failure_falls_back(options: SqlGenerationOptions) {
        let extractor = DataExtractor::new(
            StubSource::default().reply("HOG_PRICE", Reply::Fail("connection reset"), 0),
        );

        let result = extractor.extract(&config("HOG_PRICE"), &options).await.unwrap();
        assert!(!result.has_data());
        assert!(result.message().starts_with("query failed: "));
        assert!(result.message().contains("connection reset"));
        let sql = result.sql().unwrap();
        assert!(sql.contains("INSERT INTO fact_observation ("));
        assert!(sql.contains("INSERT INTO fact_observation_tag"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_invalid_options_skip_query(options: SqlGenerationOptions) {
        let extractor = DataExtractor::new(StubSource::default());
        let options = options.with_sample_count(0);

        let result = extractor.extract(&config("HOG_PRICE"), &options).await;
        assert!(matches!(
            result,
            Err(ExtractError::Generation(SqlGeneratorError::ZeroSampleCount))
        ));
        assert!(extractor.source().seen.lock().await.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures(options: SqlGenerationOptions) {
        let source = StubSource::default()
            .reply("SLOW_PRICE", Reply::Rows(2), 50)
            .reply("BROKEN_RATIO", Reply::Fail("timeout"), 0)
            .reply("FAST_WEIGHT", Reply::Rows(1), 0);
        let extractor = DataExtractor::new(source);
        let configs = vec![
            config("SLOW_PRICE"),
            config("BROKEN_RATIO"),
            config("EMPTY_SPREAD"),
            config("FAST_WEIGHT"),
        ];

        let results = extractor.extract_batch(&configs, &options).await;
        assert_eq!(4, results.len());

        let results: Vec<ExtractionResult> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(2, results[0].data().len());
        assert!(results[1].message().contains("timeout"));
        assert!(results[1].sql().unwrap().contains("BROKEN_RATIO"));
        assert!(results[2].sql().unwrap().contains("EMPTY_SPREAD"));
        assert_eq!(1, results[3].data().len());
        assert_eq!(4, extractor.source().seen.lock().await.len());
    }
}
