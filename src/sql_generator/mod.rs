pub mod dedup_key;
pub mod sample_value;

use crate::model::{MetricConfig, SqlGenerationOptions};
use chrono::{Days, NaiveDate};
use dedup_key::{build_dedup_key, NATION_GEO_CODE};
use log::debug;
use rand::Rng;
use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use std::fmt;
use thiserror::Error;

pub const OBSERVATION_COLUMNS: [&str; 8] = [
    "batch_id",
    "metric_id",
    "obs_date",
    "value",
    "geo_id",
    "tags_json",
    "dedup_key",
    "created_at",
];

#[derive(Error, Debug)]
pub enum SqlGeneratorError {
    #[error("Sample count must be at least 1")]
    ZeroSampleCount,

    #[error("Invalid date range: end date {end} is before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Tag encoding error: {0}")]
    TagEncoding(#[from] serde_json::Error),

    #[error("Generated SQL is malformed: {0}")]
    Malformed(String),
}

/// Synthetic insert script for one metric
#[derive(Debug, Clone)]
pub struct InsertScript {
    header: String,
    /// Multi-row `INSERT INTO fact_observation` statement
    pub observation_insert: String,
    /// `INSERT INTO fact_observation_tag ... SELECT` back-fill statement
    pub tag_backfill: String,
    /// Observation date of each generated row, in row order
    pub dates: Vec<NaiveDate>,
}

impl fmt::Display for InsertScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n\n{}\n\n-- Populate the tag table from tags_json\n{}\n",
            self.header, self.observation_insert, self.tag_backfill
        )
    }
}

/// Rejects options that would yield an empty or inverted window
pub fn validate_options(options: &SqlGenerationOptions) -> Result<(), SqlGeneratorError> {
    if options.sample_count == 0 {
        return Err(SqlGeneratorError::ZeroSampleCount);
    }
    if options.end_date < options.start_date {
        return Err(SqlGeneratorError::InvalidRange {
            start: options.start_date,
            end: options.end_date,
        });
    }
    Ok(())
}

/// Dates sampled from the window at an even stride.
///
/// The stride is `max(1, days / sample_count)`. Sampling stops at the first
/// date past the end, so narrow windows yield fewer than `sample_count` dates.
pub fn sample_dates(options: &SqlGenerationOptions) -> Result<Vec<NaiveDate>, SqlGeneratorError> {
    validate_options(options)?;

    let days = (options.end_date - options.start_date).num_days() as u64;
    let step = (days / u64::from(options.sample_count)).max(1);

    let kept = (days / step + 1).min(u64::from(options.sample_count));
    let mut dates = Vec::with_capacity(kept as usize);
    for i in 0..kept {
        match options.start_date.checked_add_days(Days::new(i * step)) {
            Some(date) if date <= options.end_date => dates.push(date),
            _ => break,
        }
    }
    Ok(dates)
}

/// Renders a string literal, escaping quotes and backslashes
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

fn metric_id_subquery(metric_key: &str) -> String {
    format!(
        "(SELECT id FROM dim_metric WHERE metric_key = {} LIMIT 1)",
        quote(metric_key)
    )
}

/// Builds the insert script for `config` over the window in `options`.
///
/// Metric and geography ids are resolved by sub-queries when the script
/// runs. Each row carries `SHA1` of its dedup key as the uniqueness handle.
pub fn render_script<R: Rng + ?Sized>(
    config: &MetricConfig,
    options: &SqlGenerationOptions,
    rng: &mut R,
) -> Result<InsertScript, SqlGeneratorError> {
    let dates = sample_dates(options)?;
    let tags_json = serde_json::to_string(&config.tags)?;
    let geo_id = match &config.geo_code {
        Some(geo_code) => format!(
            "(SELECT id FROM dim_geo WHERE province = {} LIMIT 1)",
            quote(geo_code)
        ),
        None => "NULL".to_string(),
    };
    let dedup_geo = config.geo_code.as_deref().unwrap_or(NATION_GEO_CODE);
    let metric_id = metric_id_subquery(config.metric_key());

    let rows: Vec<String> = dates
        .iter()
        .enumerate()
        .map(|(index, date)| {
            let date = date.format("%Y-%m-%d").to_string();
            let value = config.kind().sample(index, &mut *rng);
            let dedup_key = build_dedup_key(
                &config.source_code,
                &config.sheet_name,
                config.metric_key(),
                dedup_geo,
                &date,
                &config.tags,
            );
            format!(
                "({}, {}, {}, {}, {}, {}, SHA1({}), NOW())",
                options.batch_id,
                metric_id,
                quote(&date),
                value,
                geo_id,
                quote(&tags_json),
                quote(&dedup_key)
            )
        })
        .collect();

    let observation_insert = format!(
        "INSERT INTO fact_observation ({})\nVALUES\n{};",
        OBSERVATION_COLUMNS.join(", "),
        rows.join(",\n")
    );
    check_insert(&observation_insert)?;

    let start = quote(&options.start_date.to_string());
    let end = quote(&options.end_date.to_string());
    let tag_backfill = format!(
        "INSERT INTO fact_observation_tag (observation_id, tag_key, tag_value)
SELECT fo.id, jt.tag_key,
  JSON_UNQUOTE(JSON_EXTRACT(fo.tags_json, CONCAT('$.\"', jt.tag_key, '\"')))
FROM fact_observation fo
CROSS JOIN JSON_TABLE(
  JSON_KEYS(fo.tags_json),
  '$[*]' COLUMNS (tag_key VARCHAR(64) PATH '$')
) AS jt
WHERE fo.metric_id = {metric_id}
  AND fo.obs_date >= {start}
  AND fo.obs_date <= {end}
  AND NOT EXISTS (
    SELECT 1 FROM fact_observation_tag fot
    WHERE fot.observation_id = fo.id AND fot.tag_key = jt.tag_key
  );"
    );

    let header = format!(
        "-- {} sample data\n-- Source: {}\n-- Sheet: {}\n-- Metric: {}\n-- Date range: {} to {}\n-- Unit: {}",
        config.metric_name,
        config.source_code,
        config.sheet_name,
        config.metric_key(),
        options.start_date,
        options.end_date,
        config.unit.as_deref().unwrap_or("N/A")
    );

    debug!(
        "Generated {} rows for metric {} ({:?})",
        dates.len(),
        config.metric_key(),
        config.kind()
    );

    Ok(InsertScript {
        header,
        observation_insert,
        tag_backfill,
        dates,
    })
}

/// The insert must parse as exactly one `INSERT` statement
fn check_insert(sql: &str) -> Result<(), SqlGeneratorError> {
    let statements = Parser::parse_sql(&MySqlDialect {}, sql)
        .map_err(|e| SqlGeneratorError::Malformed(e.to_string()))?;
    match statements.as_slice() {
        [Statement::Insert(_)] => Ok(()),
        _ => Err(SqlGeneratorError::Malformed(format!(
            "expected a single INSERT statement, got {} statements",
            statements.len()
        ))),
    }
}

/// Generates the full insert script for one metric
pub fn generate_insert_sql(
    config: &MetricConfig,
    options: &SqlGenerationOptions,
) -> Result<String, SqlGeneratorError> {
    let script = render_script(config, options, &mut rand::thread_rng())?;
    Ok(script.to_string())
}

/// Generates one script per config, separated by a blank line
pub fn generate_batch_sql(
    configs: &[MetricConfig],
    options: &SqlGenerationOptions,
) -> Result<String, SqlGeneratorError> {
    let scripts = configs
        .iter()
        .map(|config| generate_insert_sql(config, options))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(scripts.join("\n\n"))
}
