use crate::sql_generator::sample_value::MetricKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar value carried in an observation's tag payload
///
/// The backend stores tags as a JSON object. Only scalars are allowed as
/// values, nested arrays and objects are rejected at deserialization.
/// Integral floats are held as integers, so `120.0` and `120` are the same
/// tag value in dedup keys and in `tags_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawTagValue")]
pub enum TagValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTagValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl From<RawTagValue> for TagValue {
    fn from(raw: RawTagValue) -> Self {
        match raw {
            RawTagValue::Null => TagValue::Null,
            RawTagValue::Bool(b) => TagValue::Bool(b),
            RawTagValue::Number(n) => TagValue::Number(shortest_number(&n)),
            RawTagValue::String(s) => TagValue::String(s),
        }
    }
}

/// `120.0` becomes `120`; everything else is kept as is
fn shortest_number(n: &serde_json::Number) -> serde_json::Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            (f as i64).into()
        }
        _ => n.clone(),
    }
}

impl TagValue {
    /// `None` for non-finite floats, which JSON cannot represent
    pub fn from_f64(value: f64) -> Option<Self> {
        serde_json::Number::from_f64(value).map(|n| TagValue::Number(shortest_number(&n)))
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Null => write!(f, "null"),
            TagValue::Bool(b) => write!(f, "{}", b),
            TagValue::Number(n) => write!(f, "{}", shortest_number(n)),
            TagValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::String(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::String(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Number(value.into())
    }
}

/// Tag payload keyed by tag name, iterated in key order
pub type Tags = BTreeMap<String, TagValue>;

/// A metric to extract, as requested by the caller
///
/// The metric key is fixed at construction since the value kind is
/// classified from it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "MetricConfigFields")]
pub struct MetricConfig {
    metric_key: String,
    pub metric_name: String,
    pub source_code: String,
    pub sheet_name: String,
    pub unit: Option<String>,
    pub geo_code: Option<String>,
    pub tags: Tags,
    kind: MetricKind,
}

impl MetricConfig {
    pub fn new(
        metric_key: impl Into<String>,
        metric_name: impl Into<String>,
        source_code: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        let metric_key = metric_key.into();
        let kind = MetricKind::classify(&metric_key);
        Self {
            metric_key,
            metric_name: metric_name.into(),
            source_code: source_code.into(),
            sheet_name: sheet_name.into(),
            unit: None,
            geo_code: None,
            tags: Tags::new(),
            kind,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_geo_code(mut self, geo_code: impl Into<String>) -> Self {
        self.geo_code = Some(geo_code.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn metric_key(&self) -> &str {
        &self.metric_key
    }

    /// Value shape of the metric, resolved from the metric key at construction
    pub fn kind(&self) -> MetricKind {
        self.kind
    }
}

#[derive(Deserialize)]
struct MetricConfigFields {
    metric_key: String,
    metric_name: String,
    source_code: String,
    sheet_name: String,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    geo_code: Option<String>,
    #[serde(default)]
    tags: Tags,
}

impl From<MetricConfigFields> for MetricConfig {
    fn from(fields: MetricConfigFields) -> Self {
        let kind = MetricKind::classify(&fields.metric_key);
        MetricConfig {
            metric_key: fields.metric_key,
            metric_name: fields.metric_name,
            source_code: fields.source_code,
            sheet_name: fields.sheet_name,
            unit: fields.unit,
            geo_code: fields.geo_code,
            tags: fields.tags,
            kind,
        }
    }
}

pub const DEFAULT_SAMPLE_COUNT: u32 = 10;
pub const DEFAULT_BATCH_ID: u64 = 1;

/// Inclusive date window and sampling parameters for SQL generation
#[derive(Debug, Clone, PartialEq)]
pub struct SqlGenerationOptions {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sample_count: u32,
    pub batch_id: u64,
}

impl SqlGenerationOptions {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            sample_count: DEFAULT_SAMPLE_COUNT,
            batch_id: DEFAULT_BATCH_ID,
        }
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_batch_id(mut self, batch_id: u64) -> Self {
        self.batch_id = batch_id;
        self
    }
}

/// An observation as returned by the observation query endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub metric_name: String,
    pub obs_date: Option<NaiveDate>,
    pub period_type: Option<String>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub value: Option<f64>,
    pub raw_value: Option<String>,
    pub geo_code: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    pub unit: Option<String>,
}

/// Why an extraction produced SQL instead of data
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    NoData,
    QueryFailed(String),
}

/// Outcome of a single extraction
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    /// Observations were found; never constructed with an empty vec
    Data {
        observations: Vec<Observation>,
        message: String,
    },
    Fallback {
        sql: String,
        reason: FallbackReason,
        message: String,
    },
}

impl ExtractionResult {
    pub fn has_data(&self) -> bool {
        matches!(self, ExtractionResult::Data { .. })
    }

    pub fn data(&self) -> &[Observation] {
        match self {
            ExtractionResult::Data { observations, .. } => observations,
            ExtractionResult::Fallback { .. } => &[],
        }
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            ExtractionResult::Data { .. } => None,
            ExtractionResult::Fallback { sql, .. } => Some(sql),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ExtractionResult::Data { message, .. } | ExtractionResult::Fallback { message, .. } => {
                message
            }
        }
    }
}
