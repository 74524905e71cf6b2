pub mod http;

use crate::model::Observation;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub use http::HttpObservationSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Week,
    Month,
}

/// Filters for an observation query, sent as URL query parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationQuery {
    pub source_code: String,
    pub metric_key: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_type: Option<PeriodType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nation_col: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Overrides the client's request timeout for this call only
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ObservationQuery {
    pub fn new(
        source_code: impl Into<String>,
        metric_key: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            source_code: source_code.into(),
            metric_key: metric_key.into(),
            start_date,
            end_date,
            period_type: None,
            geo_code: None,
            tag_key: None,
            tag_value: None,
            indicator: None,
            nation_col: None,
            limit: None,
            offset: None,
            timeout: None,
        }
    }

    pub fn with_geo_code(mut self, geo_code: Option<String>) -> Self {
        self.geo_code = geo_code;
        self
    }

    pub fn with_period_type(mut self, period_type: PeriodType) -> Self {
        self.period_type = Some(period_type);
        self
    }

    pub fn with_tag(mut self, tag_key: impl Into<String>, tag_value: impl Into<String>) -> Self {
        self.tag_key = Some(tag_key.into());
        self.tag_value = Some(tag_value.into());
        self
    }

    /// Column filters for wide sheets stored one indicator per column
    pub fn with_indicator(mut self, indicator: impl Into<String>, nation_col: Option<String>) -> Self {
        self.indicator = Some(indicator.into());
        self.nation_col = nation_col;
        self
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Remote service answering observation queries.
///
/// An empty result is `Ok(vec![])`, never an error.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn query_observations(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<Observation>, ObservationSourceError>;
}

#[derive(Error, Debug)]
pub enum ObservationSourceError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unauthorized: session token missing or rejected")]
    Unauthorized,

    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}
