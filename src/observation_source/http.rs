use crate::config::ApiConfig;
use crate::model::Observation;
use crate::observation_source::{ObservationQuery, ObservationSource, ObservationSourceError};
use crate::session::Session;
use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use std::time::Duration;

const QUERY_PATH: &str = "/v1/observation/query";

/// Observation source backed by the dashboard REST API
pub struct HttpObservationSource {
    client: Client,
    base_url: String,
    session: Session,
}

impl HttpObservationSource {
    pub fn new(config: &ApiConfig, session: Session) -> Result<Self, ObservationSourceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(HttpObservationSource {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl ObservationSource for HttpObservationSource {
    async fn query_observations(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<Observation>, ObservationSourceError> {
        let url = format!("{}{}", self.base_url, QUERY_PATH);
        debug!("GET {} {:?}", url, query);

        let mut request = self.client.get(&url).query(query);
        if let Some(timeout) = query.timeout {
            request = request.timeout(timeout);
        }
        if let Some(token) = self.session.token().await {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("GET {} failed: {}", url, e);
            e
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("GET {} rejected with 401, clearing session token", url);
            self.session.clear().await;
            return Err(ObservationSourceError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("GET {} responded {}: {}", url, status, body);
            return Err(ObservationSourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let observations: Vec<Observation> = response
            .json()
            .await
            .map_err(|e| ObservationSourceError::Decode(e.to_string()))?;
        debug!("GET {} returned {} observations", url, observations.len());
        Ok(observations)
    }
}
