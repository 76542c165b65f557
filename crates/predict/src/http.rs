//! HTTP collaborator clients.
//!
//! Each collaborator is a JSON POST endpoint. Timeouts are enforced per
//! request at the client level; callers translate a timeout into a degraded
//! (null) prediction rather than a failed run.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::collaborators::{
    ClassificationOutcome, Classifier, CollaboratorError, CustomerFeatures, EarlyWindowFeatures,
    ForecastPoint, ForecastRequest, Forecaster, SegmentAssignment, Segmenter,
};

pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, CollaboratorError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|error| CollaboratorError::Transport(error.to_string()))
}

async fn post_json<Request, Response>(
    client: &reqwest::Client,
    url: &str,
    request: &Request,
) -> Result<Response, CollaboratorError>
where
    Request: Serialize + Sync,
    Response: DeserializeOwned,
{
    let response = client.post(url).json(request).send().await.map_err(|error| {
        if error.is_timeout() {
            CollaboratorError::Timeout
        } else {
            CollaboratorError::Transport(error.to_string())
        }
    })?;

    let response = response
        .error_for_status()
        .map_err(|error| CollaboratorError::Transport(error.to_string()))?;

    response
        .json::<Response>()
        .await
        .map_err(|error| CollaboratorError::Contract(error.to_string()))
}

pub struct HttpForecaster {
    client: reqwest::Client,
    url: String,
}

impl HttpForecaster {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl Forecaster for HttpForecaster {
    async fn forecast(
        &self,
        request: ForecastRequest,
    ) -> Result<Vec<ForecastPoint>, CollaboratorError> {
        let horizon = request.horizon_days as usize;
        let points: Vec<ForecastPoint> = post_json(&self.client, &self.url, &request).await?;
        if points.len() != horizon {
            return Err(CollaboratorError::Contract(format!(
                "expected {horizon} forecast points, got {}",
                points.len()
            )));
        }
        Ok(points)
    }
}

pub struct HttpSegmenter {
    client: reqwest::Client,
    url: String,
}

impl HttpSegmenter {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl Segmenter for HttpSegmenter {
    async fn assign_segments(
        &self,
        customers: Vec<CustomerFeatures>,
    ) -> Result<Vec<SegmentAssignment>, CollaboratorError> {
        post_json(&self.client, &self.url, &customers).await
    }
}

pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        products: Vec<EarlyWindowFeatures>,
    ) -> Result<Vec<ClassificationOutcome>, CollaboratorError> {
        post_json(&self.client, &self.url, &products).await
    }
}

#[cfg(test)]
mod tests {
    use crate::collaborators::{CollaboratorError, ForecastRequest, Forecaster};

    use super::{build_client, HttpForecaster};

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let client = build_client(1).expect("client");
        // A reserved TEST-NET address: connection refused or unroutable.
        let forecaster = HttpForecaster::new(client, "http://192.0.2.1:9/forecast");

        let error = forecaster
            .forecast(ForecastRequest { series: Vec::new(), horizon_days: 1 })
            .await
            .expect_err("unreachable endpoint must fail");
        assert!(matches!(
            error,
            CollaboratorError::Transport(_) | CollaboratorError::Timeout
        ));
    }
}
