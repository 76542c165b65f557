//! Batch dispatch to the collaborators with bounded concurrency, a timeout
//! per request, and per-batch degradation: a failed or timed-out request
//! costs its keys their predictions, never the run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use retailsense_core::analytics::pipeline::PipelineRun;
use retailsense_core::config::{CollaboratorMode, CollaboratorsConfig};

use crate::collaborators::{
    Classifier, CollaboratorError, ForecastPoint, Forecaster, Segmenter,
};
use crate::features::{customer_features, early_cutoff, early_window_features, forecast_request};
use crate::http::{build_client, HttpClassifier, HttpForecaster, HttpSegmenter};
use crate::merge::{merge_classifications, merge_segments, ClassifiedProduct, SegmentedCustomer};
use crate::stub::{StubClassifier, StubForecaster, StubSegmenter};

/// Count of keys whose prediction degraded to null, per collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PredictionWarnings {
    pub forecast_failures: u64,
    pub segmentation_failures: u64,
    pub classification_failures: u64,
}

impl PredictionWarnings {
    pub fn total(&self) -> u64 {
        self.forecast_failures + self.segmentation_failures + self.classification_failures
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PredictionOutcome {
    pub products: Vec<ClassifiedProduct>,
    pub customers: Vec<SegmentedCustomer>,
    pub forecast: Vec<ForecastPoint>,
    pub warnings: PredictionWarnings,
}

pub struct PredictionRuntime {
    forecaster: Option<Arc<dyn Forecaster>>,
    segmenter: Option<Arc<dyn Segmenter>>,
    classifier: Option<Arc<dyn Classifier>>,
    batch_size: usize,
    max_concurrent_requests: usize,
    request_timeout: Duration,
    forecast_horizon_days: u32,
    early_window_days: u32,
}

impl PredictionRuntime {
    /// No collaborators: every prediction field stays null and no network
    /// I/O happens. The merge still runs so output shapes are uniform.
    pub fn disabled(config: &CollaboratorsConfig) -> Self {
        Self::with_collaborators(None, None, None, config)
    }

    pub fn stub(config: &CollaboratorsConfig) -> Self {
        Self::with_collaborators(
            Some(Arc::new(StubForecaster)),
            Some(Arc::new(StubSegmenter)),
            Some(Arc::new(StubClassifier)),
            config,
        )
    }

    pub fn http(config: &CollaboratorsConfig) -> Result<Self> {
        let client = build_client(config.timeout_secs)
            .map_err(|error| anyhow!("building collaborator http client: {error}"))?;
        let url = |key: &str, value: &Option<String>| {
            value.clone().ok_or_else(|| anyhow!("collaborators.{key} is required in http mode"))
        };

        Ok(Self::with_collaborators(
            Some(Arc::new(HttpForecaster::new(
                client.clone(),
                url("forecast_url", &config.forecast_url)?,
            ))),
            Some(Arc::new(HttpSegmenter::new(
                client.clone(),
                url("segmentation_url", &config.segmentation_url)?,
            ))),
            Some(Arc::new(HttpClassifier::new(
                client,
                url("classification_url", &config.classification_url)?,
            ))),
            config,
        ))
    }

    pub fn from_config(config: &CollaboratorsConfig) -> Result<Self> {
        match config.mode {
            CollaboratorMode::Disabled => Ok(Self::disabled(config)),
            CollaboratorMode::Stub => Ok(Self::stub(config)),
            CollaboratorMode::Http => Self::http(config),
        }
    }

    pub fn with_collaborators(
        forecaster: Option<Arc<dyn Forecaster>>,
        segmenter: Option<Arc<dyn Segmenter>>,
        classifier: Option<Arc<dyn Classifier>>,
        config: &CollaboratorsConfig,
    ) -> Self {
        Self {
            forecaster,
            segmenter,
            classifier,
            batch_size: config.batch_size.max(1),
            max_concurrent_requests: config.max_concurrent_requests.max(1),
            request_timeout: Duration::from_secs(config.timeout_secs),
            forecast_horizon_days: config.forecast_horizon_days,
            early_window_days: config.early_window_days,
        }
    }

    /// Annotates a finished run with collaborator predictions. Always
    /// returns a complete outcome: every aggregate from the run is present
    /// whether or not its prediction arrived.
    pub async fn annotate(&self, run: &PipelineRun, window_start: NaiveDate) -> PredictionOutcome {
        let mut warnings = PredictionWarnings::default();

        let forecast = match &self.forecaster {
            Some(forecaster) if !run.daily_revenue.is_empty() => {
                let request = forecast_request(&run.daily_revenue, self.forecast_horizon_days);
                let forecaster = Arc::clone(forecaster);
                match tokio::time::timeout(self.request_timeout, forecaster.forecast(request)).await
                {
                    Ok(Ok(points)) => points,
                    Ok(Err(error)) => {
                        warn!(
                            event_name = "predict.forecast.degraded",
                            run_id = %run.run_id,
                            error = %error,
                            "revenue forecast unavailable, continuing without it"
                        );
                        warnings.forecast_failures = 1;
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(
                            event_name = "predict.forecast.degraded",
                            run_id = %run.run_id,
                            error = %CollaboratorError::Timeout,
                            "revenue forecast unavailable, continuing without it"
                        );
                        warnings.forecast_failures = 1;
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };

        let assignments = match &self.segmenter {
            Some(segmenter) => {
                let features: Vec<_> = run.customers.iter().map(customer_features).collect();
                let segmenter = Arc::clone(segmenter);
                let (assignments, failed) = self
                    .dispatch_batches("segmentation", features, move |batch| {
                        let segmenter = Arc::clone(&segmenter);
                        async move { segmenter.assign_segments(batch).await }
                    })
                    .await;
                warnings.segmentation_failures = failed;
                assignments
            }
            None => Vec::new(),
        };

        let outcomes = match &self.classifier {
            Some(classifier) => {
                let cutoff = early_cutoff(window_start, self.early_window_days);
                let features = early_window_features(&run.events, cutoff);
                let classifier = Arc::clone(classifier);
                let (outcomes, failed) = self
                    .dispatch_batches("classification", features, move |batch| {
                        let classifier = Arc::clone(&classifier);
                        async move { classifier.classify(batch).await }
                    })
                    .await;
                warnings.classification_failures = failed;
                outcomes
            }
            None => Vec::new(),
        };

        PredictionOutcome {
            products: merge_classifications(run.products.clone(), &outcomes),
            customers: merge_segments(run.customers.clone(), &assignments),
            forecast,
            warnings,
        }
    }

    /// Splits `items` into batches and issues them through a semaphore with
    /// a timeout each. Returns the successful responses and the number of
    /// keys in batches that failed.
    async fn dispatch_batches<T, R, F, Fut>(
        &self,
        collaborator: &'static str,
        items: Vec<T>,
        call: F,
    ) -> (Vec<R>, u64)
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(Vec<T>) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<Vec<R>, CollaboratorError>> + Send + 'static,
    {
        if items.is_empty() {
            return (Vec::new(), 0);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let timeout = self.request_timeout;
        let mut tasks: JoinSet<(Vec<R>, u64)> = JoinSet::new();

        let mut batches: Vec<Vec<T>> = Vec::new();
        let mut items = items;
        while !items.is_empty() {
            let rest = items.split_off(items.len().min(self.batch_size));
            batches.push(items);
            items = rest;
        }

        for batch in batches {
            let semaphore = Arc::clone(&semaphore);
            let call = call.clone();
            let batch_keys = batch.len() as u64;
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (Vec::new(), batch_keys);
                };
                match tokio::time::timeout(timeout, call(batch)).await {
                    Ok(Ok(results)) => (results, 0),
                    Ok(Err(error)) => {
                        warn!(
                            event_name = "predict.batch.degraded",
                            collaborator,
                            keys = batch_keys,
                            error = %error,
                            "collaborator batch failed, predictions degrade to null"
                        );
                        (Vec::new(), batch_keys)
                    }
                    Err(_) => {
                        warn!(
                            event_name = "predict.batch.degraded",
                            collaborator,
                            keys = batch_keys,
                            error = %CollaboratorError::Timeout,
                            "collaborator batch timed out, predictions degrade to null"
                        );
                        (Vec::new(), batch_keys)
                    }
                }
            });
        }

        let mut results = Vec::new();
        let mut failed_keys = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((batch_results, batch_failed)) => {
                    results.extend(batch_results);
                    failed_keys += batch_failed;
                }
                Err(error) => {
                    warn!(
                        event_name = "predict.batch.join_failed",
                        collaborator,
                        error = %error,
                        "collaborator batch task did not complete"
                    );
                }
            }
        }

        (results, failed_keys)
    }
}
