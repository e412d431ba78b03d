//! One feed cycle: fetch, decode, validate, publish.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::fetch::{BasicClient, FetchOutcome, HttpClient, RetryPolicy, fetch_with_retry};
use crate::output::VehicleSink;
use crate::parser::{normalize, parse_feed};
use crate::stats::CycleStats;
use crate::validate::{Classifier, validate};

pub struct Pipeline<C> {
    client: C,
    config: PipelineConfig,
    policy: RetryPolicy,
    classifier: Classifier,
}

impl Pipeline<BasicClient> {
    /// Builds a pipeline over a [`BasicClient`] configured from `config`.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let client = BasicClient::new(config.timeout(), &config.user_agent)
            .context("building HTTP client")?;
        Self::new(client, config)
    }
}

impl<C: HttpClient> Pipeline<C> {
    pub fn new(client: C, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            policy: config.retry_policy(),
            classifier: config.classifier(),
            config,
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Runs one cycle against the configured feed URL.
    ///
    /// Never fails: fetch exhaustion, cancellation and sink errors are
    /// reported through the returned [`CycleStats`].
    #[tracing::instrument(skip_all, fields(url = %self.config.feed_url))]
    pub async fn run_cycle<S>(&self, sink: &mut S, cancel: &CancellationToken) -> CycleStats
    where
        S: VehicleSink + ?Sized,
    {
        let outcome = fetch_with_retry(&self.client, &self.config.feed_url, &self.policy, cancel).await;
        let attempts = outcome.attempts();

        let bytes = match outcome {
            FetchOutcome::Fetched { bytes, .. } => bytes,
            FetchOutcome::Exhausted { last_error, .. } => {
                warn!(attempts, error = %last_error, "No feed data this cycle");
                let mut stats = CycleStats::from_error("fetch_error", &last_error.to_string());
                stats.fetch_attempts = attempts;
                return stats;
            }
            FetchOutcome::Cancelled { .. } => {
                info!(attempts, "Fetch cancelled");
                let mut stats = CycleStats::from_error("cancelled", "fetch cancelled");
                stats.fetch_attempts = attempts;
                return stats;
            }
        };

        let mut stats = self.process(&bytes, sink).await;
        stats.fetch_attempts = attempts;
        stats
    }

    /// Decodes, validates and publishes an already-fetched feed.
    pub async fn process<S>(&self, bytes: &[u8], sink: &mut S) -> CycleStats
    where
        S: VehicleSink + ?Sized,
    {
        let mut stats = CycleStats::new();
        stats.bytes = bytes.len();

        let feed = parse_feed(bytes);
        stats = stats.with_feed(&feed);
        if let Some(error) = feed.framing_error {
            warn!(%error, entities = stats.entities, "Feed truncated, using entities decoded before the break");
        }
        if let Some(error) = feed.header_error {
            warn!(%error, "Feed header undecodable, header timestamp unavailable");
        }
        if !feed.faults.is_empty() {
            warn!(dropped = feed.faults.len(), "Dropped undecodable entities");
        }

        let records = normalize(feed);
        let (valid, rejections) = validate(records, &self.config.bounding_box);
        stats = stats.with_validation(&valid, &rejections, &self.classifier);
        debug!(
            missing = rejections.missing_coordinates,
            zero = rejections.zero_coordinates,
            out_of_bounds = rejections.out_of_bounds,
            "Validation rejections"
        );

        if valid.is_empty() {
            info!(vehicles = stats.vehicles, "No valid vehicles this cycle, nothing published");
            return stats;
        }

        match sink.publish(&valid).await {
            Ok(written) => info!(
                vehicles = stats.vehicles,
                valid = stats.valid,
                valid_pct = stats.valid_pct(),
                written,
                trams = stats.trams,
                trains = stats.trains,
                buses = stats.buses,
                "Cycle published"
            ),
            Err(e) => {
                error!(error = %e, "Sink publish failed");
                stats.error_type = Some("sink_error".to_string());
                stats.error_message = Some(format!("{e:#}"));
            }
        }

        stats
    }
}
