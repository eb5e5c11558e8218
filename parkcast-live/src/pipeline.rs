//! Refresh cycle
//!
//! One cycle: fetch occupancy and weather concurrently through their
//! coordinators, derive the time context once, then assemble and score
//! each lot. Failures never abort the batch; a lot that cannot be scored
//! is marked and the rest proceed. A cancelled cycle is discarded whole.

use crate::error::{CycleCancelled, PipelineWarning};
use crate::fallback::{DynSource, FallbackCoordinator, Resolution};
use crate::features::FeatureAssembler;
use crate::scoring::{load_predictor, Predictor, PredictorDescriptor, ScoringGateway};
use crate::sources::{
    CachedSource, HtmlTableSource, HttpFetcher, JsonEndpointSource, OpenMeteoSource,
    StaticFileSource, WeatherPageSource,
};
use crate::summary::{summarize, Summary};
use anyhow::Context;
use chrono::NaiveDateTime;
use parkcast_common::config::ParkcastConfig;
use parkcast_common::{
    normalize_name, HolidayCalendar, MetadataTable, OccupancyRecords, TimeContext, WeatherSnapshot,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-lot outcome of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Scored,
    /// Capacity 0, never scored
    Excluded,
    /// Predictor faulted for this lot
    Errored,
    /// No predictor loaded
    Unscored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRow {
    pub entity: String,
    pub district: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub capacity: u32,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub free_spots: Option<u32>,
    /// Live occupancy ratio
    pub live_occupancy: Option<f64>,
    /// Predicted occupancy ratio
    pub predicted_occupancy: Option<f64>,
    pub clamped: bool,
    pub status: EntityStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub instant: NaiveDateTime,
    pub time: TimeContext,
    pub occupancy_source: Option<String>,
    pub weather_source: Option<String>,
    pub weather: WeatherSnapshot,
    pub predictor: Option<String>,
    pub rows: Vec<EntityRow>,
    pub summary: Summary,
    pub warnings: Vec<PipelineWarning>,
}

/// Fetched inputs, reusable across several instants
#[derive(Debug, Clone)]
pub struct FetchedInputs {
    pub occupancy: Resolution<OccupancyRecords>,
    pub weather: Resolution<WeatherSnapshot>,
}

impl FetchedInputs {
    /// Warnings raised while fetching
    pub fn warnings(&self) -> Vec<PipelineWarning> {
        let mut out = Vec::new();
        for (category, failures, defaulted) in [
            ("occupancy", &self.occupancy.failures, self.occupancy.defaulted),
            ("weather", &self.weather.failures, self.weather.defaulted),
        ] {
            if defaulted {
                out.push(PipelineWarning::DefaultedFallback {
                    category: category.to_string(),
                    failures: failures.clone(),
                });
            } else {
                out.extend(failures.iter().cloned().map(PipelineWarning::SourceFailed));
            }
        }
        out
    }
}

/// Rows of one instant before they are wrapped into a report
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub time: TimeContext,
    pub rows: Vec<EntityRow>,
    pub warnings: Vec<PipelineWarning>,
}

pub struct RefreshCycle {
    occupancy: FallbackCoordinator<OccupancyRecords>,
    weather: FallbackCoordinator<WeatherSnapshot>,
    metadata: Arc<MetadataTable>,
    calendar: HolidayCalendar,
    assembler: FeatureAssembler,
    predictor: Option<Arc<dyn Predictor>>,
}

impl RefreshCycle {
    pub fn new(
        occupancy: FallbackCoordinator<OccupancyRecords>,
        weather: FallbackCoordinator<WeatherSnapshot>,
        metadata: Arc<MetadataTable>,
        calendar: HolidayCalendar,
        assembler: FeatureAssembler,
        predictor: Option<Arc<dyn Predictor>>,
    ) -> Self {
        Self {
            occupancy,
            weather,
            metadata,
            calendar,
            assembler,
            predictor,
        }
    }

    /// Wire sources, metadata and predictor from configuration
    ///
    /// Occupancy: JSON → HTML table → static file. Weather: API → page.
    /// Network sources sit behind a TTL cache. A missing metadata table or
    /// predictor artifact degrades with a warning.
    pub fn from_config(config: &ParkcastConfig) -> anyhow::Result<Self> {
        let src = &config.sources;
        let http = HttpFetcher::new(Duration::from_secs(src.timeout_secs), &src.user_agent)
            .context("Failed to build HTTP client")?;
        let ttl = Duration::from_secs(src.cache_ttl_secs);

        let mut occupancy: Vec<DynSource<OccupancyRecords>> = Vec::new();
        if let Some(url) = &src.json_url {
            occupancy.push(Arc::new(CachedSource::new(
                JsonEndpointSource::new(url.as_str(), http.clone()),
                ttl,
            )));
        }
        if let Some(url) = &src.html_url {
            occupancy.push(Arc::new(CachedSource::new(
                HtmlTableSource::new(url.as_str(), http.clone()),
                ttl,
            )));
        }
        if let Some(path) = &src.static_file {
            occupancy.push(Arc::new(StaticFileSource::new(path.clone())));
        }

        let w = &config.weather;
        let mut weather: Vec<DynSource<WeatherSnapshot>> = Vec::new();
        if let Some(url) = &w.api_url {
            weather.push(Arc::new(CachedSource::new(
                OpenMeteoSource::new(url.as_str(), w.latitude, w.longitude, w.timezone.as_str(), http.clone()),
                ttl,
            )));
        }
        if let Some(url) = &w.page_url {
            weather.push(Arc::new(CachedSource::new(
                WeatherPageSource::new(url.as_str(), http.clone()),
                ttl,
            )));
        }

        let metadata = match MetadataTable::load_csv(&config.paths.metadata) {
            Ok(table) => table,
            Err(e) => {
                warn!(
                    path = %config.paths.metadata.display(),
                    error = %e,
                    "Metadata table unavailable, every lot will use sentinels"
                );
                MetadataTable::default()
            }
        };

        Ok(Self::new(
            FallbackCoordinator::new("occupancy", occupancy, OccupancyRecords::default()),
            FallbackCoordinator::new("weather", weather, config.defaults.weather()),
            Arc::new(metadata),
            HolidayCalendar::saxony().with_extra_dates(config.extra_holidays.iter().copied()),
            FeatureAssembler::new(config.events),
            load_predictor(&config.paths.model),
        ))
    }

    pub fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    pub fn predictor_name(&self) -> Option<&str> {
        self.predictor.as_ref().map(|p| p.name())
    }

    pub fn source_ids(&self) -> (Vec<String>, Vec<String>) {
        (self.occupancy.source_ids(), self.weather.source_ids())
    }

    /// Resolve the predictor's declared capabilities; call once per cycle
    pub fn gateway(&self) -> Option<ScoringGateway> {
        let descriptor = PredictorDescriptor::resolve(self.predictor.clone()?);
        debug!(
            predictor = descriptor.name(),
            scale = ?descriptor.scale(),
            declared_features = descriptor.feature_order().map(<[String]>::len),
            "Predictor resolved"
        );
        Some(ScoringGateway::new(descriptor))
    }

    /// Run a complete cycle for `at`
    pub async fn run(
        &self,
        at: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, CycleCancelled> {
        let cycle_id = Uuid::new_v4();
        info!(%cycle_id, %at, "Refresh cycle started");

        let inputs = self.fetch(cancel).await?;
        let gateway = self.gateway();
        let evaluation = self.evaluate(&inputs, gateway.as_ref(), at, None, cancel)?;

        let mut warnings = inputs.warnings();
        warnings.extend(evaluation.warnings);
        let summary = summarize(&evaluation.rows);

        info!(
            %cycle_id,
            lots = evaluation.rows.len(),
            warnings = warnings.len(),
            "Refresh cycle finished"
        );

        Ok(CycleReport {
            cycle_id,
            instant: at,
            time: evaluation.time,
            occupancy_source: inputs.occupancy.source,
            weather_source: inputs.weather.source,
            weather: inputs.weather.value,
            predictor: self.predictor_name().map(str::to_string),
            rows: evaluation.rows,
            summary,
            warnings,
        })
    }

    /// Resolve occupancy and weather concurrently
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<FetchedInputs, CycleCancelled> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Refresh cycle cancelled while fetching");
                Err(CycleCancelled)
            }
            (occupancy, weather) = async { tokio::join!(self.occupancy.resolve(), self.weather.resolve()) } => {
                Ok(FetchedInputs { occupancy, weather })
            }
        }
    }

    /// Assemble and score every lot (or only `lot`) for `at`
    ///
    /// Without a gateway every scorable lot stays `Unscored`.
    pub fn evaluate(
        &self,
        inputs: &FetchedInputs,
        gateway: Option<&ScoringGateway>,
        at: NaiveDateTime,
        lot: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Evaluation, CycleCancelled> {
        let time = TimeContext::from_instant(at, &self.calendar);
        let live = &inputs.occupancy.value;
        let weather = &inputs.weather.value;

        let feature_order = gateway.and_then(|g| g.descriptor().feature_order());

        let mut warnings = Vec::new();
        if gateway.is_none() {
            warnings.push(PipelineWarning::NoPredictor);
        }

        let wanted = lot.map(normalize_name);
        let mut rows = Vec::new();
        for entity in entities(&self.metadata, live) {
            if wanted.as_ref().is_some_and(|w| *w != normalize_name(&entity)) {
                continue;
            }
            if cancel.is_cancelled() {
                info!("Refresh cycle cancelled while scoring");
                return Err(CycleCancelled);
            }

            let assembled =
                self.assembler
                    .assemble(&entity, live, weather, &time, &self.metadata, feature_order);
            warnings.extend(assembled.warnings.iter().cloned());

            let mut row = EntityRow {
                entity: assembled.vector.entity.clone(),
                district: assembled.metadata.district.clone(),
                kind: assembled.metadata.kind.clone(),
                capacity: assembled.capacity,
                lat: assembled.metadata.lat,
                lon: assembled.metadata.lon,
                free_spots: assembled.free_spots,
                live_occupancy: assembled.live_ratio,
                predicted_occupancy: None,
                clamped: false,
                status: EntityStatus::Unscored,
            };

            if assembled.capacity == 0 {
                debug!(lot = %entity, "Capacity 0, excluded from scoring");
                row.status = EntityStatus::Excluded;
            } else if let Some(gateway) = gateway {
                match gateway.score(&assembled.vector) {
                    Ok(estimate) => {
                        row.predicted_occupancy = Some(estimate.ratio);
                        row.clamped = estimate.clamped;
                        row.status = EntityStatus::Scored;
                    }
                    Err(failure) => {
                        row.status = EntityStatus::Errored;
                        warnings.push(PipelineWarning::ScoringFailure(failure));
                    }
                }
            }
            rows.push(row);
        }

        Ok(Evaluation { time, rows, warnings })
    }
}

/// Metadata rows in table order, then lots only the live source knows
fn entities(metadata: &MetadataTable, live: &OccupancyRecords) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(metadata.len());
    for row in metadata.iter() {
        if seen.insert(normalize_name(&row.name)) {
            out.push(row.name.clone());
        }
    }
    for obs in live.iter() {
        if seen.insert(normalize_name(&obs.name)) {
            out.push(obs.name.clone());
        }
    }
    out
}
