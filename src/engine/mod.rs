//! # Congestion Engine
//!
//! Request-handling layer over the analysis functions.
//!
//! ## Architecture
//!
//! The engine is composed of focused modules:
//! - `ResultCache` - LRU + TTL cache of computed reports
//! - `hashing` - canonical SHA-256 request keys
//!
//! Every request is hashed after its parameters are normalized (step
//! clamping, segment selection), so equivalent requests share a cache entry.

pub mod hashing;
pub mod result_cache;

pub use result_cache::ResultCache;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::density::{DensityConfig, DensityReport, DensitySegment, analyze_density};
use crate::{
    AnalysisConfig, AnalysisReport, OverlapSegment, PaceTable, Result, SegmentSelection,
    StartTimes, analyze_overlaps, filter_overlap_segments,
};

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum cached reports per request kind. Default: 64
    pub cache_capacity: usize,
    /// Seconds a cached report stays valid. Default: 600
    pub cache_ttl_secs: u64,
    /// Overlap requests with a finer step are clamped to this. Default: 0.03
    pub min_step_km: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 64,
            cache_ttl_secs: 600,
            min_step_km: 0.03,
        }
    }
}

/// An overlap analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapRequest {
    pub pace: PaceTable,
    pub segments: Vec<OverlapSegment>,
    pub start_times: StartTimes,
    #[serde(default)]
    pub config: AnalysisConfig,
    /// Optional subset of segments to analyze
    #[serde(default)]
    pub selections: Vec<SegmentSelection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapResponse {
    pub report: AnalysisReport,
    pub requested_step_km: f64,
    pub effective_step_km: f64,
    pub warnings: Vec<String>,
    pub request_utc: DateTime<Utc>,
    pub response_utc: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub cache_hit: bool,
}

impl OverlapResponse {
    /// Warnings and timing banner followed by the report text.
    pub fn text(&self) -> String {
        let mut lines = self.warnings.clone();
        lines.push(format!("Request received (UTC): {}", self.request_utc.to_rfc3339()));
        lines.push(format!(
            "Execution time: {:.3} seconds",
            self.elapsed_ms as f64 / 1000.0
        ));
        lines.push(format!("Results returned (UTC): {}", self.response_utc.to_rfc3339()));
        lines.push(String::new());
        lines.join("\n") + "\n" + &self.report.report_text
    }
}

/// A density request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityRequest {
    pub pace: PaceTable,
    pub segments: Vec<DensitySegment>,
    pub start_times: StartTimes,
    #[serde(default)]
    pub config: DensityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityResponse {
    pub report: DensityReport,
    pub request_utc: DateTime<Utc>,
    pub response_utc: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub cache_hit: bool,
}

/// Serves analysis requests through owned result caches.
pub struct CongestionEngine {
    config: EngineConfig,
    overlap_cache: ResultCache<AnalysisReport>,
    density_cache: ResultCache<DensityReport>,
}

impl Default for CongestionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CongestionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            overlap_cache: ResultCache::new(config.cache_capacity, ttl),
            density_cache: ResultCache::new(config.cache_capacity, ttl),
            config,
        }
    }

    /// Use caller-provided caches (e.g. shared sizing or short TTLs in tests).
    pub fn with_caches(
        config: EngineConfig,
        overlap_cache: ResultCache<AnalysisReport>,
        density_cache: ResultCache<DensityReport>,
    ) -> Self {
        Self {
            config,
            overlap_cache,
            density_cache,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run (or serve from cache) an overlap analysis.
    pub fn analyze(&mut self, request: &OverlapRequest) -> Result<OverlapResponse> {
        let request_utc = Utc::now();
        let started = Instant::now();

        let requested_step_km = request.config.detection.step_km;
        let mut config = request.config.clone();
        let mut warnings = Vec::new();
        if requested_step_km < self.config.min_step_km {
            warn!(
                "[Engine] Requested step {}km is below the minimum {}km, clamping",
                requested_step_km, self.config.min_step_km
            );
            warnings.push(format!(
                "Requested step_km={:.3} is below the minimum ({:.2}). Using {:.2}.",
                requested_step_km, self.config.min_step_km, self.config.min_step_km
            ));
            config.detection.step_km = self.config.min_step_km;
        }

        let segments = filter_overlap_segments(&request.segments, &request.selections)?;
        let key = hashing::canonical_json_hash(&(
            "overlaps",
            &request.pace,
            &segments,
            &request.start_times,
            &config,
        ))?;

        let (report, cache_hit) = match self.overlap_cache.get(&key) {
            Some(report) => {
                debug!("[Engine] Overlap cache hit {}", &key[..12]);
                (report, true)
            }
            None => {
                let report = analyze_overlaps(&request.pace, &segments, &request.start_times, &config)?;
                self.overlap_cache.set(key, report.clone());
                (report, false)
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "[Engine] Overlap request: {} segments, {} records, cache_hit={}, {}ms",
            segments.len(),
            report.records.len(),
            cache_hit,
            elapsed_ms
        );

        Ok(OverlapResponse {
            report,
            requested_step_km,
            effective_step_km: config.detection.step_km,
            warnings,
            request_utc,
            response_utc: Utc::now(),
            elapsed_ms,
            cache_hit,
        })
    }

    /// Run (or serve from cache) a density analysis.
    pub fn density(&mut self, request: &DensityRequest) -> Result<DensityResponse> {
        let request_utc = Utc::now();
        let started = Instant::now();

        let key = hashing::canonical_json_hash(&("density", request))?;
        let (report, cache_hit) = match self.density_cache.get(&key) {
            Some(report) => (report, true),
            None => {
                let report = analyze_density(
                    &request.pace,
                    &request.segments,
                    &request.start_times,
                    &request.config,
                )?;
                self.density_cache.set(key, report.clone());
                (report, false)
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            "[Engine] Density request: {} segments, cache_hit={}, {}ms",
            request.segments.len(),
            cache_hit,
            elapsed_ms
        );

        Ok(DensityResponse {
            report,
            request_utc,
            response_utc: Utc::now(),
            elapsed_ms,
            cache_hit,
        })
    }

    /// Drop every cached report.
    pub fn clear_caches(&mut self) {
        self.overlap_cache.clear();
        self.density_cache.clear();
    }

    pub fn cached_reports(&self) -> usize {
        self.overlap_cache.len() + self.density_cache.len()
    }
}
