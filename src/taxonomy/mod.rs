//! Metric taxonomy resolver.
//!
//! The taxonomy is an externally governed, read-only catalog mapping metric
//! names to default units and histogram buckets. The resolver loads it once
//! per instance, memoizes it, and degrades gracefully on any miss or load
//! failure: telemetry emission must never be fatal, and taxonomy drift (call
//! sites racing ahead of the catalog) is expected during development.

use crate::metrics::histogram::DURATION_MS_BUCKETS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::OnceCell;

/// Default bucket boundaries for payload-size histograms, in bytes.
pub const SIZE_BYTES_BUCKETS: &[f64] = &[
    100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0,
];

/// Measurement unit attached to exported events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Dimensionless count (the generic fallback).
    #[serde(rename = "count")]
    Count,
    /// Milliseconds.
    #[serde(rename = "ms")]
    Milliseconds,
    /// Bytes.
    #[serde(rename = "bytes")]
    Bytes,
    /// Percentage, 0-100.
    #[serde(rename = "percent")]
    Percent,
    /// Seconds.
    #[serde(rename = "s")]
    Seconds,
}

impl Unit {
    /// Wire-format string for this unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Count => "count",
            Unit::Milliseconds => "ms",
            Unit::Bytes => "bytes",
            Unit::Percent => "percent",
            Unit::Seconds => "s",
        }
    }
}

/// One read-only catalog entry. The resolver never mutates these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    /// Unit reported for the metric.
    pub unit: Unit,
    /// Metric-specific default histogram buckets, if any.
    #[serde(default)]
    pub default_buckets: Option<Vec<f64>>,
}

type Catalog = HashMap<String, TaxonomyEntry>;

static BUILTIN_CATALOG: once_cell::sync::Lazy<Catalog> =
    once_cell::sync::Lazy::new(builtin_catalog);

/// Catalog entries shipped with the crate for the standard HTTP metrics.
fn builtin_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.insert(
        "http_requests_total".to_string(),
        TaxonomyEntry {
            unit: Unit::Count,
            default_buckets: None,
        },
    );
    catalog.insert(
        "http_request_duration_seconds".to_string(),
        TaxonomyEntry {
            unit: Unit::Seconds,
            default_buckets: Some(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
        },
    );
    catalog.insert(
        "http_request_size_bytes".to_string(),
        TaxonomyEntry {
            unit: Unit::Bytes,
            default_buckets: Some(SIZE_BYTES_BUCKETS.to_vec()),
        },
    );
    catalog.insert(
        "http_response_size_bytes".to_string(),
        TaxonomyEntry {
            unit: Unit::Bytes,
            default_buckets: Some(SIZE_BYTES_BUCKETS.to_vec()),
        },
    );
    catalog.insert(
        "http_active_requests".to_string(),
        TaxonomyEntry {
            unit: Unit::Count,
            default_buckets: None,
        },
    );
    catalog
}

/// Resolves default units and buckets from the taxonomy catalog.
///
/// The catalog file (YAML, `name -> {unit, default_buckets}`) is read once
/// on first use and merged over the built-in entries. The load is the only
/// I/O in the whole subsystem and is memoized so the hot path never touches
/// the filesystem again.
#[derive(Debug)]
pub struct TaxonomyResolver {
    path: Option<PathBuf>,
    catalog: OnceCell<Catalog>,
}

impl TaxonomyResolver {
    /// Create a resolver backed by the built-in catalog only.
    pub fn new() -> Self {
        Self {
            path: None,
            catalog: OnceCell::new(),
        }
    }

    /// Create a resolver that merges a catalog file over the built-ins.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            catalog: OnceCell::new(),
        }
    }

    async fn catalog(&self) -> &Catalog {
        self.catalog
            .get_or_init(|| async {
                let mut catalog = BUILTIN_CATALOG.clone();
                if let Some(path) = &self.path {
                    match Self::load_file(path).await {
                        Ok(loaded) => catalog.extend(loaded),
                        Err(err) => {
                            // A broken or missing catalog degrades to the
                            // built-ins; it must never take the service down.
                            tracing::warn!(
                                path = %path.display(),
                                error = %err,
                                "failed to load taxonomy catalog, using built-in defaults"
                            );
                        },
                    }
                }
                catalog
            })
            .await
    }

    async fn load_file(path: &PathBuf) -> crate::core::Result<Catalog> {
        let raw = tokio::fs::read_to_string(path).await?;
        let catalog: Catalog = serde_yaml::from_str(&raw)?;
        Ok(catalog)
    }

    /// Default unit for a metric name.
    ///
    /// Unknown names resolve to [`Unit::Count`] at `debug` severity rather
    /// than failing.
    pub async fn default_unit(&self, name: &str) -> Unit {
        match self.catalog().await.get(name) {
            Some(entry) => entry.unit,
            None => {
                tracing::debug!(metric = name, "metric not in taxonomy, defaulting unit to count");
                Unit::Count
            },
        }
    }

    /// Default histogram buckets for a metric name.
    ///
    /// The `_ms` naming convention takes precedence over catalog overrides;
    /// names with neither resolve to `None` and the histogram decides the
    /// final fallback.
    pub async fn default_buckets(&self, name: &str) -> Option<Vec<f64>> {
        if name.ends_with("_ms") {
            return Some(DURATION_MS_BUCKETS.to_vec());
        }
        self.catalog()
            .await
            .get(name)
            .and_then(|entry| entry.default_buckets.clone())
    }

    /// Synchronous peek at the catalog for a metric's buckets.
    ///
    /// The synchronous registry get-or-create path uses this so it never
    /// blocks on I/O. Before the catalog file has loaded, only the built-in
    /// entries are visible; the memoization cell is deliberately left
    /// untouched so the file still loads on first async use.
    pub fn cached_buckets(&self, name: &str) -> Option<Vec<f64>> {
        let catalog = match self.catalog.get() {
            Some(catalog) => catalog,
            None => &BUILTIN_CATALOG,
        };
        catalog
            .get(name)
            .and_then(|entry| entry.default_buckets.clone())
    }
}

impl Default for TaxonomyResolver {
    fn default() -> Self {
        Self::new()
    }
}
