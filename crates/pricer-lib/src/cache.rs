//! Process-lifetime model cache
//!
//! Each distinct artifact is loaded from storage at most once per process.
//! Concurrent callers for the same unresolved artifact block on a shared
//! per-descriptor slot while exactly one of them runs the loader; the
//! outcome, success or failure, is memoized until process restart. A
//! failed load is terminal: operators replace the artifact and restart
//! rather than having every request retry the I/O.

use crate::backend::PriceModel;
use crate::error::ArtifactError;
use crate::observability::ServingMetrics;
use crate::registry::ModelDescriptor;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{info, warn};

type LoadOutcome = Result<Arc<dyn PriceModel>, ArtifactError>;
type Slot = Arc<OnceLock<LoadOutcome>>;

/// Cache of loaded models keyed by artifact path.
pub struct ModelCache {
    slots: Mutex<HashMap<PathBuf, Slot>>,
    metrics: ServingMetrics,
    attempted_loads: AtomicU64,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            metrics: ServingMetrics::new(),
            attempted_loads: AtomicU64::new(0),
        }
    }

    /// Fetch the cached model for `descriptor`, running `load` if this is
    /// the first request for its artifact.
    ///
    /// Blocks while another caller is loading the same artifact; loads of
    /// different artifacts proceed independently. May block on disk
    /// latency, so callers must tolerate a blocking call.
    pub fn get_or_load<F>(&self, descriptor: &ModelDescriptor, load: F) -> LoadOutcome
    where
        F: FnOnce() -> LoadOutcome,
    {
        let slot = {
            let mut slots = self.slots.lock().expect("cache mutex poisoned");
            slots
                .entry(descriptor.artifact_path.clone())
                .or_default()
                .clone()
        };

        slot.get_or_init(|| {
            self.attempted_loads.fetch_add(1, Ordering::Relaxed);
            self.metrics.inc_model_loads();
            info!(
                model = %descriptor.logical_name,
                path = %descriptor.artifact_path.display(),
                format = descriptor.artifact_format.as_str(),
                "loading model artifact"
            );
            let outcome = load();
            if let Err(error) = &outcome {
                warn!(
                    model = %descriptor.logical_name,
                    error = %error,
                    "model load failed; failure cached until restart"
                );
            }
            outcome
        })
        .clone()
    }

    /// Number of loader executions since process start.
    pub fn attempted_loads(&self) -> u64 {
        self.attempted_loads.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.slots.lock().expect("cache mutex poisoned");
        let mut ready = 0;
        let mut failed = 0;
        for slot in slots.values() {
            match slot.get() {
                Some(Ok(_)) => ready += 1,
                Some(Err(_)) => failed += 1,
                None => {}
            }
        }
        CacheStats {
            attempted_loads: self.attempted_loads(),
            ready,
            failed,
        }
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache state summary.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub attempted_loads: u64,
    pub ready: usize,
    pub failed: usize,
}
