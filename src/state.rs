use std::sync::Arc;

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::predictor::Predictor;

/// Read-only data shared by all workers.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(predictor: impl Predictor + 'static) -> Self {
        Self {
            predictor: Arc::new(predictor),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}
