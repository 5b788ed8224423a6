//! The `predict` capability.
//!
//! Callers hold a `dyn Predictor`, so a real model can replace
//! [`RandomPredictor`] without touching the CLI or the HTTP layer.

use image::DynamicImage;
use rand::seq::IndexedRandom;

use crate::error::{Error, Result};
use crate::models::{PredictionResult, IMAGE_CLASSES};

pub trait Predictor: Send + Sync {
    fn predict(&self, image: Option<&DynamicImage>) -> Result<PredictionResult>;
}

/// Placeholder classifier: picks a label uniformly at random and never
/// looks at the image. Outputs carry no information about the input.
#[derive(Debug, Clone)]
pub struct RandomPredictor {
    labels: Vec<String>,
}

impl RandomPredictor {
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::InvalidInput(
                "Predictor needs at least one label".into(),
            ));
        }
        Ok(Self { labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl Default for RandomPredictor {
    fn default() -> Self {
        Self {
            labels: IMAGE_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Predictor for RandomPredictor {
    fn predict(&self, _image: Option<&DynamicImage>) -> Result<PredictionResult> {
        let label = self
            .labels
            .choose(&mut rand::rng())
            .ok_or_else(|| Error::Internal("empty label set".into()))?;
        Ok(PredictionResult {
            label: label.clone(),
            confidence: None,
        })
    }
}
