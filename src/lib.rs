pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod predictor;
pub mod state;
pub mod transforms;
pub mod upload;

pub use error::{Error, Result};
pub use predictor::{Predictor, RandomPredictor};
pub use state::AppState;

/// Logger setup shared by both binaries. `RUST_LOG` overrides the level.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();
}
