//! Public façade of the engine.
//!
//! [`Engine`] owns one [`ContextPredictor`](crate::predictor::ContextPredictor)
//! and one [`UserDictionary`](crate::user_dict::UserDictionary), and exposes
//! the static-dictionary operations by delegation.
//! The user dictionary publishes its own operation set; callers reach it
//! through [`Engine::user_dict`].

mod engine;

pub use engine::Engine;

use std::io;

use crate::dict::DictError;
use crate::predictor::PredictError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Dict(#[from] DictError),

    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
