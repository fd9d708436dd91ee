//! Windowed multi-layer perceptron forecaster built on burn.
//!
//! An [`MlpConfig`] builds an [`Mlp`] that maps lookback windows (plus optional
//! historic, future and static covariates) to `[batch, horizon, outputs]`
//! forecast parameters, with the output head sized and mapped by a [`losses::Loss`].

pub mod data;
pub mod error;
pub mod losses;
pub mod models;
pub mod utils;

pub use data::{TrainingBatch, WindowBatch};
pub use error::{ForecastError, Result};
pub use losses::{Loss, LossFunction};
pub use models::mlp::{Mlp, MlpConfig};
pub use models::{Architecture, Forecaster, WindowsSettings};
