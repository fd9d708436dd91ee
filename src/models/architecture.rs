use std::marker::PhantomData;

use burn::config::Config;
use burn::module::Module;
use burn::tensor::{backend::Backend, Tensor};
use tracing::{debug, info};

use crate::data::windows::WindowBatch;
use crate::error::{ensure_positive, ForecastError};

/// Network body plugged into a [`Forecaster`].
pub trait Architecture<B: Backend>: Module<B> + Sized {
    type Config;

    /// Default display name, used when no alias is configured.
    const NAME: &'static str;

    fn build(config: &Self::Config) -> crate::error::Result<Self>;

    /// Forecast parameters `[B, H, M]` for a batch of windows.
    fn forward(&self, batch: WindowBatch<B>) -> crate::error::Result<Tensor<B, 3>>;

    fn horizon(&self) -> usize;

    fn input_size(&self) -> usize;
}

/// Hyperparameters shared by every windowed model.
///
/// The training loop, scaler and scheduler that consume them are provided by
/// the host; they are validated here so a bad value fails before any weights exist.
#[derive(Config, Debug)]
pub struct WindowsSettings {
    #[config(default = 1000)]
    pub max_steps: usize,

    #[config(default = 1e-3)]
    pub learning_rate: f64,

    /// Number of learning-rate decays across `max_steps`, -1 disables decay.
    #[config(default = -1)]
    pub num_lr_decays: i64,

    /// Validation checks without improvement before stopping, -1 disables early stopping.
    #[config(default = -1)]
    pub early_stop_patience_steps: i64,

    #[config(default = 100)]
    pub val_check_steps: usize,

    #[config(default = 32)]
    pub batch_size: usize,

    #[config(default = "None")]
    pub valid_batch_size: Option<usize>,

    #[config(default = 1024)]
    pub windows_batch_size: usize,

    #[config(default = 1)]
    pub step_size: usize,

    #[config(default = 1)]
    pub random_seed: u64,

    #[config(default = "None")]
    pub alias: Option<String>,
}

impl WindowsSettings {
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate < 1.0) {
            return Err(ForecastError::invalid(
                "learning_rate",
                format!("{} is outside the open interval (0, 1)", self.learning_rate),
            ));
        }
        ensure_positive("max_steps", self.max_steps)?;
        ensure_positive("val_check_steps", self.val_check_steps)?;
        ensure_positive("batch_size", self.batch_size)?;
        ensure_positive("windows_batch_size", self.windows_batch_size)?;
        ensure_positive("step_size", self.step_size)?;
        if let Some(size) = self.valid_batch_size {
            ensure_positive("valid_batch_size", size)?;
        }
        Ok(())
    }

    /// Batch size for validation and prediction, falling back to the training batch size.
    pub fn valid_batch_size(&self) -> usize {
        self.valid_batch_size.unwrap_or(self.batch_size)
    }
}

/// A configured forecasting model: an architecture plus the settings the host trains it with.
#[derive(Debug)]
pub struct Forecaster<B: Backend, A: Architecture<B>> {
    architecture: A,
    settings: WindowsSettings,
    _backend: PhantomData<B>,
}

impl<B: Backend, A: Architecture<B>> Forecaster<B, A> {
    /// Validates `settings`, seeds the backend and builds the architecture.
    pub fn new(config: &A::Config, settings: WindowsSettings) -> crate::error::Result<Self> {
        settings.validate()?;
        B::seed(settings.random_seed);

        let architecture = A::build(config)?;
        info!(
            name = settings.alias.as_deref().unwrap_or(A::NAME),
            horizon = architecture.horizon(),
            input_size = architecture.input_size(),
            num_params = architecture.num_params(),
            "configured forecaster"
        );

        Ok(Self {
            architecture,
            settings,
            _backend: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        self.settings.alias.as_deref().unwrap_or(A::NAME)
    }

    pub fn settings(&self) -> &WindowsSettings {
        &self.settings
    }

    pub fn architecture(&self) -> &A {
        &self.architecture
    }

    /// Hands the architecture to a host training loop.
    pub fn into_architecture(self) -> A {
        self.architecture
    }

    /// Replaces the architecture, e.g. with the module returned by a training loop.
    pub fn with_architecture(mut self, architecture: A) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn predict(&self, batch: WindowBatch<B>) -> crate::error::Result<Tensor<B, 3>> {
        debug!(
            name = self.name(),
            batch_size = batch.batch_size(),
            "predicting"
        );
        self.architecture.forward(batch)
    }
}
