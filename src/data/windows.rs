use burn::tensor::{backend::Backend, Tensor};

/// Lookback windows fed to a forecasting architecture.
///
/// Covariate blocks are `None` when the series carries no such covariates; a
/// block with zero channels is treated the same way.
#[derive(Clone, Debug)]
pub struct WindowBatch<B: Backend> {
    pub insample_y: Tensor<B, 2>,         // [B, L]
    pub hist_exog: Option<Tensor<B, 3>>,  // [B, L, C_hist]
    pub futr_exog: Option<Tensor<B, 3>>,  // [B, L + H, C_futr]
    pub stat_exog: Option<Tensor<B, 2>>,  // [B, C_stat]
}

impl<B: Backend> WindowBatch<B> {
    pub fn new(insample_y: Tensor<B, 2>) -> Self {
        Self {
            insample_y,
            hist_exog: None,
            futr_exog: None,
            stat_exog: None,
        }
    }

    pub fn with_hist_exog(mut self, hist_exog: Tensor<B, 3>) -> Self {
        self.hist_exog = Some(hist_exog);
        self
    }

    pub fn with_futr_exog(mut self, futr_exog: Tensor<B, 3>) -> Self {
        self.futr_exog = Some(futr_exog);
        self
    }

    pub fn with_stat_exog(mut self, stat_exog: Tensor<B, 2>) -> Self {
        self.stat_exog = Some(stat_exog);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.insample_y.dims()[0]
    }
}

/// Windows paired with the horizon targets a training or validation step scores against.
#[derive(Clone, Debug)]
pub struct TrainingBatch<B: Backend> {
    pub windows: WindowBatch<B>,
    pub outsample_y: Tensor<B, 2>,    // [B, H]
    pub outsample_mask: Tensor<B, 2>, // [B, H], 1 where observed
}

impl<B: Backend> TrainingBatch<B> {
    /// Builds a batch where every horizon target is observed.
    pub fn new(windows: WindowBatch<B>, outsample_y: Tensor<B, 2>) -> Self {
        let outsample_mask = outsample_y.zeros_like().add_scalar(1.0);
        Self {
            windows,
            outsample_y,
            outsample_mask,
        }
    }

    pub fn with_mask(mut self, outsample_mask: Tensor<B, 2>) -> Self {
        self.outsample_mask = outsample_mask;
        self
    }
}
