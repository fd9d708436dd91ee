use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{backend::Backend, Tensor};
use burn::train::{RegressionOutput, TrainOutput, TrainStep, ValidStep};
use tracing::{debug, info};

use crate::data::windows::{TrainingBatch, WindowBatch};
use crate::error::{ensure_positive, ForecastError};
use crate::losses::{Loss, LossFunction};
use crate::models::architecture::Architecture;
use crate::utils::flatten_window;

/// Multi-layer perceptron over flattened lookback windows.
///
/// Every layer has the same width with a ReLU after it. Static, historic and
/// future covariates are flattened and concatenated with the target history
/// before the first layer:
///
/// `[ y_{t-L..t} | X_{t-L..t} | F_{t-L..t+H} | S ]`
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    horizon: usize,
    input_size: usize,
    hist_input_size: usize,
    futr_input_size: usize,
    stat_input_size: usize,
    input_size_first_layer: usize,
    layers: Vec<Linear<B>>,
    out: Linear<B>,
    loss: LossFunction,
    valid_loss: LossFunction,
}

impl<B: Backend> Mlp<B> {
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn input_size_first_layer(&self) -> usize {
        self.input_size_first_layer
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn loss(&self) -> &LossFunction {
        &self.loss
    }

    pub fn valid_loss(&self) -> &LossFunction {
        &self.valid_loss
    }

    /// Concatenates the window blocks into `[B, input_size_first_layer]`.
    fn flatten_inputs(&self, batch: WindowBatch<B>) -> crate::error::Result<Tensor<B, 2>> {
        let [batch_size, lags] = batch.insample_y.dims();
        if lags != self.input_size {
            return Err(ForecastError::shape(
                "insample_y",
                [batch_size, self.input_size],
                [batch_size, lags],
            ));
        }

        let mut blocks = vec![batch.insample_y];

        let hist_steps = self.input_size;
        if let Some(hist_exog) = checked_window(
            "hist_exog",
            batch.hist_exog,
            [batch_size, hist_steps, self.hist_input_size],
        )? {
            blocks.push(flatten_window(hist_exog));
        }

        let futr_steps = self.input_size + self.horizon;
        if let Some(futr_exog) = checked_window(
            "futr_exog",
            batch.futr_exog,
            [batch_size, futr_steps, self.futr_input_size],
        )? {
            blocks.push(flatten_window(futr_exog));
        }

        if let Some(stat_exog) = checked_window(
            "stat_exog",
            batch.stat_exog,
            [batch_size, self.stat_input_size],
        )? {
            blocks.push(stat_exog);
        }

        let x = Tensor::cat(blocks, 1);
        let width = x.dims()[1];
        if width != self.input_size_first_layer {
            return Err(ForecastError::shape(
                "windows",
                [batch_size, self.input_size_first_layer],
                [batch_size, width],
            ));
        }

        debug!(batch_size, width, "flattened MLP inputs");
        Ok(x)
    }

    /// Hidden representation after the last ReLU, `[B, hidden_size]`.
    pub fn encode(&self, batch: WindowBatch<B>) -> crate::error::Result<Tensor<B, 2>> {
        let mut x = self.flatten_inputs(batch)?;
        for layer in self.layers.iter() {
            x = activation::relu(layer.forward(x));
        }
        Ok(x)
    }

    /// Forecast parameters `[B, H, M]` mapped through `loss` instead of the configured loss.
    ///
    /// `loss` must emit as many outputs per step as the configured one.
    pub fn forward_with<L: Loss>(&self, batch: WindowBatch<B>, loss: &L) -> crate::error::Result<Tensor<B, 3>> {
        let multiplier = self.loss.outputsize_multiplier();
        if loss.outputsize_multiplier() != multiplier {
            return Err(ForecastError::invalid(
                "loss",
                format!(
                    "emits {} outputs per step, model was built for {}",
                    loss.outputsize_multiplier(),
                    multiplier
                ),
            ));
        }

        let batch_size = batch.batch_size();
        let hidden = self.encode(batch)?;
        let y_hat = self.out.forward(hidden);
        let y_hat = y_hat.reshape([batch_size, self.horizon, multiplier]);

        Ok(loss.domain_map(y_hat))
    }

    /// Forecast parameters `[B, H, M]` for each window in the batch.
    pub fn forward(&self, batch: WindowBatch<B>) -> crate::error::Result<Tensor<B, 3>> {
        self.forward_with(batch, &self.loss)
    }

    /// Scores the batch with the training loss.
    pub fn forward_regression(&self, batch: TrainingBatch<B>) -> crate::error::Result<RegressionOutput<B>> {
        self.score(batch, &self.loss)
    }

    /// Scores the batch with the validation loss.
    pub fn forward_validation(&self, batch: TrainingBatch<B>) -> crate::error::Result<RegressionOutput<B>> {
        self.score(batch, &self.valid_loss)
    }

    /// `criterion` scores the raw parameters when its output count matches the
    /// model's, and the point forecast when it emits a single output.
    fn score(
        &self,
        batch: TrainingBatch<B>,
        criterion: &LossFunction,
    ) -> crate::error::Result<RegressionOutput<B>> {
        let batch_size = batch.windows.batch_size();
        let expected = [batch_size, self.horizon];
        if batch.outsample_y.dims() != expected {
            return Err(ForecastError::shape(
                "outsample_y",
                expected,
                batch.outsample_y.dims(),
            ));
        }
        if batch.outsample_mask.dims() != expected {
            return Err(ForecastError::shape(
                "outsample_mask",
                expected,
                batch.outsample_mask.dims(),
            ));
        }

        let output_targets = batch.outsample_y.clone();
        let y_hat = self.forward(batch.windows)?;
        let output_pred = self.loss.point_forecast(y_hat.clone());
        let scored = if criterion.outputsize_multiplier() == self.loss.outputsize_multiplier() {
            y_hat
        } else {
            output_pred.clone().unsqueeze_dim(2)
        };
        let loss = criterion.compute(batch.outsample_y, scored, batch.outsample_mask);

        Ok(RegressionOutput::new(loss, output_pred, output_targets))
    }
}

/// Validates an optional covariate block against `[B, steps.., channels]`.
///
/// With zero configured channels the block is dropped, but only when it carries no channels.
fn checked_window<B: Backend, const D: usize>(
    input: &'static str,
    block: Option<Tensor<B, D>>,
    expected: [usize; D],
) -> crate::error::Result<Option<Tensor<B, D>>> {
    let channels = expected[D - 1];
    match block {
        None if channels == 0 => Ok(None),
        None => Err(ForecastError::MissingInput { input, channels }),
        Some(tensor) => {
            let actual = tensor.dims();
            if actual != expected {
                return Err(ForecastError::shape(input, expected, actual));
            }
            Ok(if channels == 0 { None } else { Some(tensor) })
        }
    }
}

impl<B: Backend> Architecture<B> for Mlp<B> {
    type Config = MlpConfig;

    const NAME: &'static str = "MLP";

    fn build(config: &MlpConfig) -> crate::error::Result<Self> {
        config.init()
    }

    fn forward(&self, batch: WindowBatch<B>) -> crate::error::Result<Tensor<B, 3>> {
        Mlp::forward(self, batch)
    }

    fn horizon(&self) -> usize {
        self.horizon
    }

    fn input_size(&self) -> usize {
        self.input_size
    }
}

impl<B: AutodiffBackend> TrainStep<TrainingBatch<B>, RegressionOutput<B>> for Mlp<B> {
    fn step(&self, batch: TrainingBatch<B>) -> TrainOutput<RegressionOutput<B>> {
        let item = match self.forward_regression(batch) {
            Ok(item) => item,
            Err(err) => panic!("invalid training batch: {err}"),
        };
        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<TrainingBatch<B>, RegressionOutput<B>> for Mlp<B> {
    fn step(&self, batch: TrainingBatch<B>) -> RegressionOutput<B> {
        match self.forward_validation(batch) {
            Ok(item) => item,
            Err(err) => panic!("invalid validation batch: {err}"),
        }
    }
}

#[derive(Config, Debug)]
pub struct MlpConfig {
    horizon: usize,
    input_size: usize,

    #[config(default = "Vec::new()")]
    futr_exog_list: Vec<String>,

    #[config(default = "Vec::new()")]
    hist_exog_list: Vec<String>,

    #[config(default = "Vec::new()")]
    stat_exog_list: Vec<String>,

    #[config(default = 2)]
    num_layers: usize,

    #[config(default = 1024)]
    hidden_size: usize,

    #[config(default = "LossFunction::default()")]
    loss: LossFunction,

    /// Criterion reported by validation steps, `loss` when unset.
    #[config(default = "None")]
    valid_loss: Option<LossFunction>,
}

impl MlpConfig {
    /// Width of the flattened window: `L + C_hist*L + C_futr*(L+H) + C_stat`.
    pub fn input_size_first_layer(&self) -> crate::error::Result<usize> {
        let overflow =
            || ForecastError::invalid("input_size_first_layer", "flattened window width overflows");

        let hist = self
            .hist_exog_list
            .len()
            .checked_mul(self.input_size)
            .ok_or_else(overflow)?;
        let futr_steps = self
            .input_size
            .checked_add(self.horizon)
            .ok_or_else(overflow)?;
        let futr = self
            .futr_exog_list
            .len()
            .checked_mul(futr_steps)
            .ok_or_else(overflow)?;

        [hist, futr, self.stat_exog_list.len()]
            .into_iter()
            .try_fold(self.input_size, |width, block| width.checked_add(block))
            .ok_or_else(overflow)
    }

    fn resolve_valid_loss(&self) -> crate::error::Result<LossFunction> {
        let valid_loss = match &self.valid_loss {
            Some(valid_loss) => valid_loss.clone(),
            None => return Ok(self.loss.clone()),
        };
        valid_loss.validate()?;

        let multiplier = valid_loss.outputsize_multiplier();
        if multiplier != 1 && multiplier != self.loss.outputsize_multiplier() {
            return Err(ForecastError::invalid(
                "valid_loss",
                format!(
                    "emits {} outputs per step, expected 1 or {}",
                    multiplier,
                    self.loss.outputsize_multiplier()
                ),
            ));
        }
        Ok(valid_loss)
    }

    /// Builds the layer stack.
    ///
    /// Weights and biases use burn's `LinearConfig` default initializer,
    /// `KaimingUniform { gain: 1/sqrt(3), fan_out_only: false }`, drawn from the
    /// backend's seeded generator.
    pub fn init<B: Backend>(&self) -> crate::error::Result<Mlp<B>> {
        ensure_positive("horizon", self.horizon)?;
        ensure_positive("input_size", self.input_size)?;
        ensure_positive("num_layers", self.num_layers)?;
        ensure_positive("hidden_size", self.hidden_size)?;
        self.loss.validate()?;
        ensure_positive("outputsize_multiplier", self.loss.outputsize_multiplier())?;
        let valid_loss = self.resolve_valid_loss()?;

        let input_size_first_layer = self.input_size_first_layer()?;
        let output_size = self
            .horizon
            .checked_mul(self.loss.outputsize_multiplier())
            .ok_or_else(|| ForecastError::invalid("horizon", "output width overflows"))?;

        let mut layers = Vec::with_capacity(self.num_layers);
        layers.push(LinearConfig::new(input_size_first_layer, self.hidden_size).init());
        for _ in 1..self.num_layers {
            layers.push(LinearConfig::new(self.hidden_size, self.hidden_size).init());
        }

        // Adapter with loss dependent dimensions
        let out = LinearConfig::new(self.hidden_size, output_size).init();

        info!(
            horizon = self.horizon,
            input_size = self.input_size,
            input_size_first_layer,
            num_layers = self.num_layers,
            hidden_size = self.hidden_size,
            outputsize_multiplier = self.loss.outputsize_multiplier(),
            "built MLP"
        );

        Ok(Mlp {
            horizon: self.horizon,
            input_size: self.input_size,
            hist_input_size: self.hist_exog_list.len(),
            futr_input_size: self.futr_exog_list.len(),
            stat_input_size: self.stat_exog_list.len(),
            input_size_first_layer,
            layers,
            out,
            loss: self.loss.clone(),
            valid_loss,
        })
    }
}
