use burn::tensor::{backend::Backend, Data, Shape, Tensor};
use serde::{Deserialize, Serialize};

use super::Loss;
use crate::error::{ForecastError, Result};
use crate::utils::masked_mean;

/// Multi-quantile pinball loss, one output per quantile.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MqLoss {
    quantiles: Vec<f32>,
}

impl MqLoss {
    pub fn new(quantiles: Vec<f32>) -> Self {
        Self { quantiles }
    }

    /// Quantiles bounding the given prediction-interval levels (in percent), plus the median.
    ///
    /// `from_levels(&[80.0])` yields quantiles `[0.1, 0.5, 0.9]`.
    pub fn from_levels(levels: &[f32]) -> Self {
        let mut quantiles = vec![0.5];
        for level in levels {
            quantiles.push(0.5 - level / 200.0);
            quantiles.push(0.5 + level / 200.0);
        }
        quantiles.sort_by(|a, b| a.total_cmp(b));
        quantiles.dedup();

        Self { quantiles }
    }

    pub fn quantiles(&self) -> &[f32] {
        &self.quantiles
    }

    fn median_index(&self) -> usize {
        self.quantiles
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - 0.5).abs().total_cmp(&(*b - 0.5).abs()))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    fn quantile_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 3> {
        let count = self.quantiles.len();
        let data = Data::new(self.quantiles.clone(), Shape::new([1, 1, count]));
        let quantiles: Tensor<B, 3> = Tensor::from_data(data.convert());
        quantiles.to_device(device)
    }
}

impl Loss for MqLoss {
    fn outputsize_multiplier(&self) -> usize {
        self.quantiles.len()
    }

    fn domain_map<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 3> {
        y_hat
    }

    fn compute<B: Backend>(
        &self,
        y: Tensor<B, 2>,
        y_hat: Tensor<B, 3>,
        mask: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        let quantiles = self.quantile_tensor::<B>(&y_hat.device());
        let y: Tensor<B, 3> = y.unsqueeze_dim(2);

        // max(q * r, (q - 1) * r) == r * (q - 1[r < 0])
        let residual = y - y_hat;
        let under = residual.clone().lower_elem(0.0).float();
        let pinball = residual.clone() * quantiles - residual * under;
        let pinball: Tensor<B, 2> = pinball.mean_dim(2).squeeze(2);

        masked_mean(pinball, &mask)
    }

    fn point_forecast<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, horizon, _] = y_hat.dims();
        let idx = self.median_index();
        y_hat.slice([0..batch, 0..horizon, idx..idx + 1]).squeeze(2)
    }

    fn validate(&self) -> Result<()> {
        if self.quantiles.is_empty() {
            return Err(ForecastError::invalid("quantiles", "at least one quantile is required"));
        }
        if let Some(q) = self.quantiles.iter().find(|q| !(**q > 0.0 && **q < 1.0)) {
            return Err(ForecastError::invalid(
                "quantiles",
                format!("{q} is outside the open interval (0, 1)"),
            ));
        }
        Ok(())
    }
}
