//! Training criteria and the output heads they imply.
//!
//! A loss fixes how many raw values the network emits per horizon step
//! (`outputsize_multiplier`) and how those raw values are mapped into valid
//! forecast-parameter space (`domain_map`) before they leave the model.

use burn::constant;
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod distribution;
pub mod point;
pub mod quantile;

pub use distribution::Normal;
pub use point::{Mae, Mse};
pub use quantile::MqLoss;

pub trait Loss {
    /// Number of raw outputs per horizon step.
    fn outputsize_multiplier(&self) -> usize;

    /// Maps raw network outputs `[B, H, M]` into forecast-parameter space, keeping the shape.
    fn domain_map<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 3>;

    /// Masked training criterion of domain-mapped outputs `[B, H, M]` against targets `[B, H]`.
    fn compute<B: Backend>(
        &self,
        y: Tensor<B, 2>,
        y_hat: Tensor<B, 3>,
        mask: Tensor<B, 2>,
    ) -> Tensor<B, 1>;

    /// Collapses domain-mapped outputs `[B, H, M]` into a point forecast `[B, H]`.
    fn point_forecast<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 2>;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Losses that can be named in a model configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum LossFunction {
    Mae(Mae),
    Mse(Mse),
    MqLoss(MqLoss),
    Normal(Normal),
}

impl Default for LossFunction {
    fn default() -> Self {
        LossFunction::Mae(Mae)
    }
}

constant!(LossFunction);

impl Loss for LossFunction {
    fn outputsize_multiplier(&self) -> usize {
        match self {
            LossFunction::Mae(loss) => loss.outputsize_multiplier(),
            LossFunction::Mse(loss) => loss.outputsize_multiplier(),
            LossFunction::MqLoss(loss) => loss.outputsize_multiplier(),
            LossFunction::Normal(loss) => loss.outputsize_multiplier(),
        }
    }

    fn domain_map<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 3> {
        match self {
            LossFunction::Mae(loss) => loss.domain_map(y_hat),
            LossFunction::Mse(loss) => loss.domain_map(y_hat),
            LossFunction::MqLoss(loss) => loss.domain_map(y_hat),
            LossFunction::Normal(loss) => loss.domain_map(y_hat),
        }
    }

    fn compute<B: Backend>(
        &self,
        y: Tensor<B, 2>,
        y_hat: Tensor<B, 3>,
        mask: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        match self {
            LossFunction::Mae(loss) => loss.compute(y, y_hat, mask),
            LossFunction::Mse(loss) => loss.compute(y, y_hat, mask),
            LossFunction::MqLoss(loss) => loss.compute(y, y_hat, mask),
            LossFunction::Normal(loss) => loss.compute(y, y_hat, mask),
        }
    }

    fn point_forecast<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 2> {
        match self {
            LossFunction::Mae(loss) => loss.point_forecast(y_hat),
            LossFunction::Mse(loss) => loss.point_forecast(y_hat),
            LossFunction::MqLoss(loss) => loss.point_forecast(y_hat),
            LossFunction::Normal(loss) => loss.point_forecast(y_hat),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            LossFunction::Mae(loss) => loss.validate(),
            LossFunction::Mse(loss) => loss.validate(),
            LossFunction::MqLoss(loss) => loss.validate(),
            LossFunction::Normal(loss) => loss.validate(),
        }
    }
}

impl From<Mae> for LossFunction {
    fn from(loss: Mae) -> Self {
        LossFunction::Mae(loss)
    }
}

impl From<Mse> for LossFunction {
    fn from(loss: Mse) -> Self {
        LossFunction::Mse(loss)
    }
}

impl From<MqLoss> for LossFunction {
    fn from(loss: MqLoss) -> Self {
        LossFunction::MqLoss(loss)
    }
}

impl From<Normal> for LossFunction {
    fn from(loss: Normal) -> Self {
        LossFunction::Normal(loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mae() {
        assert_eq!(LossFunction::default(), LossFunction::Mae(Mae));
        assert_eq!(LossFunction::default().outputsize_multiplier(), 1);
    }

    #[test]
    fn test_multiplier_dispatch() {
        assert_eq!(LossFunction::from(Mse).outputsize_multiplier(), 1);
        assert_eq!(LossFunction::from(Normal).outputsize_multiplier(), 2);
        let mq = MqLoss::new(vec![0.1, 0.5, 0.9]);
        assert_eq!(LossFunction::from(mq).outputsize_multiplier(), 3);
    }

    #[test]
    fn test_validate_dispatch() {
        assert!(LossFunction::from(MqLoss::new(vec![])).validate().is_err());
        assert!(LossFunction::from(Mae).validate().is_ok());
    }
}
