use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use super::Loss;
use crate::utils::{masked_mean, softplus};

const MIN_SCALE: f32 = 1e-3;
const HALF_LN_TWO_PI: f32 = 0.918_938_5;

/// Gaussian head trained by negative log-likelihood. Outputs `(loc, scale)` per step.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Normal;

impl Normal {
    fn split<B: Backend>(y_hat: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, horizon, _] = y_hat.dims();
        let loc = y_hat.clone().slice([0..batch, 0..horizon, 0..1]).squeeze(2);
        let scale = y_hat.slice([0..batch, 0..horizon, 1..2]).squeeze(2);
        (loc, scale)
    }
}

impl Loss for Normal {
    fn outputsize_multiplier(&self) -> usize {
        2
    }

    fn domain_map<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, horizon, _] = y_hat.dims();
        let loc = y_hat.clone().slice([0..batch, 0..horizon, 0..1]);
        let scale = y_hat.slice([0..batch, 0..horizon, 1..2]);
        let scale = softplus(scale).add_scalar(MIN_SCALE);

        Tensor::cat(vec![loc, scale], 2)
    }

    fn compute<B: Backend>(
        &self,
        y: Tensor<B, 2>,
        y_hat: Tensor<B, 3>,
        mask: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        let (loc, scale) = Self::split(y_hat);
        let z = (y - loc) / scale.clone();
        let nll = scale.log() + (z.clone() * z).mul_scalar(0.5);

        masked_mean(nll.add_scalar(HALF_LN_TWO_PI), &mask)
    }

    fn point_forecast<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 2> {
        Self::split(y_hat).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Data, Shape};

    type TestBackend = NdArray<f32>;

    fn tensor<const D: usize>(values: Vec<f32>, shape: [usize; D]) -> Tensor<TestBackend, D> {
        Tensor::from_data(Data::new(values, Shape::new(shape)).convert())
    }

    #[test]
    fn test_domain_map_positive_scale() {
        let raw = tensor(vec![1.0, -20.0, -3.0, 0.0, 2.0, 5.0], [1, 3, 2]);
        let mapped = Normal.domain_map(raw);

        assert_eq!(mapped.dims(), [1, 3, 2]);
        let values = mapped.into_data().value;
        // loc untouched
        assert_eq!(values[0], 1.0);
        assert_eq!(values[2], -3.0);
        assert_eq!(values[4], 2.0);
        for scale in [values[1], values[3], values[5]] {
            assert!(scale >= MIN_SCALE);
        }
        assert!((values[3] - (2f32.ln() + MIN_SCALE)).abs() < 1e-5);
    }

    #[test]
    fn test_standard_normal_nll() {
        let y = tensor(vec![0.0], [1, 1]);
        let y_hat = tensor(vec![0.0, 1.0], [1, 1, 2]);
        let mask = tensor(vec![1.0], [1, 1]);

        let nll = Normal.compute(y, y_hat, mask).into_scalar();
        assert!((nll - HALF_LN_TWO_PI).abs() < 1e-5);
    }

    #[test]
    fn test_point_forecast_is_loc() {
        let y_hat = tensor(vec![4.0, 0.5, 6.0, 0.7], [1, 2, 2]);
        assert_eq!(Normal.point_forecast(y_hat).into_data().value, vec![4.0, 6.0]);
    }
}
