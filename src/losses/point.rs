use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use super::Loss;
use crate::utils::masked_mean;

/// Mean absolute error over a single point output.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Mae;

/// Mean squared error over a single point output.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Mse;

fn squeeze_point<B: Backend>(y_hat: Tensor<B, 3>) -> Tensor<B, 2> {
    y_hat.squeeze(2)
}

impl Loss for Mae {
    fn outputsize_multiplier(&self) -> usize {
        1
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
        let residual = y - squeeze_point(y_hat);
        masked_mean(residual.abs(), &mask)
    }

    fn point_forecast<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 2> {
        squeeze_point(y_hat)
    }
}

impl Loss for Mse {
    fn outputsize_multiplier(&self) -> usize {
        1
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
        let residual = y - squeeze_point(y_hat);
        masked_mean(residual.clone() * residual, &mask)
    }

    fn point_forecast<B: Backend>(&self, y_hat: Tensor<B, 3>) -> Tensor<B, 2> {
        squeeze_point(y_hat)
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
    fn test_mae() {
        let y = tensor(vec![1.0, 2.0, 3.0, 4.0], [2, 2]);
        let y_hat = tensor(vec![2.0, 2.0, 1.0, 8.0], [2, 2, 1]);
        let mask = tensor(vec![1.0, 1.0, 1.0, 0.0], [2, 2]);

        // |1-2| + |2-2| + |3-1| over three observed steps
        let loss = Mae.compute(y, y_hat, mask).into_scalar();
        assert!((loss - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mse() {
        let y = tensor(vec![1.0, 2.0], [1, 2]);
        let y_hat = tensor(vec![3.0, 2.0], [1, 2, 1]);
        let mask = tensor(vec![1.0, 1.0], [1, 2]);

        let loss = Mse.compute(y, y_hat, mask).into_scalar();
        assert!((loss - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_identity_domain() {
        let y_hat = tensor(vec![-1.5, 0.0, 2.5], [1, 3, 1]);
        let mapped = Mae.domain_map(y_hat.clone());

        assert_eq!(mapped.dims(), [1, 3, 1]);
        assert_eq!(mapped.into_data().value, y_hat.clone().into_data().value);
        assert_eq!(Mse.point_forecast(y_hat).into_data().value, vec![-1.5, 0.0, 2.5]);
    }
}
