use burn::tensor::activation;
use burn::tensor::{backend::Backend, Tensor};

/// Mean of `x` over the entries where `mask` is non-zero.
///
/// Unobserved entries are zeroed before weighting, so NaN or infinite values
/// there cannot reach the result. An all-zero mask yields zero.
pub fn masked_mean<B: Backend>(x: Tensor<B, 2>, mask: &Tensor<B, 2>) -> Tensor<B, 1> {
    let unobserved = mask.clone().equal_elem(0.0);
    let observed = x.mask_fill(unobserved, 0.0) * mask.clone();

    observed.sum() / mask.clone().sum().clamp_min(1.0)
}

/// Flattens `[B, T, C]` into `[B, T * C]`, row-major so channels vary fastest.
pub fn flatten_window<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, steps, channels] = x.dims();
    x.reshape([batch, steps * channels])
}

/// `ln(1 + e^x)` computed as `max(x, 0) + ln(1 + e^-|x|)` to stay finite for large inputs.
pub fn softplus<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let tail = x.clone().abs().neg().exp().add_scalar(1.0).log();
    activation::relu(x) + tail
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
    fn test_masked_mean_skips_unobserved() {
        let x = tensor(vec![1.0, 2.0, 100.0, 3.0], [2, 2]);
        let mask = tensor(vec![1.0, 1.0, 0.0, 1.0], [2, 2]);

        let mean = masked_mean(x, &mask).into_scalar();
        assert!((mean - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_masked_mean_all_masked() {
        let x = tensor(vec![5.0, 7.0], [1, 2]);
        let mask = tensor(vec![0.0, 0.0], [1, 2]);

        assert_eq!(masked_mean(x, &mask).into_scalar(), 0.0);
    }

    #[test]
    fn test_masked_mean_ignores_non_finite_unobserved() {
        let x = tensor(vec![f32::NAN, 4.0, f32::INFINITY, 2.0], [2, 2]);
        let mask = tensor(vec![0.0, 1.0, 0.0, 1.0], [2, 2]);

        let mean = masked_mean(x, &mask).into_scalar();
        assert!((mean - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_masked_mean_weights_partial_mask() {
        let x = tensor(vec![2.0, 6.0], [1, 2]);
        let mask = tensor(vec![0.5, 1.0], [1, 2]);

        // (0.5 * 2 + 6) / 1.5
        let mean = masked_mean(x, &mask).into_scalar();
        assert!((mean - 7.0 / 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_flatten_window_channels_fastest() {
        // [1, 2, 2]: t0 = (1, 2), t1 = (3, 4)
        let x = tensor(vec![1.0, 2.0, 3.0, 4.0], [1, 2, 2]);
        let flat = flatten_window(x);

        assert_eq!(flat.dims(), [1, 4]);
        assert_eq!(flat.into_data().value, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_softplus() {
        let x = tensor(vec![-50.0, 0.0, 50.0], [3]);
        let y = softplus(x).into_data().value;

        assert!(y[0] >= 0.0 && y[0] < 1e-6);
        assert!((y[1] - 2f32.ln()).abs() < 1e-6);
        assert!((y[2] - 50.0).abs() < 1e-4);
    }
}
