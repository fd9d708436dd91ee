pub mod architecture;
pub mod mlp;

pub use architecture::{Architecture, Forecaster, WindowsSettings};
