mod model;

pub use model::{Mlp, MlpConfig};
