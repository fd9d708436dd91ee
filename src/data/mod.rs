pub mod windows;

pub use windows::{TrainingBatch, WindowBatch};
