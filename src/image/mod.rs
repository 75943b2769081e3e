pub mod loader;
pub mod normalization;
pub mod preprocessing;

pub use loader::ImageLoader;
pub use normalization::Normalization;
pub use preprocessing::{ImagePreprocessor, ImageTensor, INPUT_SIZE};
