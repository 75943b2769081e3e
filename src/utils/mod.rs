pub mod error;

pub use error::RiceError;
