pub mod cleanup;
mod error;

pub use error::Error;
