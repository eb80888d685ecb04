mod descriptor;
mod digest;
mod error;
mod lenient;
mod manifest;

pub use descriptor::{platform_label, Descriptor, Platform};
pub use digest::Digest;
pub use error::Error;
pub use manifest::{ImageConfig, Manifest};
