//! ImageKit media hosting.
//!
//! Product images are uploaded through the ImageKit upload API and served
//! from the configured URL endpoint. [`url`] holds the pure URL helpers used
//! by templates.

mod client;
mod error;
pub mod url;

pub use client::{ImageKitClient, UploadedImage, delete_token};
pub use error::ImageKitError;
pub use url::file_name_for;
