// ABOUTME: Ports to the virtualization management API used by the uploader.
// ABOUTME: Exposes DiskOps, TransferOps, their value types, and the REST adapter.

mod error;
pub mod rest;
pub mod traits;

pub use error::ApiError;
pub use rest::{Credentials, RestClient};
pub use traits::*;
