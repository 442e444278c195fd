#![allow(unreachable_pub)]

mod api_error;
mod error;
mod params;
mod response;

pub use api_error::{ApiError, ApiErrorKind};
pub use error::ErrorKind;
pub use params::QueryParams;
pub use response::RawResponse;

/// The hoopstat `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
