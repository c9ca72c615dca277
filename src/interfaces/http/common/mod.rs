//! Shared HTTP plumbing: response envelope, error mapping, extractors

pub mod error;
pub mod response;
pub mod validated_json;

pub use error::{domain_error, ApiError, ApiResult};
pub use response::ApiResponse;
pub use validated_json::{ValidatedJson, ValidatedJsonRejection};
