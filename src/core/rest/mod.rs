//! REST surface extraction across the supported annotation dialects

pub mod dialect;
mod endpoint_extractor;
mod error_handlers;
pub mod model;

pub use endpoint_extractor::{extract_all, extract_endpoints, join_paths, normalize_path, ExtractedEndpoint};
pub use error_handlers::{extract_error_codes, guess_http_status, ExtractedErrorCode};
pub use model::{BusinessSemantic, Endpoint, ErrorCode, ErrorCodeRef, Parameter, ParameterLocation, SpecResult};
