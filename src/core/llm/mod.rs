//! LLM integration for enhancing the extracted specification
//!
//! The enhancer only consumes context records built by the analysis and
//! returns free text; the engine attaches it to endpoints and error codes.

mod documenter;
mod providers;

pub use documenter::{EndpointContext, ErrorCodeContext, ErrorInsight, NoOpEnhancer, SpecEnhancer};
pub use providers::{create_enhancer, OpenAiEnhancer};
