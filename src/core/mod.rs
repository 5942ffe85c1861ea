// src/core/mod.rs
mod engine;
mod parser;
mod merger;
mod exporter;
mod openapi;
mod context_builder;
mod llm;

// Static analysis over the parsed sources
mod index;
mod rest;
mod call_graph;

// Language-specific parsers
mod languages;

pub use parser::{SourceFile, SourceLoader};
pub use index::{ClassKind, ClassRecord, MethodId, MethodRecord, SourceIndex};
pub use rest::{
    BusinessSemantic, Endpoint, ErrorCode, ErrorCodeRef, ExtractedEndpoint, ExtractedErrorCode,
    Parameter, ParameterLocation, SpecResult,
};
pub use call_graph::{CallChainTrace, CallChainTracer, ScopeResolver};
pub use context_builder::ContextBuilder;
pub use llm::{EndpointContext, ErrorCodeContext, ErrorInsight, NoOpEnhancer, SpecEnhancer};
pub use merger::SpecMerger;
pub use exporter::{ContextBundle, SpecExporter};

// Export the main engine
pub use engine::{AnalyzeOptions, Engine};
