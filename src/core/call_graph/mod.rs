// src/core/call_graph/mod.rs
//! Call-chain resolution
//!
//! Resolves the outbound calls of an endpoint method against the source index
//! without a type checker, and traces the reachable methods under depth and
//! size bounds. The rendered trace is narrative context for the enhancer.

mod call_chain_tracer;
mod scope_resolver;

pub use call_chain_tracer::{CallChainTrace, CallChainTracer, TraceEntry};
pub use scope_resolver::ScopeResolver;
