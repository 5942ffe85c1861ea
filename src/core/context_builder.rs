// src/core/context_builder.rs
use std::collections::HashSet;
use rayon::prelude::*;
use tracing::warn;

use crate::config::AnalysisConfig;
use super::call_graph::CallChainTracer;
use super::index::{CallKind, MethodId, SourceIndex};
use super::llm::{EndpointContext, ErrorCodeContext};
use super::rest::{ErrorCode, ErrorCodeRef, ExtractedEndpoint, ExtractedErrorCode};

/// Assembles enhancer context for endpoints and error codes
pub struct ContextBuilder<'a> {
    index: &'a SourceIndex,
    config: &'a AnalysisConfig,
    tracer: CallChainTracer<'a>,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(index: &'a SourceIndex, config: &'a AnalysisConfig) -> Self {
        Self {
            index,
            config,
            tracer: CallChainTracer::new(index, config),
        }
    }

    /// Build one context per endpoint, in parallel, and link each endpoint to
    /// the known error codes its method or call chain can throw.
    pub fn build_endpoint_contexts(
        &self,
        endpoints: &mut [ExtractedEndpoint],
        error_codes: &[ErrorCode],
    ) -> Vec<EndpointContext> {
        endpoints
            .par_iter_mut()
            .map(|extracted| {
                let (context, reachable) = self.endpoint_context(extracted);
                extracted.endpoint.error_code_refs = self.error_code_refs(&reachable, error_codes);
                context
            })
            .collect()
    }

    /// Context for one endpoint plus the methods its call chain reached
    pub fn endpoint_context(&self, extracted: &ExtractedEndpoint) -> (EndpointContext, Vec<MethodId>) {
        let method = self.index.method(extracted.method);
        let mut reachable = vec![extracted.method];

        let call_chain_snippet = match self.tracer.resolve_chain(extracted.method) {
            Ok(trace) => {
                reachable.extend(trace.methods());
                Some(trace.render()).filter(|rendered| !rendered.is_empty())
            }
            Err(e) => {
                warn!("⚠️ No call chain for {} {}: {}", extracted.endpoint.http_method, extracted.endpoint.uri, e);
                None
            }
        };

        let mut seen = HashSet::new();
        let called_method_names = method.call_sites.iter()
            .filter(|site| site.kind == CallKind::Invocation)
            .filter(|site| seen.insert(site.name.clone()))
            .take(self.config.called_methods_limit)
            .map(|site| site.name.clone())
            .collect();

        let context = EndpointContext {
            uri: extracted.endpoint.uri.clone(),
            http_method: extracted.endpoint.http_method.clone(),
            method_name: method.name.clone(),
            javadoc: method.javadoc_text().map(str::to_string),
            parameter_types: method.parameter_types(),
            return_type: method.return_type.clone(),
            body_snippet: truncate(method.body.as_deref().unwrap_or_default(), self.config.body_snippet_chars),
            called_method_names,
            call_chain_snippet,
        };

        (context, reachable)
    }

    pub fn error_code_context(&self, extracted: &ExtractedErrorCode) -> ErrorCodeContext {
        let handler = self.index.method(extracted.handler);
        let code = &extracted.error_code;

        ErrorCodeContext {
            code: code.code.clone(),
            message: code.message.clone(),
            http_status: code.http_status,
            exception_type: code.exception_type.clone(),
            handler_body_snippet: truncate(handler.body.as_deref().unwrap_or_default(), self.config.body_snippet_chars),
        }
    }

    /// Known error codes thrown by any of the methods, in order of first appearance
    fn error_code_refs(&self, methods: &[MethodId], error_codes: &[ErrorCode]) -> Vec<ErrorCodeRef> {
        let mut seen = HashSet::new();

        methods.iter()
            .flat_map(|&id| self.index.method(id).thrown_types.iter())
            .filter(|thrown| seen.insert(thrown.as_str()))
            .filter_map(|thrown| error_codes.iter().find(|code| &code.code == thrown))
            .map(|code| ErrorCodeRef {
                code: code.code.clone(),
                description: Some(code.message.clone()).filter(|m| !m.is_empty()),
            })
            .collect()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars).collect();
        format!("{}...", kept)
    }
}
