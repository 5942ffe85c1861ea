// src/core/merger.rs
use std::collections::HashMap;

use super::rest::{Endpoint, ErrorCode, SpecResult};

/// Reconciles the analysed specification with an externally produced one.
///
/// Endpoints match on `VERB /path` and error codes on `code`. Non-blank
/// external values outrank analysed ones; unmatched external entries are
/// appended. Order of first appearance is kept.
pub struct SpecMerger;

impl SpecMerger {
    pub fn merge(core: SpecResult, external: SpecResult) -> SpecResult {
        SpecResult {
            base_path: core.base_path,
            endpoints: Self::merge_endpoints(core.endpoints, external.endpoints),
            error_codes: Self::merge_error_codes(core.error_codes, external.error_codes),
        }
    }

    fn merge_endpoints(core: Vec<Endpoint>, external: Vec<Endpoint>) -> Vec<Endpoint> {
        let mut merged: Vec<Endpoint> = Vec::with_capacity(core.len() + external.len());
        let mut positions: HashMap<String, usize> = HashMap::new();

        for endpoint in core {
            let key = endpoint.key();
            if !positions.contains_key(&key) {
                positions.insert(key, merged.len());
                merged.push(endpoint);
            }
        }

        for endpoint in external {
            match positions.get(&endpoint.key()) {
                Some(&position) => enrich(&mut merged[position], endpoint),
                None => {
                    positions.insert(endpoint.key(), merged.len());
                    merged.push(endpoint);
                }
            }
        }

        merged
    }

    fn merge_error_codes(core: Vec<ErrorCode>, external: Vec<ErrorCode>) -> Vec<ErrorCode> {
        let mut merged: Vec<ErrorCode> = Vec::with_capacity(core.len() + external.len());
        let mut positions: HashMap<String, usize> = HashMap::new();

        for code in core.into_iter().chain(external) {
            match positions.get(&code.code) {
                Some(&position) => {
                    if !code.message.trim().is_empty() {
                        merged[position].message = code.message;
                    }
                }
                None => {
                    positions.insert(code.code.clone(), merged.len());
                    merged.push(code);
                }
            }
        }

        merged
    }
}

fn enrich(target: &mut Endpoint, external: Endpoint) {
    if let Some(summary) = non_blank(external.summary) {
        target.summary = Some(summary);
    }
    if let Some(description) = non_blank(external.description) {
        target.description = Some(description);
    }
    if !external.parameters.is_empty() {
        target.parameters = external.parameters;
    }
    if external.request_body_type.is_some() {
        target.request_body_type = external.request_body_type;
    }
    if external.response_type.is_some() {
        target.response_type = external.response_type;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rest::{Parameter, ParameterLocation};

    fn endpoint(verb: &str, uri: &str, summary: Option<&str>) -> Endpoint {
        Endpoint {
            uri: uri.to_string(),
            http_method: verb.to_string(),
            operation_id: String::new(),
            summary: summary.map(str::to_string),
            description: None,
            business_semantic: None,
            parameters: Vec::new(),
            request_body_type: None,
            response_type: Some("OrderDto".to_string()),
            error_code_refs: Vec::new(),
        }
    }

    fn error_code(code: &str, message: &str) -> ErrorCode {
        ErrorCode {
            code: code.to_string(),
            message: message.to_string(),
            http_status: 500,
            exception_type: code.to_string(),
            root_cause: None,
            handling_suggestion: None,
            prevention: None,
        }
    }

    #[test]
    fn test_external_values_outrank_and_extend() {
        let core = SpecResult {
            base_path: "/".to_string(),
            endpoints: vec![endpoint("GET", "/orders/{id}", Some("get")), endpoint("POST", "/orders", Some("create"))],
            error_codes: vec![error_code("OrderNotFoundException", "Order missing")],
        };

        let mut documented = endpoint("GET", "/orders/{id}", Some("Fetch an order"));
        documented.description = Some("   ".to_string());
        documented.response_type = None;
        documented.parameters = vec![Parameter {
            name: "id".to_string(),
            location: ParameterLocation::Path,
            type_name: "string".to_string(),
            required: true,
            description: Some("Order id".to_string()),
        }];

        let external = SpecResult {
            base_path: "/api".to_string(),
            endpoints: vec![endpoint("DELETE", "/orders/{id}", None), documented],
            error_codes: vec![error_code("OrderNotFoundException", " "), error_code("RateLimited", "Too many requests")],
        };

        let merged = SpecMerger::merge(core, external);

        assert_eq!(merged.base_path, "/");
        let keys: Vec<String> = merged.endpoints.iter().map(Endpoint::key).collect();
        assert_eq!(keys, vec!["GET /orders/{id}", "POST /orders", "DELETE /orders/{id}"]);

        let get = &merged.endpoints[0];
        assert_eq!(get.summary.as_deref(), Some("Fetch an order"));
        assert_eq!(get.description, None);
        assert_eq!(get.response_type.as_deref(), Some("OrderDto"));
        assert_eq!(get.parameters.len(), 1);

        let messages: Vec<(&str, &str)> = merged.error_codes.iter().map(|c| (c.code.as_str(), c.message.as_str())).collect();
        assert_eq!(
            messages,
            vec![("OrderNotFoundException", "Order missing"), ("RateLimited", "Too many requests")]
        );
    }
}
