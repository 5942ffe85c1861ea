// src/core/rest/error_handlers.rs
use std::collections::HashSet;
use std::sync::OnceLock;
use regex::Regex;
use tracing::debug;

use crate::core::index::{MethodId, MethodRecord, SourceIndex};
use crate::core::languages::find_annotation;
use super::model::ErrorCode;

/// An error code together with the handler method that produced it
#[derive(Debug, Clone)]
pub struct ExtractedErrorCode {
    pub error_code: ErrorCode,
    pub handler: MethodId,
}

fn exception_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid exception name pattern"))
}

/// Scan every `@ExceptionHandler` method in index order.
///
/// One error code per handled exception type; the first handler seen for a
/// type wins and later ones are ignored.
pub fn extract_error_codes(index: &SourceIndex) -> Vec<ExtractedErrorCode> {
    let mut seen = HashSet::new();
    let mut codes = Vec::new();

    for class in index.classes() {
        for (id, method) in index.methods_of(class) {
            let Some(handler) = find_annotation(&method.annotations, "ExceptionHandler") else {
                continue;
            };
            let exception_types = handler.argument("value")
                .map(|value| value.class_names())
                .unwrap_or_default();

            for exception_type in exception_types {
                if !exception_name_pattern().is_match(&exception_type) {
                    debug!("Ignoring malformed exception handler value {:?} on {}.{}", exception_type, class.simple_name, method.name);
                    continue;
                }
                if !seen.insert(exception_type.clone()) {
                    debug!("{} already handled, skipping handler on {}", exception_type, class.simple_name);
                    continue;
                }

                codes.push(ExtractedErrorCode {
                    error_code: build_error_code(method, &exception_type),
                    handler: id,
                });
            }
        }
    }

    codes
}

fn build_error_code(method: &MethodRecord, exception_type: &str) -> ErrorCode {
    let message = method.javadoc.as_ref()
        .and_then(|doc| doc.summary())
        .filter(|summary| !summary.to_lowercase().starts_with("handle"))
        .map(str::to_string)
        .unwrap_or_else(|| exception_type.to_string());

    ErrorCode {
        code: exception_type.to_string(),
        message,
        http_status: guess_http_status(exception_type),
        exception_type: exception_type.to_string(),
        root_cause: None,
        handling_suggestion: None,
        prevention: None,
    }
}

/// HTTP status from keywords in the exception name
pub fn guess_http_status(exception_type: &str) -> u16 {
    let lower = exception_type.to_lowercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if has(&["notfound", "not_found"]) {
        404
    } else if has(&["badrequest", "illegalargument"]) {
        400
    } else if has(&["unauthorized"]) {
        401
    } else if has(&["forbidden"]) {
        403
    } else if has(&["conflict", "insufficient", "stock"]) {
        409
    } else {
        500
    }
}
