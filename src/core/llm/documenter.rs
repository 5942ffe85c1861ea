use serde::{Serialize, Deserialize};

use crate::error::Result;
use super::super::rest::BusinessSemantic;

/// What the enhancer sees of one endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointContext {
    /// Normalized path of the endpoint
    pub uri: String,

    /// HTTP verb
    pub http_method: String,

    /// Name of the declaring Java method
    pub method_name: String,

    /// Javadoc description of the method
    pub javadoc: Option<String>,

    /// Parameter types as written
    pub parameter_types: Vec<String>,

    /// Return type as written
    pub return_type: String,

    /// Method body, truncated
    pub body_snippet: String,

    /// Distinct called method names in order of first appearance
    pub called_method_names: Vec<String>,

    /// Rendered call chain, absent when resolution failed or found nothing
    pub call_chain_snippet: Option<String>,
}

/// What the enhancer sees of one error code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCodeContext {
    pub code: String,
    pub message: String,
    pub http_status: u16,
    pub exception_type: String,

    /// Body of the exception handler method
    pub handler_body_snippet: String,
}

/// Free-text fields the enhancer may attach to an error code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInsight {
    #[serde(default)]
    pub root_cause: Option<String>,
    #[serde(default)]
    pub handling_suggestion: Option<String>,
    #[serde(default)]
    pub prevention: Option<String>,
}

/// Enhancement collaborator. Implementations only produce free text; the
/// caller decides where it goes, so identity fields are never touched.
#[async_trait::async_trait]
pub trait SpecEnhancer: Send + Sync {
    /// Business description of an endpoint, `None` when nothing was produced
    async fn enhance_endpoint(&self, context: &EndpointContext) -> Result<Option<BusinessSemantic>>;

    /// Root cause and handling advice for an error code
    async fn enhance_error_code(&self, context: &ErrorCodeContext) -> Result<Option<ErrorInsight>>;

    /// Whether calls will produce anything
    fn is_enabled(&self) -> bool;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// Enhancer used when enhancement is disabled
pub struct NoOpEnhancer;

#[async_trait::async_trait]
impl SpecEnhancer for NoOpEnhancer {
    async fn enhance_endpoint(&self, _context: &EndpointContext) -> Result<Option<BusinessSemantic>> {
        Ok(None)
    }

    async fn enhance_error_code(&self, _context: &ErrorCodeContext) -> Result<Option<ErrorInsight>> {
        Ok(None)
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn provider_name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_enhancer_produces_nothing() {
        let enhancer = NoOpEnhancer;
        assert!(!enhancer.is_enabled());
        assert!(enhancer.enhance_endpoint(&EndpointContext::default()).await.unwrap().is_none());
        assert!(enhancer.enhance_error_code(&ErrorCodeContext::default()).await.unwrap().is_none());
    }

    #[test]
    fn test_context_serializes_camel_case() {
        let context = EndpointContext {
            uri: "/orders".to_string(),
            http_method: "POST".to_string(),
            called_method_names: vec!["create".to_string()],
            ..EndpointContext::default()
        };
        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json["httpMethod"], "POST");
        assert_eq!(json["calledMethodNames"][0], "create");
        assert!(json["callChainSnippet"].is_null());
    }
}
