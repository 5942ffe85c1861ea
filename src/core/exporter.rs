// src/core/exporter.rs
use std::path::{Path, PathBuf};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::debug;

use crate::error::{SpecsworthError, Result};
use super::llm::{EndpointContext, ErrorCodeContext};
use super::openapi::openapi_document;
use super::rest::SpecResult;

const MARKDOWN_TEMPLATE_NAME: &str = "api-docs.md";

const MARKDOWN_TEMPLATE: &str = r#"# API Documentation

Base path: `{{ basePath }}`

## Endpoints
{% for ep in endpoints %}
### {{ ep.httpMethod }} {{ ep.uri }}
{% if ep.summary %}
{{ ep.summary }}
{% endif %}{% if ep.description %}{% if not ep.summary or ep.description != ep.summary %}
{{ ep.description }}
{% endif %}{% endif %}
- Operation: `{{ ep.operationId }}`
{%- if ep.requestBodyType %}
- Request body: `{{ ep.requestBodyType }}`
{%- endif %}
{%- if ep.responseType %}
- Response: `{{ ep.responseType }}`
{%- endif %}
{% if ep.parameters | length > 0 %}
| Name | In | Type | Required | Description |
|------|----|------|----------|-------------|
{% for p in ep.parameters -%}
| {{ p.name }} | {{ p["in"] }} | `{{ p["type"] }}` | {% if p.required %}yes{% else %}no{% endif %} | {{ p.description | default(value="") }} |
{% endfor %}{% endif %}
{%- if ep.businessSemantic %}
#### Business semantics
{% if ep.businessSemantic.function %}- Function: {{ ep.businessSemantic.function }}
{% endif %}{% if ep.businessSemantic.scenario %}- Scenario: {{ ep.businessSemantic.scenario }}
{% endif %}{% if ep.businessSemantic.implementationNotes %}- Implementation notes: {{ ep.businessSemantic.implementationNotes }}
{% endif %}{% if ep.businessSemantic.cautions %}- Cautions: {{ ep.businessSemantic.cautions }}
{% endif %}{% endif %}
{%- if ep.errorCodes | length > 0 %}
Errors: {% for ref in ep.errorCodes %}`{{ ref.code }}`{% if not loop.last %}, {% endif %}{% endfor %}
{% endif %}
{% endfor %}
## Error Codes
{% if errorCodes | length > 0 %}
| Code | HTTP Status | Message |
|------|-------------|---------|
{% for ec in errorCodes -%}
| {{ ec.code }} | {{ ec.httpStatus }} | {{ ec.message }} |
{% endfor %}
{% for ec in errorCodes %}{% if ec.rootCause or ec.handlingSuggestion or ec.prevention %}
### {{ ec.code }}
{% if ec.rootCause %}- Root cause: {{ ec.rootCause }}
{% endif %}{% if ec.handlingSuggestion %}- Handling: {{ ec.handlingSuggestion }}
{% endif %}{% if ec.prevention %}- Prevention: {{ ec.prevention }}
{% endif %}{% endif %}{% endfor %}{% else %}
No error codes found.
{% endif %}"#;

/// Enhancer context records, written alongside the spec on request
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBundle {
    pub endpoints: Vec<EndpointContext>,
    pub error_codes: Vec<ErrorCodeContext>,
}

/// Writes the merged specification to disk
pub struct SpecExporter {
    tera: Tera,
}

impl SpecExporter {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(MARKDOWN_TEMPLATE_NAME, MARKDOWN_TEMPLATE)?;
        Ok(Self { tera })
    }

    /// Write every requested format into `output_dir`; returns the written paths
    pub fn export(
        &self,
        spec: &SpecResult,
        contexts: Option<&ContextBundle>,
        output_dir: &Path,
        formats: &[String],
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(output_dir)
            .map_err(|e| SpecsworthError::FileSystem(format!("{}: {}", output_dir.display(), e)))?;

        let mut written = Vec::new();

        for format in formats {
            let (file_name, content) = match format.as_str() {
                "json" => ("spec.json", serde_json::to_string_pretty(spec)?),
                "openapi" => ("openapi.json", serde_json::to_string_pretty(&openapi_document(spec))?),
                "markdown" | "md" => (MARKDOWN_TEMPLATE_NAME, self.render_markdown(spec)?),
                other => {
                    return Err(SpecsworthError::Config(format!("Unsupported output format: {}", other)));
                }
            };
            written.push(write_file(output_dir, file_name, &content)?);
        }

        if let Some(contexts) = contexts {
            let content = serde_json::to_string_pretty(contexts)?;
            written.push(write_file(output_dir, "context.json", &content)?);
        }

        Ok(written)
    }

    pub fn render_markdown(&self, spec: &SpecResult) -> Result<String> {
        let context = Context::from_serialize(spec)?;
        Ok(self.tera.render(MARKDOWN_TEMPLATE_NAME, &context)?)
    }
}

fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    debug!("Wrote {}", path.display());
    Ok(path)
}
