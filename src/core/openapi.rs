// src/core/openapi.rs
use std::collections::BTreeMap;
use serde_json::{json, Map, Value};

use super::rest::{BusinessSemantic, Endpoint, ErrorCode, Parameter, ParameterLocation, SpecResult};

const OPENAPI_VERSION: &str = "3.0.3";

const HTTP_VERBS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Build an OpenAPI 3 document from the merged specification.
///
/// Each operation lists a `200` response plus one response per HTTP status of
/// the error codes linked to the endpoint. Codes sharing a status are folded
/// into a single response.
pub fn openapi_document(spec: &SpecResult) -> Value {
    let codes: BTreeMap<&str, &ErrorCode> = spec.error_codes.iter()
        .map(|code| (code.code.as_str(), code))
        .collect();

    let mut paths = Map::new();
    for endpoint in &spec.endpoints {
        let item = paths.entry(endpoint.uri.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = item {
            // First endpoint wins when a (path, verb) pair repeats
            item.entry(operation_verb(&endpoint.http_method))
                .or_insert_with(|| operation(endpoint, &codes));
        }
    }

    json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "title": "REST API",
            "description": "Recovered from source analysis",
            "version": "1.0.0",
        },
        "servers": [{ "url": spec.base_path }],
        "paths": paths,
    })
}

fn operation_verb(http_method: &str) -> String {
    let verb = http_method.to_lowercase();
    if HTTP_VERBS.contains(&verb.as_str()) {
        verb
    } else {
        "get".to_string()
    }
}

fn operation(endpoint: &Endpoint, codes: &BTreeMap<&str, &ErrorCode>) -> Value {
    let mut op = Map::new();
    op.insert("operationId".to_string(), json!(endpoint.operation_id));
    if let Some(summary) = non_blank(endpoint.summary.as_deref()) {
        op.insert("summary".to_string(), json!(summary));
    }
    if let Some(description) = operation_description(endpoint) {
        op.insert("description".to_string(), json!(description));
    }

    let parameters: Vec<Value> = endpoint.parameters.iter()
        .filter(|p| p.location != ParameterLocation::Form)
        .map(parameter)
        .collect();
    if !parameters.is_empty() {
        op.insert("parameters".to_string(), Value::Array(parameters));
    }

    if let Some(body) = request_body(endpoint) {
        op.insert("requestBody".to_string(), body);
    }

    op.insert("responses".to_string(), responses(endpoint, codes));
    Value::Object(op)
}

fn operation_description(endpoint: &Endpoint) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    if let Some(description) = non_blank(endpoint.description.as_deref()) {
        parts.push(description.to_string());
    }
    if let Some(semantic) = &endpoint.business_semantic {
        parts.extend(semantic_lines(semantic));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

fn semantic_lines(semantic: &BusinessSemantic) -> Vec<String> {
    [
        ("Function", &semantic.function),
        ("Scenario", &semantic.scenario),
        ("Implementation notes", &semantic.implementation_notes),
        ("Cautions", &semantic.cautions),
    ]
    .into_iter()
    .filter_map(|(label, value)| non_blank(value.as_deref()).map(|v| format!("{}: {}", label, v)))
    .collect()
}

fn parameter(param: &Parameter) -> Value {
    let location = match param.location {
        ParameterLocation::Path => "path",
        ParameterLocation::Query => "query",
        ParameterLocation::Header => "header",
        ParameterLocation::Form => "query",
    };

    let mut value = json!({
        "name": param.name,
        "in": location,
        // OpenAPI requires path parameters to be marked required
        "required": param.required || param.location == ParameterLocation::Path,
        "schema": type_schema(&param.type_name),
    });
    if let (Some(description), Value::Object(map)) = (non_blank(param.description.as_deref()), &mut value) {
        map.insert("description".to_string(), json!(description));
    }
    value
}

/// JSON body when the endpoint takes a payload, form fields otherwise
fn request_body(endpoint: &Endpoint) -> Option<Value> {
    if let Some(body_type) = non_blank(endpoint.request_body_type.as_deref()) {
        return Some(json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "type": "object", "description": body_type },
                },
            },
        }));
    }

    let form: Vec<&Parameter> = endpoint.parameters.iter()
        .filter(|p| p.location == ParameterLocation::Form)
        .collect();
    if form.is_empty() {
        return None;
    }

    let properties: Map<String, Value> = form.iter()
        .map(|p| (p.name.clone(), type_schema(&p.type_name)))
        .collect();
    let required: Vec<&str> = form.iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    let mut schema = json!({ "type": "object", "properties": properties });
    if let (false, Value::Object(map)) = (required.is_empty(), &mut schema) {
        map.insert("required".to_string(), json!(required));
    }

    Some(json!({
        "content": {
            "application/x-www-form-urlencoded": { "schema": schema },
        },
    }))
}

fn responses(endpoint: &Endpoint, codes: &BTreeMap<&str, &ErrorCode>) -> Value {
    let mut success = json!({ "description": "Success" });
    if let (Some(response_type), Value::Object(map)) = (response_schema_type(endpoint), &mut success) {
        map.insert(
            "content".to_string(),
            json!({
                "application/json": {
                    "schema": { "type": "object", "description": response_type },
                },
            }),
        );
    }

    let mut by_status: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for reference in &endpoint.error_code_refs {
        let Some(code) = codes.get(reference.code.as_str()) else {
            continue;
        };
        by_status.entry(code.http_status.to_string())
            .or_default()
            .push(error_description(code));
    }

    let mut responses = Map::new();
    responses.insert("200".to_string(), success);
    for (status, descriptions) in by_status {
        responses.entry(status)
            .or_insert_with(|| json!({ "description": descriptions.join("; ") }));
    }
    Value::Object(responses)
}

fn response_schema_type(endpoint: &Endpoint) -> Option<&str> {
    non_blank(endpoint.response_type.as_deref())
        .filter(|t| !t.eq_ignore_ascii_case("void"))
}

fn error_description(code: &ErrorCode) -> String {
    let mut description = if code.message.trim().is_empty() {
        code.code.clone()
    } else {
        code.message.clone()
    };
    if let Some(root_cause) = non_blank(code.root_cause.as_deref()) {
        description.push_str(&format!(" Root cause: {}", root_cause));
    }
    if let Some(handling) = non_blank(code.handling_suggestion.as_deref()) {
        description.push_str(&format!(" Handling: {}", handling));
    }
    description
}

/// Primitive JSON schema for a Java type name
fn type_schema(type_name: &str) -> Value {
    match type_name.trim().to_lowercase().as_str() {
        "int" | "integer" | "short" => json!({ "type": "integer", "format": "int32" }),
        "long" => json!({ "type": "integer", "format": "int64" }),
        "double" => json!({ "type": "number", "format": "double" }),
        "float" => json!({ "type": "number", "format": "float" }),
        "bigdecimal" => json!({ "type": "number" }),
        "boolean" => json!({ "type": "boolean" }),
        _ => json!({ "type": "string" }),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rest::ErrorCodeRef;

    fn error_code(code: &str, message: &str, http_status: u16) -> ErrorCode {
        ErrorCode {
            code: code.to_string(),
            message: message.to_string(),
            http_status,
            exception_type: code.to_string(),
            root_cause: None,
            handling_suggestion: None,
            prevention: None,
        }
    }

    fn endpoint(method: &str, uri: &str) -> Endpoint {
        Endpoint {
            uri: uri.to_string(),
            http_method: method.to_string(),
            operation_id: "op".to_string(),
            summary: None,
            description: None,
            business_semantic: None,
            parameters: Vec::new(),
            request_body_type: None,
            response_type: None,
            error_code_refs: Vec::new(),
        }
    }

    fn reference(code: &str) -> ErrorCodeRef {
        ErrorCodeRef { code: code.to_string(), description: None }
    }

    #[test]
    fn test_operations_share_a_path_item() {
        let mut create = endpoint("POST", "/orders");
        create.request_body_type = Some("CreateOrderRequest".to_string());
        create.response_type = Some("OrderDto".to_string());
        let list = endpoint("GET", "/orders");
        let odd = endpoint("FETCH", "/legacy");

        let spec = SpecResult {
            endpoints: vec![create, list, odd],
            ..SpecResult::default()
        };
        let doc = openapi_document(&spec);

        assert_eq!(doc["openapi"], "3.0.3");
        let orders = &doc["paths"]["/orders"];
        assert_eq!(orders["post"]["requestBody"]["content"]["application/json"]["schema"]["description"], "CreateOrderRequest");
        assert_eq!(orders["post"]["responses"]["200"]["content"]["application/json"]["schema"]["description"], "OrderDto");
        assert!(orders["get"]["responses"]["200"].get("content").is_none());
        assert!(doc["paths"]["/legacy"].get("get").is_some());
    }

    #[test]
    fn test_parameters_and_form_fields() {
        let mut restock = endpoint("PUT", "/products/{id}/stock");
        restock.parameters = vec![
            Parameter {
                name: "id".to_string(),
                location: ParameterLocation::Path,
                type_name: "Long".to_string(),
                required: false,
                description: Some("the product".to_string()),
            },
            Parameter {
                name: "count".to_string(),
                location: ParameterLocation::Form,
                type_name: "int".to_string(),
                required: true,
                description: None,
            },
            Parameter {
                name: "dryRun".to_string(),
                location: ParameterLocation::Query,
                type_name: "boolean".to_string(),
                required: false,
                description: None,
            },
        ];

        let spec = SpecResult { endpoints: vec![restock], ..SpecResult::default() };
        let doc = openapi_document(&spec);
        let op = &doc["paths"]["/products/{id}/stock"]["put"];

        let params = op["parameters"].as_array().unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0]["in"], "path");
        assert_eq!(params[0]["required"], true);
        assert_eq!(params[0]["schema"]["format"], "int64");
        assert_eq!(params[0]["description"], "the product");
        assert_eq!(params[1]["schema"]["type"], "boolean");

        let form = &op["requestBody"]["content"]["application/x-www-form-urlencoded"]["schema"];
        assert_eq!(form["properties"]["count"]["type"], "integer");
        assert_eq!(form["required"], json!(["count"]));
    }

    #[test]
    fn test_linked_error_codes_become_responses() {
        let mut get = endpoint("GET", "/orders/{id}");
        get.description = Some("Fetch an order.".to_string());
        get.business_semantic = Some(BusinessSemantic {
            function: Some("Looks up one order".to_string()),
            cautions: Some("  ".to_string()),
            ..BusinessSemantic::default()
        });
        get.error_code_refs = vec![reference("OrderNotFoundException"), reference("ProductNotFoundException"), reference("Unknown")];

        let mut not_found = error_code("OrderNotFoundException", "Order missing", 404);
        not_found.root_cause = Some("Unknown id".to_string());
        let spec = SpecResult {
            endpoints: vec![get],
            error_codes: vec![
                not_found,
                error_code("ProductNotFoundException", "Product missing", 404),
                error_code("InsufficientStockException", "No stock", 409),
            ],
            ..SpecResult::default()
        };
        let doc = openapi_document(&spec);
        let op = &doc["paths"]["/orders/{id}"]["get"];

        assert_eq!(op["description"], "Fetch an order.\n\nFunction: Looks up one order");
        let responses = op["responses"].as_object().unwrap();
        let statuses: Vec<&str> = responses.keys().map(String::as_str).collect();
        assert_eq!(statuses, vec!["200", "404"]);
        assert_eq!(
            responses["404"]["description"],
            "Order missing Root cause: Unknown id; Product missing"
        );
    }
}
