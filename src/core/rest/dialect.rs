// src/core/rest/dialect.rs
//! Annotation dialects recognised on REST surfaces.
//!
//! Markers are closed enums matched by simple annotation name. When a
//! declaration carries markers from more than one dialect the explicit
//! priority decides, never annotation order.

use crate::core::languages::{find_annotation, Annotation};
use super::model::ParameterLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
        }
    }
}

/// Class-level markers that make a class a REST surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassMarker {
    /// `@RestController`
    RestController,
    /// `@Controller`
    Controller,
    /// `@Path` on the class
    ResourcePath,
    /// `@RestSchema`
    RestSchema,
}

impl ClassMarker {
    pub fn from_annotation(name: &str) -> Option<Self> {
        match name {
            "RestController" => Some(ClassMarker::RestController),
            "Controller" => Some(ClassMarker::Controller),
            "Path" => Some(ClassMarker::ResourcePath),
            "RestSchema" => Some(ClassMarker::RestSchema),
            _ => None,
        }
    }
}

/// Whether any class-level annotation marks a REST surface
pub fn is_rest_surface(annotations: &[Annotation]) -> bool {
    annotations.iter().any(|a| ClassMarker::from_annotation(&a.name).is_some())
}

/// Base path of a REST surface: `@RequestMapping`, else `@Path`, else empty
pub fn class_base_path(annotations: &[Annotation]) -> String {
    find_annotation(annotations, "RequestMapping")
        .or_else(|| find_annotation(annotations, "Path"))
        .and_then(path_value)
        .unwrap_or_default()
}

/// Method-level route markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMarker {
    /// `@GetMapping`, `@PostMapping`, ...
    VerbMapping(HttpVerb),
    /// `@RequestMapping(method = ...)`
    RequestMapping,
    /// `@GET`, `@POST`, ... combined with `@Path`
    VerbMarker(HttpVerb),
}

impl RouteMarker {
    pub fn from_annotation(name: &str) -> Option<Self> {
        let marker = match name {
            "GetMapping" => RouteMarker::VerbMapping(HttpVerb::Get),
            "PostMapping" => RouteMarker::VerbMapping(HttpVerb::Post),
            "PutMapping" => RouteMarker::VerbMapping(HttpVerb::Put),
            "DeleteMapping" => RouteMarker::VerbMapping(HttpVerb::Delete),
            "PatchMapping" => RouteMarker::VerbMapping(HttpVerb::Patch),
            "RequestMapping" => RouteMarker::RequestMapping,
            "GET" => RouteMarker::VerbMarker(HttpVerb::Get),
            "POST" => RouteMarker::VerbMarker(HttpVerb::Post),
            "PUT" => RouteMarker::VerbMarker(HttpVerb::Put),
            "DELETE" => RouteMarker::VerbMarker(HttpVerb::Delete),
            "PATCH" => RouteMarker::VerbMarker(HttpVerb::Patch),
            "HEAD" => RouteMarker::VerbMarker(HttpVerb::Head),
            "OPTIONS" => RouteMarker::VerbMarker(HttpVerb::Options),
            _ => return None,
        };
        Some(marker)
    }

    /// Lower wins
    pub fn priority(&self) -> u8 {
        match self {
            RouteMarker::VerbMapping(_) => 0,
            RouteMarker::RequestMapping => 1,
            RouteMarker::VerbMarker(_) => 2,
        }
    }
}

/// Verb and method-relative path of an endpoint method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub verb: String,
    pub path: String,
}

/// Classify a method by its annotations. `None` means the method is not an endpoint.
pub fn resolve_route(annotations: &[Annotation]) -> Option<Route> {
    let (marker, annotation) = annotations.iter()
        .enumerate()
        .filter_map(|(position, a)| RouteMarker::from_annotation(&a.name).map(|m| (m.priority(), position, m, a)))
        .min_by_key(|(priority, position, _, _)| (*priority, *position))
        .map(|(_, _, marker, annotation)| (marker, annotation))?;

    let route = match marker {
        RouteMarker::VerbMapping(verb) => Route {
            verb: verb.as_str().to_string(),
            path: path_value(annotation).unwrap_or_default(),
        },
        RouteMarker::RequestMapping => Route {
            verb: request_mapping_verb(annotation),
            path: path_value(annotation).unwrap_or_default(),
        },
        RouteMarker::VerbMarker(verb) => Route {
            verb: verb.as_str().to_string(),
            path: find_annotation(annotations, "Path")
                .and_then(path_value)
                .unwrap_or_default(),
        },
    };

    Some(route)
}

/// `method = RequestMethod.POST` or `{RequestMethod.POST, ...}`; GET when absent
fn request_mapping_verb(annotation: &Annotation) -> String {
    annotation.argument("method")
        .and_then(|value| value.first_text())
        .map(|text| {
            let text = text.trim();
            text.rsplit('.').next().unwrap_or(text).to_uppercase()
        })
        .filter(|verb| !verb.is_empty())
        .unwrap_or_else(|| HttpVerb::Get.as_str().to_string())
}

/// String path under `value` or `path`, first element when an array
fn path_value(annotation: &Annotation) -> Option<String> {
    annotation.string_argument(&["value", "path"])
}

/// Parameter-level markers, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamMarker {
    PathVariable,
    PathParam,
    RequestParam,
    QueryParam,
    RequestHeader,
    HeaderParam,
    FormParam,
    RequestBody,
    BeanParam,
    Context,
}

/// What a parameter is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamBinding {
    Located(ParameterLocation),
    Body,
    Ignored,
}

impl ParamMarker {
    pub fn from_annotation(name: &str) -> Option<Self> {
        let marker = match name {
            "PathVariable" => ParamMarker::PathVariable,
            "PathParam" => ParamMarker::PathParam,
            "RequestParam" => ParamMarker::RequestParam,
            "QueryParam" => ParamMarker::QueryParam,
            "RequestHeader" => ParamMarker::RequestHeader,
            "HeaderParam" => ParamMarker::HeaderParam,
            "FormParam" => ParamMarker::FormParam,
            "RequestBody" => ParamMarker::RequestBody,
            "BeanParam" => ParamMarker::BeanParam,
            "Context" => ParamMarker::Context,
            _ => return None,
        };
        Some(marker)
    }

    pub fn binding(&self) -> ParamBinding {
        match self {
            ParamMarker::PathVariable | ParamMarker::PathParam => ParamBinding::Located(ParameterLocation::Path),
            ParamMarker::RequestParam | ParamMarker::QueryParam => ParamBinding::Located(ParameterLocation::Query),
            ParamMarker::RequestHeader | ParamMarker::HeaderParam => ParamBinding::Located(ParameterLocation::Header),
            ParamMarker::FormParam => ParamBinding::Located(ParameterLocation::Form),
            ParamMarker::RequestBody => ParamBinding::Body,
            ParamMarker::BeanParam | ParamMarker::Context => ParamBinding::Ignored,
        }
    }

    /// Path markers are always required; the rest only with an explicit `required = true`
    pub fn is_required(&self, annotation: &Annotation) -> bool {
        match self {
            ParamMarker::PathVariable | ParamMarker::PathParam => true,
            _ => annotation.argument("required")
                .and_then(|value| value.first_text())
                .map(|text| text.trim() == "true")
                .unwrap_or(false),
        }
    }
}

/// Highest-priority parameter marker and its annotation
pub fn param_marker(annotations: &[Annotation]) -> Option<(ParamMarker, &Annotation)> {
    annotations.iter()
        .filter_map(|a| ParamMarker::from_annotation(&a.name).map(|m| (m, a)))
        .min_by_key(|(marker, _)| *marker)
}

/// Request/response plumbing types that are never a request body
const FRAMEWORK_CONTEXT_TYPES: &[&str] = &[
    "HttpServletRequest", "HttpServletResponse", "ServletRequest", "ServletResponse",
    "HttpSession", "Model", "ModelMap", "BindingResult", "Principal", "Authentication",
    "Pageable", "Sort", "Locale", "WebRequest", "ServerWebExchange", "UriInfo", "HttpHeaders",
    "SecurityContext", "Request", "AsyncResponse", "ContainerRequestContext",
];

pub fn is_framework_context_type(type_name: &str) -> bool {
    let raw = crate::core::languages::raw_type_name(type_name);
    let simple = crate::core::languages::simple_name(&raw);
    FRAMEWORK_CONTEXT_TYPES.contains(&simple)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::languages::ElementValue;

    fn annotation(name: &str, arguments: Vec<(&str, ElementValue)>) -> Annotation {
        Annotation {
            name: name.to_string(),
            arguments: arguments.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    #[test]
    fn test_verb_mapping_outranks_other_dialects() {
        let annotations = vec![
            annotation("POST", vec![]),
            annotation("Path", vec![("value", ElementValue::Str("/jaxrs".into()))]),
            annotation("GetMapping", vec![("value", ElementValue::Str("/{id}".into()))]),
        ];

        let route = resolve_route(&annotations).unwrap();
        assert_eq!(route, Route { verb: "GET".into(), path: "/{id}".into() });
    }

    #[test]
    fn test_request_mapping_verb() {
        let explicit = annotation("RequestMapping", vec![
            ("path", ElementValue::Array(vec![ElementValue::Str("/a".into()), ElementValue::Str("/b".into())])),
            ("method", ElementValue::Expr("RequestMethod.PUT".into())),
        ]);
        assert_eq!(
            resolve_route(&[explicit]).unwrap(),
            Route { verb: "PUT".into(), path: "/a".into() }
        );

        let implicit = annotation("RequestMapping", vec![("value", ElementValue::Str("/x".into()))]);
        assert_eq!(resolve_route(&[implicit]).unwrap().verb, "GET");
    }

    #[test]
    fn test_verb_marker_takes_separate_path() {
        let annotations = vec![
            annotation("DELETE", vec![]),
            annotation("Path", vec![("value", ElementValue::Str("/{id}".into()))]),
        ];
        assert_eq!(
            resolve_route(&annotations).unwrap(),
            Route { verb: "DELETE".into(), path: "/{id}".into() }
        );
        assert!(resolve_route(&[annotation("Override", vec![])]).is_none());
    }

    #[test]
    fn test_param_markers() {
        let path = annotation("PathParam", vec![("value", ElementValue::Str("id".into()))]);
        let (marker, _) = param_marker(std::slice::from_ref(&path)).unwrap();
        assert_eq!(marker.binding(), ParamBinding::Located(ParameterLocation::Path));
        assert!(marker.is_required(&path));

        let query = annotation("RequestParam", vec![("required", ElementValue::Expr("true".into()))]);
        assert!(ParamMarker::RequestParam.is_required(&query));
        assert!(!ParamMarker::QueryParam.is_required(&annotation("QueryParam", vec![])));

        assert!(is_framework_context_type("javax.servlet.http.HttpServletRequest"));
        assert!(!is_framework_context_type("CreateOrderRequest"));
    }
}
