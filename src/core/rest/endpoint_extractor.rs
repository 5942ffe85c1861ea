// src/core/rest/endpoint_extractor.rs
use rayon::prelude::*;
use tracing::debug;

use crate::core::index::{ClassRecord, MethodId, MethodRecord, SourceIndex};
use super::dialect::{
    class_base_path, is_framework_context_type, is_rest_surface, param_marker, resolve_route, ParamBinding,
};
use super::model::{Endpoint, Parameter};

/// An endpoint together with the method that declares it
#[derive(Debug, Clone)]
pub struct ExtractedEndpoint {
    pub endpoint: Endpoint,
    pub method: MethodId,
}

/// Extract endpoints from every REST surface in the index.
///
/// Classes are processed in parallel; the result keeps file order, then
/// declaration order.
pub fn extract_all(index: &SourceIndex) -> Vec<ExtractedEndpoint> {
    let classes: Vec<&ClassRecord> = index.classes().collect();

    classes
        .par_iter()
        .flat_map_iter(|class| extract_endpoints(class, index))
        .collect()
}

/// Endpoints declared by one class; empty when the class is not a REST surface
pub fn extract_endpoints(class: &ClassRecord, index: &SourceIndex) -> Vec<ExtractedEndpoint> {
    if !is_rest_surface(&class.annotations) {
        return Vec::new();
    }

    let base_path = class_base_path(&class.annotations);
    let mut endpoints = Vec::new();

    for (id, method) in index.methods_of(class) {
        let Some(route) = resolve_route(&method.annotations) else {
            continue;
        };

        let uri = join_paths(&base_path, &route.path);
        debug!("Found endpoint {} {} on {}.{}", route.verb, uri, class.simple_name, method.name);

        endpoints.push(ExtractedEndpoint {
            endpoint: build_endpoint(method, uri, route.verb),
            method: id,
        });
    }

    endpoints
}

fn build_endpoint(method: &MethodRecord, uri: String, http_method: String) -> Endpoint {
    let javadoc = method.javadoc.as_ref();
    let mut parameters = Vec::new();
    let mut request_body_type = None;

    for param in &method.parameters {
        let description = javadoc
            .and_then(|doc| doc.param(&param.name))
            .map(str::to_string);

        match param_marker(&param.annotations) {
            Some((marker, annotation)) => match marker.binding() {
                ParamBinding::Located(location) => {
                    let name = annotation.string_argument(&["value", "name"])
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| param.name.clone());
                    parameters.push(Parameter {
                        name,
                        location,
                        type_name: param.type_name.clone(),
                        required: marker.is_required(annotation),
                        description,
                    });
                }
                ParamBinding::Body => request_body_type = Some(param.type_name.clone()),
                ParamBinding::Ignored => {}
            },
            // Several unannotated payload parameters: the last one wins
            None if !is_framework_context_type(&param.type_name) => {
                request_body_type = Some(param.type_name.clone());
            }
            None => {}
        }
    }

    let summary = javadoc
        .and_then(|doc| doc.summary())
        .map(str::to_string)
        .unwrap_or_else(|| method.name.clone());

    Endpoint {
        uri,
        http_method,
        operation_id: method.name.clone(),
        summary: Some(summary),
        description: method.javadoc_text().map(str::to_string),
        business_semantic: None,
        parameters,
        request_body_type,
        response_type: Some(method.return_type.clone()),
        error_code_refs: Vec::new(),
    }
}

/// Leading `/`, no trailing `/` unless the path is exactly `/`; empty stays empty
pub fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return String::new();
    }

    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

/// Concatenate a class path and a method path, each normalized on its own
pub fn join_paths(base: &str, path: &str) -> String {
    let base = normalize_path(base);
    let path = normalize_path(path);

    let joined = match (base.as_str(), path.as_str()) {
        ("/", _) => path,
        (_, "/") => base,
        _ => base + &path,
    };

    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index::test_support::index_sources;
    use crate::core::rest::model::ParameterLocation;

    const ORDER_CONTROLLER: &str = r#"
        package com.shop.web;

        import org.springframework.web.bind.annotation.*;

        @RestController
        @RequestMapping("/orders")
        public class OrderController {
            private final OrderService orderService;

            /**
             * Create an order.
             * Validates stock first.
             */
            @PostMapping
            public OrderDto create(@RequestBody CreateOrderRequest request) {
                return orderService.create(request);
            }

            /**
             * Fetch one order.
             * @param id the order id
             */
            @GetMapping("/{id}")
            public OrderDto get(@PathVariable Long id, HttpServletRequest servletRequest) {
                return orderService.get(id);
            }

            @DeleteMapping(value = "/{id}/")
            public void delete(@PathVariable("id") Long orderId) {
                orderService.delete(orderId);
            }

            private void helper() {}
        }
    "#;

    #[test]
    fn test_controller_end_to_end() {
        let index = index_sources(&[("OrderController.java", ORDER_CONTROLLER)]);
        let class = index.class("com.shop.web.OrderController").unwrap();
        let endpoints: Vec<Endpoint> = extract_endpoints(class, &index).into_iter().map(|e| e.endpoint).collect();

        let routes: Vec<(&str, &str)> = endpoints.iter()
            .map(|e| (e.http_method.as_str(), e.uri.as_str()))
            .collect();
        assert_eq!(routes, vec![("POST", "/orders"), ("GET", "/orders/{id}"), ("DELETE", "/orders/{id}")]);

        let create = &endpoints[0];
        assert!(create.parameters.is_empty());
        assert_eq!(create.request_body_type.as_deref(), Some("CreateOrderRequest"));
        assert_eq!(create.summary.as_deref(), Some("Create an order."));
        assert_eq!(create.description.as_deref(), Some("Create an order.\nValidates stock first."));
        assert_eq!(create.response_type.as_deref(), Some("OrderDto"));

        let get = &endpoints[1];
        assert_eq!(get.parameters.len(), 1);
        assert_eq!(get.parameters[0].name, "id");
        assert_eq!(get.parameters[0].location, ParameterLocation::Path);
        assert!(get.parameters[0].required);
        assert_eq!(get.parameters[0].description.as_deref(), Some("the order id"));
        assert_eq!(get.request_body_type, None);

        let delete = &endpoints[2];
        assert_eq!(delete.parameters[0].name, "id");
        assert!(delete.parameters[0].required);
        assert_eq!(delete.summary.as_deref(), Some("delete"));
    }

    #[test]
    fn test_jaxrs_resource() {
        let index = index_sources(&[(
            "ProductResource.java",
            r#"
            package com.shop.api;

            @Path("/api/v1/products/")
            public class ProductResource {
                @GET
                @Path("/{id}")
                public Product find(@PathParam("id") String id, @QueryParam("expand") String expand,
                                    @HeaderParam("X-Tenant") String tenant, @Context UriInfo uriInfo) {
                    return null;
                }

                @POST
                public Response create(Product product, @BeanParam Filters filters) {
                    return null;
                }

                @PUT
                @Path("{id}/stock")
                public void restock(@PathParam("id") String id, @FormParam("count") int count) {}
            }
            "#,
        )]);
        let class = index.class("com.shop.api.ProductResource").unwrap();
        let endpoints: Vec<Endpoint> = extract_endpoints(class, &index).into_iter().map(|e| e.endpoint).collect();

        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints[0].uri, "/api/v1/products/{id}");
        let locations: Vec<_> = endpoints[0].parameters.iter().map(|p| (p.name.as_str(), p.location, p.required)).collect();
        assert_eq!(
            locations,
            vec![
                ("id", ParameterLocation::Path, true),
                ("expand", ParameterLocation::Query, false),
                ("X-Tenant", ParameterLocation::Header, false),
            ]
        );
        assert_eq!(endpoints[0].request_body_type, None);

        assert_eq!(endpoints[1].http_method, "POST");
        assert_eq!(endpoints[1].uri, "/api/v1/products");
        assert_eq!(endpoints[1].request_body_type.as_deref(), Some("Product"));

        assert_eq!(endpoints[2].uri, "/api/v1/products/{id}/stock");
        assert_eq!(endpoints[2].parameters[1].location, ParameterLocation::Form);
    }

    #[test]
    fn test_request_mapping_method_on_method() {
        let index = index_sources(&[(
            "StockController.java",
            r#"
            package com.shop.web;

            import org.springframework.web.bind.annotation.*;

            @RestController
            @RequestMapping("/stock")
            public class StockController {
                @RequestMapping(value = "/{sku}", method = RequestMethod.PUT)
                public void restock(@PathVariable String sku, @RequestBody RestockRequest request) {}

                @RequestMapping(path = "/{sku}/history", method = {RequestMethod.DELETE, RequestMethod.POST})
                public void clearHistory(@PathVariable String sku) {}

                @RequestMapping("/levels")
                public List<StockLevel> levels() { return null; }
            }
            "#,
        )]);
        let class = index.class("com.shop.web.StockController").unwrap();
        let endpoints: Vec<Endpoint> = extract_endpoints(class, &index).into_iter().map(|e| e.endpoint).collect();

        let keys: Vec<String> = endpoints.iter().map(Endpoint::key).collect();
        assert_eq!(
            keys,
            vec![
                "PUT /stock/{sku}".to_string(),
                "DELETE /stock/{sku}/history".to_string(),
                "GET /stock/levels".to_string(),
            ]
        );
        assert_eq!(endpoints[0].request_body_type.as_deref(), Some("RestockRequest"));
    }

    #[test]
    fn test_rest_schema_and_unmarked_classes() {
        let index = index_sources(&[
            (
                "FileDelegate.java",
                r#"
                package com.files;
                @RestSchema(schemaId = "files")
                @Path("/files")
                public class FileDelegateImpl {
                    @DELETE
                    @Path("/{name}")
                    public boolean remove(@PathParam("name") String name) { return true; }
                    public void notAnEndpoint() {}
                }
                "#,
            ),
            (
                "Plain.java",
                "package com.files; public class Plain { @GetMapping(\"/x\") public void x() {} }",
            ),
        ]);

        let all: Vec<_> = extract_all(&index).into_iter().map(|e| e.endpoint.key()).collect();
        assert_eq!(all, vec!["DELETE /files/{name}".to_string()]);
    }

    #[test]
    fn test_last_unannotated_payload_wins() {
        let index = index_sources(&[(
            "R.java",
            "@Path(\"/r\") class R { @POST public void send(First a, Second b) {} }",
        )]);
        let endpoints = extract_all(&index);
        assert_eq!(endpoints[0].endpoint.request_body_type.as_deref(), Some("Second"));
    }

    #[test]
    fn test_path_joining() {
        assert_eq!(normalize_path("orders/"), "/orders");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "");

        for (base, path, expected) in [
            ("/api/v1/orders", "/{id}", "/api/v1/orders/{id}"),
            ("api/v1/orders/", "{id}/", "/api/v1/orders/{id}"),
            ("", "", "/"),
            ("/", "/", "/"),
            ("/", "/health", "/health"),
            ("/a", "/", "/a"),
        ] {
            assert_eq!(join_paths(base, path), expected, "{} + {}", base, path);
        }
    }
}
