// src/core/engine.rs
use std::path::{Path, PathBuf};
use anyhow::{Context as _, Result};
use tracing::{info, warn, debug};

use crate::config::Config;
use super::{
    ContextBuilder, ContextBundle, SourceIndex, SourceLoader, SpecEnhancer, SpecExporter,
    SpecMerger, SpecResult, EndpointContext, ErrorCode, ErrorCodeContext, ExtractedEndpoint,
    NoOpEnhancer,
};
use super::llm::create_enhancer;
use super::rest::{extract_all, extract_error_codes};

/// Options of one `analyze` run that override the configuration
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub depth: Option<usize>,
    pub max_chars: Option<usize>,
    pub merge: Option<PathBuf>,
    pub no_llm: bool,
}

/// Main orchestration engine for Specsworth
pub struct Engine {
    config: Config,
    loader: SourceLoader,
    exporter: SpecExporter,
}

impl Engine {
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let loader = SourceLoader::new(&config.parsing);
        let exporter = SpecExporter::new()?;

        Ok(Self { config, loader, exporter })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline and write the requested outputs
    pub async fn analyze(&self, options: AnalyzeOptions) -> Result<SpecResult> {
        let source_dirs = match options.source {
            Some(source) => vec![source],
            None => self.config.project.source_dirs.clone(),
        };
        let output_dir = options.output.unwrap_or_else(|| self.config.project.output_dir.clone());

        let mut analysis = self.config.analysis.clone();
        if let Some(depth) = options.depth {
            analysis.call_chain_depth = depth;
        }
        if let Some(max_chars) = options.max_chars {
            analysis.call_chain_max_chars = max_chars;
        }

        info!("🔍 Analyzing REST surface...");
        for dir in &source_dirs {
            info!("Source: {}", dir.display());
        }
        info!("Output: {}", output_dir.display());

        // Step 1: load and parse
        let files = self.loader.load_directories(&source_dirs)?;
        info!("📂 Parsed {} source files", files.len());

        // Step 2: index
        let index = SourceIndex::build(&files)?;
        info!("🗂️ Indexed {} classes and {} methods", index.class_count(), index.method_count());

        // Step 3: extract
        let extracted_codes = extract_error_codes(&index);
        let mut endpoints = extract_all(&index);
        info!("🌐 Found {} endpoints and {} error codes", endpoints.len(), extracted_codes.len());

        // Step 4: contexts and call chains
        info!("🔗 Resolving call chains...");
        let builder = ContextBuilder::new(&index, &analysis);
        let mut error_codes: Vec<ErrorCode> = extracted_codes.iter().map(|c| c.error_code.clone()).collect();
        let endpoint_contexts = builder.build_endpoint_contexts(&mut endpoints, &error_codes);
        let error_contexts: Vec<ErrorCodeContext> = extracted_codes.iter()
            .map(|code| builder.error_code_context(code))
            .collect();

        // Step 5: enhance
        let enhancer = self.enhancer(options.no_llm);
        if enhancer.is_enabled() {
            info!("🤖 Enhancing with {}...", enhancer.provider_name());
            enhance_endpoints(enhancer.as_ref(), &mut endpoints, &endpoint_contexts).await;
            enhance_error_codes(enhancer.as_ref(), &mut error_codes, &error_contexts).await;
        }

        let mut spec = SpecResult {
            endpoints: endpoints.into_iter().map(|e| e.endpoint).collect(),
            error_codes,
            ..SpecResult::default()
        };

        // Step 6: merge
        if let Some(merge_path) = options.merge {
            info!("🔀 Merging {}", merge_path.display());
            let content = std::fs::read_to_string(&merge_path)
                .with_context(|| format!("Failed to read {}", merge_path.display()))?;
            let external: SpecResult = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", merge_path.display()))?;
            spec = SpecMerger::merge(spec, external);
        }

        // Step 7: export
        let bundle = self.config.output.include_context.then(|| ContextBundle {
            endpoints: endpoint_contexts,
            error_codes: error_contexts,
        });
        let written = self.exporter.export(&spec, bundle.as_ref(), &output_dir, &self.config.output.formats)?;

        info!("✅ Wrote {} files:", written.len());
        for path in &written {
            info!("  - {}", path.display());
        }

        Ok(spec)
    }

    /// Write the default configuration into `path` (or the current directory)
    pub async fn init(&self, path: Option<PathBuf>) -> Result<PathBuf> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        info!("Initializing Specsworth in: {}", target_dir.display());

        std::fs::create_dir_all(&target_dir)?;
        let config_path = target_dir.join("specsworth.toml");
        if config_path.exists() {
            warn!("⚠️ {} already exists, leaving it untouched", config_path.display());
            return Ok(config_path);
        }

        Config::default().save(&config_path)?;
        info!("✅ Wrote {}", config_path.display());
        Ok(config_path)
    }

    fn enhancer(&self, no_llm: bool) -> Box<dyn SpecEnhancer> {
        if no_llm {
            debug!("LLM enhancement disabled from the command line");
            return Box::new(NoOpEnhancer);
        }

        match create_enhancer(&self.config.llm) {
            Ok(enhancer) => enhancer,
            Err(e) => {
                warn!("⚠️ Failed to initialize LLM enhancer: {}", e);
                warn!("Continuing without LLM enhancement");
                Box::new(NoOpEnhancer)
            }
        }
    }
}

async fn enhance_endpoints(
    enhancer: &dyn SpecEnhancer,
    endpoints: &mut [ExtractedEndpoint],
    contexts: &[EndpointContext],
) {
    for (extracted, context) in endpoints.iter_mut().zip(contexts) {
        match enhancer.enhance_endpoint(context).await {
            Ok(Some(semantic)) => extracted.endpoint.business_semantic = Some(semantic),
            Ok(None) => debug!("No business semantics for {}", extracted.endpoint.key()),
            Err(e) => warn!("⚠️ Enhancement failed for {}: {}", extracted.endpoint.key(), e),
        }
    }
}

async fn enhance_error_codes(
    enhancer: &dyn SpecEnhancer,
    error_codes: &mut [ErrorCode],
    contexts: &[ErrorCodeContext],
) {
    for (code, context) in error_codes.iter_mut().zip(contexts) {
        match enhancer.enhance_error_code(context).await {
            Ok(Some(insight)) => {
                code.root_cause = insight.root_cause;
                code.handling_suggestion = insight.handling_suggestion;
                code.prevention = insight.prevention;
            }
            Ok(None) => debug!("No insight for {}", code.code),
            Err(e) => warn!("⚠️ Enhancement failed for {}: {}", code.code, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    #[tokio::test]
    async fn test_analyze_writes_spec_for_project() {
        let project = assert_fs::TempDir::new().unwrap();
        project.child("src/shop/OrderController.java").write_str(r#"
            package shop;

            @RestController
            @RequestMapping("/orders")
            public class OrderController {
                private OrderService service;

                /** Fetch an order. */
                @GetMapping("/{id}")
                public Order get(@PathVariable("id") Long id) {
                    return service.find(id);
                }
            }
        "#).unwrap();
        project.child("src/shop/OrderService.java").write_str(r#"
            package shop;

            public class OrderService {
                Order find(Long id) {
                    throw new OrderNotFoundException(id);
                }
            }
        "#).unwrap();
        project.child("src/shop/Handlers.java").write_str(r#"
            package shop;

            @RestControllerAdvice
            public class Handlers {
                /** Order missing */
                @ExceptionHandler(OrderNotFoundException.class)
                public ResponseEntity<String> notFound(OrderNotFoundException e) { return null; }
            }
        "#).unwrap();
        project.child("external.json").write_str(r#"{
            "endpoints": [{
                "uri": "/orders/{id}",
                "httpMethod": "GET",
                "operationId": "getOrder",
                "summary": "Get one order"
            }]
        }"#).unwrap();

        let mut config = Config::default();
        config.output.include_context = true;
        let engine = Engine::with_config(config).unwrap();

        let output = project.child("out");
        let spec = engine
            .analyze(AnalyzeOptions {
                source: Some(project.child("src").path().to_path_buf()),
                output: Some(output.path().to_path_buf()),
                merge: Some(project.child("external.json").path().to_path_buf()),
                no_llm: true,
                ..AnalyzeOptions::default()
            })
            .await
            .unwrap();

        assert_eq!(spec.endpoints.len(), 1);
        let endpoint = &spec.endpoints[0];
        assert_eq!(endpoint.key(), "GET /orders/{id}");
        assert_eq!(endpoint.summary.as_deref(), Some("Get one order"));
        assert_eq!(endpoint.error_code_refs.len(), 1);
        assert_eq!(spec.error_codes[0].http_status, 404);

        output.child("spec.json").assert(predicate::str::contains("OrderNotFoundException"));
        output.child("openapi.json").assert(predicate::str::contains("\"summary\": \"Get one order\""));
        output.child("api-docs.md").assert(predicate::str::contains("### GET /orders/{id}"));
        output.child("context.json").assert(predicate::str::contains("OrderService.find"));

        project.close().unwrap();
    }

    #[tokio::test]
    async fn test_init_writes_default_config_once() {
        let dir = assert_fs::TempDir::new().unwrap();
        let engine = Engine::with_config(Config::default()).unwrap();

        let path = engine.init(Some(dir.path().to_path_buf())).await.unwrap();
        assert_eq!(path, dir.path().join("specsworth.toml"));
        dir.child("specsworth.toml").assert(predicate::str::contains("call_chain_depth = 3"));

        std::fs::write(&path, "# edited").unwrap();
        engine.init(Some(dir.path().to_path_buf())).await.unwrap();
        dir.child("specsworth.toml").assert("# edited");

        dir.close().unwrap();
    }
}
