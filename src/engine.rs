//! Response resolution pipeline.
//!
//! For each request: regenerate a dynamic body (synthesize, then evaluate
//! deferred leaves), let the guard override status and body, then
//! interpolate request values into the result.

use crate::cache::InterfaceCache;
use crate::config::{EndpointDefinition, MockConfig, Settings};
use crate::context::RequestContext;
use crate::descriptor::Interface;
use crate::expr::ExpressionEvaluator;
use crate::guard::{self, Branch, GuardSpec, ResponseShape, ResponseSpec};
use crate::interpolate::Interpolator;
use crate::source::{DirectorySource, InterfaceSource, MemorySource, SourceError};
use crate::synth::{SynthesisMode, Synthesizer};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Explicitly constructed engine dependencies.
#[derive(Clone)]
pub struct EngineConfig {
    pub verbose: bool,
    pub cache: Arc<InterfaceCache>,
    pub source: Arc<dyn InterfaceSource>,
}

impl EngineConfig {
    pub fn new(source: Arc<dyn InterfaceSource>) -> Self {
        Self {
            verbose: false,
            cache: Arc::new(InterfaceCache::new()),
            source,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_cache(mut self, cache: Arc<InterfaceCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Build from settings; a relative `interfaces_dir` resolves against `base_dir`.
    pub fn from_settings(settings: &Settings, base_dir: &Path) -> Result<Self, SourceError> {
        let source: Arc<dyn InterfaceSource> = match &settings.interfaces_dir {
            Some(dir) => Arc::new(DirectorySource::new(
                base_dir.join(dir),
                &settings.interface_globs,
            )?),
            None => Arc::new(MemorySource::new()),
        };

        Ok(Self::new(source).with_verbose(settings.verbose))
    }
}

/// Final status and body handed back to the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedResponse {
    pub status: u16,
    pub body: Value,
}

impl ResolvedResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// An endpoint ready to serve.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub id: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    /// Default body, used when the endpoint is not dynamic
    pub body: Value,
    /// Interface re-synthesized per request when `dynamic`
    pub interface: Option<Arc<Interface>>,
    pub dynamic: bool,
    pub guard: Option<GuardSpec>,
}

impl Endpoint {
    /// An endpoint with a fixed body and no guard.
    pub fn fixed(
        id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        body: Value,
    ) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            path: path.into(),
            status,
            body,
            interface: None,
            dynamic: false,
            guard: None,
        }
    }

    /// Serve a freshly synthesized body per request.
    pub fn with_dynamic_interface(mut self, interface: Arc<Interface>) -> Self {
        self.interface = Some(interface);
        self.dynamic = true;
        self
    }

    pub fn with_guard(mut self, guard: GuardSpec) -> Self {
        self.guard = Some(guard);
        self
    }
}

/// The synthesis and resolution engine.
pub struct ResponseEngine {
    config: EngineConfig,
    synthesizer: Synthesizer,
    interpolator: Interpolator,
    /// Total requests resolved.
    requests_total: AtomicU64,
    /// Requests where the guard chose the left branch.
    guard_left: AtomicU64,
    /// Requests where the guard chose the right branch.
    guard_right: AtomicU64,
    /// Interface references that fell back to a generic body.
    fallbacks: AtomicU64,
}

impl ResponseEngine {
    /// Create a new engine with the given dependencies.
    pub fn new(config: EngineConfig) -> Self {
        let synthesizer = Synthesizer::new(Arc::new(ExpressionEvaluator::new()), config.verbose);

        Self {
            config,
            synthesizer,
            interpolator: Interpolator::new(),
            requests_total: AtomicU64::new(0),
            guard_left: AtomicU64::new(0),
            guard_right: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    pub fn cache(&self) -> &InterfaceCache {
        &self.config.cache
    }

    /// Get total requests resolved.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get guard branch counts as `(left, right)`.
    pub fn guard_counts(&self) -> (u64, u64) {
        (
            self.guard_left.load(Ordering::Relaxed),
            self.guard_right.load(Ordering::Relaxed),
        )
    }

    /// Get the number of unresolved interface references.
    pub fn total_fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Locate an interface by name across all source files.
    pub async fn find_interface(&self, name: &str) -> Option<Arc<Interface>> {
        let files = match self.config.source.files().await {
            Ok(files) => files,
            Err(e) => {
                warn!(interface = %name, error = %e, "Failed to read interface sources");
                return None;
            }
        };

        for file in &files {
            if let Some(interface) = self.config.cache.get_or_parse(file).await.get(name) {
                return Some(interface);
            }
        }

        None
    }

    /// Prepare every endpoint in a configuration.
    pub async fn prepare_all(&self, config: &MockConfig) -> Vec<Endpoint> {
        let mut endpoints = Vec::with_capacity(config.endpoints.len());
        for definition in &config.endpoints {
            endpoints.push(self.prepare(definition).await);
        }

        info!(
            endpoints = endpoints.len(),
            dynamic = endpoints.iter().filter(|e| e.dynamic).count(),
            guarded = endpoints.iter().filter(|e| e.guard.is_some()).count(),
            "Endpoints prepared"
        );

        endpoints
    }

    /// Turn a definition into a servable endpoint.
    ///
    /// An invalid guard is reported and dropped. A missing interface leaves the
    /// endpoint with its static body.
    pub async fn prepare(&self, definition: &EndpointDefinition) -> Endpoint {
        let guard = definition.guard.as_ref().and_then(|raw| {
            GuardSpec::from_definition(raw)
                .map_err(|e| {
                    warn!(endpoint = %definition.id, error = %e, "Invalid guard, serving without it");
                })
                .ok()
        });

        let mut endpoint = Endpoint::fixed(
            definition.id.clone(),
            definition.method.clone(),
            definition.path.clone(),
            definition.status,
            definition.body.clone().unwrap_or(Value::Null),
        );
        endpoint.guard = guard;

        if let Some(name) = &definition.interface {
            match self.find_interface(name).await {
                Some(interface) if definition.dynamic => {
                    endpoint = endpoint.with_dynamic_interface(interface);
                }
                Some(interface) => {
                    endpoint.body = self.synthesizer.synthesize_value(&interface.fields, None);
                }
                None => {
                    warn!(endpoint = %definition.id, interface = %name, "Interface not found");
                }
            }
        }

        endpoint
    }

    /// Resolve the response for one request. Never fails.
    pub async fn resolve(&self, endpoint: &Endpoint, ctx: &RequestContext) -> ResolvedResponse {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let mut response = ResolvedResponse::new(endpoint.status, self.base_body(endpoint, ctx));

        if let Some(guard) = &endpoint.guard {
            let (branch, spec) = guard.select(ctx);
            match branch {
                Branch::Left => self.guard_left.fetch_add(1, Ordering::Relaxed),
                Branch::Right => self.guard_right.fetch_add(1, Ordering::Relaxed),
            };
            debug!(
                endpoint = %endpoint.id,
                branch = ?branch,
                field = %guard.condition.field,
                operator = %guard.condition.operator,
                "Guard evaluated"
            );
            response = self.resolve_branch(spec, ctx).await;
        }

        response.body = self.interpolator.interpolate(&response.body, ctx);
        response
    }

    fn base_body(&self, endpoint: &Endpoint, ctx: &RequestContext) -> Value {
        match (&endpoint.interface, endpoint.dynamic) {
            (Some(interface), true) => {
                let tree = self
                    .synthesizer
                    .synthesize(&interface.fields, SynthesisMode::Deferred, None);
                self.synthesizer.evaluate_deferred(&tree, &ctx.body)
            }
            _ => endpoint.body.clone(),
        }
    }

    /// Produce the response for a selected guard branch.
    pub async fn resolve_branch(&self, spec: &ResponseSpec, ctx: &RequestContext) -> ResolvedResponse {
        match &spec.shape {
            ResponseShape::Inline(body) => ResolvedResponse::new(spec.status, body.clone()),
            ResponseShape::Reference(name) => match self.find_interface(name).await {
                Some(interface) => {
                    let body = self
                        .synthesizer
                        .synthesize_value(&interface.fields, Some(&ctx.body));
                    ResolvedResponse::new(spec.status, body)
                }
                None => {
                    self.fallbacks.fetch_add(1, Ordering::Relaxed);
                    if self.config.verbose {
                        debug!(interface = %name, "Guard interface not found, using generic body");
                    }
                    ResolvedResponse::new(spec.status, guard::fallback_body(name, spec.status))
                }
            },
        }
    }
}
