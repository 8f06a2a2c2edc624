//! The dependency-resolving wrapper ("argument helper").
//!
//! Fills in parameters the caller did not supply, from three sources in
//! precedence order: the caller's explicit value (which, when it is a string,
//! is treated as a replacement path and resolution restarts with it), concept
//! decomposition of a related object, and dotted-path lookup through the
//! attribute cache and the provider registry.
//!
//! The resolver composes outside the caching wrapper, so the cache-key hash
//! is computed over the fully resolved argument set.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use canopy_cache::AttributeCache;
use canopy_common::Value;

use crate::call::{canonicalize, CallArgs};
use crate::concept::Concept;
use crate::context::Context;
use crate::error::{EngineError, LookupError, ResolveError, ShapeError};
use crate::function::AttributeFn;
use crate::signature::Signature;

enum DependencyKind {
    /// A dotted attribute path resolved against the source object.
    Path(String),
    /// A concept decomposition of the source object.
    Concept(Arc<dyn Concept>),
}

/// One dependency descriptor of a wrapped function.
///
/// Unless overridden, the source parameter is the function's first declared
/// parameter (the owning object) and, for paths, the target parameter is the
/// last path segment.
pub struct Dependency {
    kind: DependencyKind,
    source: Option<String>,
    target: Option<String>,
}

impl Dependency {
    /// A dotted attribute path, e.g. `"leaf_graph.edge_length"`.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            kind: DependencyKind::Path(path.into()),
            source: None,
            target: None,
        }
    }

    /// A concept decomposition.
    pub fn concept(concept: Arc<dyn Concept>) -> Self {
        Self {
            kind: DependencyKind::Concept(concept),
            source: None,
            target: None,
        }
    }

    /// Resolves against the value of `parameter` instead of the first
    /// declared parameter.
    pub fn source(mut self, parameter: impl Into<String>) -> Self {
        self.source = Some(parameter.into());
        self
    }

    /// Fills `parameter` instead of the last path segment. Ignored for
    /// concept dependencies, whose targets come from their role names.
    pub fn target(mut self, parameter: impl Into<String>) -> Self {
        self.target = Some(parameter.into());
        self
    }

    fn target_for(&self, path: &str) -> String {
        match &self.target {
            Some(target) => target.clone(),
            None => path.rsplit('.').next().unwrap_or(path).to_string(),
        }
    }
}

/// Dependency-resolving wrapper around an [`AttributeFn`].
pub struct Resolver {
    inner: Arc<dyn AttributeFn>,
    deps: Vec<Dependency>,
}

impl Resolver {
    /// Wraps a function with dependency resolution.
    ///
    /// Descriptors are validated against the declared signature now, so a
    /// misspelled target or source parameter fails during setup.
    pub fn wrap(
        inner: Arc<dyn AttributeFn>,
        deps: Vec<Dependency>,
    ) -> Result<Arc<Self>, ShapeError> {
        let signature = inner.signature();
        for dep in &deps {
            if let Some(source) = &dep.source {
                if !signature.contains(source) {
                    return Err(ShapeError::UnknownSourceParameter {
                        function: inner.name().to_string(),
                        parameter: source.clone(),
                    });
                }
            }
            if let DependencyKind::Path(path) = &dep.kind {
                if path.is_empty() || path.split('.').any(str::is_empty) {
                    return Err(ShapeError::EmptyDependencyPath {
                        function: inner.name().to_string(),
                    });
                }
                let target = dep.target_for(path);
                if !signature.contains(&target) {
                    return Err(ShapeError::UnknownTargetParameter {
                        function: inner.name().to_string(),
                        parameter: target,
                    });
                }
            }
        }
        Ok(Arc::new(Self { inner, deps }))
    }

    fn resolve(
        &self,
        ctx: &Context,
        cache: &AttributeCache,
        signature: &Signature,
        named: &mut BTreeMap<String, Value>,
        debug: bool,
    ) -> Result<(), EngineError> {
        // Everything known so far: caller arguments plus decomposed roles,
        // whether or not they map onto declared parameters. Later
        // descriptors may source from values found by earlier ones.
        let mut found: BTreeMap<String, Value> = named.clone();

        for dep in &self.deps {
            let source = dep.source.as_deref().unwrap_or(signature.first_param());
            match &dep.kind {
                DependencyKind::Concept(concept) => {
                    let object = match found.get(source).and_then(Value::as_object) {
                        Some(object) => object.clone(),
                        // No source object to decompose; nothing to fill.
                        None => continue,
                    };
                    for (role, value) in concept.decompose(cache, &object) {
                        let parameter = concept.rename_role(&role).unwrap_or(role.as_str());
                        if signature.contains(parameter) && !named.contains_key(parameter) {
                            named.insert(parameter.to_string(), value.clone());
                        }
                        found.insert(role, value);
                    }
                }
                DependencyKind::Path(path) => {
                    let target = dep.target_for(path);
                    let effective_path = match named.get(&target) {
                        // An explicit string restarts resolution with the
                        // caller's path instead of the declared one.
                        Some(Value::Str(replacement)) => {
                            let replacement = replacement.clone();
                            named.remove(&target);
                            found.remove(&target);
                            replacement
                        }
                        // Any other explicit value wins outright.
                        Some(_) => continue,
                        None => path.clone(),
                    };

                    let root = found.get(source).cloned().unwrap_or(Value::Unit);
                    match lookup_path(ctx, cache, &root, &effective_path) {
                        Ok(value) => {
                            named.insert(target.clone(), value.clone());
                            found.insert(target, value);
                        }
                        Err(cause) => {
                            let required = signature
                                .param(&target)
                                .map_or(true, |p| p.default.is_none());
                            if required {
                                return Err(ResolveError::new(
                                    self.inner.name(),
                                    &target,
                                    &effective_path,
                                    &root.to_string(),
                                    cause,
                                    debug,
                                )
                                .into());
                            }
                            // A declared default applies; the miss is silent.
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolver({})", self.inner.name())
    }
}

impl AttributeFn for Resolver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn signature(&self) -> &Signature {
        self.inner.signature()
    }

    fn resolves_dependencies(&self) -> bool {
        true
    }

    fn call(&self, ctx: &Context, mut args: CallArgs) -> Result<Value, EngineError> {
        args.extract_reserved(self.inner.name())?;
        let (positional, named, options, cache_override) = args.into_parts();
        let cache = cache_override
            .clone()
            .unwrap_or_else(|| ctx.cache().clone());
        let signature = self.inner.signature();

        // Canonicalize without defaults: a parameter is only "missing" for
        // resolution purposes if the caller truly did not supply it.
        let mut named = canonicalize(self.inner.name(), signature, positional, named, false)?;
        self.resolve(ctx, &cache, signature, &mut named, options.debug)?;

        self.inner
            .call(ctx, CallArgs::from_parts(named, options, cache_override))
    }
}

/// Resolves a dotted path against a value, one segment at a time.
///
/// Each segment is looked up in the current object's attribute cache first,
/// then in the provider registry; the obtained value becomes the current
/// object for the remaining segments.
fn lookup_path(
    ctx: &Context,
    cache: &AttributeCache,
    current: &Value,
    path: &str,
) -> Result<Value, LookupError> {
    let object = match current.as_object() {
        Some(object) => object,
        None => {
            return Err(LookupError::NotAnObject {
                path: path.to_string(),
                value: current.to_string(),
            })
        }
    };

    let (segment, rest) = match path.split_once('.') {
        Some((segment, rest)) => (segment, Some(rest)),
        None => (path, None),
    };

    let value = if let Some(value) = cache.get_attribute(object, segment) {
        value
    } else if let Some(provider) = ctx.providers().lookup(segment) {
        provider
            .call(ctx, object)
            .map_err(|source| LookupError::Provider {
                name: segment.to_string(),
                path: path.to_string(),
                source: Box::new(source),
            })?
    } else {
        return Err(LookupError::NotFound {
            path: path.to_string(),
            segment: segment.to_string(),
            object: object.label().to_string(),
        });
    };

    match rest {
        Some(rest) => lookup_path(ctx, cache, &value, rest),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cached::Cached;
    use crate::concept::RoleConcept;
    use crate::function::RawFn;
    use crate::signature::Param;
    use canopy_common::ObjectHandle;

    fn consumer() -> Arc<dyn AttributeFn> {
        let sig = Signature::new(vec![
            Param::required("graph"),
            Param::required("area"),
            Param::optional("scale", Value::Int(1)),
        ])
        .unwrap();
        RawFn::shared("compactness", sig, |_ctx, args| {
            Ok(args.require("area")?.clone())
        })
    }

    #[test]
    fn provider_fills_a_missing_argument() {
        let ctx = Context::new();
        ctx.register_provider("area", "", |_ctx, _obj| Ok(Value::Float(1.0)));
        let f = Resolver::wrap(consumer(), vec![Dependency::path("area")]).unwrap();

        let g = ObjectHandle::new(());
        let out = f.call(&ctx, CallArgs::new().arg(&g)).unwrap();
        assert_eq!(out, Value::Float(1.0));
    }

    #[test]
    fn cached_attribute_beats_the_provider() {
        let ctx = Context::new();
        ctx.register_provider("area", "", |_ctx, _obj| Ok(Value::Float(1.0)));
        let f = Resolver::wrap(consumer(), vec![Dependency::path("area")]).unwrap();

        let g = ObjectHandle::new(());
        ctx.set_attribute(&g, "area", Value::Float(9.0));
        let out = f.call(&ctx, CallArgs::new().arg(&g)).unwrap();
        assert_eq!(out, Value::Float(9.0));
    }

    #[test]
    fn explicit_argument_is_never_overwritten() {
        let ctx = Context::new();
        ctx.register_provider("area", "", |_ctx, _obj| Ok(Value::Float(1.0)));
        let f = Resolver::wrap(consumer(), vec![Dependency::path("area")]).unwrap();

        let g = ObjectHandle::new(());
        let out = f
            .call(&ctx, CallArgs::new().arg(&g).named("area", Value::Float(5.0)))
            .unwrap();
        assert_eq!(out, Value::Float(5.0));
    }

    #[test]
    fn explicit_string_restarts_resolution_with_a_new_path() {
        let ctx = Context::new();
        let f = Resolver::wrap(consumer(), vec![Dependency::path("area")]).unwrap();

        let g = ObjectHandle::new(());
        ctx.set_attribute(&g, "area_fine", Value::Float(7.0));
        let out = f
            .call(&ctx, CallArgs::new().arg(&g).named("area", "area_fine"))
            .unwrap();
        assert_eq!(out, Value::Float(7.0));
    }

    #[test]
    fn dotted_path_through_a_concept_link() {
        let ctx = Context::new();
        let hierarchy = RoleConcept::new("hierarchy").role("leaf_graph");

        let tree = ObjectHandle::with_label("tree", ());
        let graph = ObjectHandle::with_label("leaf graph", ());
        hierarchy
            .link(
                ctx.cache(),
                &tree,
                vec![("leaf_graph".to_string(), Value::from(&graph))],
            )
            .unwrap();
        ctx.set_attribute(&graph, "edge_length", Value::Float(3.0));

        let sig = Signature::new(vec![
            Param::required("tree"),
            Param::required("edge_length"),
        ])
        .unwrap();
        let f = Resolver::wrap(
            RawFn::shared("perimeter", sig, |_ctx, args| {
                Ok(args.require("edge_length")?.clone())
            }),
            vec![Dependency::path("leaf_graph.edge_length")],
        )
        .unwrap();

        let out = f.call(&ctx, CallArgs::new().arg(&tree)).unwrap();
        assert_eq!(out, Value::Float(3.0), "same value as reading edge_length on the graph");
        assert_eq!(
            ctx.get_attribute(&graph, "edge_length"),
            Some(Value::Float(3.0))
        );
    }

    #[test]
    fn concept_roles_fill_declared_parameters() {
        let ctx = Context::new();
        let hierarchy: Arc<dyn Concept> =
            Arc::new(RoleConcept::new("hierarchy").role("leaf_graph"));

        let tree = ObjectHandle::new(());
        let graph = ObjectHandle::new(());
        ctx.set_attribute(&tree, "leaf_graph", Value::from(&graph));

        let sig = Signature::new(vec![
            Param::required("tree"),
            Param::required("leaf_graph"),
        ])
        .unwrap();
        let f = Resolver::wrap(
            RawFn::shared("leaves", sig, |_ctx, args| {
                Ok(args.require("leaf_graph")?.clone())
            }),
            vec![Dependency::concept(hierarchy)],
        )
        .unwrap();

        let out = f.call(&ctx, CallArgs::new().arg(&tree)).unwrap();
        assert_eq!(out, Value::from(&graph));
    }

    #[test]
    fn concept_rename_maps_role_to_parameter() {
        let ctx = Context::new();
        let concept: Arc<dyn Concept> =
            Arc::new(RoleConcept::new("grid").role_as("shape", "grid_shape"));

        let g = ObjectHandle::new(());
        ctx.set_attribute(&g, "shape", Value::Seq(vec![Value::Int(2), Value::Int(3)]));

        let sig = Signature::new(vec![
            Param::required("graph"),
            Param::required("grid_shape"),
        ])
        .unwrap();
        let f = Resolver::wrap(
            RawFn::shared("grid_area", sig, |_ctx, args| {
                Ok(args.require("grid_shape")?.clone())
            }),
            vec![Dependency::concept(concept)],
        )
        .unwrap();

        let out = f.call(&ctx, CallArgs::new().arg(&g)).unwrap();
        assert_eq!(out, Value::Seq(vec![Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn indirect_attribute_needs_the_dotted_form() {
        let ctx = Context::new();
        let hierarchy: Arc<dyn Concept> =
            Arc::new(RoleConcept::new("hierarchy").role("leaf_graph"));

        let tree = ObjectHandle::new(());
        let graph = ObjectHandle::new(());
        ctx.set_attribute(&tree, "leaf_graph", Value::from(&graph));
        ctx.set_attribute(&graph, "vertex_area", Value::Float(4.0));

        let sig = Signature::new(vec![
            Param::required("tree"),
            Param::required("vertex_area"),
        ])
        .unwrap();
        let f = Resolver::wrap(
            RawFn::shared("node_area", sig, |_ctx, args| {
                Ok(args.require("vertex_area")?.clone())
            }),
            vec![
                Dependency::concept(hierarchy),
                Dependency::path("vertex_area").source("tree"),
            ],
        )
        .unwrap();

        // "vertex_area" is not on the tree; the full dotted form is.
        let err = f.call(&ctx, CallArgs::new().arg(&tree)).unwrap_err();
        assert!(matches!(err, EngineError::Resolution(_)));

        let f = Resolver::wrap(
            RawFn::shared(
                "node_area",
                Signature::new(vec![
                    Param::required("tree"),
                    Param::required("vertex_area"),
                ])
                .unwrap(),
                |_ctx, args| Ok(args.require("vertex_area")?.clone()),
            ),
            vec![Dependency::path("leaf_graph.vertex_area")],
        )
        .unwrap();
        let out = f.call(&ctx, CallArgs::new().arg(&tree)).unwrap();
        assert_eq!(out, Value::Float(4.0));
    }

    #[test]
    fn default_applies_silently_when_resolution_misses() {
        let ctx = Context::new();
        let sig = Signature::new(vec![
            Param::required("graph"),
            Param::optional("weights", Value::Int(-1)),
        ])
        .unwrap();
        let f = Resolver::wrap(
            RawFn::shared("weighted", sig, |_ctx, args| {
                Ok(args.require("weights")?.clone())
            }),
            vec![Dependency::path("weights")],
        )
        .unwrap();

        let out = f.call(&ctx, CallArgs::new().arg(&ObjectHandle::new(()))).unwrap();
        assert_eq!(out, Value::Int(-1));
    }

    #[test]
    fn required_miss_names_parameter_path_and_object() {
        let ctx = Context::new();
        let f = Resolver::wrap(consumer(), vec![Dependency::path("area")]).unwrap();

        let g = ObjectHandle::with_label("test graph", ());
        let err = f.call(&ctx, CallArgs::new().arg(&g)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'area'"));
        assert!(message.contains("'compactness'"));
        assert!(message.contains("test graph"));

        match err {
            EngineError::Resolution(resolve) => {
                assert_eq!(resolve.parameter, "area");
                assert_eq!(resolve.path, "area");
                assert!(std::error::Error::source(&resolve).is_none());
            }
            other => panic!("expected a resolution error, got {other}"),
        }
    }

    #[test]
    fn debug_mode_keeps_the_cause_chain() {
        let ctx = Context::new();
        let f = Resolver::wrap(consumer(), vec![Dependency::path("area")]).unwrap();

        let g = ObjectHandle::new(());
        let err = f.call(&ctx, CallArgs::new().arg(&g).debug(true)).unwrap_err();
        match err {
            EngineError::Resolution(resolve) => {
                assert!(std::error::Error::source(&resolve).is_some());
            }
            other => panic!("expected a resolution error, got {other}"),
        }
    }

    #[test]
    fn provider_failure_is_distinguished_from_a_miss() {
        let ctx = Context::new();
        ctx.register_provider("area", "", |_ctx, _obj| {
            Err(EngineError::computation("degenerate region"))
        });
        let f = Resolver::wrap(consumer(), vec![Dependency::path("area")]).unwrap();

        let g = ObjectHandle::new(());
        let err = f.call(&ctx, CallArgs::new().arg(&g)).unwrap_err();
        assert!(err.to_string().contains("degenerate region"));
    }

    #[test]
    fn unknown_target_parameter_fails_at_wrap_time() {
        let err = Resolver::wrap(consumer(), vec![Dependency::path("perimeter")]).unwrap_err();
        assert!(matches!(
            err,
            ShapeError::UnknownTargetParameter { parameter, .. } if parameter == "perimeter"
        ));
    }

    #[test]
    fn unknown_source_parameter_fails_at_wrap_time() {
        let err = Resolver::wrap(
            consumer(),
            vec![Dependency::path("area").source("tre")],
        )
        .unwrap_err();
        assert!(matches!(err, ShapeError::UnknownSourceParameter { .. }));
    }

    #[test]
    fn empty_path_fails_at_wrap_time() {
        let err = Resolver::wrap(consumer(), vec![Dependency::path("")]).unwrap_err();
        assert!(matches!(err, ShapeError::EmptyDependencyPath { .. }));

        let err =
            Resolver::wrap(consumer(), vec![Dependency::path("a..b").target("area")]).unwrap_err();
        assert!(matches!(err, ShapeError::EmptyDependencyPath { .. }));
    }

    #[test]
    fn debug_names_the_wrapped_function() {
        let f = Resolver::wrap(consumer(), vec![Dependency::path("area")]).unwrap();
        assert_eq!(format!("{f:?}"), "Resolver(compactness)");
    }

    #[test]
    fn resolution_happens_before_hashing() {
        // Composed correctly (resolver outside the cache), a call that
        // spells the argument explicitly and one that resolves it hit the
        // same cache slot.
        use std::sync::atomic::{AtomicUsize, Ordering};

        let ctx = Context::new();
        ctx.register_provider("area", "", |_ctx, _obj| Ok(Value::Float(1.0)));

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let sig = Signature::new(vec![Param::required("graph"), Param::required("area")]).unwrap();
        let raw = RawFn::shared("compactness", sig, move |_ctx, args| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(args.require("area")?.clone())
        });
        let f = Resolver::wrap(
            Cached::wrap(raw).unwrap(),
            vec![Dependency::path("area")],
        )
        .unwrap();

        let g = ObjectHandle::new(());
        f.call(&ctx, CallArgs::new().arg(&g)).unwrap();
        f.call(&ctx, CallArgs::new().arg(&g).named("area", Value::Float(1.0)))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
