//! Error types for attribute calls and dependency resolution.
//!
//! The taxonomy separates wrap-time configuration errors ([`ShapeError`],
//! fatal during setup), call-time lookup misses ([`LookupError`], explicit
//! results rather than exception-style control flow), and resolution
//! failures surfaced to callers ([`ResolveError`]). A computation's own
//! failure propagates unchanged through [`EngineError::Computation`]; the
//! engine only recovers from its own bookkeeping problems.

use std::error::Error;

/// Invalid function shape or wrapper configuration.
///
/// These are raised at wrap time, when a signature or a dependency list is
/// declared, so a misconfigured function fails during setup instead of deep
/// inside a call chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// A parameter name appears twice in one signature.
    #[error("duplicate parameter '{parameter}' in function signature")]
    DuplicateParameter {
        /// The repeated parameter name.
        parameter: String,
    },

    /// A parameter uses one of the reserved control names.
    #[error("parameter '{parameter}' is reserved for engine control")]
    ReservedParameter {
        /// The offending parameter name.
        parameter: String,
    },

    /// The signature declares no parameters, so there is no owning object.
    #[error("function signature declares no parameters; the first parameter is the owning object")]
    NoParameters,

    /// A dependency targets a parameter the function does not declare.
    #[error("dependency of '{function}' targets undeclared parameter '{parameter}'")]
    UnknownTargetParameter {
        /// The wrapped function.
        function: String,
        /// The undeclared target parameter.
        parameter: String,
    },

    /// A dependency reads its source from a parameter the function does not
    /// declare.
    #[error("dependency of '{function}' reads from undeclared parameter '{parameter}'")]
    UnknownSourceParameter {
        /// The wrapped function.
        function: String,
        /// The undeclared source parameter.
        parameter: String,
    },

    /// A dependency path is empty.
    #[error("dependency of '{function}' has an empty attribute path")]
    EmptyDependencyPath {
        /// The wrapped function.
        function: String,
    },

    /// The caching wrapper was applied over a dependency-resolving wrapper.
    ///
    /// Resolution changes the effective argument set and therefore the cache
    /// key, so it must run outside the cache.
    #[error("'{function}' resolves dependencies and cannot sit inside the caching wrapper; apply caching first and resolution outside")]
    CachingInsideResolution {
        /// The wrapped function.
        function: String,
    },

    /// A role name passed to concept linking is not part of the concept.
    #[error("concept '{concept}' has no role named '{role}'")]
    UnknownRole {
        /// The concept name.
        concept: String,
        /// The unknown role.
        role: String,
    },
}

/// A path-segment lookup miss or provider failure.
///
/// Lookup misses are ordinary values, not exceptions: the resolver decides
/// whether a miss is fatal (required parameter) or ignorable (parameter with
/// a declared default).
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The current value along the path is not a cacheable object.
    #[error("cannot resolve '{path}' against {value}: not a cacheable object")]
    NotAnObject {
        /// The remaining path being resolved.
        path: String,
        /// Display form of the offending value.
        value: String,
    },

    /// Neither the object's cache nor the provider registry knows the segment.
    #[error("lookup of '{path}' in the attribute cache of '{object}' and in the provider registry failed")]
    NotFound {
        /// The remaining path being resolved.
        path: String,
        /// The segment that missed.
        segment: String,
        /// Label of the object searched.
        object: String,
    },

    /// A registered provider was found but failed while computing.
    #[error("provider '{name}' failed while resolving '{path}'")]
    Provider {
        /// The provider name.
        name: String,
        /// The remaining path being resolved.
        path: String,
        /// The provider's own failure.
        #[source]
        source: Box<EngineError>,
    },
}

/// Failure to resolve a required argument of a wrapped function.
///
/// In debug mode the causal [`LookupError`] chain is preserved through
/// [`Error::source`]; in normal mode the chain is flattened into one
/// human-readable message and no source is attached.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ResolveError {
    /// The wrapped function whose argument could not be resolved.
    pub function: String,
    /// The unresolvable parameter.
    pub parameter: String,
    /// The dependency path that was attempted.
    pub path: String,
    /// Display form of the object resolution started from.
    pub object: String,
    message: String,
    #[source]
    cause: Option<LookupError>,
}

impl ResolveError {
    /// Builds a resolution failure for `parameter` of `function`.
    ///
    /// `debug` selects between the chained and the flattened form.
    pub(crate) fn new(
        function: &str,
        parameter: &str,
        path: &str,
        object: &str,
        cause: LookupError,
        debug: bool,
    ) -> Self {
        let (message, cause) = if debug {
            (
                format!(
                    "could not resolve argument '{parameter}' of '{function}' \
                     using path '{path}' against {object}"
                ),
                Some(cause),
            )
        } else {
            (
                format!(
                    "could not resolve argument '{parameter}' of '{function}' using path '{path}': \
                     the caller did not supply an explicit value, and {}; \
                     pass data_debug=true to preserve the full resolution chain",
                    flatten(&cause)
                ),
                None,
            )
        };
        Self {
            function: function.to_string(),
            parameter: parameter.to_string(),
            path: path.to_string(),
            object: object.to_string(),
            message,
            cause,
        }
    }
}

/// Flattens an error chain into a single `": "`-joined line.
fn flatten(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        current = cause.source();
    }
    message
}

/// Umbrella error for attribute calls.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid function shape or wrapper configuration.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// A required argument could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    /// More positional arguments than declared parameters.
    #[error("'{function}' takes {expected} arguments but {supplied} positional arguments were supplied")]
    TooManyPositional {
        /// The called function.
        function: String,
        /// Number of declared parameters.
        expected: usize,
        /// Number of positional arguments supplied.
        supplied: usize,
    },

    /// A named argument does not match any declared parameter.
    #[error("unknown parameter '{parameter}' supplied to '{function}'")]
    UnknownParameter {
        /// The called function.
        function: String,
        /// The unknown parameter name.
        parameter: String,
    },

    /// The same parameter was supplied both positionally and by name.
    #[error("parameter '{parameter}' of '{function}' was supplied both positionally and by name")]
    DuplicateArgument {
        /// The called function.
        function: String,
        /// The doubly supplied parameter.
        parameter: String,
    },

    /// A reserved control parameter was supplied with the wrong type.
    #[error("reserved parameter '{parameter}' supplied to '{function}' has the wrong type")]
    MalformedReservedParameter {
        /// The called function.
        function: String,
        /// The reserved parameter name.
        parameter: String,
    },

    /// A required argument was neither supplied nor resolvable.
    #[error("missing required argument '{parameter}' for '{function}'")]
    MissingArgument {
        /// The called function.
        function: String,
        /// The missing parameter.
        parameter: String,
    },

    /// A computation function's own failure, propagated unchanged.
    #[error("computation failed: {reason}")]
    Computation {
        /// Description of the failure.
        reason: String,
    },
}

impl EngineError {
    /// Creates a computation failure with the given reason.
    ///
    /// Attribute formulas use this to report their own errors; the engine
    /// never swallows or rewraps them.
    pub fn computation(reason: impl Into<String>) -> Self {
        Self::Computation {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miss() -> LookupError {
        LookupError::NotFound {
            path: "leaf_graph.edge_length".to_string(),
            segment: "leaf_graph".to_string(),
            object: "tree".to_string(),
        }
    }

    #[test]
    fn shape_error_display() {
        let err = ShapeError::DuplicateParameter {
            parameter: "graph".to_string(),
        };
        assert!(err.to_string().contains("duplicate parameter 'graph'"));
    }

    #[test]
    fn normal_mode_flattens_the_chain() {
        let err = ResolveError::new("area", "edge_length", "leaf_graph.edge_length", "tree", miss(), false);
        assert!(err.source().is_none(), "flattened message carries no source");
        let msg = err.to_string();
        assert!(msg.contains("'edge_length'"));
        assert!(msg.contains("'area'"));
        assert!(msg.contains("leaf_graph.edge_length"));
        assert!(msg.contains("data_debug"));
    }

    #[test]
    fn debug_mode_preserves_the_chain() {
        let err = ResolveError::new("area", "edge_length", "leaf_graph.edge_length", "tree", miss(), true);
        let source = err.source().expect("debug mode keeps the cause");
        assert!(source.to_string().contains("provider registry failed"));
    }

    #[test]
    fn provider_failure_chains_through() {
        let inner = EngineError::computation("singular matrix");
        let err = LookupError::Provider {
            name: "area".to_string(),
            path: "area".to_string(),
            source: Box::new(inner),
        };
        let flat = flatten(&err);
        assert!(flat.contains("provider 'area' failed"));
        assert!(flat.contains("singular matrix"));
    }

    #[test]
    fn computation_constructor() {
        let err = EngineError::computation("bad input");
        assert_eq!(err.to_string(), "computation failed: bad input");
    }
}
