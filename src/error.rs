//! Error types for the component container.

use std::sync::Arc;
use thiserror::Error;

/// Boxed error type returned by factories and lifecycle hooks.
///
/// A [`DiError`] converts into this with `?`, which lets a factory propagate
/// resolution failures from [`ResolvedArgs`](crate::ResolvedArgs) unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Container errors
///
/// Represents the various error conditions that can occur during component
/// registration, graph validation, resolution, or scope handling.
///
/// Ambiguity and cycle errors always carry the full diagnostic context (all
/// candidate ids, or the whole cycle path).
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::DiError;
///
/// let cycle = DiError::CyclicDependency {
///     cycle: vec!["a".into(), "b".into(), "a".into()],
/// };
/// assert_eq!(cycle.to_string(), "Cyclic dependency: a -> b -> a");
///
/// let ambiguous = DiError::AmbiguousComponent {
///     requested: "dyn DiscountPolicy".into(),
///     candidates: vec!["fixedPolicy".into(), "ratePolicy".into()],
/// };
/// assert!(ambiguous.to_string().contains("fixedPolicy, ratePolicy"));
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// A definition with this id already exists and overriding is not allowed
    #[error("Component already registered: {id}")]
    DuplicateRegistration { id: String },

    /// No definition matches the requested id or type
    #[error("No such component: {what}")]
    NoSuchComponent { what: String },

    /// More than one definition satisfies the request and none could be preferred
    #[error("Ambiguous component {requested}: {} candidates [{}]", .candidates.len(), .candidates.join(", "))]
    AmbiguousComponent {
        requested: String,
        candidates: Vec<String>,
    },

    /// A required dependency edge has no candidate
    #[error("Missing dependency {required} for {}", .path.join(" -> "))]
    MissingDependency {
        required: String,
        path: Vec<String>,
    },

    /// Circular dependency detected (includes the full cycle)
    #[error("Cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A custom-scoped component was requested with no open context for its scope
    #[error("No active context for scope '{scope}'")]
    NoActiveScope { scope: String },

    /// Factory or init hook failed; the instance was discarded
    #[error("Initialization of '{id}' failed: {source}")]
    InitializationFailure {
        id: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The component exists but does not expose the requested type
    #[error("Component '{id}' is not of type {expected}")]
    TypeMismatch { id: String, expected: &'static str },

    /// A factory read an argument slot with an accessor that does not match its declaration
    #[error("Argument {index} cannot be read as {expected}")]
    ArgumentMismatch { index: usize, expected: &'static str },

    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),

    /// The container was closed (or dropped) before the lookup
    #[error("Container is closed")]
    ContainerClosed,

    /// Container options could not be loaded
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl DiError {
    /// Wraps an arbitrary factory or hook error for the component `id`.
    ///
    /// A boxed `DiError` is unwrapped and returned as is, so resolution errors
    /// raised inside a factory keep their kind.
    pub(crate) fn from_hook(id: &str, err: BoxError) -> Self {
        match err.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(other) => DiError::InitializationFailure {
                id: id.to_string(),
                source: Arc::from(other),
            },
        }
    }

    /// Whether this error is a graph problem reported by validation.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            DiError::MissingDependency { .. } | DiError::CyclicDependency { .. }
        )
    }
}

/// Result type for container operations
///
/// A convenience alias for `Result<T, DiError>` used throughout ferrous-ioc.
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn hook_error_keeps_di_error_kind() {
        let boxed: BoxError = Box::new(DiError::NoActiveScope { scope: "request".into() });
        match DiError::from_hook("logger", boxed) {
            DiError::NoActiveScope { scope } => assert_eq!(scope, "request"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn foreign_hook_error_becomes_initialization_failure() {
        let err = DiError::from_hook("client", Box::new(Boom));
        assert!(matches!(&err, DiError::InitializationFailure { id, .. } if id == "client"));
        assert_eq!(err.to_string(), "Initialization of 'client' failed: boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn missing_dependency_renders_path() {
        let err = DiError::MissingDependency {
            required: "dyn Repository".into(),
            path: vec!["orderService".into(), "memberService".into()],
        };
        assert_eq!(
            err.to_string(),
            "Missing dependency dyn Repository for orderService -> memberService"
        );
        assert!(err.is_graph_error());
    }
}
