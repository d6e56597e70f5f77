//! Scope policy definitions.

use std::fmt;

/// Name of the conventional per-request custom scope.
pub const REQUEST_SCOPE: &str = "request";

/// Scope policies controlling instance sharing and lifetime
///
/// # Policy Characteristics
///
/// - **Singleton**: one instance per container, cached until `close()`
/// - **Prototype**: fresh instance per lookup, never retained by the container
/// - **Custom**: one instance per open [`ScopeContext`](crate::ScopeContext)
///   of the named scope, destroyed when that context closes
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::ScopePolicy;
///
/// let request = ScopePolicy::custom("request");
/// assert_eq!(request.scope_name(), Some("request"));
/// assert_eq!(ScopePolicy::Singleton.scope_name(), None);
/// assert_eq!(request.to_string(), "custom(request)");
/// assert_eq!(ScopePolicy::default(), ScopePolicy::Singleton);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ScopePolicy {
    /// Single instance per container, cached forever
    ///
    /// Construction is serialized per component id: concurrent first lookups
    /// block until one thread finishes and then share its instance.
    #[default]
    Singleton,
    /// New instance per lookup, never cached
    ///
    /// The caller owns the instance; destroy hooks are not run by the container.
    Prototype,
    /// Single instance per context of the named scope
    ///
    /// Requires an open context for the scope at lookup time. Consumers with a
    /// longer lifetime should depend on it through a scoped proxy.
    Custom(String),
}

impl ScopePolicy {
    /// Convenience constructor for [`ScopePolicy::Custom`].
    pub fn custom(name: impl Into<String>) -> Self {
        ScopePolicy::Custom(name.into())
    }

    /// Scope name for custom scopes, `None` otherwise.
    pub fn scope_name(&self) -> Option<&str> {
        match self {
            ScopePolicy::Custom(name) => Some(name),
            _ => None,
        }
    }

    /// Whether instances are cached by the container (singleton or custom scope).
    pub fn is_cached(&self) -> bool {
        !matches!(self, ScopePolicy::Prototype)
    }
}

impl fmt::Display for ScopePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopePolicy::Singleton => f.write_str("singleton"),
            ScopePolicy::Prototype => f.write_str("prototype"),
            ScopePolicy::Custom(name) => write!(f, "custom({})", name),
        }
    }
}
