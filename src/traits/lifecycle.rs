//! Lifecycle callback traits.

use crate::error::BoxError;

/// Init callback for components that need setup after injection.
///
/// Wire it with [`DefinitionBuilder::with_initialize`](crate::DefinitionBuilder::with_initialize).
/// Runs exactly once, after constructor and setter injection. Returning an
/// error discards the instance.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{BoxError, ComponentCollection, ComponentDefinition, Dispose, Initialize, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct NetworkClient {
///     url: String,
///     connected: AtomicBool,
/// }
///
/// impl Initialize for NetworkClient {
///     fn initialize(&self) -> Result<(), BoxError> {
///         if self.url.is_empty() {
///             return Err("no url configured".into());
///         }
///         self.connected.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// impl Dispose for NetworkClient {
///     fn dispose(&self) {
///         self.connected.store(false, Ordering::SeqCst);
///     }
/// }
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(ComponentDefinition::builder::<NetworkClient>("networkClient")
///         .with_initialize()
///         .with_dispose()
///         .factory(|_| Ok(NetworkClient {
///             url: "http://hello-spring.dev".into(),
///             connected: AtomicBool::new(false),
///         })))
///     .unwrap();
///
/// let container = components.open().unwrap();
/// let client = container.get::<NetworkClient>().unwrap();
/// assert!(client.connected.load(Ordering::SeqCst));
///
/// container.close();
/// assert!(!client.connected.load(Ordering::SeqCst));
/// ```
pub trait Initialize: Send + Sync + 'static {
    fn initialize(&self) -> Result<(), BoxError>;
}

/// Destroy callback, run at most once when the owning scope ends.
///
/// Implement this for components that need structured teardown (closing
/// connections, flushing buffers). Wire it with
/// [`DefinitionBuilder::with_dispose`](crate::DefinitionBuilder::with_dispose).
/// Singletons are disposed in reverse creation order at container close;
/// custom-scoped instances when their context closes. Prototypes are never
/// disposed by the container.
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}
