//! Resolver traits for component lookup.

use std::sync::Arc;

use crate::definition::{unwrap_exposed, AnyArc};
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::provider::{typed_set, ComponentSet};

/// Core resolver trait for object-safe component lookup.
///
/// Handles the low-level mechanics: scope policy, cycle detection and
/// instance caching. Values come back type-erased; most callers should use
/// the generic helpers of [`Resolver`], which every `ResolverCore` gets for
/// free.
pub trait ResolverCore: Send + Sync {
    /// Resolves component `id` exposed as `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - the exposed value (an `Arc<T>` boxed in `Arc<dyn Any>`)
    /// * `Err(DiError)` - `NoSuchComponent`, `TypeMismatch`, `NoActiveScope`,
    ///   `CyclicDependency`, `InitializationFailure` or `ContainerClosed`
    fn resolve_by_id(&self, id: &str, key: &TypeKey) -> DiResult<AnyArc>;

    /// Resolves the single component selected for `key` and `qualifier`.
    ///
    /// Fails with `NoSuchComponent` when nothing matches and
    /// `AmbiguousComponent` when the selection rules cannot pick one.
    fn resolve_by_type(&self, key: &TypeKey, qualifier: Option<&str>) -> DiResult<AnyArc>;

    /// Resolves every component exposing `key`, in registration order.
    fn resolve_all(&self, key: &TypeKey) -> DiResult<Vec<(String, AnyArc)>>;
}

/// High-level resolver interface with generic methods for type-safe lookup.
///
/// Both [`Container`](crate::Container) and [`ScopeContext`](crate::ScopeContext)
/// implement this trait. Lookups through a `ScopeContext` resolve
/// custom-scoped components in that context even when it is not bound to the
/// calling thread.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(ComponentDefinition::builder::<ConsoleLogger>("consoleLogger")
///         .exposes(|l| l as Arc<dyn Logger>)
///         .factory(|_| Ok(ConsoleLogger)))
///     .unwrap();
/// let container = components.open().unwrap();
///
/// // By type, concrete or trait object
/// let logger = container.get::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// assert!(container.get::<ConsoleLogger>().is_ok());
///
/// // By id
/// let same = container.get_by_id::<dyn Logger>("consoleLogger").unwrap();
/// assert!(Arc::ptr_eq(&logger, &same));
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves component `id` as `T`.
    ///
    /// Fails with `TypeMismatch` when the component does not expose `T`.
    fn get_by_id<T: ?Sized + Send + Sync + 'static>(&self, id: &str) -> DiResult<Arc<T>> {
        let key = TypeKey::of::<T>();
        let value = self.resolve_by_id(id, &key)?;
        unwrap_exposed::<T>(&value).ok_or_else(|| DiError::TypeMismatch {
            id: id.to_string(),
            expected: key.display_name(),
        })
    }

    /// Resolves the single component of type `T`.
    fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.lookup::<T>(None)
    }

    /// Resolves the component of type `T` tagged (or named) `qualifier`.
    ///
    /// ```
    /// # use ferrous_ioc::{ComponentCollection, ComponentDefinition, Resolver};
    /// # use std::sync::Arc;
    /// trait Policy: Send + Sync { fn name(&self) -> &'static str; }
    /// struct Fixed;
    /// struct Rate;
    /// impl Policy for Fixed { fn name(&self) -> &'static str { "fixed" } }
    /// impl Policy for Rate { fn name(&self) -> &'static str { "rate" } }
    ///
    /// let mut components = ComponentCollection::new();
    /// components
    ///     .register(ComponentDefinition::builder::<Fixed>("fixDiscountPolicy")
    ///         .exposes(|p| p as Arc<dyn Policy>)
    ///         .factory(|_| Ok(Fixed)))
    ///     .unwrap()
    ///     .register(ComponentDefinition::builder::<Rate>("rateDiscountPolicy")
    ///         .exposes(|p| p as Arc<dyn Policy>)
    ///         .qualifier("mainDiscountPolicy")
    ///         .factory(|_| Ok(Rate)))
    ///     .unwrap();
    /// let container = components.open().unwrap();
    ///
    /// assert!(container.get::<dyn Policy>().is_err());
    /// assert_eq!(container.get_qualified::<dyn Policy>("mainDiscountPolicy").unwrap().name(), "rate");
    /// assert_eq!(container.get_qualified::<dyn Policy>("fixDiscountPolicy").unwrap().name(), "fixed");
    /// ```
    fn get_qualified<T: ?Sized + Send + Sync + 'static>(&self, qualifier: &str) -> DiResult<Arc<T>> {
        self.lookup::<T>(Some(qualifier))
    }

    #[doc(hidden)]
    fn lookup<T: ?Sized + Send + Sync + 'static>(&self, qualifier: Option<&str>) -> DiResult<Arc<T>> {
        let key = TypeKey::of::<T>();
        let value = self.resolve_by_type(&key, qualifier)?;
        unwrap_exposed::<T>(&value).ok_or_else(|| DiError::TypeMismatch {
            id: key.display_name().to_string(),
            expected: key.display_name(),
        })
    }

    /// Resolves `T`, mapping `NoSuchComponent` to `Ok(None)`.
    fn get_optional<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        match self.get::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(DiError::NoSuchComponent { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Every component of type `T`, keyed by id, in registration order.
    fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<ComponentSet<T>> {
        let key = TypeKey::of::<T>();
        let entries = self.resolve_all(&key)?;
        typed_set::<T>(entries, &key)
    }

    /// Resolves `T`, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the component cannot be resolved.
    fn get_required<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        match self.get::<T>() {
            Ok(value) => value,
            Err(err) => panic!("failed to resolve {}: {}", std::any::type_name::<T>(), err),
        }
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
