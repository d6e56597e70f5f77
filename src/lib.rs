//! # ferrous-ioc
//!
//! A component container with constructor injection, qualifier-aware
//! candidate selection, custom scopes and ordered lifecycle hooks.
//!
//! ## Features
//!
//! - **Typed definitions**: components are registered under an id and can
//!   expose themselves as any number of trait objects
//! - **Candidate selection**: primary markers and qualifiers disambiguate
//!   between several implementations; collections inject all of them
//! - **Scope policies**: Singleton, Prototype and named Custom scopes with
//!   explicitly opened and closed contexts
//! - **Lifecycle**: init hooks after injection, destroy hooks in reverse
//!   creation order, exactly once
//! - **Graph validation**: missing dependencies and construction cycles are
//!   rejected before the container opens
//! - **Deferred wiring**: scoped proxies and object providers resolve at
//!   call time
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_ioc::{ComponentCollection, ComponentDefinition, Dependency, Resolver};
//! use std::sync::Arc;
//!
//! trait DiscountPolicy: Send + Sync {
//!     fn discount(&self, vip: bool, price: u32) -> u32;
//! }
//!
//! struct FixDiscountPolicy;
//! impl DiscountPolicy for FixDiscountPolicy {
//!     fn discount(&self, vip: bool, _price: u32) -> u32 {
//!         if vip { 1000 } else { 0 }
//!     }
//! }
//!
//! struct RateDiscountPolicy;
//! impl DiscountPolicy for RateDiscountPolicy {
//!     fn discount(&self, vip: bool, price: u32) -> u32 {
//!         if vip { price / 10 } else { 0 }
//!     }
//! }
//!
//! struct OrderService {
//!     policy: Arc<dyn DiscountPolicy>,
//! }
//!
//! let mut components = ComponentCollection::new();
//! components
//!     .register(ComponentDefinition::builder::<FixDiscountPolicy>("fixDiscountPolicy")
//!         .exposes(|p| p as Arc<dyn DiscountPolicy>)
//!         .factory(|_| Ok(FixDiscountPolicy)))
//!     .unwrap()
//!     .register(ComponentDefinition::builder::<RateDiscountPolicy>("rateDiscountPolicy")
//!         .exposes(|p| p as Arc<dyn DiscountPolicy>)
//!         .primary()
//!         .factory(|_| Ok(RateDiscountPolicy)))
//!     .unwrap()
//!     .register(ComponentDefinition::builder::<OrderService>("orderService")
//!         .depends_on(Dependency::on::<dyn DiscountPolicy>())
//!         .factory(|args| Ok(OrderService { policy: args.required(0)? })))
//!     .unwrap();
//!
//! let container = components.open().unwrap();
//! let orders = container.get::<OrderService>().unwrap();
//! assert_eq!(orders.policy.discount(true, 20000), 2000);
//! container.close();
//! ```
//!
//! ## Scope Policies
//!
//! - **Singleton**: created once per container, destroyed at `close()`
//! - **Prototype**: created on every lookup, never retained or destroyed
//! - **Custom**: created once per [`ScopeContext`], destroyed when the
//!   context closes
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (registration, scope and lifecycle
//! transitions) and never installs a subscriber itself.

// Module declarations
pub mod collection;
pub mod config;
pub mod definition;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod provider;
pub mod proxy;
pub mod traits;
pub mod validation;

// Internal modules
mod internal;
mod lifecycle;
mod registration;
mod resolver;
mod singletons;

// Re-export core types
pub use collection::{ComponentCollection, ComponentCollectionExt, ComponentModule};
pub use config::ContainerOptions;
pub use definition::{AnyArc, ComponentDefinition, DefinitionBuilder, Dependency, DependencyKind};
pub use descriptors::ComponentDescriptor;
pub use error::{BoxError, DiError, DiResult};
pub use key::{key_of, TypeKey};
pub use lifecycle::LifecycleState;
pub use lifetime::{ScopePolicy, REQUEST_SCOPE};
pub use provider::{ComponentSet, Container, ContextGuard, ContextState, ResolvedArgs, ScopeContext};
pub use proxy::{ObjectProvider, ScopedProxy};
pub use registration::RegistrationSource;
pub use traits::{Dispose, Initialize, Resolver, ResolverCore};
pub use validation::ValidationReport;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn singleton_is_shared_and_prototype_is_fresh() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let mut components = ComponentCollection::new();
        components
            .register(
                ComponentDefinition::builder::<English>("english")
                    .exposes(|e| e as Arc<dyn Greeter>)
                    .factory(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(English)
                    }),
            )
            .unwrap()
            .register(ComponentDefinition::builder::<String>("banner").prototype().factory(|_| Ok("==".into())))
            .unwrap();
        let container = components.open().unwrap();

        let a = container.get::<dyn Greeter>().unwrap();
        let b = container.get_by_id::<dyn Greeter>("english").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.greet(), "hello");
        assert_eq!(built.load(Ordering::SeqCst), 1);

        let x = container.get::<String>().unwrap();
        let y = container.get::<String>().unwrap();
        assert!(!Arc::ptr_eq(&x, &y));
    }

    #[test]
    fn unknown_lookups_report_no_such_component() {
        let container = ComponentCollection::new().open().unwrap();
        assert!(matches!(container.get::<English>(), Err(DiError::NoSuchComponent { .. })));
        assert!(matches!(container.get_by_id::<English>("english"), Err(DiError::NoSuchComponent { .. })));
        assert!(container.get_optional::<English>().unwrap().is_none());
        assert!(container.get_all::<dyn Greeter>().unwrap().is_empty());
    }

    #[test]
    fn wrong_type_by_id_is_a_type_mismatch() {
        let mut components = ComponentCollection::new();
        components
            .register(ComponentDefinition::builder::<English>("english").factory(|_| Ok(English)))
            .unwrap();
        let container = components.open().unwrap();
        assert!(matches!(
            container.get_by_id::<dyn Greeter>("english"),
            Err(DiError::TypeMismatch { .. })
        ));
    }
}
