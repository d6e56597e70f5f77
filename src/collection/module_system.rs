//! Component modules for grouped, scanned registration.
//!
//! A module stands in for an automatic discovery pass: everything it
//! registers is recorded with [`RegistrationSource::Scanned`](crate::RegistrationSource::Scanned),
//! so a manual registration with the same id always wins.

use crate::collection::ComponentCollection;
use crate::error::DiResult;

/// A module that contributes component definitions to a [`ComponentCollection`].
///
/// # Example
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, ComponentModule, DiResult, Resolver};
///
/// struct MemoryMemberRepository;
/// struct MemberModule;
///
/// impl ComponentModule for MemberModule {
///     fn register_components(self, components: &mut ComponentCollection) -> DiResult<()> {
///         components.register(
///             ComponentDefinition::builder::<MemoryMemberRepository>("memberRepository")
///                 .factory(|_| Ok(MemoryMemberRepository)),
///         )?;
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut components = ComponentCollection::new();
/// components.scan(MemberModule)?;
/// let container = components.open()?;
/// assert!(container.contains("memberRepository"));
/// # Ok(())
/// # }
/// ```
pub trait ComponentModule {
    /// Register this module's definitions.
    fn register_components(self, components: &mut ComponentCollection) -> DiResult<()>;
}

impl<F> ComponentModule for F
where
    F: FnOnce(&mut ComponentCollection) -> DiResult<()>,
{
    fn register_components(self, components: &mut ComponentCollection) -> DiResult<()> {
        self(components)
    }
}

/// Extension trait for by-value module chaining.
pub trait ComponentCollectionExt {
    /// Scan a module, consuming and returning the collection.
    ///
    /// ```rust
    /// use ferrous_ioc::{ComponentCollection, ComponentCollectionExt, ComponentModule, DiResult};
    ///
    /// struct OrderModule;
    /// impl ComponentModule for OrderModule {
    ///     fn register_components(self, _: &mut ComponentCollection) -> DiResult<()> { Ok(()) }
    /// }
    ///
    /// # fn main() -> DiResult<()> {
    /// let container = ComponentCollection::new()
    ///     .with_module(OrderModule)?
    ///     .open()?;
    /// # Ok(())
    /// # }
    /// ```
    fn with_module<M: ComponentModule>(self, module: M) -> DiResult<Self>
    where
        Self: Sized;
}

impl ComponentCollectionExt for ComponentCollection {
    fn with_module<M: ComponentModule>(mut self, module: M) -> DiResult<Self> {
        self.scan(module)?;
        Ok(self)
    }
}
