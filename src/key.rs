//! Type keys used to index component definitions.

use std::any::TypeId;
use std::fmt;

/// Key identifying a type a component can be looked up by.
///
/// Works for concrete types and for trait objects alike: `TypeId` is defined
/// for `dyn Trait + 'static`, so `TypeKey::of::<dyn DiscountPolicy>()` is a
/// valid key. Equality and hashing use the `TypeId` only; the type name is
/// carried for diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::TypeKey;
///
/// trait Greeter: Send + Sync {}
///
/// let concrete = TypeKey::of::<String>();
/// let object = TypeKey::of::<dyn Greeter>();
///
/// assert_eq!(concrete, TypeKey::of::<String>());
/// assert_ne!(concrete, object);
/// assert_eq!(concrete.display_name(), "alloc::string::String");
/// assert!(object.display_name().contains("Greeter"));
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`, which may be unsized (`dyn Trait`).
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name from `std::any::type_name`.
    pub fn display_name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// TypeId-only comparison; the name is diagnostic
impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(other.name).then_with(|| self.id.cmp(&other.id))
    }
}

// Helper function for creating type keys
#[inline(always)]
pub fn key_of<T: ?Sized + 'static>() -> TypeKey {
    TypeKey::of::<T>()
}
