//! Collection injection results.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Every instance of a type, keyed by component id, in registration order.
///
/// Returned by [`Resolver::get_all`](crate::Resolver::get_all) and
/// [`ResolvedArgs::components`](crate::ResolvedArgs::components). Converts to
/// the id-keyed map or the ordered list form.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ComponentCollection, ComponentDefinition, Resolver};
/// use std::sync::Arc;
///
/// trait Policy: Send + Sync { fn discount(&self, price: u32) -> u32; }
/// struct Fixed;
/// struct Rate;
/// impl Policy for Fixed { fn discount(&self, _: u32) -> u32 { 1000 } }
/// impl Policy for Rate { fn discount(&self, price: u32) -> u32 { price / 10 } }
///
/// let mut components = ComponentCollection::new();
/// components
///     .register(ComponentDefinition::builder::<Fixed>("fixDiscountPolicy")
///         .exposes(|p| p as Arc<dyn Policy>)
///         .factory(|_| Ok(Fixed)))
///     .unwrap()
///     .register(ComponentDefinition::builder::<Rate>("rateDiscountPolicy")
///         .exposes(|p| p as Arc<dyn Policy>)
///         .factory(|_| Ok(Rate)))
///     .unwrap();
/// let container = components.open().unwrap();
///
/// let policies = container.get_all::<dyn Policy>().unwrap();
/// assert_eq!(policies.ids().collect::<Vec<_>>(), ["fixDiscountPolicy", "rateDiscountPolicy"]);
/// assert_eq!(policies.get("rateDiscountPolicy").unwrap().discount(20000), 2000);
/// assert_eq!(policies.to_map().len(), 2);
/// ```
pub struct ComponentSet<T: ?Sized> {
    entries: Vec<(String, Arc<T>)>,
}

impl<T: ?Sized> ComponentSet<T> {
    pub(crate) fn from_entries(entries: Vec<(String, Arc<T>)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Component ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<T>> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<T>)> {
        self.entries.iter().map(|(id, v)| (id.as_str(), v))
    }

    /// Id-keyed mapping form.
    pub fn to_map(&self) -> HashMap<String, Arc<T>> {
        self.entries.iter().cloned().collect()
    }

    /// Ordered collection form.
    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn into_entries(self) -> Vec<(String, Arc<T>)> {
        self.entries
    }
}

impl<T: ?Sized> Clone for ComponentSet<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for ComponentSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

impl<T: ?Sized> IntoIterator for ComponentSet<T> {
    type Item = (String, Arc<T>);
    type IntoIter = std::vec::IntoIter<(String, Arc<T>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
