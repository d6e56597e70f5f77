//! Core traits for the component container.

mod lifecycle;
mod resolver;

pub use lifecycle::{Dispose, Initialize};
pub use resolver::{Resolver, ResolverCore};
