//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::{current_path, ResolutionGuard};
pub(crate) use dispose_bag::DisposeBag;
