//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

// Thread-local resolution state for circular dependency detection
thread_local! {
    static RESOLUTION_TLS: RefCell<ResolutionTls> = RefCell::new(ResolutionTls::default());
}

#[derive(Default)]
struct ResolutionTls {
    stack: Vec<String>,
}

/// Guard for one frame of the thread-local resolution stack.
///
/// Entering a component id that is already on the stack is a cycle; the
/// error carries the full path, e.g. `["a", "b", "c", "a"]`. The frame is
/// popped when the guard drops, including on early `?` returns.
pub(crate) struct ResolutionGuard {
    id: String,
}

impl ResolutionGuard {
    pub(crate) fn enter(id: &str, max_depth: usize) -> DiResult<Self> {
        RESOLUTION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();

            // Circular detection BEFORE pushing the new id
            if let Some(start) = tls.stack.iter().position(|n| n == id) {
                let mut cycle: Vec<String> = tls.stack[start..].to_vec();
                cycle.push(id.to_string());
                return Err(DiError::CyclicDependency { cycle });
            }

            // Depth guard
            if tls.stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(tls.stack.len()));
            }

            tls.stack.push(id.to_string());
            Ok(())
        })?;

        Ok(Self { id: id.to_string() })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();
            if let Some(last) = tls.stack.pop() {
                debug_assert_eq!(last, self.id);
            }
        });
    }
}

/// Ids currently being resolved on this thread, outermost first.
pub(crate) fn current_path() -> Vec<String> {
    RESOLUTION_TLS.with(|tls| tls.borrow().stack.clone())
}
