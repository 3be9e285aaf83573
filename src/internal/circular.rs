//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

// Thread-local resolution stack. Resolution is synchronous per thread, so a
// plain stack of type names is enough to spot a cycle.
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<&'static str>> = RefCell::new(Vec::new());
}

struct StackFrame;

impl Drop for StackFrame {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs a resolution closure with `name` pushed on the thread-local stack.
///
/// If `name` is already on the stack the resolution is cyclic and
/// `DiError::Circular` is returned with the full path, cycle entry included
/// twice so the loop is visible in diagnostics.
pub(crate) fn with_resolution_frame<T, F>(name: &'static str, f: F) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    let cycle = RESOLUTION_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.iter().any(|&n| n == name) {
            let mut path = stack.clone();
            path.push(name);
            Some(path)
        } else {
            stack.push(name);
            None
        }
    });

    if let Some(path) = cycle {
        return Err(DiError::Circular(path));
    }

    let _frame = StackFrame;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_frames_pop_cleanly() {
        let result: DiResult<u32> = with_resolution_frame("outer", || {
            with_resolution_frame("inner", || Ok(1))
        });
        assert_eq!(result.unwrap(), 1);

        // Stack must be empty again so a later resolve of "outer" succeeds.
        let again: DiResult<u32> = with_resolution_frame("outer", || Ok(2));
        assert_eq!(again.unwrap(), 2);
    }

    #[test]
    fn cycle_reports_full_path() {
        let result: DiResult<()> = with_resolution_frame("a", || {
            with_resolution_frame("b", || {
                with_resolution_frame("a", || Ok(()))
            })
        });
        match result {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["a", "b", "a"]),
            other => panic!("expected circular error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn stack_unwinds_after_cycle_error() {
        let _ = with_resolution_frame("x", || {
            with_resolution_frame("x", || Ok(()))
        });
        let ok: DiResult<()> = with_resolution_frame("x", || Ok(()));
        assert!(ok.is_ok());
    }
}
