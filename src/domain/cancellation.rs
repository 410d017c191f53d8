use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::solver_service::{Result, SolverError};

/// Cooperative interruption signal shared between a caller and a running solve
///
/// Clones observe the same flag. The orchestrator polls it between partitions;
/// backends that support interruption poll it while solving.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    parent: Option<Box<CancellationToken>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Token that is cancelled with `self` but can also be cancelled on its own
    pub fn child(&self) -> Self {
        Self {
            cancelled: Arc::default(),
            parent: Some(Box::new(self.clone())),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Fails with [`SolverError::Cancelled`] once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SolverError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(observer.check().is_ok());

        token.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(SolverError::Cancelled)));
    }

    #[test]
    fn children_follow_their_parent_but_not_the_reverse() {
        let parent = CancellationToken::new();
        let child = parent.child();
        let grandchild = child.child();

        child.cancel();
        assert!(grandchild.is_cancelled());
        assert!(!parent.is_cancelled());

        let sibling = parent.child();
        parent.cancel();
        assert!(sibling.is_cancelled());
    }
}
