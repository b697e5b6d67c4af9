//! Pollable, blockable result handles.
//!
//! A [`Handle`] is the receiving end of a single-assignment slot. Renderers
//! poll it without blocking; batch callers block on it with
//! [`Handle::wait`]; cache tasks `.await` it.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
enum Slot<T> {
    Pending,
    Ready(T),
    Failed,
}

/// Shared view of a value that is computed once in the background.
pub struct Handle<T> {
    rx: watch::Receiver<Slot<T>>,
    id: Arc<()>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            id: self.id.clone(),
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.rx.borrow() {
            Slot::Pending => "pending",
            Slot::Ready(_) => "ready",
            Slot::Failed => "failed",
        };
        f.debug_struct("Handle").field("state", &state).finish()
    }
}

/// Producing end of a [`Handle`]. Dropping it unresolved fails the handle.
pub struct Resolver<T> {
    tx: Option<watch::Sender<Slot<T>>>,
}

/// Creates an unresolved handle and the resolver that completes it.
pub fn pending<T>() -> (Resolver<T>, Handle<T>) {
    let (tx, rx) = watch::channel(Slot::Pending);
    (
        Resolver { tx: Some(tx) },
        Handle {
            rx,
            id: Arc::new(()),
        },
    )
}

impl<T> Resolver<T> {
    pub fn resolve(mut self, value: T) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Slot::Ready(value));
        }
    }

    pub fn fail(mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Slot::Failed);
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Slot::Failed);
        }
    }
}

impl<T> Handle<T> {
    /// Number of live clones of this handle, the caller's included.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.id)
    }
}

impl<T: Clone> Handle<T> {
    /// A handle that is already resolved.
    pub fn ready(value: T) -> Self {
        let (resolver, handle) = pending();
        resolver.resolve(value);
        handle
    }

    /// The value, if resolved successfully. Never blocks.
    pub fn try_get(&self) -> Option<T> {
        match &*self.rx.borrow() {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// True once the handle resolved, successfully or not.
    pub fn is_ready(&self) -> bool {
        !matches!(&*self.rx.borrow(), Slot::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(&*self.rx.borrow(), Slot::Failed)
    }

    /// Waits for the handle to resolve; `None` when it failed.
    pub async fn resolved(&self) -> Option<T> {
        let mut rx = self.rx.clone();
        let slot = rx
            .wait_for(|slot| !matches!(slot, Slot::Pending))
            .await
            .ok()?;
        match &*slot {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Blocks the calling thread until the handle resolves.
    ///
    /// Must not be called from inside the cache's own runtime.
    pub fn wait(&self) -> Option<T> {
        futures::executor::block_on(self.resolved())
    }

    /// Whether both handles observe the same computation.
    pub fn same_as(&self, other: &Handle<T>) -> bool {
        Arc::ptr_eq(&self.id, &other.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_once_for_every_clone() {
        let (resolver, handle) = pending::<u32>();
        let other = handle.clone();
        assert!(!handle.is_ready());
        assert_eq!(handle.try_get(), None);
        resolver.resolve(7);
        assert_eq!(handle.try_get(), Some(7));
        assert_eq!(other.wait(), Some(7));
        assert!(handle.same_as(&other));
    }

    #[test]
    fn dropped_resolver_fails_the_handle() {
        let (resolver, handle) = pending::<u32>();
        drop(resolver);
        assert!(handle.is_ready());
        assert!(handle.is_failed());
        assert_eq!(handle.wait(), None);
    }

    #[test]
    fn wait_blocks_until_another_thread_resolves() {
        let (resolver, handle) = pending::<String>();
        let worker = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            resolver.resolve("done".to_string());
        });
        assert_eq!(handle.wait().as_deref(), Some("done"));
        worker.join().unwrap();
    }

    #[test]
    fn holders_count_live_clones() {
        let handle = Handle::ready(3);
        assert_eq!(handle.holders(), 1);
        let other = handle.clone();
        assert_eq!(handle.holders(), 2);
        drop(other);
        assert_eq!(handle.holders(), 1);
    }

    #[test]
    fn distinct_handles_are_not_the_same() {
        let a = Handle::ready(1);
        let b = Handle::ready(1);
        assert!(!a.same_as(&b));
    }
}
