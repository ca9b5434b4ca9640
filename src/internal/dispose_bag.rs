//! Teardown hooks collected by a repository.

use std::fmt;

use futures::future::BoxFuture;

use crate::args::AnyArc;
use crate::provider::DisposeHook;

type SyncHook = Box<dyn FnOnce() + Send>;
type AsyncHook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Disposal hooks of one repository, run in LIFO order.
///
/// Async hooks run first (newest first), then sync hooks (newest first). A bag
/// is taken out of its repository under the tree lock and run after the lock
/// is released. Bags of different repositories are never merged; a subtree
/// disposal runs them one after another, children first.
#[derive(Default)]
pub(crate) struct DisposeBag {
    sync: Vec<SyncHook>,
    asyncs: Vec<AsyncHook>,
}

impl DisposeBag {
    /// Schedules `hook` for `value`.
    pub(crate) fn push(&mut self, hook: &DisposeHook, value: AnyArc) {
        match hook {
            DisposeHook::Sync(hook) => {
                let hook = hook.clone();
                self.sync.push(Box::new(move || hook(value)));
            }
            DisposeHook::Async(hook) => {
                let hook = hook.clone();
                self.asyncs.push(Box::new(move || hook(value)));
            }
        }
    }

    pub(crate) fn run_all_sync_reverse(&mut self) {
        while let Some(f) = self.sync.pop() {
            (f)();
        }
    }

    pub(crate) async fn run_all_async_reverse(&mut self) {
        while let Some(f) = self.asyncs.pop() {
            (f)().await;
        }
    }

    pub(crate) async fn run(mut self) {
        self.run_all_async_reverse().await;
        self.run_all_sync_reverse();
    }

    pub(crate) fn len(&self) -> usize {
        self.sync.len() + self.asyncs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sync.is_empty() && self.asyncs.is_empty()
    }
}

impl fmt::Debug for DisposeBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeBag")
            .field("sync", &self.sync.len())
            .field("async", &self.asyncs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn async_hooks_run_before_sync_hooks_newest_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();

        for name in ["sync-a", "sync-b"] {
            let log = log.clone();
            let hook = DisposeHook::Sync(Arc::new(move |_| log.lock().unwrap().push(name)));
            bag.push(&hook, Arc::new(()));
        }
        for name in ["async-a", "async-b"] {
            let log = log.clone();
            let hook = DisposeHook::Async(Arc::new(move |_| {
                let log = log.clone();
                async move { log.lock().unwrap().push(name) }.boxed()
            }));
            bag.push(&hook, Arc::new(()));
        }

        assert_eq!(bag.len(), 4);
        bag.run().await;
        assert_eq!(*log.lock().unwrap(), vec!["async-b", "async-a", "sync-b", "sync-a"]);
    }
}
