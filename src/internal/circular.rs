//! Circular dependency detection.
//!
//! Resolution is asynchronous and hops between tasks, so the provider stack
//! travels with each request instead of living in thread-local storage.
//! Singleton builds started from different branches can still wait on each
//! other through their in-flight futures; [`WaitGraph`] catches those cycles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::context::NodeId;
use crate::error::{DiError, DiResult};
use crate::provider::{Provider, ProviderId};

/// One singleton build: the provider and the node caching its instance.
pub(crate) type BuildKey = (NodeId, ProviderId);

#[derive(Debug)]
struct Frame {
    id: ProviderId,
    label: String,
    build: Option<NodeId>,
    parent: Option<Arc<Frame>>,
}

/// Providers currently being constructed along one resolution branch.
///
/// Sibling branches share their common prefix, so fanning out to many
/// dependencies is cheap.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolutionPath {
    head: Option<Arc<Frame>>,
    depth: usize,
}

impl ResolutionPath {
    /// Pushes `provider`, failing if it is already on the path or the path is too deep.
    pub(crate) fn enter(&self, provider: &Provider, max_depth: usize) -> DiResult<ResolutionPath> {
        self.push(provider, None, max_depth)
    }

    /// Like [`enter`](Self::enter), for the singleton build cached on `owner`.
    pub(crate) fn enter_build(
        &self,
        provider: &Provider,
        owner: NodeId,
        max_depth: usize,
    ) -> DiResult<ResolutionPath> {
        self.push(provider, Some(owner), max_depth)
    }

    fn push(&self, provider: &Provider, build: Option<NodeId>, max_depth: usize) -> DiResult<ResolutionPath> {
        if self.contains(provider.id()) {
            let mut path = self.labels();
            path.push(provider.label());
            return Err(DiError::Circular(path));
        }
        if self.depth >= max_depth {
            return Err(DiError::DepthExceeded(self.depth));
        }
        Ok(ResolutionPath {
            head: Some(Arc::new(Frame {
                id: provider.id(),
                label: provider.label(),
                build,
                parent: self.head.clone(),
            })),
            depth: self.depth + 1,
        })
    }

    pub(crate) fn contains(&self, id: ProviderId) -> bool {
        self.frames().any(|frame| frame.id == id)
    }

    /// Singleton builds this branch is part of.
    pub(crate) fn builds(&self) -> Vec<BuildKey> {
        self.frames()
            .filter_map(|frame| frame.build.map(|owner| (owner, frame.id)))
            .collect()
    }

    /// Provider labels, outermost first.
    pub(crate) fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.frames().map(|frame| frame.label.clone()).collect();
        labels.reverse();
        labels
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.as_deref())
    }
}

/// Which singleton builds are waiting on which in-flight builds.
///
/// An edge `a -> b` means a branch inside build `a` awaits the in-flight
/// future of build `b`. Edges are multi-set entries, one per waiting branch.
#[derive(Debug, Default)]
pub(crate) struct WaitGraph {
    edges: HashMap<BuildKey, Vec<BuildKey>>,
}

impl WaitGraph {
    /// Records that every build in `waiters` awaits `target`.
    ///
    /// Refuses, returning `false`, when `target` already waits on one of
    /// `waiters` directly or transitively.
    pub(crate) fn wait(&mut self, waiters: &[BuildKey], target: BuildKey) -> bool {
        if self.reaches(target, waiters) {
            return false;
        }
        for waiter in waiters {
            self.edges.entry(*waiter).or_default().push(target);
        }
        true
    }

    /// Removes the edges added by one successful [`wait`](Self::wait).
    pub(crate) fn release(&mut self, waiters: &[BuildKey], target: BuildKey) {
        for waiter in waiters {
            let Some(targets) = self.edges.get_mut(waiter) else {
                continue;
            };
            if let Some(index) = targets.iter().position(|t| *t == target) {
                targets.swap_remove(index);
            }
            if targets.is_empty() {
                self.edges.remove(waiter);
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    fn reaches(&self, from: BuildKey, goals: &[BuildKey]) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(key) = stack.pop() {
            if goals.contains(&key) {
                return true;
            }
            if !seen.insert(key) {
                continue;
            }
            if let Some(next) = self.edges.get(&key) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }
}
