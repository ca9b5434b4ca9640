//! Shared state behind every injector handle of one tree.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::args::Instance;
use crate::config::InjectorConfig;
use crate::context::{Match, NodeId, ScopeTree};
use crate::error::{DiError, DiResult};
use crate::generator::{GenerationContext, Generator};
use crate::internal::{ResolutionPath, WaitGraph};
use crate::observer::Observers;
use crate::provider::Provider;
use crate::scope::Scope;
use crate::token::Token;

pub(crate) type GeneratorGate = Shared<BoxFuture<'static, Arc<dyn Generator>>>;

/// One lookup-and-construct request.
pub(crate) struct Request {
    pub(crate) origin: NodeId,
    pub(crate) token: Token,
    pub(crate) optional: bool,
    pub(crate) providers: Vec<Provider>,
    /// Scope of the short-lived node; a fresh resolution scope when unset.
    pub(crate) scope: Option<Scope>,
    pub(crate) path: ResolutionPath,
}

pub(crate) struct Core {
    tree: Mutex<ScopeTree>,
    waits: Mutex<WaitGraph>,
    generator: GeneratorGate,
    pub(crate) observers: Observers,
    pub(crate) config: InjectorConfig,
    sequence: AtomicU64,
}

impl Core {
    pub(crate) fn new(
        tree: ScopeTree,
        generator: GeneratorGate,
        observers: Observers,
        config: InjectorConfig,
    ) -> Self {
        Self {
            tree: Mutex::new(tree),
            waits: Mutex::new(WaitGraph::default()),
            generator,
            observers,
            config,
            sequence: AtomicU64::new(1),
        }
    }

    /// Locks the tree. Never held across an `.await`.
    pub(crate) fn tree(&self) -> MutexGuard<'_, ScopeTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the singleton wait graph. Taken after the tree lock, never before it.
    pub(crate) fn waits(&self) -> MutexGuard<'_, WaitGraph> {
        self.waits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) async fn generator(&self) -> Arc<dyn Generator> {
        self.generator.clone().await
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.generator.peek().is_some()
    }

    /// Looks `token` up from `origin` without constructing anything.
    ///
    /// Ad-hoc `providers` live in a short-lived child that is removed before returning.
    pub(crate) fn lookup(
        &self,
        origin: NodeId,
        token: &Token,
        providers: Vec<Provider>,
    ) -> DiResult<Option<Match>> {
        let mut tree = self.tree();
        if providers.is_empty() {
            return tree.find(origin, origin, token);
        }
        let node = tree.create_child(origin, Scope::Resolution(self.next_sequence()), providers)?;
        let found = tree.find(node, origin, token);
        tree.dispose(node);
        found.map(|found| found.map(|record| record.with_origin(origin)))
    }

    pub(crate) fn missing(&self, token: &Token, origin: NodeId) -> DiError {
        let ancestry = self.tree().ancestry(origin);
        self.observers.missing(token, &ancestry);
        DiError::MissingProvider {
            token: token.to_string(),
            ancestry,
        }
    }

    /// Resolves and constructs a token in a short-lived child of `request.origin`.
    ///
    /// The child is released when the result is absent or construction fails,
    /// and kept when it ended up owning the produced instances.
    pub(crate) fn request(self: &Arc<Self>, request: Request) -> BoxFuture<'static, DiResult<Option<Instance>>> {
        self.request_tracked(request).1
    }

    /// Like [`Core::request`], also handing back the node the request resolves in.
    ///
    /// The node is created and searched before the future is returned. It is
    /// `None` when `request.origin` is already gone.
    pub(crate) fn request_tracked(
        self: &Arc<Self>,
        request: Request,
    ) -> (Option<NodeId>, BoxFuture<'static, DiResult<Option<Instance>>>) {
        let Request {
            origin,
            token,
            optional,
            providers,
            scope,
            path,
        } = request;
        let started = Instant::now();
        self.observers.resolving(&token);

        let scope = scope.unwrap_or_else(|| Scope::Resolution(self.next_sequence()));
        let opened = {
            let mut tree = self.tree();
            tree.create_child(origin, scope, providers)
                .map(|node| (node, tree.find(node, origin, &token)))
        };
        let (node, found) = match opened {
            Ok(opened) => opened,
            Err(err) => return (None, futures::future::err::<Option<Instance>, _>(err).boxed()),
        };

        let core = self.clone();
        let pending = async move {
            let record = match found {
                Ok(Some(record)) => record,
                Ok(None) => {
                    core.release(node).await;
                    if optional {
                        return Ok(None);
                    }
                    return Err(core.missing(&token, origin));
                }
                Err(err) => {
                    core.release(node).await;
                    return Err(err);
                }
            };

            let generator = core.generator().await;
            let outcome = generator
                .generate(GenerationContext::new(core.clone(), record, path))
                .await;

            match outcome {
                Ok(Some(instance)) => {
                    core.release_if_idle(node);
                    let elapsed = started.elapsed();
                    core.observers.resolved(&token, elapsed);
                    if core.config.trace_resolutions {
                        tracing::trace!(token = %token, node = %node, ?elapsed, "resolved");
                    }
                    Ok(Some(instance))
                }
                Ok(None) => {
                    core.release(node).await;
                    Ok(None)
                }
                Err(err) => {
                    core.observers.construction_failed(&token, &err);
                    tracing::warn!(token = %token, error = %err, "construction failed");
                    core.release(node).await;
                    Err(err)
                }
            }
        }
        .boxed();
        (Some(node), pending)
    }

    /// Disposes `node` and runs the teardown hooks it owned.
    pub(crate) async fn release(&self, node: NodeId) {
        let released = self.tree().dispose(node);
        if released.has_teardown() {
            tracing::debug!(node = %node, "running teardown of released scope");
        }
        released.teardown().await;
    }

    /// Removes `node` if it owns nothing, when the configuration asks for it.
    pub(crate) fn release_if_idle(&self, node: NodeId) {
        if !self.config.release_idle_resolutions {
            return;
        }
        let mut tree = self.tree();
        if tree.is_idle(node) {
            tree.dispose(node);
        }
    }
}
