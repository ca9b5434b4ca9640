//! Instance generation: turning a matched binding into a value.
//!
//! The [`DefaultGenerator`] handles every provider shape:
//!
//! - **Value** providers return their value.
//! - **Multi** bindings fan out, one private child scope per member, and
//!   return the members' values in registration order.
//! - **Factory** and **class** providers resolve their declared dependencies
//!   concurrently, each in its own short-lived child scope, then construct.
//!   Non-singleton results are bound to the requesting resolution node so
//!   disposing it tears them down.
//! - **Singletons** are constructed at most once per owning scope. The first
//!   caller inserts a shared in-flight future before doing any dependency work;
//!   concurrent callers await that same future.
//!
//! A custom [`Generator`] can be installed through
//! [`InjectorBuilder::generator`](crate::InjectorBuilder::generator), for example
//! to wrap the default one with instrumentation.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture, FutureExt};

use crate::args::{Args, Instance};
use crate::context::{Match, NodeId};
use crate::error::{DiError, DiResult};
use crate::injector::shared::{Core, Request};
use crate::internal::{BuildKey, ResolutionPath};
use crate::provider::{FactoryFn, Provider, ProviderKind};
use crate::repository::Binding;
use crate::scope::Scope;
use crate::token::Token;

/// Strategy producing instances for matched bindings.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    async fn generate(&self, cx: GenerationContext) -> DiResult<Option<Instance>>;
}

/// Everything a generator needs to produce one value.
#[derive(Clone)]
pub struct GenerationContext {
    core: Arc<Core>,
    record: Match,
    path: ResolutionPath,
}

impl GenerationContext {
    pub(crate) fn new(core: Arc<Core>, record: Match, path: ResolutionPath) -> Self {
        Self { core, record, path }
    }

    /// The lookup result being generated.
    pub fn record(&self) -> &Match {
        &self.record
    }

    pub fn token(&self) -> &Token {
        self.record.token()
    }

    /// Labels of the providers under construction along this branch, outermost first.
    pub fn path(&self) -> Vec<String> {
        self.path.labels()
    }

    /// Resolves another token from the node this value is being produced for.
    pub async fn inject(&self, token: &Token, optional: bool) -> DiResult<Option<Instance>> {
        self.core
            .request(Request {
                origin: self.record.origin(),
                token: token.clone(),
                optional,
                providers: Vec::new(),
                scope: None,
                path: self.path.clone(),
            })
            .await
    }
}

/// The built-in generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGenerator;

#[async_trait]
impl Generator for DefaultGenerator {
    async fn generate(&self, cx: GenerationContext) -> DiResult<Option<Instance>> {
        let GenerationContext { core, record, path } = cx;
        let binding = record.binding().clone();
        match binding {
            Binding::Single(provider) => produce(core, record, provider, path).await,
            Binding::Multi(members) if members.is_empty() => Err(DiError::InvalidProviderType(
                format!("{} (empty multi binding)", record.token()),
            )),
            Binding::Multi(members) => fan_out(core, record, members, path).await,
        }
    }
}

async fn fan_out(
    core: Arc<Core>,
    record: Match,
    members: Vec<Arc<Provider>>,
    path: ResolutionPath,
) -> DiResult<Option<Instance>> {
    let mut nodes = Vec::with_capacity(members.len());
    let mut pending = Vec::with_capacity(members.len());
    for (index, provider) in members.into_iter().enumerate() {
        let scope = Scope::Provider {
            id: provider.id(),
            token: provider.label(),
        };
        let node = core.tree().create_child(record.origin(), scope, Vec::new())?;
        let member = record
            .member(index, node)
            .ok_or_else(|| DiError::InvalidProviderType(record.token().to_string()))?;
        nodes.push(node);
        pending.push(produce(core.clone(), member, provider, path.clone()));
    }

    let produced = try_join_all(pending).await?;
    for node in nodes {
        core.release_if_idle(node);
    }

    let values = produced
        .into_iter()
        .flatten()
        .flat_map(|instance| match instance {
            Instance::Single(value) => vec![value],
            Instance::Many(values) => values,
        })
        .collect();
    Ok(Some(Instance::Many(values)))
}

fn produce(
    core: Arc<Core>,
    record: Match,
    provider: Arc<Provider>,
    path: ResolutionPath,
) -> BoxFuture<'static, DiResult<Option<Instance>>> {
    async move {
        match provider.kind() {
            ProviderKind::Value(value) => Ok(Some(Instance::Single(value.clone()))),
            ProviderKind::Existing(target) if target == provider.token() => Err(
                DiError::InvalidProviderType(format!("{} is an alias of itself", provider.label())),
            ),
            ProviderKind::Existing(target) => {
                let path = path.enter(&provider, core.config.max_depth)?;
                core.request(Request {
                    origin: record.origin(),
                    token: target.clone(),
                    optional: false,
                    providers: Vec::new(),
                    scope: None,
                    path,
                })
                .await
            }
            _ if provider.is_singleton() => singleton(core, record, provider, path).await,
            _ => {
                let path = path.enter(&provider, core.config.max_depth)?;
                let produced = construct(core.clone(), record.origin(), provider.clone(), path).await?;
                if let (Some(hook), Some(Instance::Single(value))) = (provider.dispose_hook(), &produced) {
                    core.tree()
                        .repository_mut(record.origin())?
                        .bind_disposer(hook, value.clone())?;
                }
                Ok(produced)
            }
        }
    }
    .boxed()
}

async fn singleton(
    core: Arc<Core>,
    record: Match,
    provider: Arc<Provider>,
    path: ResolutionPath,
) -> DiResult<Option<Instance>> {
    let (in_flight, _waiting) = {
        let mut tree = core.tree();
        let Some(owner) = tree.owner_for(&record, &provider) else {
            let ancestry = tree.ancestry(record.origin());
            return Err(DiError::MissingProvider {
                token: record.token().to_string(),
                ancestry,
            });
        };
        let repository = tree.repository_mut(owner)?;
        if let Some(instance) = repository.get_instance(provider.id())? {
            return Ok(Some(instance));
        }
        let entered = path.enter_build(&provider, owner, core.config.max_depth)?;
        match repository.pending(provider.id()) {
            Some(in_flight) => {
                let waiting = WaitGuard::enter(&core, &path, &provider, owner)?;
                (in_flight, waiting)
            }
            None => {
                let in_flight = build_singleton(core.clone(), owner, provider.clone(), entered)
                    .boxed()
                    .shared();
                repository.set_pending(provider.id(), in_flight.clone());
                tracing::debug!(token = %record.token(), provider = %provider.id(), owner = %owner, "constructing singleton");
                (in_flight, None)
            }
        }
    };
    in_flight.await
}

/// Edges a branch holds in the wait graph while it awaits another build.
struct WaitGuard {
    core: Arc<Core>,
    waiters: Vec<BuildKey>,
    target: BuildKey,
}

impl WaitGuard {
    /// Registers the builds on `path` as waiting on the build of `provider` cached on `owner`.
    ///
    /// Nothing is registered when `path` is inside no build. Fails with
    /// `Circular` when that build already waits on one of ours.
    fn enter(
        core: &Arc<Core>,
        path: &ResolutionPath,
        provider: &Provider,
        owner: NodeId,
    ) -> DiResult<Option<WaitGuard>> {
        let waiters = path.builds();
        if waiters.is_empty() {
            return Ok(None);
        }
        let target = (owner, provider.id());
        if !core.waits().wait(&waiters, target) {
            let mut cycle = path.labels();
            cycle.push(provider.label());
            return Err(DiError::Circular(cycle));
        }
        Ok(Some(WaitGuard {
            core: core.clone(),
            waiters,
            target,
        }))
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.core.waits().release(&self.waiters, self.target);
    }
}

async fn build_singleton(
    core: Arc<Core>,
    owner: NodeId,
    provider: Arc<Provider>,
    path: ResolutionPath,
) -> DiResult<Option<Instance>> {
    let produced = construct(core.clone(), owner, provider.clone(), path).await;

    let mut tree = core.tree();
    let Ok(repository) = tree.repository_mut(owner) else {
        tracing::debug!(provider = %provider.id(), "singleton owner disposed during construction");
        return produced;
    };
    repository.clear_pending(provider.id());
    if let Ok(Some(instance)) = &produced {
        repository.add_instance(provider.id(), instance.clone())?;
        if let (Some(hook), Instance::Single(value)) = (provider.dispose_hook(), instance) {
            repository.bind_disposer(hook, value.clone())?;
        }
    }
    produced
}

/// Resolves the provider's dependencies below `parent` and calls its factory or constructor.
async fn construct(
    core: Arc<Core>,
    parent: NodeId,
    provider: Arc<Provider>,
    path: ResolutionPath,
) -> DiResult<Option<Instance>> {
    let target = provider.label();
    let tokens = provider
        .dependencies()
        .iter()
        .map(|dep| dep.token().resolve(&target))
        .collect::<DiResult<Vec<Token>>>()?;

    let private = if provider.sub_providers().is_empty() {
        None
    } else {
        let scope = Scope::Provider {
            id: provider.id(),
            token: target.clone(),
        };
        Some(core.tree().create_child(parent, scope, provider.sub_providers().to_vec())?)
    };
    let base = private.unwrap_or(parent);

    let (nodes, requests): (Vec<_>, Vec<_>) = provider
        .dependencies()
        .iter()
        .zip(tokens)
        .map(|(dep, token)| {
            core.request_tracked(Request {
                origin: base,
                token,
                optional: dep.is_optional(),
                providers: dep.providers().to_vec(),
                scope: None,
                path: path.clone(),
            })
        })
        .unzip();

    let produced = match try_join_all(requests).await {
        Ok(values) => invoke_recipe(&provider, Args::new(target.clone(), values)).await,
        Err(err) => Err(err),
    };

    // Dependencies built for a failed construction go with it.
    if produced.is_err() {
        for node in nodes.into_iter().flatten() {
            core.release(node).await;
        }
    }

    if let Some(node) = private {
        if produced.is_err() {
            core.release(node).await;
        } else {
            core.release_if_idle(node);
        }
    }
    produced
}

async fn invoke_recipe(provider: &Provider, args: Args) -> DiResult<Option<Instance>> {
    let target = args.target().to_string();
    let produced = match provider.kind() {
        ProviderKind::Factory {
            factory: FactoryFn::Sync(factory),
            ..
        } => factory(args),
        ProviderKind::Factory {
            factory: FactoryFn::Async(factory),
            ..
        } => factory(args).await,
        ProviderKind::Class { ctor, .. } => ctor(args).map(Some),
        ProviderKind::Value(_) | ProviderKind::Existing(_) => {
            return Err(DiError::InvalidProviderType(target))
        }
    };
    produced
        .map(|value| value.map(Instance::Single))
        .map_err(|err| DiError::from_boxed(target, err))
}
