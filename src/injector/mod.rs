//! The injector façade: registration, lookup, injection and invocation.

mod builder;
pub(crate) mod shared;

pub use builder::InjectorBuilder;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::args::{AnyArc, Args, Instance};
use crate::context::NodeId;
use crate::descriptors::{self, ProviderDescriptor};
use crate::error::{DiError, DiResult};
use crate::internal::ResolutionPath;
use crate::invoke::Invocable;
use crate::provider::{ClassRegistration, Dependency, Provider};
use crate::repository::Binding;
use crate::scope::Scope;
use crate::token::Token;

use self::shared::{Core, Request};

/// Options of a single `resolve` or `inject` call.
#[derive(Debug, Clone, Default)]
pub struct InjectOptions {
    optional: bool,
    providers: Vec<Provider>,
}

impl InjectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return absent instead of failing when nothing provides the token.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// An ad-hoc provider visible only to this call.
    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Handle on one node of a scope tree.
///
/// Injectors are cheap to clone; clones address the same node. Child
/// injectors created with [`create_child`](Injector::create_child) are
/// disposed together with their parent.
///
/// # Examples
///
/// ```
/// use ferrous_injector::{Dependency, Injector, Provider, Scope, Token};
///
/// # tokio_test();
/// # fn tokio_test() {
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let name = Token::named("Name");
/// let greeting = Token::named("Greeting");
///
/// let root = Injector::builder()
///     .provider(Provider::value(name.clone(), "world".to_string()))
///     .provider(Provider::factory(greeting.clone(), vec![Dependency::new(&name)], |args| {
///         Ok(format!("hello {}", args.get::<String>(0)?))
///     }))
///     .build()
///     .unwrap();
///
/// let request = root
///     .create_child(Scope::named("request"), vec![Provider::value(name.clone(), "rust".to_string())])
///     .unwrap();
///
/// assert_eq!(*root.inject::<String>(&greeting).await.unwrap(), "hello world");
/// assert_eq!(*request.inject::<String>(&greeting).await.unwrap(), "hello rust");
///
/// root.dispose("shutdown").await;
/// assert!(request.is_disposed());
/// # });
/// # }
/// ```
#[derive(Clone)]
pub struct Injector {
    core: Arc<Core>,
    node: NodeId,
}

impl Injector {
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    pub(crate) fn from_parts(core: Arc<Core>, node: NodeId) -> Self {
        Self { core, node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn scope(&self) -> DiResult<Scope> {
        self.core
            .tree()
            .scope(self.node)
            .cloned()
            .ok_or_else(|| self.disposed())
    }

    pub fn is_disposed(&self) -> bool {
        !self.core.tree().contains(self.node)
    }

    /// True once the generator is available.
    pub fn is_ready(&self) -> bool {
        self.core.is_ready()
    }

    /// Waits for the generator.
    pub async fn ready(&self) {
        self.core.generator().await;
    }

    /// Scope labels from this node up to the ambient node.
    pub fn ancestry(&self) -> Vec<String> {
        self.core.tree().ancestry(self.node)
    }

    /// Every provider visible from this node, nearest scope first.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        descriptors::collect(&self.core.tree(), self.node)
    }

    pub fn register(&self, provider: Provider) -> DiResult<()> {
        self.core.tree().register(self.node, provider)
    }

    pub fn register_class(&self, registration: ClassRegistration) -> DiResult<()> {
        self.core.tree().register_class(self.node, registration)
    }

    pub fn register_all(&self, providers: impl IntoIterator<Item = Provider>) -> DiResult<()> {
        let mut tree = self.core.tree();
        providers
            .into_iter()
            .try_for_each(|provider| tree.register(self.node, provider))
    }

    /// Finds the binding for a required token without constructing anything.
    pub fn resolve(&self, token: &Token) -> DiResult<Binding> {
        self.resolve_with(token, InjectOptions::new())?
            .ok_or_else(|| self.core.missing(token, self.node))
    }

    /// Finds the binding for `token`, honouring `optional` and ad-hoc providers.
    pub fn resolve_with(&self, token: &Token, options: InjectOptions) -> DiResult<Option<Binding>> {
        let found = self.core.lookup(self.node, token, options.providers)?;
        match found {
            Some(record) => Ok(Some(record.binding().clone())),
            None if options.optional => Ok(None),
            None => Err(self.core.missing(token, self.node)),
        }
    }

    /// Shallow check: is there a usable provider for `token`? Never constructs.
    pub fn can_resolve(&self, token: &Token, providers: Vec<Provider>) -> bool {
        matches!(self.core.lookup(self.node, token, providers), Ok(Some(_)))
    }

    /// Resolves and constructs `token`.
    pub async fn inject_with(&self, token: &Token, options: InjectOptions) -> DiResult<Option<Instance>> {
        self.core
            .request(Request {
                origin: self.node,
                token: token.clone(),
                optional: options.optional,
                providers: options.providers,
                scope: None,
                path: ResolutionPath::default(),
            })
            .await
    }

    /// Resolves a required single value of type `T`.
    pub async fn inject<T: Send + Sync + 'static>(&self, token: &Token) -> DiResult<Arc<T>> {
        match self.inject_with(token, InjectOptions::new()).await? {
            Some(instance) => instance.downcast(),
            None => Err(self.core.missing(token, self.node)),
        }
    }

    /// Resolves a value of type `T`, or `None` when nothing provides it.
    pub async fn inject_optional<T: Send + Sync + 'static>(&self, token: &Token) -> DiResult<Option<Arc<T>>> {
        self.inject_with(token, InjectOptions::new().optional())
            .await?
            .map(|instance| instance.downcast::<T>())
            .transpose()
    }

    /// Resolves every value of a multi token, in registration order.
    pub async fn inject_all<T: Send + Sync + 'static>(&self, token: &Token) -> DiResult<Vec<Arc<T>>> {
        match self.inject_with(token, InjectOptions::new().optional()).await? {
            Some(instance) => instance.downcast_all(),
            None => Ok(Vec::new()),
        }
    }

    /// Resolves `T` by its type token.
    pub async fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.inject::<T>(&Token::of::<T>()).await
    }

    /// Resolves one declared parameter in a child scope tagged `scope`.
    pub async fn inject_param(&self, dependency: &Dependency, scope: Scope) -> DiResult<Option<Instance>> {
        let token = dependency.token().resolve(&scope.to_string())?;
        self.core
            .request(Request {
                origin: self.node,
                token,
                optional: dependency.is_optional(),
                providers: dependency.providers().to_vec(),
                scope: Some(scope),
                path: ResolutionPath::default(),
            })
            .await
    }

    /// Calls `method` on `target` with every declared parameter injected.
    ///
    /// The call runs in a child scope identifying this invocation, seeded with
    /// `providers`. Parameters are resolved concurrently and passed in
    /// declaration order.
    pub async fn invoke<I: Invocable>(
        &self,
        target: &I,
        method: &str,
        providers: Vec<Provider>,
    ) -> DiResult<AnyArc> {
        let target_name = std::any::type_name::<I>();
        let signature = target
            .signature(method)
            .ok_or_else(|| DiError::MethodNotFound {
                target: target_name.to_string(),
                method: method.to_string(),
            })?;
        let method_name: Cow<'static, str> = Cow::Owned(signature.name().to_string());

        let scope = Scope::Invocation {
            target: target_name,
            instance: (target as *const I).cast::<()>() as usize,
            method: method_name.clone(),
            call: self.core.next_sequence(),
        };
        let call = self.create_child(scope, providers)?;

        let params = signature.params().iter().enumerate().map(|(index, dependency)| {
            call.inject_param(
                dependency,
                Scope::Parameter {
                    target: target_name,
                    method: method_name.clone(),
                    index,
                },
            )
        });
        let values = match try_join_all(params).await {
            Ok(values) => values,
            Err(err) => {
                self.core.release(call.node).await;
                return Err(err);
            }
        };

        let label = format!("{target_name}::{method_name}");
        let outcome = target
            .call(method, Args::new(label.clone(), values))
            .await
            .map_err(|err| DiError::from_boxed(label, err));
        match &outcome {
            Ok(_) => self.core.release_if_idle(call.node),
            Err(_) => self.core.release(call.node).await,
        }
        outcome
    }

    /// [`invoke`](Injector::invoke) with the result downcast to `R`.
    pub async fn invoke_as<I: Invocable, R: Send + Sync + 'static>(
        &self,
        target: &I,
        method: &str,
        providers: Vec<Provider>,
    ) -> DiResult<Arc<R>> {
        let value = self.invoke(target, method, providers).await?;
        crate::args::downcast_arc(value)
    }

    /// A child injector whose scope node is seeded with `providers`.
    pub fn create_child(&self, scope: Scope, providers: Vec<Provider>) -> DiResult<Injector> {
        let node = self.core.tree().create_child(self.node, scope, providers)?;
        Ok(Self::from_parts(self.core.clone(), node))
    }

    /// Disposes this node and every node below it, running their teardown hooks.
    ///
    /// Disposing twice is a no-op. Callers must await outstanding `inject` and
    /// `invoke` calls on this injector first.
    pub async fn dispose(&self, reason: &str) {
        let released = self.core.tree().dispose(self.node);
        if released.scopes.is_empty() {
            return;
        }
        for (_, scope) in &released.scopes {
            self.core.observers.disposed(scope, reason);
        }
        tracing::debug!(node = %self.node, reason, nodes = released.scopes.len(), "disposing injector");
        released.teardown().await;
    }

    fn disposed(&self) -> DiError {
        DiError::Disposed(self.node.to_string())
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("node", &self.node)
            .field("ancestry", &self.ancestry())
            .finish()
    }
}
