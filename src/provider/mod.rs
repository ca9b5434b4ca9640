//! Providers: recipes for producing the value of a token.
//!
//! A [`Provider`] is one of three shapes:
//!
//! - a fixed **value**,
//! - a synchronous or asynchronous **factory** with its own dependency list,
//! - a constructible **class** (an [`Injectable`] type) with its own dependency list,
//!
//! plus an alias shape ([`Provider::existing`]) that forwards to another token.
//! Policy flags (`multi`, `singleton`, `restrict_scope`, `no_self`,
//! `parents_only`) stay unset until the repository reconciles them with the
//! token's policy at registration time.

mod class;
mod dependency;

pub use class::{ClassRegistration, Injectable};
pub use dependency::{Dependency, TokenRef};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::args::{AnyArc, Args};
use crate::error::BoxError;
use crate::scope::ScopeRestriction;
use crate::token::Token;
use crate::traits::{AsyncDispose, Dispose};

static NEXT_PROVIDER: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a provider. Keys the singleton and in-flight tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u64);

impl ProviderId {
    fn next() -> Self {
        ProviderId(NEXT_PROVIDER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type SyncFactory = Arc<dyn Fn(Args) -> Result<Option<AnyArc>, BoxError> + Send + Sync>;
pub type AsyncFactory =
    Arc<dyn Fn(Args) -> BoxFuture<'static, Result<Option<AnyArc>, BoxError>> + Send + Sync>;
pub type Constructor = Arc<dyn Fn(Args) -> Result<AnyArc, BoxError> + Send + Sync>;

/// Factory function, awaited when asynchronous.
#[derive(Clone)]
pub enum FactoryFn {
    Sync(SyncFactory),
    Async(AsyncFactory),
}

/// How a provider produces its value.
#[derive(Clone)]
pub enum ProviderKind {
    Value(AnyArc),
    Factory {
        factory: FactoryFn,
        deps: Vec<Dependency>,
    },
    Class {
        type_name: &'static str,
        ctor: Constructor,
        deps: Vec<Dependency>,
    },
    /// Resolves another token in place of this one.
    Existing(Token),
}

impl ProviderKind {
    pub fn shape(&self) -> &'static str {
        match self {
            ProviderKind::Value(_) => "value",
            ProviderKind::Factory { factory: FactoryFn::Sync(_), .. } => "factory",
            ProviderKind::Factory { factory: FactoryFn::Async(_), .. } => "async factory",
            ProviderKind::Class { .. } => "class",
            ProviderKind::Existing(_) => "existing",
        }
    }
}

/// Provider policy flags. `None` means "not set by the provider".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderFlags {
    pub multi: Option<bool>,
    pub singleton: Option<bool>,
    pub restrict_scope: Option<ScopeRestriction>,
    pub no_self: bool,
    pub parents_only: Option<bool>,
}

/// Teardown run when the scope owning an instance is disposed.
#[derive(Clone)]
pub enum DisposeHook {
    Sync(Arc<dyn Fn(AnyArc) + Send + Sync>),
    Async(Arc<dyn Fn(AnyArc) -> BoxFuture<'static, ()> + Send + Sync>),
}

/// Recipe for producing the value of a token.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{Dependency, Provider, Token};
///
/// let port = Token::named("Port");
/// let url = Token::named("Url");
///
/// let providers = vec![
///     Provider::value(port.clone(), 8080u16),
///     Provider::factory(url.clone(), vec![Dependency::new(&port)], |args| {
///         let port = args.get::<u16>(0)?;
///         Ok(format!("http://localhost:{port}"))
///     })
///     .singleton(),
/// ];
///
/// assert!(providers[1].is_singleton());
/// assert_eq!(providers[1].dependencies().len(), 1);
/// ```
#[derive(Clone)]
pub struct Provider {
    id: ProviderId,
    provide: Token,
    kind: ProviderKind,
    sub_providers: Vec<Provider>,
    flags: ProviderFlags,
    dispose: Option<DisposeHook>,
}

impl Provider {
    fn with_kind(provide: Token, kind: ProviderKind) -> Self {
        Self {
            id: ProviderId::next(),
            provide,
            kind,
            sub_providers: Vec::new(),
            flags: ProviderFlags::default(),
            dispose: None,
        }
    }

    /// A fixed value.
    pub fn value<T: Send + Sync + 'static>(provide: Token, value: T) -> Self {
        Self::with_kind(provide, ProviderKind::Value(Arc::new(value)))
    }

    /// A fixed, already shared value.
    pub fn shared(provide: Token, value: AnyArc) -> Self {
        Self::with_kind(provide, ProviderKind::Value(value))
    }

    /// A synchronous factory.
    pub fn factory<T, F>(provide: Token, deps: Vec<Dependency>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let factory: SyncFactory =
            Arc::new(move |args| factory(args).map(|value| Some(Arc::new(value) as AnyArc)));
        Self::with_kind(
            provide,
            ProviderKind::Factory {
                factory: FactoryFn::Sync(factory),
                deps,
            },
        )
    }

    /// A synchronous factory that may produce nothing.
    ///
    /// An absent result releases the resolution and is returned as absent.
    pub fn optional_factory<T, F>(provide: Token, deps: Vec<Dependency>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Args) -> Result<Option<T>, BoxError> + Send + Sync + 'static,
    {
        let factory: SyncFactory = Arc::new(move |args| {
            factory(args).map(|value| value.map(|value| Arc::new(value) as AnyArc))
        });
        Self::with_kind(
            provide,
            ProviderKind::Factory {
                factory: FactoryFn::Sync(factory),
                deps,
            },
        )
    }

    /// An asynchronous factory.
    pub fn async_factory<T, F, Fut>(provide: Token, deps: Vec<Dependency>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        let factory: AsyncFactory = Arc::new(move |args| {
            factory(args)
                .map(|result| result.map(|value| Some(Arc::new(value) as AnyArc)))
                .boxed()
        });
        Self::with_kind(
            provide,
            ProviderKind::Factory {
                factory: FactoryFn::Async(factory),
                deps,
            },
        )
    }

    /// Class provider for `T`, registered under `T`'s own type token.
    pub fn class<T: Injectable>() -> Self {
        Self::class_as::<T>(Token::of::<T>())
    }

    /// Class provider for `T`, registered under `provide`.
    pub fn class_as<T: Injectable>(provide: Token) -> Self {
        let ctor: Constructor = Arc::new(|args| T::construct(args).map(|value| Arc::new(value) as AnyArc));
        Self::with_kind(
            provide,
            ProviderKind::Class {
                type_name: std::any::type_name::<T>(),
                ctor,
                deps: T::dependencies(),
            },
        )
    }

    /// Alias: resolving `provide` resolves `target` instead.
    pub fn existing(provide: Token, target: Token) -> Self {
        Self::with_kind(provide, ProviderKind::Existing(target))
    }

    pub fn singleton(mut self) -> Self {
        self.flags.singleton = Some(true);
        self
    }

    pub fn multi(mut self) -> Self {
        self.flags.multi = Some(true);
        self
    }

    pub fn parents_only(mut self) -> Self {
        self.flags.parents_only = Some(true);
        self
    }

    pub fn restrict_scope(mut self, restriction: ScopeRestriction) -> Self {
        self.flags.restrict_scope = Some(restriction);
        self
    }

    /// Replaces every flag at once, including explicit `false` values.
    pub fn with_flags(mut self, flags: ProviderFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Providers visible only while resolving this provider's dependencies.
    pub fn with_sub_providers(mut self, providers: Vec<Provider>) -> Self {
        self.sub_providers = providers;
        self
    }

    /// Calls [`Dispose::dispose`] on the produced value when its scope is disposed.
    pub fn disposable<T: Dispose>(mut self) -> Self {
        self.dispose = Some(DisposeHook::Sync(Arc::new(|value: AnyArc| {
            if let Ok(value) = value.downcast::<T>() {
                value.dispose();
            }
        })));
        self
    }

    /// Awaits [`AsyncDispose::dispose`] on the produced value when its scope is disposed.
    pub fn async_disposable<T: AsyncDispose>(mut self) -> Self {
        self.dispose = Some(DisposeHook::Async(Arc::new(|value: AnyArc| {
            async move {
                if let Ok(value) = value.downcast::<T>() {
                    value.dispose().await;
                }
            }
            .boxed()
        })));
        self
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn token(&self) -> &Token {
        &self.provide
    }

    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    pub fn flags(&self) -> &ProviderFlags {
        &self.flags
    }

    pub fn sub_providers(&self) -> &[Provider] {
        &self.sub_providers
    }

    pub fn dependencies(&self) -> &[Dependency] {
        match &self.kind {
            ProviderKind::Factory { deps, .. } | ProviderKind::Class { deps, .. } => deps,
            ProviderKind::Value(_) | ProviderKind::Existing(_) => &[],
        }
    }

    pub fn is_singleton(&self) -> bool {
        self.flags.singleton.unwrap_or(false)
    }

    pub fn is_multi(&self) -> bool {
        self.flags.multi.unwrap_or(false)
    }

    pub fn is_parents_only(&self) -> bool {
        self.flags.parents_only.unwrap_or(false)
    }

    pub fn restriction(&self) -> Option<&ScopeRestriction> {
        self.flags.restrict_scope.as_ref()
    }

    pub(crate) fn dispose_hook(&self) -> Option<&DisposeHook> {
        self.dispose.as_ref()
    }

    pub(crate) fn flags_mut(&mut self) -> &mut ProviderFlags {
        &mut self.flags
    }

    /// Label used in diagnostics: the class name for classes, the token otherwise.
    pub fn label(&self) -> String {
        match &self.kind {
            ProviderKind::Class { type_name, .. } if self.provide.name() != *type_name => {
                format!("{} ({})", self.provide, type_name)
            }
            _ => self.provide.to_string(),
        }
    }

    /// Same recipe and flags under another token, with the same identity.
    pub(crate) fn rebind(&self, provide: Token) -> Self {
        Self {
            provide,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("provide", &self.provide)
            .field("kind", &self.kind.shape())
            .field("flags", &self.flags)
            .field("sub_providers", &self.sub_providers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_gets_a_fresh_id() {
        let token = Token::named("Value");
        let a = Provider::value(token.clone(), 1u8);
        let b = Provider::value(token, 1u8);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn flags_default_to_unset() {
        let provider = Provider::value(Token::named("Value"), 1u8);
        assert_eq!(provider.flags(), &ProviderFlags::default());
        assert!(!provider.is_singleton());
        assert!(!provider.is_multi());

        let provider = provider.singleton().multi().parents_only();
        assert!(provider.is_singleton() && provider.is_multi() && provider.is_parents_only());
    }

    #[test]
    fn value_providers_have_no_dependencies() {
        let provider = Provider::existing(Token::named("Alias"), Token::named("Target"));
        assert!(provider.dependencies().is_empty());
        assert_eq!(provider.kind().shape(), "existing");
    }
}
