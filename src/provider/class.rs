use crate::args::Args;
use crate::error::BoxError;
use crate::provider::{Dependency, Provider};
use crate::scope::ScopeRestriction;
use crate::token::Token;
use crate::traits::{AsyncDispose, Dispose};

/// A type the injector can construct from its declared dependencies.
///
/// `dependencies()` is the static parameter list; `construct` receives the
/// resolved values in the same order.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{Args, BoxError, Dependency, Injectable};
/// use std::sync::Arc;
///
/// struct Config {
///     url: String,
/// }
///
/// struct Repo {
///     config: Arc<Config>,
/// }
///
/// impl Injectable for Repo {
///     fn dependencies() -> Vec<Dependency> {
///         vec![Dependency::of::<Config>()]
///     }
///
///     fn construct(args: Args) -> Result<Self, BoxError> {
///         Ok(Repo { config: args.get::<Config>(0)? })
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    fn dependencies() -> Vec<Dependency> {
        Vec::new()
    }

    fn construct(args: Args) -> Result<Self, BoxError>;
}

/// Registration of a class by reference.
///
/// The synthesized provider is registered under `provide` (the class's own
/// type token when unset) and, unless `no_self` is set, also under the class
/// type token so the concrete type stays injectable.
pub struct ClassRegistration {
    class_token: Token,
    provide: Option<Token>,
    template: Provider,
}

impl ClassRegistration {
    pub fn of<T: Injectable>() -> Self {
        Self {
            class_token: Token::of::<T>(),
            provide: None,
            template: Provider::class::<T>(),
        }
    }

    pub fn provide(mut self, token: Token) -> Self {
        self.provide = Some(token);
        self
    }

    pub fn no_self(mut self) -> Self {
        self.template.flags_mut().no_self = true;
        self
    }

    pub fn singleton(mut self) -> Self {
        self.template = self.template.singleton();
        self
    }

    pub fn multi(mut self) -> Self {
        self.template = self.template.multi();
        self
    }

    pub fn parents_only(mut self) -> Self {
        self.template = self.template.parents_only();
        self
    }

    pub fn restrict_scope(mut self, restriction: ScopeRestriction) -> Self {
        self.template = self.template.restrict_scope(restriction);
        self
    }

    pub fn with_sub_providers(mut self, providers: Vec<Provider>) -> Self {
        self.template = self.template.with_sub_providers(providers);
        self
    }

    pub fn disposable<T: Dispose>(mut self) -> Self {
        self.template = self.template.disposable::<T>();
        self
    }

    pub fn async_disposable<T: AsyncDispose>(mut self) -> Self {
        self.template = self.template.async_disposable::<T>();
        self
    }

    pub fn class_token(&self) -> &Token {
        &self.class_token
    }

    pub fn is_no_self(&self) -> bool {
        self.template.flags().no_self
    }

    /// The provider for the `provide` token, plus the self registration when required.
    ///
    /// Both entries share one provider identity, so a singleton is constructed once
    /// whichever token it is requested by.
    pub(crate) fn into_providers(self) -> Result<Vec<Provider>, String> {
        let no_self = self.is_no_self();
        match self.provide {
            None if no_self => Err(format!(
                "{} is registered with no_self and no provide token",
                self.class_token
            )),
            None => Ok(vec![self.template]),
            Some(provide) if provide == self.class_token || no_self => {
                Ok(vec![self.template.rebind(provide)])
            }
            Some(provide) => {
                let aliased = self.template.rebind(provide);
                Ok(vec![aliased, self.template])
            }
        }
    }
}
