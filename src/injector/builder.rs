use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::config::InjectorConfig;
use crate::context::ScopeTree;
use crate::error::{DiError, DiResult};
use crate::generator::{DefaultGenerator, Generator};
use crate::injector::shared::Core;
use crate::injector::Injector;
use crate::observer::{DiObserver, Observers};
use crate::provider::{ClassRegistration, Provider};
use crate::repository::Repository;
use crate::scope::Scope;

/// Assembles the root injector of a new scope tree.
///
/// # Examples
///
/// ```
/// use ferrous_injector::{Injector, InjectorConfig, Provider, Repository, Token};
///
/// let greeting = Token::named("Greeting");
///
/// let mut ambient = Repository::ambient();
/// ambient.register(Provider::value(greeting.clone(), "hello")).unwrap();
///
/// let injector = Injector::builder()
///     .ambient(ambient)
///     .config(InjectorConfig { max_depth: 64, ..InjectorConfig::default() })
///     .build()
///     .unwrap();
///
/// assert!(injector.can_resolve(&greeting, vec![]));
/// ```
pub struct InjectorBuilder {
    ambient: Repository,
    providers: Vec<Provider>,
    classes: Vec<ClassRegistration>,
    observers: Observers,
    config: InjectorConfig,
    generator: Option<BoxFuture<'static, Arc<dyn Generator>>>,
}

impl Default for InjectorBuilder {
    fn default() -> Self {
        Self {
            ambient: Repository::ambient(),
            providers: Vec::new(),
            classes: Vec::new(),
            observers: Observers::new(),
            config: InjectorConfig::default(),
            generator: None,
        }
    }
}

impl InjectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrations shared by the whole tree. Must come from [`Repository::ambient`].
    pub fn ambient(mut self, ambient: Repository) -> Self {
        self.ambient = ambient;
        self
    }

    /// A provider for the root scope.
    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// A class registration for the root scope.
    pub fn class(mut self, registration: ClassRegistration) -> Self {
        self.classes.push(registration);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn DiObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn config(mut self, config: InjectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn generator(self, generator: impl Generator) -> Self {
        let generator: Arc<dyn Generator> = Arc::new(generator);
        self.generator_future(async move { generator })
    }

    /// A generator that becomes available later.
    ///
    /// Lookups work immediately; every construction waits until `future`
    /// completes.
    pub fn generator_future<F>(mut self, future: F) -> Self
    where
        F: Future<Output = Arc<dyn Generator>> + Send + 'static,
    {
        self.generator = Some(future.boxed());
        self
    }

    pub fn build(self) -> DiResult<Injector> {
        self.config.validate()?;
        if !self.ambient.is_ambient() {
            return Err(DiError::InvalidRegistration(
                "the ambient repository must be created with Repository::ambient()".to_string(),
            ));
        }

        let mut tree = ScopeTree::new(self.ambient);
        let root = tree.create_child(tree.ambient(), Scope::Root, self.providers)?;
        for registration in self.classes {
            tree.register_class(root, registration)?;
        }

        let generator = self
            .generator
            .unwrap_or_else(|| async { Arc::new(DefaultGenerator) as Arc<dyn Generator> }.boxed())
            .shared();

        tracing::debug!(
            observers = self.observers.has_observers(),
            max_depth = self.config.max_depth,
            "built root injector"
        );
        let core = Core::new(tree, generator, self.observers, self.config);
        Ok(Injector::from_parts(Arc::new(core), root))
    }
}
