//! Token registry and singleton store for one scope value.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};

use crate::args::{AnyArc, Instance};
use crate::error::{DiError, DiResult};
use crate::internal::DisposeBag;
use crate::provider::{ClassRegistration, DisposeHook, Provider, ProviderId};
use crate::token::Token;

/// An in-flight singleton construction that late callers await.
pub(crate) type PendingInstance = Shared<BoxFuture<'static, DiResult<Option<Instance>>>>;

/// Registry entry for a token.
///
/// A token is either single or multi within one repository; the shape is fixed
/// by the first registration.
#[derive(Debug, Clone)]
pub enum Binding {
    Single(Arc<Provider>),
    /// Members in registration order. Never empty once registered.
    Multi(Vec<Arc<Provider>>),
}

impl Binding {
    pub fn is_multi(&self) -> bool {
        matches!(self, Binding::Multi(_))
    }

    pub fn providers(&self) -> &[Arc<Provider>] {
        match self {
            Binding::Single(provider) => std::slice::from_ref(provider),
            Binding::Multi(providers) => providers,
        }
    }

    /// The provider whose flags speak for the whole entry.
    pub fn first(&self) -> Option<&Arc<Provider>> {
        self.providers().first()
    }

    pub(crate) fn is_parents_only(&self) -> bool {
        self.first().is_some_and(|provider| provider.is_parents_only())
    }
}

/// Registry of providers plus the instances and teardown hooks they produced.
///
/// A repository is created for every distinct scope value in the tree. The
/// ambient repository holds convenience registrations shared by a whole tree;
/// it never stores instances and cannot be disposed.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{Provider, Repository, Token, TokenPolicy, DiError};
///
/// let hooks = Token::opinionated("Hooks", TokenPolicy::new().multi(true));
///
/// let mut repo = Repository::new();
/// repo.register(Provider::value(hooks.clone(), "first")).unwrap();
/// repo.register(Provider::value(hooks.clone(), "second")).unwrap();
/// assert_eq!(repo.get(&hooks).unwrap().providers().len(), 2);
///
/// let single = Provider::value(Token::named("Port"), 80u16);
/// let port = single.token().clone();
/// repo.register(single).unwrap();
/// let err = repo.register(Provider::value(port, 81u16).multi()).unwrap_err();
/// assert!(matches!(err, DiError::ConflictingOptions { .. }));
/// ```
pub struct Repository {
    registry: HashMap<Token, Binding>,
    order: Vec<Token>,
    instances: HashMap<ProviderId, Instance>,
    pending: HashMap<ProviderId, PendingInstance>,
    disposers: DisposeBag,
    ambient: bool,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
            order: Vec::new(),
            instances: HashMap::new(),
            pending: HashMap::new(),
            disposers: DisposeBag::default(),
            ambient: false,
        }
    }

    /// A repository for ambient registrations.
    pub fn ambient() -> Self {
        Self {
            ambient: true,
            ..Self::new()
        }
    }

    pub fn is_ambient(&self) -> bool {
        self.ambient
    }

    pub fn allows_instances(&self) -> bool {
        !self.ambient
    }

    /// Registers a provider under its token.
    ///
    /// Opinionated token policy is applied first. Multi providers accumulate in
    /// registration order; single providers replace the previous entry.
    pub fn register(&mut self, provider: Provider) -> DiResult<()> {
        let provider = reconcile(provider)?;
        let token = provider.token().clone();
        let multi = provider.is_multi();
        let provider = Arc::new(provider);

        match self.registry.entry(token.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(if multi {
                    Binding::Multi(vec![provider.clone()])
                } else {
                    Binding::Single(provider.clone())
                });
                self.order.push(token.clone());
            }
            Entry::Occupied(mut slot) => match (slot.get_mut(), multi) {
                (Binding::Single(existing), false) => *existing = provider.clone(),
                (Binding::Multi(members), true) => {
                    if !members.iter().any(|member| member.id() == provider.id()) {
                        members.push(provider.clone());
                    }
                }
                (Binding::Single(_), true) => {
                    return Err(DiError::ConflictingOptions {
                        token: token.to_string(),
                        reason: "multi provider registered over a single provider",
                    })
                }
                (Binding::Multi(_), false) => {
                    return Err(DiError::ConflictingOptions {
                        token: token.to_string(),
                        reason: "single provider registered over multi providers",
                    })
                }
            },
        }

        tracing::debug!(
            token = %token,
            provider = %provider.id(),
            shape = provider.kind().shape(),
            multi,
            singleton = provider.is_singleton(),
            ambient = self.ambient,
            "registered provider"
        );
        Ok(())
    }

    /// Registers a class by reference. See [`ClassRegistration`].
    pub fn register_class(&mut self, registration: ClassRegistration) -> DiResult<()> {
        let providers = registration
            .into_providers()
            .map_err(DiError::InvalidRegistration)?;
        providers.into_iter().try_for_each(|provider| self.register(provider))
    }

    pub fn register_all(&mut self, providers: impl IntoIterator<Item = Provider>) -> DiResult<()> {
        providers.into_iter().try_for_each(|provider| self.register(provider))
    }

    pub fn get(&self, token: &Token) -> Option<&Binding> {
        self.registry.get(token)
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.registry.contains_key(token)
    }

    /// Entries in first-registration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&Token, &Binding)> {
        self.order
            .iter()
            .filter_map(|token| self.registry.get(token).map(|binding| (token, binding)))
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn add_instance(&mut self, id: ProviderId, value: Instance) -> DiResult<()> {
        if self.ambient {
            return Err(DiError::AmbientRepository("store instances"));
        }
        self.instances.insert(id, value);
        Ok(())
    }

    pub fn get_instance(&self, id: ProviderId) -> DiResult<Option<Instance>> {
        if self.ambient {
            return Err(DiError::AmbientRepository("store instances"));
        }
        Ok(self.instances.get(&id).cloned())
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub(crate) fn pending(&self, id: ProviderId) -> Option<PendingInstance> {
        self.pending.get(&id).cloned()
    }

    pub(crate) fn set_pending(&mut self, id: ProviderId, pending: PendingInstance) {
        self.pending.insert(id, pending);
    }

    pub(crate) fn clear_pending(&mut self, id: ProviderId) {
        self.pending.remove(&id);
    }

    pub(crate) fn bind_disposer(&mut self, hook: &DisposeHook, value: AnyArc) -> DiResult<()> {
        if self.ambient {
            return Err(DiError::AmbientRepository("own disposable instances"));
        }
        self.disposers.push(hook, value);
        Ok(())
    }

    /// True when nothing was constructed into this repository.
    pub(crate) fn is_idle(&self) -> bool {
        self.instances.is_empty() && self.pending.is_empty() && self.disposers.is_empty()
    }

    /// Clears entries and instances and hands back the teardown hooks to run.
    pub(crate) fn teardown(&mut self) -> DiResult<DisposeBag> {
        if self.ambient {
            return Err(DiError::AmbientRepository("be disposed"));
        }
        self.registry.clear();
        self.order.clear();
        self.instances.clear();
        self.pending.clear();
        Ok(std::mem::take(&mut self.disposers))
    }

    /// Clears the repository and runs its teardown hooks.
    pub async fn dispose(&mut self) -> DiResult<()> {
        let bag = self.teardown()?;
        bag.run().await;
        Ok(())
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("ambient", &self.ambient)
            .field("tokens", &self.order)
            .field("instances", &self.instances.len())
            .field("pending", &self.pending.len())
            .field("disposers", &self.disposers.len())
            .finish()
    }
}

/// Applies the token's policy to the provider's unset flags.
fn reconcile(mut provider: Provider) -> DiResult<Provider> {
    let Some(policy) = provider.token().policy().cloned() else {
        return Ok(provider);
    };
    let token = provider.token().to_string();
    let flags = provider.flags_mut();
    reconcile_option(&token, "multi", policy.multi, &mut flags.multi)?;
    reconcile_option(&token, "singleton", policy.singleton, &mut flags.singleton)?;
    reconcile_option(&token, "parents_only", policy.parents_only, &mut flags.parents_only)?;
    reconcile_option(
        &token,
        "restrict_scope",
        policy.restrict_scope,
        &mut flags.restrict_scope,
    )?;
    Ok(provider)
}

fn reconcile_option<T: PartialEq + fmt::Debug>(
    token: &str,
    option: &'static str,
    required: Option<T>,
    actual: &mut Option<T>,
) -> DiResult<()> {
    let Some(required) = required else {
        return Ok(());
    };
    match actual.as_ref() {
        Some(found) if *found != required => Err(DiError::PolicyConflict {
            token: token.to_string(),
            option,
            expected: format!("{required:?}"),
            found: format!("{found:?}"),
        }),
        Some(_) => Ok(()),
        None => {
            *actual = Some(required);
            Ok(())
        }
    }
}
