//! Tokens: the identity of "the thing that can be injected".

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::scope::ScopeRestriction;

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Identity {
    Type(TypeId),
    Symbol(u64),
}

/// The three kinds of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Nominal handle for a Rust type.
    Type,
    /// Free-form symbolic handle.
    Named,
    /// Symbolic handle carrying an authoritative [`TokenPolicy`].
    Opinionated,
}

/// Policy carried by an opinionated token.
///
/// Every field is optional. A provider registered for the token inherits the
/// fields it leaves unset and is rejected if it sets one to a different value.
///
/// ```rust
/// use ferrous_injector::{Token, TokenPolicy};
///
/// let plugins = Token::opinionated("Plugins", TokenPolicy::new().multi(true));
/// assert_eq!(plugins.policy().and_then(|p| p.multi), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenPolicy {
    pub multi: Option<bool>,
    pub singleton: Option<bool>,
    pub restrict_scope: Option<ScopeRestriction>,
    pub parents_only: Option<bool>,
}

impl TokenPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = Some(multi);
        self
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = Some(singleton);
        self
    }

    pub fn restrict_scope(mut self, restriction: ScopeRestriction) -> Self {
        self.restrict_scope = Some(restriction);
        self
    }

    pub fn parents_only(mut self, parents_only: bool) -> Self {
        self.parents_only = Some(parents_only);
        self
    }
}

struct TokenInner {
    identity: Identity,
    name: Cow<'static, str>,
    policy: Option<TokenPolicy>,
}

/// Opaque, identity-comparable handle for an injectable value.
///
/// Type tokens compare by `TypeId`, so `Token::of::<T>()` called twice yields
/// equal tokens. Named and opinionated tokens receive a fresh symbol when they
/// are created: two tokens built from the same name are different tokens, and
/// clones of one token are the same token.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::Token;
///
/// struct Database;
///
/// assert_eq!(Token::of::<Database>(), Token::of::<Database>());
///
/// let a = Token::named("ConnectionString");
/// let b = Token::named("ConnectionString");
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// assert_eq!(a.name(), "ConnectionString");
/// ```
#[derive(Clone)]
pub struct Token {
    inner: Arc<TokenInner>,
}

impl Token {
    /// Token for the Rust type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::from_parts(
            Identity::Type(TypeId::of::<T>()),
            Cow::Borrowed(std::any::type_name::<T>()),
            None,
        )
    }

    /// A new symbolic token.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::from_parts(Identity::Symbol(next_symbol()), name.into(), None)
    }

    /// A new symbolic token whose policy providers must agree with.
    pub fn opinionated(name: impl Into<Cow<'static, str>>, policy: TokenPolicy) -> Self {
        Self::from_parts(Identity::Symbol(next_symbol()), name.into(), Some(policy))
    }

    fn from_parts(identity: Identity, name: Cow<'static, str>, policy: Option<TokenPolicy>) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                identity,
                name,
                policy,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> TokenKind {
        match (&self.inner.identity, &self.inner.policy) {
            (Identity::Type(_), _) => TokenKind::Type,
            (Identity::Symbol(_), None) => TokenKind::Named,
            (Identity::Symbol(_), Some(_)) => TokenKind::Opinionated,
        }
    }

    pub fn policy(&self) -> Option<&TokenPolicy> {
        self.inner.policy.as_ref()
    }

    /// True when this is the type token of `T`.
    pub fn is_type<T: ?Sized + 'static>(&self) -> bool {
        self.inner.identity == Identity::Type(TypeId::of::<T>())
    }
}

fn next_symbol() -> u64 {
    NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed)
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.inner.identity == other.inner.identity
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.identity.hash(state);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("name", &self.inner.name)
            .field("kind", &self.kind())
            .finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}
