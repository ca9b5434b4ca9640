use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::provider::Provider;
use crate::token::Token;

/// A token as written in dependency metadata.
///
/// Metadata can name a token directly, defer to a closure for tokens that are
/// declared later (a forward reference), or carry no token at all.
#[derive(Clone)]
pub enum TokenRef {
    Token(Token),
    Forward {
        label: Cow<'static, str>,
        resolve: Arc<dyn Fn() -> Option<Token> + Send + Sync>,
    },
    Missing,
}

impl TokenRef {
    pub fn forward<F>(label: impl Into<Cow<'static, str>>, resolve: F) -> Self
    where
        F: Fn() -> Option<Token> + Send + Sync + 'static,
    {
        TokenRef::Forward {
            label: label.into(),
            resolve: Arc::new(resolve),
        }
    }

    /// Turns the reference into a token. `target` names the declaring site for errors.
    pub fn resolve(&self, target: &str) -> DiResult<Token> {
        match self {
            TokenRef::Token(token) => Ok(token.clone()),
            TokenRef::Forward { label, resolve } => {
                resolve().ok_or_else(|| DiError::InvalidToken(format!("{label} (in {target})")))
            }
            TokenRef::Missing => Err(DiError::MissingToken(target.to_string())),
        }
    }
}

impl From<Token> for TokenRef {
    fn from(token: Token) -> Self {
        TokenRef::Token(token)
    }
}

impl From<&Token> for TokenRef {
    fn from(token: &Token) -> Self {
        TokenRef::Token(token.clone())
    }
}

impl fmt::Debug for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenRef::Token(token) => write!(f, "{token:?}"),
            TokenRef::Forward { label, .. } => write!(f, "Forward({label})"),
            TokenRef::Missing => f.write_str("Missing"),
        }
    }
}

/// One declared dependency of a factory, class or method parameter.
///
/// ```rust
/// use ferrous_injector::{Dependency, Token};
///
/// struct Clock;
///
/// let dep = Dependency::of::<Clock>().optional();
/// assert!(dep.is_optional());
/// ```
#[derive(Clone, Debug)]
pub struct Dependency {
    token: TokenRef,
    optional: bool,
    providers: Vec<Provider>,
}

impl Dependency {
    pub fn new(token: impl Into<TokenRef>) -> Self {
        Self {
            token: token.into(),
            optional: false,
            providers: Vec::new(),
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(Token::of::<T>())
    }

    /// A forward reference, resolved when the dependency is injected.
    pub fn forward<F>(label: impl Into<Cow<'static, str>>, resolve: F) -> Self
    where
        F: Fn() -> Option<Token> + Send + Sync + 'static,
    {
        Self::new(TokenRef::forward(label, resolve))
    }

    /// A parameter declared without a token.
    pub fn missing() -> Self {
        Self::new(TokenRef::Missing)
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Ad-hoc providers visible only to this dependency's resolution.
    pub fn with_providers(mut self, providers: Vec<Provider>) -> Self {
        self.providers = providers;
        self
    }

    pub fn token(&self) -> &TokenRef {
        &self.token
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }
}
