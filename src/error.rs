//! Error types for the injector.

use thiserror::Error;

/// Boxed error returned by user factories, constructors and invoked methods.
///
/// Any `DiError` raised inside a factory (for example by [`Args::get`]) converts
/// into a `BoxError` with `?` and is recovered unchanged by the generator, so
/// nested resolution failures keep their original kind.
///
/// [`Args::get`]: crate::Args::get
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Dependency injection errors.
///
/// The variants fall into four families:
///
/// - **Configuration** errors are raised synchronously by `register`:
///   [`PolicyConflict`](DiError::PolicyConflict),
///   [`ConflictingOptions`](DiError::ConflictingOptions),
///   [`InvalidRegistration`](DiError::InvalidRegistration),
///   [`AmbientRepository`](DiError::AmbientRepository) and
///   [`Configuration`](DiError::Configuration).
/// - **Resolution** errors are raised by `resolve`, `inject` and `invoke` before
///   anything is constructed: [`MissingProvider`](DiError::MissingProvider),
///   [`InvalidToken`](DiError::InvalidToken), [`MissingToken`](DiError::MissingToken),
///   [`MethodNotFound`](DiError::MethodNotFound) and [`Disposed`](DiError::Disposed).
/// - **Construction** errors come out of factories and constructors:
///   [`Construction`](DiError::Construction), [`Circular`](DiError::Circular),
///   [`DepthExceeded`](DiError::DepthExceeded), [`ArgumentAbsent`](DiError::ArgumentAbsent)
///   and [`TypeMismatch`](DiError::TypeMismatch).
/// - [`InvalidProviderType`](DiError::InvalidProviderType) guards states the
///   default generator can never reach.
///
/// `DiError` is `Clone` because a single in-flight singleton construction hands
/// the same outcome to every caller awaiting it.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::DiError;
///
/// let missing = DiError::MissingProvider {
///     token: "Database".to_string(),
///     ancestry: vec!["request".to_string(), "root".to_string()],
/// };
/// assert_eq!(
///     missing.to_string(),
///     "No provider for Database (ancestry: request -> root)"
/// );
/// assert!(missing.is_missing_provider());
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// No provider matched a required token. Carries the scope chain the lookup walked.
    #[error("No provider for {token} (ancestry: {})", .ancestry.join(" -> "))]
    MissingProvider {
        token: String,
        ancestry: Vec<String>,
    },
    /// A token reference could not be turned into a token.
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    /// Dependency metadata declared a parameter without any token.
    #[error("Missing token for {0}")]
    MissingToken(String),
    /// A provider flag disagrees with the policy of its opinionated token.
    #[error("Provider for {token} sets {option}={found} but the token requires {option}={expected}")]
    PolicyConflict {
        token: String,
        option: &'static str,
        expected: String,
        found: String,
    },
    /// A multi provider was registered against a single entry or the reverse.
    #[error("Conflicting options for {token}: {reason}")]
    ConflictingOptions {
        token: String,
        reason: &'static str,
    },
    /// The registration target cannot be registered at all.
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),
    /// An operation the ambient repository does not support.
    #[error("The ambient repository cannot {0}")]
    AmbientRepository(&'static str),
    /// Invalid injector configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A factory, constructor or invoked method failed.
    #[error("Construction of {token} failed: {message}")]
    Construction {
        token: String,
        message: String,
    },
    /// A constructed value was not of the requested type.
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// A required argument was absent or out of range.
    #[error("Argument {index} of {target} is absent")]
    ArgumentAbsent {
        target: String,
        index: usize,
    },
    /// A provider of a shape the generator does not understand.
    #[error("Invalid provider type for {0}")]
    InvalidProviderType(String),
    /// Circular dependency detected (includes path).
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Maximum resolution depth exceeded.
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// The scope node backing an injector has been disposed.
    #[error("Scope {0} has been disposed")]
    Disposed(String),
    /// `invoke` was asked for a method the target does not declare.
    #[error("Method {method} not found on {target}")]
    MethodNotFound {
        target: String,
        method: String,
    },
}

impl DiError {
    /// Wraps a failure raised by user code while producing `token`.
    ///
    /// A boxed `DiError` is unwrapped instead of being re-labelled, so a
    /// missing nested dependency still surfaces as `MissingProvider`.
    pub fn from_boxed(token: impl Into<String>, error: BoxError) -> Self {
        match error.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(other) => DiError::Construction {
                token: token.into(),
                message: other.to_string(),
            },
        }
    }

    /// Returns true for [`DiError::MissingProvider`].
    pub fn is_missing_provider(&self) -> bool {
        matches!(self, DiError::MissingProvider { .. })
    }

    /// Returns true for the synchronous registration-time errors.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DiError::PolicyConflict { .. }
                | DiError::ConflictingOptions { .. }
                | DiError::InvalidRegistration(_)
                | DiError::AmbientRepository(_)
                | DiError::Configuration(_)
        )
    }
}

/// Result type for DI operations.
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_di_error_is_recovered() {
        let boxed: BoxError = Box::new(DiError::DepthExceeded(3));
        match DiError::from_boxed("Service", boxed) {
            DiError::DepthExceeded(3) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn foreign_error_becomes_construction() {
        let boxed: BoxError = "connection refused".into();
        let err = DiError::from_boxed("Database", boxed);
        assert_eq!(err.to_string(), "Construction of Database failed: connection refused");
        assert!(!err.is_configuration());
    }

    #[test]
    fn circular_path_is_joined() {
        let err = DiError::Circular(vec!["A".into(), "B".into(), "A".into()]);
        assert_eq!(err.to_string(), "Circular dependency: A -> B -> A");
    }
}
