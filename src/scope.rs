//! Scope values and scope restrictions.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::args::AnyArc;
use crate::provider::ProviderId;

/// Position of a node in the scope tree.
///
/// Scopes are immutable values. Two nodes created under the same parent with
/// equal scopes share one [`Repository`](crate::Repository), which is how two
/// resolution paths arriving at "the same" scope see the same singletons.
///
/// Equality is identity: [`Scope::Instance`] compares the pointer of the
/// wrapped value, [`Scope::Invocation`] compares the call sequence number.
/// [`Scope::is_compatible`] is the looser structural comparison used by
/// restrictions.
#[derive(Clone)]
pub enum Scope {
    /// Parent of the root; holds the ambient registrations.
    Ambient,
    Root,
    /// A Rust type used as a scope marker.
    Type(TypeId, &'static str),
    /// Free-form descriptor such as `"request"`.
    Named(Cow<'static, str>),
    /// A constructed scope object. Identity is the pointer.
    Instance(AnyArc),
    /// One call of a method on a target instance.
    Invocation {
        target: &'static str,
        instance: usize,
        method: Cow<'static, str>,
        call: u64,
    },
    /// Resolution of a single method parameter.
    Parameter {
        target: &'static str,
        method: Cow<'static, str>,
        index: usize,
    },
    /// Private scope of one provider (multi fan-out, sub-providers).
    Provider { id: ProviderId, token: String },
    /// Short-lived node created for a single lookup.
    Resolution(u64),
}

/// Data-free discriminant of [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Ambient,
    Root,
    Type,
    Named,
    Instance,
    Invocation,
    Parameter,
    Provider,
    Resolution,
}

impl Scope {
    /// Scope marker for the type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Scope::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Scope::Named(name.into())
    }

    pub fn instance<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Scope::Instance(value)
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Ambient => ScopeKind::Ambient,
            Scope::Root => ScopeKind::Root,
            Scope::Type(..) => ScopeKind::Type,
            Scope::Named(_) => ScopeKind::Named,
            Scope::Instance(_) => ScopeKind::Instance,
            Scope::Invocation { .. } => ScopeKind::Invocation,
            Scope::Parameter { .. } => ScopeKind::Parameter,
            Scope::Provider { .. } => ScopeKind::Provider,
            Scope::Resolution(_) => ScopeKind::Resolution,
        }
    }

    /// Identity equality, or equal structural fields.
    ///
    /// An invocation is compatible with any other call of the same method on
    /// the same target type; a parameter scope with the same parameter of the
    /// same method.
    ///
    /// ```rust
    /// use ferrous_injector::Scope;
    ///
    /// assert!(Scope::named("request").is_compatible(&Scope::named("request")));
    /// assert!(!Scope::named("request").is_compatible(&Scope::Root));
    /// ```
    pub fn is_compatible(&self, other: &Scope) -> bool {
        match (self, other) {
            (
                Scope::Invocation { target: ta, method: ma, .. },
                Scope::Invocation { target: tb, method: mb, .. },
            ) => ta == tb && ma == mb,
            _ => self == other,
        }
    }
}

fn instance_addr(value: &AnyArc) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scope::Ambient, Scope::Ambient) | (Scope::Root, Scope::Root) => true,
            (Scope::Type(a, _), Scope::Type(b, _)) => a == b,
            (Scope::Named(a), Scope::Named(b)) => a == b,
            (Scope::Instance(a), Scope::Instance(b)) => instance_addr(a) == instance_addr(b),
            (Scope::Invocation { call: a, .. }, Scope::Invocation { call: b, .. }) => a == b,
            (
                Scope::Parameter { target: ta, method: ma, index: ia },
                Scope::Parameter { target: tb, method: mb, index: ib },
            ) => ta == tb && ma == mb && ia == ib,
            (Scope::Provider { id: a, .. }, Scope::Provider { id: b, .. }) => a == b,
            (Scope::Resolution(a), Scope::Resolution(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Scope::Ambient | Scope::Root => {}
            Scope::Type(id, _) => id.hash(state),
            Scope::Named(name) => name.hash(state),
            Scope::Instance(value) => instance_addr(value).hash(state),
            Scope::Invocation { call, .. } => call.hash(state),
            Scope::Parameter { target, method, index } => {
                target.hash(state);
                method.hash(state);
                index.hash(state);
            }
            Scope::Provider { id, .. } => id.hash(state),
            Scope::Resolution(seq) => seq.hash(state),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Ambient => f.write_str("ambient"),
            Scope::Root => f.write_str("root"),
            Scope::Type(_, name) => f.write_str(name),
            Scope::Named(name) => f.write_str(name),
            Scope::Instance(value) => write!(f, "instance@{:#x}", instance_addr(value)),
            Scope::Invocation { target, method, .. } => write!(f, "{target}::{method}"),
            Scope::Parameter { target, method, index } => write!(f, "{target}::{method}#{index}"),
            Scope::Provider { token, .. } => write!(f, "provider({token})"),
            Scope::Resolution(seq) => write!(f, "resolution#{seq}"),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({self})")
    }
}

/// Where a restricted token may be resolved and its singleton cached.
///
/// A restriction is evaluated at lookup time against the ancestry of the
/// requesting node, never at registration time. When no ancestor satisfies it
/// the provider is treated as absent.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeRestriction {
    /// Nearest ancestor whose scope is compatible with this one.
    Scope(Scope),
    /// Nearest ancestor whose scope is of this kind.
    Kind(ScopeKind),
    /// The root scope.
    Root,
}

impl ScopeRestriction {
    pub fn is_satisfied_by(&self, scope: &Scope) -> bool {
        match self {
            ScopeRestriction::Scope(wanted) => wanted.is_compatible(scope),
            ScopeRestriction::Kind(kind) => scope.kind() == *kind,
            ScopeRestriction::Root => matches!(scope, Scope::Root),
        }
    }
}

impl fmt::Display for ScopeRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeRestriction::Scope(scope) => write!(f, "scope({scope})"),
            ScopeRestriction::Kind(kind) => write!(f, "kind({kind:?})"),
            ScopeRestriction::Root => f.write_str("root"),
        }
    }
}
