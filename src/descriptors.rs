//! Provider descriptors for introspection and diagnostics.

use std::collections::HashSet;

use crate::context::{NodeId, ScopeTree};
use crate::provider::ProviderId;
use crate::scope::ScopeRestriction;
use crate::token::Token;

/// Metadata about one provider visible from an injector.
///
/// # Use Cases
///
/// - **Debugging**: see which scope a token is served from
/// - **Validation**: check that required tokens are registered before start-up
/// - **Health checks**: dump the effective registry of a request scope
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{Injector, Provider, Scope, Token};
///
/// let port = Token::named("Port");
/// let root = Injector::builder()
///     .provider(Provider::value(port.clone(), 80u16))
///     .build()
///     .unwrap();
/// let request = root
///     .create_child(Scope::named("request"), vec![Provider::value(port.clone(), 8080u16)])
///     .unwrap();
///
/// let descriptors = request.descriptors();
/// let ports: Vec<_> = descriptors.iter().filter(|d| d.token == port).collect();
/// assert_eq!(ports.len(), 2);
/// assert_eq!(ports[0].scope, "request");
/// assert!(!ports[0].shadowed);
/// assert!(ports[1].shadowed);
/// ```
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub token: Token,
    pub provider: ProviderId,
    /// `value`, `factory`, `async factory`, `class` or `existing`.
    pub shape: &'static str,
    pub singleton: bool,
    pub multi: bool,
    pub parents_only: bool,
    pub restriction: Option<ScopeRestriction>,
    /// Scope of the node whose repository holds the provider.
    pub scope: String,
    /// A nearer node registers the same token.
    pub shadowed: bool,
}

impl ProviderDescriptor {
    pub fn is_restricted(&self) -> bool {
        self.restriction.is_some()
    }
}

/// Descriptors for every provider from `node` up to the ambient node, nearest first.
pub(crate) fn collect(tree: &ScopeTree, node: NodeId) -> Vec<ProviderDescriptor> {
    let mut seen: HashSet<Token> = HashSet::new();
    let mut descriptors = Vec::new();

    for id in tree.ancestors(node) {
        let (Ok(repository), Some(scope)) = (tree.repository(id), tree.scope(id)) else {
            continue;
        };
        let mut local = Vec::new();
        for (token, binding) in repository.bindings() {
            let shadowed = seen.contains(token);
            local.push(token.clone());
            for provider in binding.providers() {
                descriptors.push(ProviderDescriptor {
                    token: token.clone(),
                    provider: provider.id(),
                    shape: provider.kind().shape(),
                    singleton: provider.is_singleton(),
                    multi: provider.is_multi(),
                    parents_only: provider.is_parents_only(),
                    restriction: provider.restriction().cloned(),
                    scope: scope.to_string(),
                    shadowed,
                });
            }
        }
        seen.extend(local);
    }
    descriptors
}
