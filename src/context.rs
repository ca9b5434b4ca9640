//! The scope tree: an arena of nodes, each wrapping a repository.
//!
//! Nodes refer to their parent and children by [`NodeId`]. Lookups walk from a
//! node toward the ambient node at the top and are memoized per node.
//! Disposal is an explicit post-order traversal of the arena, so every node is
//! released exactly once no matter how many handles refer to it.
//!
//! Nodes created with an equal scope under the same parent share one
//! repository. A shared repository is torn down when its last node goes away.

use std::collections::HashMap;
use std::fmt;

use crate::error::{DiError, DiResult};
use crate::internal::DisposeBag;
use crate::provider::Provider;
use crate::repository::{Binding, Repository};
use crate::scope::{Scope, ScopeRestriction};
use crate::token::Token;
use crate::ClassRegistration;

/// Address of a node in the scope tree. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        NodeId(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RepoId(u64);

/// Whether a memoized lookup was made on behalf of the node itself.
///
/// `parents_only` entries are skipped only for the node's own requests, so
/// the two roles cache different answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Role {
    Origin,
    Ancestor,
}

type CachedMatch = Option<(Binding, NodeId)>;

struct Node {
    scope: Scope,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    repository: RepoId,
    find_cache: HashMap<(Token, Role), CachedMatch>,
}

struct RepoSlot {
    repository: Repository,
    key: (Option<RepoId>, Scope),
    users: usize,
}

/// A successful lookup: the matched binding, the node whose repository holds
/// it, and the node the lookup started from.
#[derive(Debug, Clone)]
pub struct Match {
    token: Token,
    binding: Binding,
    owner: NodeId,
    origin: NodeId,
}

impl Match {
    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// The same match seen from another node.
    pub(crate) fn with_origin(&self, origin: NodeId) -> Match {
        Match {
            origin,
            ..self.clone()
        }
    }

    /// A match for one member of a multi binding.
    pub(crate) fn member(&self, index: usize, origin: NodeId) -> Option<Match> {
        let provider = self.binding.providers().get(index)?.clone();
        Some(Match {
            token: self.token.clone(),
            binding: Binding::Single(provider),
            owner: self.owner,
            origin,
        })
    }
}

/// Nodes removed by a disposal, children before parents.
///
/// `bags` holds one teardown bag per released repository in the same
/// post-order, so a node's hooks run only after its descendants' hooks.
#[derive(Debug, Default)]
pub(crate) struct Released {
    pub(crate) scopes: Vec<(NodeId, Scope)>,
    pub(crate) bags: Vec<DisposeBag>,
}

impl Released {
    pub(crate) fn has_teardown(&self) -> bool {
        self.bags.iter().any(|bag| !bag.is_empty())
    }

    /// Runs every bag to completion before starting the next one.
    pub(crate) async fn teardown(self) {
        for bag in self.bags {
            bag.run().await;
        }
    }
}

pub(crate) struct ScopeTree {
    nodes: HashMap<NodeId, Node>,
    repositories: HashMap<RepoId, RepoSlot>,
    shared: HashMap<(Option<RepoId>, Scope), RepoId>,
    next_node: u64,
    next_repo: u64,
    ambient: NodeId,
}

impl ScopeTree {
    /// A tree holding only the ambient node.
    pub(crate) fn new(ambient: Repository) -> Self {
        let ambient_id = NodeId(0);
        let repo_id = RepoId(0);
        let key = (None, Scope::Ambient);

        let mut tree = Self {
            nodes: HashMap::new(),
            repositories: HashMap::new(),
            shared: HashMap::new(),
            next_node: 1,
            next_repo: 1,
            ambient: ambient_id,
        };
        tree.shared.insert(key.clone(), repo_id);
        tree.repositories.insert(
            repo_id,
            RepoSlot {
                repository: ambient,
                key,
                users: 1,
            },
        );
        tree.nodes.insert(
            ambient_id,
            Node {
                scope: Scope::Ambient,
                parent: None,
                children: Vec::new(),
                repository: repo_id,
                find_cache: HashMap::new(),
            },
        );
        tree
    }

    pub(crate) fn ambient(&self) -> NodeId {
        self.ambient
    }

    pub(crate) fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn scope(&self, node: NodeId) -> Option<&Scope> {
        self.nodes.get(&node).map(|n| &n.scope)
    }

    pub(crate) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    pub(crate) fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// `node` and its ancestors, nearest first.
    pub(crate) fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node).filter(|id| self.contains(*id)), move |id| {
            self.parent(*id)
        })
    }

    /// Scope labels from `node` up to the ambient node.
    pub(crate) fn ancestry(&self, node: NodeId) -> Vec<String> {
        self.ancestors(node)
            .filter_map(|id| self.scope(id).map(ToString::to_string))
            .collect()
    }

    pub(crate) fn repository(&self, node: NodeId) -> DiResult<&Repository> {
        let node = self.nodes.get(&node).ok_or_else(|| disposed(node))?;
        self.repositories
            .get(&node.repository)
            .map(|slot| &slot.repository)
            .ok_or_else(|| DiError::Disposed(node.scope.to_string()))
    }

    pub(crate) fn repository_mut(&mut self, node: NodeId) -> DiResult<&mut Repository> {
        let node = self.nodes.get(&node).ok_or_else(|| disposed(node))?;
        let scope = &node.scope;
        self.repositories
            .get_mut(&node.repository)
            .map(|slot| &mut slot.repository)
            .ok_or_else(|| DiError::Disposed(scope.to_string()))
    }

    fn allows_instances(&self, node: NodeId) -> bool {
        self.repository(node).is_ok_and(Repository::allows_instances)
    }

    /// Adds a child node and registers `providers` into its repository.
    ///
    /// Reuses the repository of an existing sibling with an equal scope.
    pub(crate) fn create_child(
        &mut self,
        parent: NodeId,
        scope: Scope,
        providers: Vec<Provider>,
    ) -> DiResult<NodeId> {
        let parent_repo = self.nodes.get(&parent).ok_or_else(|| disposed(parent))?.repository;
        let key = (Some(parent_repo), scope.clone());

        let repo_id = match self.shared.get(&key) {
            Some(id) => *id,
            None => {
                let id = RepoId(self.next_repo);
                self.next_repo += 1;
                self.shared.insert(key.clone(), id);
                self.repositories.insert(
                    id,
                    RepoSlot {
                        repository: Repository::new(),
                        key,
                        users: 0,
                    },
                );
                id
            }
        };
        if let Some(slot) = self.repositories.get_mut(&repo_id) {
            slot.users += 1;
        }

        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                scope,
                parent: Some(parent),
                children: Vec::new(),
                repository: repo_id,
                find_cache: HashMap::new(),
            },
        );
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.push(id);
        }

        if !providers.is_empty() {
            let registered = self.repository_mut(id).and_then(|repository| {
                providers
                    .into_iter()
                    .try_for_each(|provider| repository.register(provider))
            });
            if let Err(err) = registered {
                // A fresh node owns nothing yet, so there is no teardown to run.
                self.dispose(id);
                return Err(err);
            }
            self.invalidate_repository(repo_id);
        }

        tracing::trace!(node = %id, parent = %parent, scope = ?self.scope(id), "created scope node");
        Ok(id)
    }

    pub(crate) fn register(&mut self, node: NodeId, provider: Provider) -> DiResult<()> {
        self.repository_mut(node)?.register(provider)?;
        self.invalidate_node_repository(node);
        Ok(())
    }

    pub(crate) fn register_class(
        &mut self,
        node: NodeId,
        registration: ClassRegistration,
    ) -> DiResult<()> {
        self.repository_mut(node)?.register_class(registration)?;
        self.invalidate_node_repository(node);
        Ok(())
    }

    fn invalidate_node_repository(&mut self, node: NodeId) {
        if let Some(repo) = self.nodes.get(&node).map(|n| n.repository) {
            self.invalidate_repository(repo);
        }
    }

    /// Drops the memoized lookups of every node that can see `repo`.
    fn invalidate_repository(&mut self, repo: RepoId) {
        let mut stack: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.repository == repo)
            .map(|(id, _)| *id)
            .collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.find_cache.clear();
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Finds the binding for `token` as seen from `start`.
    ///
    /// `origin` is the node issuing the request; `start` is either `origin`
    /// itself or a short-lived child of it carrying ad-hoc providers. A
    /// `parents_only` entry is skipped only when it sits in `origin`'s own
    /// repository. A binding restricted to a scope that no ancestor of `start`
    /// satisfies is reported as absent.
    pub(crate) fn find(
        &mut self,
        start: NodeId,
        origin: NodeId,
        token: &Token,
    ) -> DiResult<Option<Match>> {
        if !self.contains(start) {
            return Err(disposed(start));
        }

        let found = if start == origin {
            self.lookup(start, token, origin)
        } else {
            let local = self.repository(start)?.get(token).cloned();
            match local {
                Some(binding) => Some((binding, start)),
                None => self.lookup(origin, token, origin),
            }
        };

        let Some((binding, owner)) = found else {
            tracing::trace!(token = %token, node = %start, "no provider in scope chain");
            return Ok(None);
        };

        if let Some(restriction) = binding.first().and_then(|p| p.restriction()) {
            if self.restriction_target(start, restriction).is_none() {
                tracing::trace!(
                    token = %token,
                    restriction = %restriction,
                    "no ancestor satisfies the scope restriction"
                );
                return Ok(None);
            }
        }

        Ok(Some(Match {
            token: token.clone(),
            binding,
            owner,
            origin: start,
        }))
    }

    fn lookup(&mut self, node: NodeId, token: &Token, origin: NodeId) -> CachedMatch {
        let role = if node == origin { Role::Origin } else { Role::Ancestor };
        let key = (token.clone(), role);

        let (parent, local) = {
            let entry = self.nodes.get(&node)?;
            if let Some(hit) = entry.find_cache.get(&key) {
                return hit.clone();
            }
            let local = self
                .repositories
                .get(&entry.repository)
                .and_then(|slot| slot.repository.get(token))
                .filter(|binding| !(role == Role::Origin && binding.is_parents_only()))
                .cloned();
            (entry.parent, local)
        };

        let found = match local {
            Some(binding) => Some((binding, node)),
            None => parent.and_then(|parent| self.lookup(parent, token, origin)),
        };

        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.find_cache.insert(key, found.clone());
        }
        found
    }

    /// Nearest instance-capable node, from `node` upward, satisfying `restriction`.
    pub(crate) fn restriction_target(
        &self,
        node: NodeId,
        restriction: &ScopeRestriction,
    ) -> Option<NodeId> {
        self.ancestors(node).find(|id| {
            self.allows_instances(*id)
                && self
                    .scope(*id)
                    .is_some_and(|scope| restriction.is_satisfied_by(scope))
        })
    }

    /// Node whose repository caches the singleton produced for `record`.
    ///
    /// Restricted providers live on the nearest ancestor satisfying the
    /// restriction. Others live where they were found, unless that is the
    /// ambient repository, in which case the topmost instance-capable
    /// ancestor takes them.
    pub(crate) fn owner_for(&self, record: &Match, provider: &Provider) -> Option<NodeId> {
        if let Some(restriction) = provider.restriction() {
            return self.restriction_target(record.origin, restriction);
        }
        if self.allows_instances(record.owner) {
            return Some(record.owner);
        }
        self.ancestors(record.origin)
            .filter(|id| self.allows_instances(*id))
            .last()
    }

    /// True when `node` is a leaf that owns nothing and shares its repository with no one.
    pub(crate) fn is_idle(&self, node: NodeId) -> bool {
        let Some(entry) = self.nodes.get(&node) else {
            return false;
        };
        entry.children.is_empty()
            && self
                .repositories
                .get(&entry.repository)
                .is_some_and(|slot| slot.users == 1 && slot.repository.is_idle())
    }

    /// Removes `node` and its descendants, children first.
    ///
    /// Returns the teardown hooks of every repository that lost its last node.
    /// Disposing a node that is already gone returns an empty result.
    pub(crate) fn dispose(&mut self, node: NodeId) -> Released {
        let mut released = Released::default();
        let Some(parent) = self.nodes.get(&node).map(|n| n.parent) else {
            return released;
        };
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != node);
        }

        let mut order = Vec::new();
        let mut stack = vec![(node, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            if let Some(entry) = self.nodes.get(&id) {
                stack.extend(entry.children.iter().rev().map(|child| (*child, false)));
            }
        }

        for id in order {
            let Some(entry) = self.nodes.remove(&id) else {
                continue;
            };
            if let Some(bag) = self.release_repository(entry.repository) {
                released.bags.push(bag);
            }
            released.scopes.push((id, entry.scope));
        }

        tracing::debug!(node = %node, nodes = released.scopes.len(), "disposed scope subtree");
        released
    }

    fn release_repository(&mut self, repo: RepoId) -> Option<DisposeBag> {
        let slot = self.repositories.get_mut(&repo)?;
        slot.users = slot.users.saturating_sub(1);
        if slot.users > 0 || slot.repository.is_ambient() {
            return None;
        }
        let mut slot = self.repositories.remove(&repo)?;
        self.shared.remove(&slot.key);
        slot.repository.teardown().ok()
    }
}

fn disposed(node: NodeId) -> DiError {
    DiError::Disposed(node.to_string())
}
