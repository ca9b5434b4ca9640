//! # ferrous-injector
//!
//! Hierarchical, asynchronous dependency injection for Rust.
//!
//! ## Features
//!
//! - **Tokens**: type tokens, named tokens and opinionated tokens whose policy
//!   providers must agree with
//! - **Providers**: values, sync and async factories, constructible classes and aliases
//! - **Scope tree**: child scopes delegate lookups to their parents, with
//!   memoized lookups and cascading disposal
//! - **Single-flight singletons**: concurrent requests for the same singleton
//!   share one construction
//! - **Multi bindings**: ordered collections of providers under one token
//! - **Scope restrictions**: tokens that only resolve below a given scope
//! - **Method invocation**: call methods with every declared parameter injected
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_injector::{Args, BoxError, Dependency, Injectable, Injector, Provider, Token};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! impl Injectable for UserService {
//!     fn dependencies() -> Vec<Dependency> {
//!         vec![Dependency::of::<Database>()]
//!     }
//!
//!     fn construct(args: Args) -> Result<Self, BoxError> {
//!         Ok(UserService { db: args.get::<Database>(0)? })
//!     }
//! }
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let injector = Injector::builder()
//!     .provider(Provider::value(
//!         Token::of::<Database>(),
//!         Database { connection_string: "postgres://localhost".to_string() },
//!     ))
//!     .provider(Provider::class::<UserService>())
//!     .build()
//!     .unwrap();
//!
//! let users = injector.get::<UserService>().await.unwrap();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! # });
//! ```
//!
//! ## Singletons and scopes
//!
//! A singleton is cached on the scope that owns its provider, so every child
//! scope sees the same instance. Non-singletons are built per request and torn
//! down with the scope that requested them.
//!
//! ```rust
//! use ferrous_injector::{Injector, Provider, Scope, Token};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let counter = Arc::new(AtomicUsize::new(0));
//! let id = Token::named("RequestId");
//!
//! let seen = counter.clone();
//! let root = Injector::builder()
//!     .provider(Provider::factory(id.clone(), vec![], move |_| {
//!         Ok(seen.fetch_add(1, Ordering::SeqCst) + 1)
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let first = root.create_child(Scope::named("request"), vec![]).unwrap();
//! let second = root.create_child(Scope::named("request"), vec![]).unwrap();
//! assert_eq!(*first.inject::<usize>(&id).await.unwrap(), 1);
//! assert_eq!(*second.inject::<usize>(&id).await.unwrap(), 2);
//! # });
//! ```

pub mod args;
pub mod config;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod generator;
pub mod injector;
pub mod invoke;
pub mod observer;
pub mod provider;
pub mod repository;
pub mod scope;
pub mod token;
pub mod traits;

mod internal;

pub use args::{AnyArc, Args, Instance};
pub use config::{ConfigSource, EnvironmentConfigSource, InjectorConfig, MapConfigSource};
pub use context::{Match, NodeId};
pub use descriptors::ProviderDescriptor;
pub use error::{BoxError, DiError, DiResult};
pub use generator::{DefaultGenerator, GenerationContext, Generator};
pub use injector::{InjectOptions, Injector, InjectorBuilder};
pub use invoke::{Invocable, MethodSignature};
pub use observer::{DiObserver, LoggingObserver, MetricsObserver, MetricsSnapshot};
pub use provider::{
    ClassRegistration, Dependency, DisposeHook, FactoryFn, Injectable, Provider, ProviderFlags,
    ProviderId, ProviderKind, TokenRef,
};
pub use repository::{Binding, Repository};
pub use scope::{Scope, ScopeKind, ScopeRestriction};
pub use token::{Token, TokenKind, TokenPolicy};
pub use traits::{AsyncDispose, Dispose};
