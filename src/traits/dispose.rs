//! Disposal traits for resource cleanup.

/// Synchronous teardown for injected values.
///
/// A provider opts in with [`Provider::disposable`]; the hook runs when the
/// scope that owns the value is disposed. Hooks run in LIFO order.
///
/// # Examples
///
/// ```
/// use ferrous_injector::{Dispose, Provider, Token};
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         println!("Flushing cache: {}", self.name);
///     }
/// }
///
/// let provider = Provider::factory(Token::of::<Cache>(), vec![], |_| {
///     Ok(Cache { name: "user_cache".to_string() })
/// })
/// .disposable::<Cache>();
/// ```
///
/// [`Provider::disposable`]: crate::Provider::disposable
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}

/// Asynchronous teardown for injected values.
///
/// Async hooks of a scope run before its sync hooks, newest first.
///
/// # Examples
///
/// ```
/// use ferrous_injector::{AsyncDispose, Provider, Token};
/// use async_trait::async_trait;
///
/// struct DatabaseClient {
///     connection_id: String,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for DatabaseClient {
///     async fn dispose(&self) {
///         println!("Closing database connection: {}", self.connection_id);
///     }
/// }
///
/// let provider = Provider::async_factory(Token::of::<DatabaseClient>(), vec![], |_| async {
///     Ok(DatabaseClient { connection_id: "conn_123".to_string() })
/// })
/// .singleton()
/// .async_disposable::<DatabaseClient>();
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    async fn dispose(&self);
}
