//! Method invocation with injected parameters.

use std::borrow::Cow;

use async_trait::async_trait;

use crate::args::{AnyArc, Args};
use crate::error::BoxError;
use crate::provider::Dependency;

/// Declared parameters of one method.
#[derive(Clone, Debug)]
pub struct MethodSignature {
    name: Cow<'static, str>,
    params: Vec<Dependency>,
}

impl MethodSignature {
    pub fn new(name: impl Into<Cow<'static, str>>, params: Vec<Dependency>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Dependency] {
        &self.params
    }
}

/// A value whose methods the injector can call with resolved arguments.
///
/// `signature` is the static parameter metadata of a method; `call` receives
/// the arguments in declaration order.
///
/// # Examples
///
/// ```
/// use ferrous_injector::{AnyArc, Args, BoxError, Dependency, Invocable, MethodSignature};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Greeter;
///
/// #[async_trait]
/// impl Invocable for Greeter {
///     fn signature(&self, method: &str) -> Option<MethodSignature> {
///         match method {
///             "greet" => Some(MethodSignature::new("greet", vec![Dependency::of::<String>()])),
///             _ => None,
///         }
///     }
///
///     async fn call(&self, _method: &str, args: Args) -> Result<AnyArc, BoxError> {
///         let name = args.get::<String>(0)?;
///         Ok(Arc::new(format!("hello {name}")))
///     }
/// }
/// ```
#[async_trait]
pub trait Invocable: Send + Sync + 'static {
    fn signature(&self, method: &str) -> Option<MethodSignature>;

    async fn call(&self, method: &str, args: Args) -> Result<AnyArc, BoxError>;
}
