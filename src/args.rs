//! Resolved values and the argument lists handed to factories.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};

/// Type-erased shared value.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// A value produced by the injector.
///
/// Single bindings produce [`Instance::Single`]; multi bindings produce
/// [`Instance::Many`] in registration order.
#[derive(Clone, Debug)]
pub enum Instance {
    Single(AnyArc),
    Many(Vec<AnyArc>),
}

impl Instance {
    pub fn single<T: Send + Sync + 'static>(value: T) -> Self {
        Instance::Single(Arc::new(value))
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Instance::Many(_))
    }

    pub fn as_single(&self) -> Option<&AnyArc> {
        match self {
            Instance::Single(value) => Some(value),
            Instance::Many(_) => None,
        }
    }

    /// Downcasts a single value.
    pub fn downcast<T: Send + Sync + 'static>(self) -> DiResult<Arc<T>> {
        match self {
            Instance::Single(value) => downcast_arc(value),
            Instance::Many(_) => Err(DiError::TypeMismatch(std::any::type_name::<T>())),
        }
    }

    /// Downcasts every member. A single value becomes a one-element list.
    pub fn downcast_all<T: Send + Sync + 'static>(self) -> DiResult<Vec<Arc<T>>> {
        match self {
            Instance::Single(value) => Ok(vec![downcast_arc(value)?]),
            Instance::Many(values) => values.into_iter().map(downcast_arc).collect(),
        }
    }
}

pub(crate) fn downcast_arc<T: Send + Sync + 'static>(value: AnyArc) -> DiResult<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

/// Resolved dependencies, in declaration order.
///
/// Absent optional dependencies are `None` slots.
///
/// ```rust
/// use ferrous_injector::{Args, Instance};
///
/// let args = Args::new("Greeter", vec![Some(Instance::single("hi".to_string())), None]);
/// assert_eq!(args.get::<String>(0).unwrap().as_str(), "hi");
/// assert!(args.optional::<u32>(1).unwrap().is_none());
/// assert!(args.get::<u32>(1).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct Args {
    target: String,
    values: Vec<Option<Instance>>,
}

impl Args {
    pub fn new(target: impl Into<String>, values: Vec<Option<Instance>>) -> Self {
        Self {
            target: target.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name of the provider or method these arguments belong to.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Required argument.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        match self.instance(index) {
            Some(instance) => instance.clone().downcast(),
            None => Err(self.absent(index)),
        }
    }

    /// Optional argument. Absent slots become `None`; type mismatches are still errors.
    pub fn optional<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<T>>> {
        if index >= self.values.len() {
            return Err(self.absent(index));
        }
        self.instance(index)
            .cloned()
            .map(|instance| instance.downcast::<T>())
            .transpose()
    }

    /// Multi argument. An absent optional slot yields an empty list.
    pub fn all<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Vec<Arc<T>>> {
        if index >= self.values.len() {
            return Err(self.absent(index));
        }
        match self.instance(index) {
            Some(instance) => instance.clone().downcast_all(),
            None => Ok(Vec::new()),
        }
    }

    fn absent(&self, index: usize) -> DiError {
        DiError::ArgumentAbsent {
            target: self.target.clone(),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_downcasts_in_order() {
        let many = Instance::Many(vec![Arc::new(1u8), Arc::new(2u8), Arc::new(3u8)]);
        let values: Vec<u8> = many.downcast_all::<u8>().unwrap().into_iter().map(|v| *v).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn wrong_type_is_a_mismatch() {
        let err = Instance::single(5u32).downcast::<String>().unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch(_)));
    }

    #[test]
    fn out_of_range_is_absent() {
        let args = Args::new("Service", vec![]);
        assert!(matches!(
            args.optional::<u32>(0),
            Err(DiError::ArgumentAbsent { index: 0, .. })
        ));
        assert!(args.is_empty());
    }
}
