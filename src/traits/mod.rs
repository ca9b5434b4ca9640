//! Traits implemented by injected values.

mod dispose;

pub use dispose::{AsyncDispose, Dispose};
