// ============================================================================
// Request-scoped Context
// ============================================================================
//
// An immutable, copy-on-write bag of request-scoped values, keyed by type.
// Deriving a context with `with_value` never changes the parent, so a context
// handed down one call chain can't leak values into a sibling chain.
//
// ============================================================================

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

type Value = Arc<dyn Any + Send + Sync>;

/// Carrier passed down a call chain in place of explicit parameters
///
/// Cloning is O(1): the underlying map is a persistent `im::HashMap`.
#[derive(Clone, Default)]
pub struct Context {
    values: im::HashMap<TypeId, Value>,
}

impl Context {
    /// The empty root context
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a new context that additionally carries `value`.
    ///
    /// A value of the same type already present is shadowed in the derived
    /// context only.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        Self {
            values: self.values.update(TypeId::of::<T>(), Arc::new(value)),
        }
    }

    /// Look up the value of type `T`
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.values.len())
            .finish()
    }
}
