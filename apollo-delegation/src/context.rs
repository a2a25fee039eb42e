//! Execution context handed through to the target executor.

use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// A thread-safe context that stores values by type.
///
/// The delegator never reads it: the caller's context is passed unchanged to
/// the [`Executor`](crate::executor::Executor) of the target schema.
///
/// Values are cloned when retrieved. For types that are expensive to clone,
/// wrap them in an `Arc` before storing them.
///
/// ```rust
/// use apollo_delegation::Context;
///
/// let context = Context::new();
/// context.insert(42);
/// context.insert("hello".to_string());
///
/// assert_eq!(context.get::<i32>(), Some(42));
/// assert_eq!(context.get::<String>(), Some("hello".to_string()));
///
/// context.remove::<i32>();
/// assert!(context.get::<i32>().is_none());
/// ```
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<DashMap<TypeId, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Context {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a clone of the value stored for type `T`.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        let entry = self.entries.get(&TypeId::of::<T>())?;
        entry.value().downcast_ref::<T>().cloned()
    }

    /// Inserts a value, replacing any value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Removes the value stored for type `T`.
    pub fn remove<T: Clone + Send + Sync + 'static>(&self) {
        self.entries.remove(&TypeId::of::<T>());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries.len())
            .finish()
    }
}
