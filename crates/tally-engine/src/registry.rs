//! Name → buffer lookup.
//!
//! Hosts that expose buffers to outside callers address them by name.
//! [`BufferRegistry`] holds type-erased `Arc<TimeBuffer<K, V, A>>`
//! handles and hands them back with a typed lookup.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;

use tally_core::{Aggregator, Key, Value};

use crate::buffer::TimeBuffer;

/// Error from a [`BufferRegistry`] operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A buffer with this name is already registered.
    AlreadyRegistered {
        /// The contested name.
        name: String,
    },
    /// No buffer has this name.
    NotFound {
        /// The requested name.
        name: String,
    },
    /// The buffer exists but with different key, value or aggregator
    /// types.
    TypeMismatch {
        /// The requested name.
        name: String,
    },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRegistered { name } => write!(f, "buffer {name:?} is already registered"),
            Self::NotFound { name } => write!(f, "no buffer named {name:?}"),
            Self::TypeMismatch { name } => {
                write!(f, "buffer {name:?} has different key/value/aggregator types")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

type Erased = Arc<dyn Any + Send + Sync>;

/// Thread-safe map of named time buffers, in registration order.
#[derive(Default)]
pub struct BufferRegistry {
    buffers: Mutex<IndexMap<String, Erased>>,
}

impl BufferRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `buffer` under its configured name and return a shared
    /// handle to it.
    pub fn register<K, V, A>(
        &self,
        buffer: TimeBuffer<K, V, A>,
    ) -> Result<Arc<TimeBuffer<K, V, A>>, RegistryError>
    where
        K: Key,
        V: Value,
        A: Aggregator<K, V> + 'static,
    {
        let name = buffer.name().to_string();
        let mut buffers = self.lock();
        if buffers.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered { name });
        }
        let shared = Arc::new(buffer);
        buffers.insert(name, Arc::clone(&shared) as Erased);
        Ok(shared)
    }

    /// Typed handle to the buffer registered as `name`.
    pub fn get<K, V, A>(&self, name: &str) -> Result<Arc<TimeBuffer<K, V, A>>, RegistryError>
    where
        K: Key,
        V: Value,
        A: Aggregator<K, V> + 'static,
    {
        let erased = self
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })?;
        erased
            .downcast::<TimeBuffer<K, V, A>>()
            .map_err(|_| RegistryError::TypeMismatch {
                name: name.to_string(),
            })
    }

    /// Unregister `name`. Outstanding handles keep the buffer alive.
    pub fn remove(&self, name: &str) -> Result<(), RegistryError> {
        self.lock()
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Registered names, oldest registration first.
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Number of registered buffers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<String, Erased>> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
