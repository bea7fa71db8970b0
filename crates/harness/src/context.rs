//! Per-invocation attribute store

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

/// Key of the attached [`DriverHandle`](crate::driver::DriverHandle).
pub const DRIVER: &str = "DRIVER";
/// Key of the [`OpenedPage`](crate::page::OpenedPage) opened before the test body.
pub const INITIAL_PAGE: &str = "INITIAL_PAGE";
/// Marker set when driver provisioning failed for this invocation.
pub const PROVISION_FAILED: &str = "PROVISION_FAILED";
/// Message of the error that failed the invocation.
pub const FAILURE: &str = "FAILURE";

/// Key/value store scoped to one test invocation (retries included).
///
/// Created by the runner when it begins invoking a method and dropped when
/// the invocation completes. It is `Send` so a worker can own it, but it is
/// never shared between invocations.
pub struct InvocationContext {
    id: Uuid,
    test_name: String,
    attributes: HashMap<String, Box<dyn Any + Send>>,
}

impl InvocationContext {
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_name: test_name.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Store a value, returning the previous one if it had the same type.
    pub fn insert<T: Any + Send>(&mut self, key: &str, value: T) -> Option<T> {
        self.attributes
            .insert(key.to_string(), Box::new(value))
            .and_then(|prev| prev.downcast::<T>().ok())
            .map(|prev| *prev)
    }

    pub fn get<T: Any + Send>(&self, key: &str) -> Option<&T> {
        self.attributes.get(key)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any + Send>(&mut self, key: &str) -> Option<&mut T> {
        self.attributes.get_mut(key)?.downcast_mut::<T>()
    }

    /// Remove a value. A value of a different type is left in place.
    pub fn remove<T: Any + Send>(&mut self, key: &str) -> Option<T> {
        self.get::<T>(key)?;
        self.attributes
            .remove(key)
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.insert(FAILURE, message.into());
    }

    pub fn failure(&self) -> Option<&str> {
        self.get::<String>(FAILURE).map(String::as_str)
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("InvocationContext")
            .field("id", &self.id)
            .field("test_name", &self.test_name)
            .field("keys", &keys)
            .finish()
    }
}
