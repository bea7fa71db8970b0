//! Driver session contract and the per-invocation handle

use std::fmt;

use serde_json::{Map, Value};

use crate::config::TimeoutConfig;
use crate::error::DriverError;

/// Capability key a driver reports when it can (or cannot) take screenshots.
pub const TAKES_SCREENSHOT: &str = "takesScreenshot";

/// Capability key a driver reports when it can (or cannot) serialize its hierarchy.
pub const TAKES_PAGE_SOURCE: &str = "takesPageSource";

/// Capabilities reported by a live session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities(Map<String, Value>);

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Boolean capability; `None` when absent or not a boolean.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }
}

impl From<Map<String, Value>> for Capabilities {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A session that can capture a raster image of its viewport.
pub trait TakesScreenshot {
    fn screenshot_png(&self) -> Result<Vec<u8>, DriverError>;
}

/// A session that can serialize its document or view hierarchy.
pub trait SerializesHierarchy {
    fn page_source(&self) -> Result<String, DriverError>;
}

/// An active browser/device automation session.
///
/// Optional capabilities are discovered through the `as_*` accessors rather
/// than by downcasting.
pub trait Driver: Send {
    fn session_id(&self) -> &str;

    fn capabilities(&self) -> Result<Capabilities, DriverError>;

    fn current_url(&self) -> Result<String, DriverError>;

    fn navigate(&self, url: &str) -> Result<(), DriverError>;

    fn set_timeouts(&self, _timeouts: &TimeoutConfig) -> Result<(), DriverError> {
        Ok(())
    }

    /// Stop any page load in progress.
    fn stop_loading(&self) -> Result<(), DriverError> {
        Ok(())
    }

    /// Dismiss an open alert. Errors when none is present.
    fn dismiss_alert(&self) -> Result<(), DriverError> {
        Err(DriverError::UnsupportedCommand("dismiss_alert".into()))
    }

    fn quit(&mut self) -> Result<(), DriverError>;

    fn as_screenshot(&self) -> Option<&dyn TakesScreenshot> {
        None
    }

    fn as_hierarchy(&self) -> Option<&dyn SerializesHierarchy> {
        None
    }
}

/// Exclusive handle to the session attached to one invocation.
pub struct DriverHandle {
    driver: Box<dyn Driver>,
}

impl DriverHandle {
    pub fn new<D: Driver + 'static>(driver: D) -> Self {
        Self {
            driver: Box::new(driver),
        }
    }

    pub fn from_boxed(driver: Box<dyn Driver>) -> Self {
        Self { driver }
    }

    pub fn session_id(&self) -> &str {
        self.driver.session_id()
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// End the session, consuming the handle.
    pub fn quit(mut self) -> Result<(), DriverError> {
        self.driver.quit()
    }
}

impl fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverHandle")
            .field("session_id", &self.session_id())
            .finish()
    }
}
