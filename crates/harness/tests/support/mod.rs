//! Shared fakes for harness integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use driverkit_harness::config::TimeoutConfig;
use driverkit_harness::driver::{Capabilities, SerializesHierarchy, TakesScreenshot};
use driverkit_harness::{
    Driver, DriverError, DriverHandle, DriverProvider, InvocationContext, MethodDescriptor,
    TestInstance,
};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";
pub const HTML_SOURCE: &str = "<html><head><title>fake</title></head><body></body></html>";

/// Commands seen by fake drivers, shared across sessions.
pub type DriverLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Capture {
    Works,
    Unsupported,
    Disconnected,
    Missing,
}

pub struct FakeDriver {
    session: String,
    log: DriverLog,
    url: Mutex<String>,
    capture: Capture,
    caps: Capabilities,
    source: String,
}

impl FakeDriver {
    pub fn new(session: impl Into<String>, log: DriverLog) -> Self {
        Self {
            session: session.into(),
            log,
            url: Mutex::new("about:blank".to_string()),
            capture: Capture::Works,
            caps: Capabilities::new(),
            source: HTML_SOURCE.to_string(),
        }
    }

    pub fn capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }

    pub fn capability(mut self, name: &str, value: bool) -> Self {
        self.caps = self.caps.with(name, value);
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn at(self, url: &str) -> Self {
        *self.url.lock() = url.to_string();
        self
    }

    fn record(&self, entry: String) {
        self.log.lock().push(entry);
    }

    fn check(&self, command: &str) -> Result<(), DriverError> {
        self.record(format!("{} {}", command, self.session));
        match self.capture {
            Capture::Unsupported => Err(DriverError::UnsupportedCommand(command.to_string())),
            Capture::Disconnected => Err(DriverError::Disconnected),
            _ => Ok(()),
        }
    }
}

impl Driver for FakeDriver {
    fn session_id(&self) -> &str {
        &self.session
    }

    fn capabilities(&self) -> Result<Capabilities, DriverError> {
        Ok(self.caps.clone())
    }

    fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.url.lock().clone())
    }

    fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate {}", url));
        *self.url.lock() = url.to_string();
        Ok(())
    }

    fn set_timeouts(&self, t: &TimeoutConfig) -> Result<(), DriverError> {
        self.record(format!(
            "timeouts {}/{}/{}",
            t.script_secs, t.implicit_secs, t.page_load_secs
        ));
        Ok(())
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        self.record(format!("quit {}", self.session));
        Ok(())
    }

    fn as_screenshot(&self) -> Option<&dyn TakesScreenshot> {
        (self.capture != Capture::Missing).then_some(self as &dyn TakesScreenshot)
    }

    fn as_hierarchy(&self) -> Option<&dyn SerializesHierarchy> {
        (self.capture != Capture::Missing).then_some(self as &dyn SerializesHierarchy)
    }
}

impl TakesScreenshot for FakeDriver {
    fn screenshot_png(&self) -> Result<Vec<u8>, DriverError> {
        self.check("screenshot")?;
        Ok(PNG_BYTES.to_vec())
    }
}

impl SerializesHierarchy for FakeDriver {
    fn page_source(&self) -> Result<String, DriverError> {
        match self.check("page_source") {
            // page source has no unsupported fallback
            Err(DriverError::UnsupportedCommand(_)) | Ok(()) => Ok(self.source.clone()),
            Err(e) => Err(e),
        }
    }
}

type DriverFactory = Box<dyn Fn(String, DriverLog) -> FakeDriver + Send + Sync>;

/// Provider counting its calls; each call yields a fresh session.
pub struct CountingProvider {
    calls: AtomicUsize,
    fail: bool,
    log: DriverLog,
    factory: DriverFactory,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            log: DriverLog::default(),
            factory: Box::new(|session: String, log: DriverLog| FakeDriver::new(session, log)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_driver<F>(factory: F) -> Self
    where
        F: Fn(String, DriverLog) -> FakeDriver + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn logged(&self, entry: &str) -> bool {
        self.log.lock().iter().any(|e| e == entry)
    }
}

impl DriverProvider for CountingProvider {
    fn provide_driver(
        &self,
        method: &MethodDescriptor,
        _ctx: &InvocationContext,
    ) -> anyhow::Result<DriverHandle> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            anyhow::bail!("grid refused session for {}", method.name);
        }
        let driver = (self.factory)(format!("session-{n}"), self.log.clone());
        Ok(DriverHandle::new(driver))
    }
}

impl TestInstance for CountingProvider {
    fn driver_provider(&self) -> Option<&dyn DriverProvider> {
        Some(self)
    }
}

/// Instance that manages its driver out-of-band.
pub struct NoProvider;

impl TestInstance for NoProvider {}

/// Context with a fake driver already attached.
pub fn context_with(driver: FakeDriver, test: &str) -> InvocationContext {
    let mut ctx = InvocationContext::new(test);
    driverkit_harness::DriverManager::set_driver(&mut ctx, DriverHandle::new(driver))
        .expect("fresh context has no driver");
    ctx
}
