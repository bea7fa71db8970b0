//! Driver lifecycle around each test invocation
//!
//! [`DriverManager::before_invocation`] attaches at most one driver to an
//! [`InvocationContext`]:
//!
//! 1. a context that already holds a driver is left alone;
//! 2. a method declaring `no_driver` gets none (and releases one a setup
//!    method left behind);
//! 3. otherwise the test instance's [`DriverProvider`], if it has one,
//!    creates the driver;
//! 4. without a provider the invocation proceeds driverless, with a warning.
//!
//! Once a driver is attached, the method's initial page (if declared) is
//! resolved and opened. Teardown is [`DriverManager::close_driver`], called
//! by the runner when the invocation completes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::address::PageAddressResolver;
use crate::config::HarnessConfig;
use crate::context::{InvocationContext, DRIVER, INITIAL_PAGE, PROVISION_FAILED};
use crate::driver::DriverHandle;
use crate::error::{HarnessError, HarnessResult};
use crate::method::MethodDescriptor;
use crate::page::{InitialPage, OpenedPage};
use crate::registry::SuiteRegistry;

/// Creates driver sessions for the methods of a test class.
pub trait DriverProvider: Send + Sync {
    fn provide_driver(
        &self,
        method: &MethodDescriptor,
        ctx: &InvocationContext,
    ) -> anyhow::Result<DriverHandle>;
}

/// A test class instance as seen by the harness.
pub trait TestInstance: Send + Sync {
    /// The instance's driver provider, if it supplies drivers itself.
    fn driver_provider(&self) -> Option<&dyn DriverProvider> {
        None
    }
}

pub struct DriverManager {
    config: Arc<HarnessConfig>,
    registry: Arc<SuiteRegistry>,
    addresses: PageAddressResolver,
}

impl DriverManager {
    pub fn new(config: Arc<HarnessConfig>, registry: Arc<SuiteRegistry>) -> Self {
        let addresses = PageAddressResolver::from_config(&config);
        Self {
            config,
            registry,
            addresses,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &SuiteRegistry {
        &self.registry
    }

    pub fn addresses(&self) -> &PageAddressResolver {
        &self.addresses
    }

    /// The attached driver, if any. No lifecycle side effects.
    pub fn get_driver(ctx: &InvocationContext) -> Option<&DriverHandle> {
        ctx.get::<DriverHandle>(DRIVER)
    }

    pub fn require_driver(ctx: &InvocationContext) -> HarnessResult<&DriverHandle> {
        Self::get_driver(ctx)
            .ok_or_else(|| HarnessError::DriverNotAvailable(ctx.test_name().to_string()))
    }

    /// Attach `handle`. A context holds at most one driver, so a second
    /// handle is handed back to the caller.
    pub fn set_driver(ctx: &mut InvocationContext, handle: DriverHandle) -> Result<(), DriverHandle> {
        if Self::get_driver(ctx).is_some() {
            return Err(handle);
        }
        ctx.insert(DRIVER, handle);
        Ok(())
    }

    /// Detach the driver without closing it.
    pub fn take_driver(ctx: &mut InvocationContext) -> Option<DriverHandle> {
        ctx.remove::<DriverHandle>(DRIVER)
    }

    pub fn before_invocation(
        &self,
        method: &MethodDescriptor,
        instance: &dyn TestInstance,
        ctx: &mut InvocationContext,
    ) -> HarnessResult<()> {
        if method.no_driver {
            if method.kind.is_test() && Self::close_driver(ctx) {
                debug!(method = %method.qualified_name(), "Released setup driver for no-driver method");
            }
            return Ok(());
        }

        let initial = self.registry.initial_page_for(method);
        // configuration methods only get a driver when they open a page
        if !method.kind.is_test() && initial.is_none() {
            return Ok(());
        }

        if Self::get_driver(ctx).is_none() && !self.provision(method, instance, ctx)? {
            return Ok(());
        }

        // a method's own page always opens; the class page never replaces
        // one a setup method already opened
        let declared = method.initial_page.is_some();
        if let Some(initial) = initial {
            if declared || !ctx.contains(INITIAL_PAGE) {
                self.open_initial_page(method, initial, ctx)?;
            }
        }
        Ok(())
    }

    /// Reserved hook; teardown is [`close_driver`](Self::close_driver).
    pub fn after_invocation(&self, _method: &MethodDescriptor, _ctx: &mut InvocationContext) {}

    /// Detach and quit the attached driver. Returns whether one was attached.
    pub fn close_driver(ctx: &mut InvocationContext) -> bool {
        ctx.remove::<OpenedPage>(INITIAL_PAGE);
        let Some(handle) = Self::take_driver(ctx) else {
            return false;
        };

        let session = handle.session_id().to_string();
        if let Err(e) = handle.driver().stop_loading() {
            debug!(session = %session, "stop_loading failed: {}", e);
        }
        // no alert is the common case
        let _ = handle.driver().dismiss_alert();
        match handle.quit() {
            Ok(()) => debug!(session = %session, "Driver closed"),
            Err(e) => warn!(session = %session, "Failed to quit driver: {}", e),
        }
        true
    }

    /// Returns whether a driver was attached.
    fn provision(
        &self,
        method: &MethodDescriptor,
        instance: &dyn TestInstance,
        ctx: &mut InvocationContext,
    ) -> HarnessResult<bool> {
        let name = method.qualified_name();
        if ctx.contains(PROVISION_FAILED) {
            warn!(method = %name, "Driver provisioning already failed for this invocation");
            return Ok(false);
        }
        let Some(provider) = instance.driver_provider() else {
            warn!(method = %name, "No driver provider for method; continuing without a driver");
            return Ok(false);
        };

        let handle = match provider.provide_driver(method, ctx) {
            Ok(handle) => handle,
            Err(e) => {
                ctx.insert(PROVISION_FAILED, true);
                return Err(HarnessError::Provisioning {
                    method: name,
                    reason: format!("{e:#}"),
                });
            }
        };

        if let Err(e) = handle.driver().set_timeouts(&self.config.timeouts) {
            warn!(method = %name, session = handle.session_id(), "Failed to apply driver timeouts: {}", e);
        }
        info!(method = %name, session = handle.session_id(), "Driver attached");
        // the context was checked to be empty above
        let _ = Self::set_driver(ctx, handle);
        Ok(true)
    }

    fn open_initial_page(
        &self,
        method: &MethodDescriptor,
        initial: &InitialPage,
        ctx: &mut InvocationContext,
    ) -> HarnessResult<()> {
        let layers = self.registry.address_layers(method, initial);
        let url = self.addresses.resolve(&layers)?;
        let Some(handle) = Self::get_driver(ctx) else {
            return Ok(());
        };

        handle.driver().navigate(&url)?;
        let opened = OpenedPage {
            page_type: initial.page_type.clone(),
            url,
            session_id: handle.session_id().to_string(),
        };
        debug!(method = %method.qualified_name(), page = %opened.page_type, url = %opened.url, "Opened initial page");
        ctx.insert(INITIAL_PAGE, opened);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Capabilities, Driver};
    use crate::error::DriverError;

    struct Stub(&'static str);

    impl Driver for Stub {
        fn session_id(&self) -> &str {
            self.0
        }

        fn capabilities(&self) -> Result<Capabilities, DriverError> {
            Ok(Capabilities::new())
        }

        fn current_url(&self) -> Result<String, DriverError> {
            Ok("about:blank".into())
        }

        fn navigate(&self, _url: &str) -> Result<(), DriverError> {
            Ok(())
        }

        fn quit(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    #[test]
    fn test_second_driver_is_rejected() {
        let mut ctx = InvocationContext::new("t");
        DriverManager::set_driver(&mut ctx, DriverHandle::new(Stub("one"))).unwrap();
        let rejected = DriverManager::set_driver(&mut ctx, DriverHandle::new(Stub("two"))).unwrap_err();
        assert_eq!(rejected.session_id(), "two");
        assert_eq!(DriverManager::get_driver(&ctx).unwrap().session_id(), "one");
    }

    #[test]
    fn test_close_driver_clears_context() {
        let mut ctx = InvocationContext::new("t");
        assert!(!DriverManager::close_driver(&mut ctx));
        DriverManager::set_driver(&mut ctx, DriverHandle::new(Stub("one"))).unwrap();
        assert!(DriverManager::close_driver(&mut ctx));
        assert!(DriverManager::get_driver(&ctx).is_none());
        assert!(matches!(
            DriverManager::require_driver(&ctx),
            Err(HarnessError::DriverNotAvailable(_))
        ));
    }
}
