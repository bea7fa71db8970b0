//! DriverKit invocation harness
//!
//! This crate binds browser/device driver sessions to test invocations:
//! - Attaches at most one driver per invocation, on demand
//! - Resolves the initial page address from layered declarations
//! - Picks page/component variants from runtime conditions
//! - Filters methods by target platform
//! - Captures page source and screenshots when a test fails
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SuiteRunner                             │
//! │    ├── PlatformFilter::should_run(method)                   │
//! │    ├── InvocationContext::new(test)                         │
//! │    ├── DriverManager::before_invocation(method, instance)   │
//! │    │     ├── DriverProvider::provide_driver -> DriverHandle │
//! │    │     └── PageAddressResolver::resolve(layers) -> url    │
//! │    ├── test body (VariantTable::construct, initial_page)    │
//! │    ├── ArtifactCollector::capture_artifact (on failure)     │
//! │    └── DriverManager::close_driver                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteRegistry (built once, shared read-only)               │
//! │    ├── ClassDescriptor / MethodDescriptor                   │
//! │    └── PageType { page_url }                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod address;
pub mod artifact;
pub mod config;
pub mod container;
pub mod context;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod method;
pub mod page;
pub mod platform;
pub mod registry;
pub mod runner;

pub use address::{PageAddressResolver, PageUrl};
pub use artifact::{ArtifactCollector, ArtifactType, PageSourceCapture, ScreenshotCapture};
pub use config::HarnessConfig;
pub use container::{Condition, ContainerResolver, VariantId, VariantTable};
pub use context::InvocationContext;
pub use driver::{Driver, DriverHandle};
pub use error::{DriverError, HarnessError, HarnessResult};
pub use lifecycle::{DriverManager, DriverProvider, TestInstance};
pub use method::{ClassDescriptor, MethodDescriptor, MethodKind};
pub use page::{initial_page, InitialPage, OpenedPage, PageType};
pub use platform::{PlatformFilter, PlatformMatcher};
pub use registry::SuiteRegistry;
pub use runner::{SuiteRunner, TestResult, TestSuiteResult};
