//! Test method and class metadata

use serde::{Deserialize, Serialize};

use crate::page::InitialPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Test,
    BeforeMethod,
    BeforeClass,
    BeforeSuite,
    AfterMethod,
}

impl MethodKind {
    pub fn is_test(&self) -> bool {
        matches!(self, MethodKind::Test)
    }

    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            MethodKind::BeforeMethod | MethodKind::BeforeClass | MethodKind::BeforeSuite
        )
    }
}

/// Declarative configuration attached to one test or configuration method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub class_name: String,
    pub kind: MethodKind,
    /// Decline automatic driver provisioning
    pub no_driver: bool,
    /// Platform this method targets (None = any)
    pub target_platform: Option<String>,
    pub initial_page: Option<InitialPage>,
}

impl MethodDescriptor {
    pub fn new(kind: MethodKind, class_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            kind,
            no_driver: false,
            target_platform: None,
            initial_page: None,
        }
    }

    pub fn test(class_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(MethodKind::Test, class_name, name)
    }

    pub fn no_driver(mut self) -> Self {
        self.no_driver = true;
        self
    }

    pub fn target_platform(mut self, platform: impl Into<String>) -> Self {
        self.target_platform = Some(platform.into());
        self
    }

    pub fn initial_page(mut self, page: InitialPage) -> Self {
        self.initial_page = Some(page);
        self
    }

    /// `Class.method`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class_name, self.name)
    }
}

/// Class-level declarations shared by every method of a test class.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDescriptor {
    pub name: String,
    pub initial_page: Option<InitialPage>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_page: None,
        }
    }

    pub fn initial_page(mut self, page: InitialPage) -> Self {
        self.initial_page = Some(page);
        self
    }
}
