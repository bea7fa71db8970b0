//! Page types, initial page declarations and opened pages

use serde::{Deserialize, Serialize};

use crate::address::PageUrl;
use crate::context::{InvocationContext, INITIAL_PAGE};
use crate::error::{HarnessError, HarnessResult};

/// A page object type and the address it declares for itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageType {
    pub name: String,
    #[serde(default)]
    pub page_url: PageUrl,
}

impl PageType {
    pub fn new(name: impl Into<String>, page_url: PageUrl) -> Self {
        Self {
            name: name.into(),
            page_url,
        }
    }
}

/// Page a test should start on, with an address layer overriding the page type's.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InitialPage {
    pub page_type: String,
    #[serde(default)]
    pub page_url: PageUrl,
}

impl InitialPage {
    pub fn new(page_type: impl Into<String>) -> Self {
        Self {
            page_type: page_type.into(),
            page_url: PageUrl::default(),
        }
    }

    pub fn with_url(mut self, page_url: PageUrl) -> Self {
        self.page_url = page_url;
        self
    }
}

/// The initial page after navigation, stored under [`INITIAL_PAGE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedPage {
    pub page_type: String,
    pub url: String,
    pub session_id: String,
}

/// The initial page opened for this invocation.
pub fn initial_page(ctx: &InvocationContext) -> HarnessResult<&OpenedPage> {
    ctx.get::<OpenedPage>(INITIAL_PAGE)
        .ok_or_else(|| HarnessError::InitialPageNotSpecified(ctx.test_name().to_string()))
}
