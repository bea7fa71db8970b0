//! Suite-wide registry of test classes, methods and page types
//!
//! Built once when the suite is loaded and read-only afterwards, so it can be
//! shared between workers behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::address::PageUrl;
use crate::error::{HarnessError, HarnessResult};
use crate::method::{ClassDescriptor, MethodDescriptor};
use crate::page::{InitialPage, PageType};

#[derive(Debug, Default)]
pub struct SuiteRegistry {
    classes: HashMap<String, ClassDescriptor>,
    methods: Vec<Arc<MethodDescriptor>>,
    pages: HashMap<String, PageType>,
}

impl SuiteRegistry {
    pub fn builder() -> SuiteRegistryBuilder {
        SuiteRegistryBuilder::default()
    }

    pub fn methods(&self) -> &[Arc<MethodDescriptor>] {
        &self.methods
    }

    pub fn method(&self, qualified_name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.methods
            .iter()
            .find(|m| m.qualified_name() == qualified_name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    pub fn page_type(&self, name: &str) -> Option<&PageType> {
        self.pages.get(name)
    }

    /// Initial page for `method`: its own declaration, else its class's.
    pub fn initial_page_for<'a>(&'a self, method: &'a MethodDescriptor) -> Option<&'a InitialPage> {
        method.initial_page.as_ref().or_else(|| {
            if method.kind.is_test() {
                self.class(&method.class_name)?.initial_page.as_ref()
            } else {
                None
            }
        })
    }

    /// Address layers for `initial`, least specific first: the page type's
    /// own address, the class declaration (same page type only), then the
    /// method declaration.
    pub fn address_layers<'a>(
        &'a self,
        method: &'a MethodDescriptor,
        initial: &'a InitialPage,
    ) -> Vec<&'a PageUrl> {
        let mut layers = Vec::with_capacity(3);
        if let Some(page) = self.page_type(&initial.page_type) {
            layers.push(&page.page_url);
        }
        let class_page = self
            .class(&method.class_name)
            .and_then(|c| c.initial_page.as_ref())
            .filter(|p| p.page_type == initial.page_type);
        if let Some(class_page) = class_page {
            layers.push(&class_page.page_url);
        }
        if let Some(method_page) = method.initial_page.as_ref() {
            if method_page.page_type == initial.page_type {
                layers.push(&method_page.page_url);
            }
        }
        layers
    }
}

#[derive(Debug, Default)]
pub struct SuiteRegistryBuilder {
    classes: Vec<ClassDescriptor>,
    methods: Vec<MethodDescriptor>,
    pages: Vec<PageType>,
}

impl SuiteRegistryBuilder {
    pub fn class(mut self, class: ClassDescriptor) -> Self {
        self.classes.push(class);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn page(mut self, page: PageType) -> Self {
        self.pages.push(page);
        self
    }

    /// Validate cross references and freeze the registry.
    pub fn build(self) -> HarnessResult<SuiteRegistry> {
        let mut registry = SuiteRegistry::default();

        for page in self.pages {
            registry.pages.insert(page.name.clone(), page);
        }
        for class in self.classes {
            registry.classes.insert(class.name.clone(), class);
        }
        for method in self.methods {
            registry
                .classes
                .entry(method.class_name.clone())
                .or_insert_with(|| ClassDescriptor::new(method.class_name.clone()));
            if registry.method(&method.qualified_name()).is_some() {
                return Err(HarnessError::InvalidConfig(format!(
                    "duplicate method {}",
                    method.qualified_name()
                )));
            }
            registry.methods.push(Arc::new(method));
        }

        let declared = registry
            .classes
            .values()
            .filter_map(|c| c.initial_page.as_ref())
            .chain(registry.methods.iter().filter_map(|m| m.initial_page.as_ref()));
        for initial in declared {
            if !registry.pages.contains_key(&initial.page_type) {
                return Err(HarnessError::NotRegistered {
                    kind: "page type",
                    name: initial.page_type.clone(),
                });
            }
        }

        debug!(
            classes = registry.classes.len(),
            methods = registry.methods.len(),
            pages = registry.pages.len(),
            "Suite registry built"
        );
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodKind;

    fn registry() -> SuiteRegistry {
        SuiteRegistry::builder()
            .page(PageType::new("SearchPage", PageUrl::new().path("/search")))
            .page(PageType::new("HomePage", PageUrl::new().path("/")))
            .class(
                ClassDescriptor::new("SearchTest").initial_page(
                    InitialPage::new("SearchPage").with_url(PageUrl::new().host("class.example.com")),
                ),
            )
            .method(MethodDescriptor::test("SearchTest", "inherits"))
            .method(
                MethodDescriptor::test("SearchTest", "overrides").initial_page(
                    InitialPage::new("SearchPage").with_url(PageUrl::new().param("q=hello")),
                ),
            )
            .method(
                MethodDescriptor::test("SearchTest", "other_page")
                    .initial_page(InitialPage::new("HomePage")),
            )
            .method(MethodDescriptor::new(MethodKind::BeforeMethod, "SearchTest", "setup"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_class_initial_page_applies_to_tests_only() {
        let registry = registry();
        let inherits = registry.method("SearchTest.inherits").unwrap();
        assert_eq!(
            registry.initial_page_for(inherits).map(|p| p.page_type.as_str()),
            Some("SearchPage")
        );
        let setup = registry.method("SearchTest.setup").unwrap();
        assert!(registry.initial_page_for(setup).is_none());
    }

    #[test]
    fn test_method_declaration_outside_registry() {
        let registry = registry();
        let adhoc = MethodDescriptor::test("SearchTest", "adhoc")
            .initial_page(InitialPage::new("SearchPage").with_url(PageUrl::new().path("/adhoc")));
        let initial = registry.initial_page_for(&adhoc).unwrap();
        assert_eq!(initial.page_type, "SearchPage");
        assert_eq!(registry.address_layers(&adhoc, initial).len(), 3);
    }

    #[test]
    fn test_layers_are_ordered_least_specific_first() {
        let registry = registry();
        let method = registry.method("SearchTest.overrides").unwrap();
        let initial = registry.initial_page_for(method).unwrap();
        let layers = registry.address_layers(method, initial);
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].path.as_deref(), Some("/search"));
        assert_eq!(layers[1].host.as_deref(), Some("class.example.com"));
        assert_eq!(layers[2].params, vec!["q=hello".to_string()]);
    }

    #[test]
    fn test_class_layer_skipped_for_other_page_type() {
        let registry = registry();
        let method = registry.method("SearchTest.other_page").unwrap();
        let initial = registry.initial_page_for(method).unwrap();
        let layers = registry.address_layers(method, initial);
        assert_eq!(layers.len(), 2);
        assert!(layers.iter().all(|l| l.host.is_none()));
    }

    #[test]
    fn test_unknown_page_type_is_rejected() {
        let err = SuiteRegistry::builder()
            .method(MethodDescriptor::test("T", "m").initial_page(InitialPage::new("Missing")))
            .build()
            .unwrap_err();
        assert!(matches!(err, HarnessError::NotRegistered { kind: "page type", .. }));
    }

    #[test]
    fn test_duplicate_method_is_rejected() {
        let err = SuiteRegistry::builder()
            .method(MethodDescriptor::test("T", "m"))
            .method(MethodDescriptor::test("T", "m"))
            .build()
            .unwrap_err();
        assert!(matches!(err, HarnessError::InvalidConfig(_)));
    }
}
