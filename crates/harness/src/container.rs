//! Container variant resolution
//!
//! Pages and components that come in several interchangeable variants
//! (responsive layouts, A/B buckets, rollout phases) are registered in a
//! [`VariantTable`]: one resolver per container type picks a [`VariantId`]
//! from the runtime [`Condition`], and a constructor is registered for each
//! `(container, variant)` pair.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Runtime state a resolver may inspect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub viewport: Option<Viewport>,
    /// Experiment bucket (A/B testing)
    pub bucket: Option<String>,
    /// Rollout phase
    pub phase: Option<String>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
}

impl Condition {
    pub fn viewport(width: u32, height: u32) -> Self {
        Self {
            viewport: Some(Viewport { width, height }),
            ..Default::default()
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>, on: bool) -> Self {
        self.flags.insert(name.into(), on);
        self
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantId(String);

impl VariantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VariantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Picks the variant of one container type. Must be pure in `condition`.
pub trait ContainerResolver: Send + Sync {
    fn resolve(&self, condition: &Condition) -> HarnessResult<VariantId>;
}

impl<F> ContainerResolver for F
where
    F: Fn(&Condition) -> HarnessResult<VariantId> + Send + Sync,
{
    fn resolve(&self, condition: &Condition) -> HarnessResult<VariantId> {
        self(condition)
    }
}

/// Resolver choosing by viewport width. Each breakpoint is
/// `(min_width, variant)`; the widest breakpoint not above the viewport wins.
pub fn width_breakpoints(
    container: impl Into<String>,
    breakpoints: &[(u32, &str)],
) -> impl ContainerResolver {
    let container = container.into();
    let mut breakpoints: Vec<(u32, VariantId)> = breakpoints
        .iter()
        .map(|(min, id)| (*min, VariantId::from(*id)))
        .collect();
    breakpoints.sort_by_key(|(min, _)| std::cmp::Reverse(*min));

    move |condition: &Condition| -> HarnessResult<VariantId> {
        let viewport = condition.viewport.ok_or_else(|| HarnessError::ResolutionAmbiguity {
            container: container.clone(),
            reason: "no viewport in condition".to_string(),
        })?;
        breakpoints
            .iter()
            .find(|(min, _)| viewport.width >= *min)
            .map(|(_, id)| id.clone())
            .ok_or_else(|| HarnessError::ResolutionAmbiguity {
                container: container.clone(),
                reason: format!("viewport width {} is below every breakpoint", viewport.width),
            })
    }
}

type Constructor<P> = Box<dyn Fn(&Condition) -> P + Send + Sync>;

/// Maps `(container, condition)` to a constructed variant.
pub struct VariantTable<P> {
    resolvers: HashMap<String, Box<dyn ContainerResolver>>,
    constructors: HashMap<(String, VariantId), Constructor<P>>,
}

impl<P> Default for VariantTable<P> {
    fn default() -> Self {
        Self {
            resolvers: HashMap::new(),
            constructors: HashMap::new(),
        }
    }
}

impl<P> VariantTable<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the resolver for `container`, replacing any earlier binding.
    pub fn bind<R>(mut self, container: impl Into<String>, resolver: R) -> Self
    where
        R: ContainerResolver + 'static,
    {
        self.resolvers.insert(container.into(), Box::new(resolver));
        self
    }

    pub fn variant<F>(mut self, container: impl Into<String>, variant: impl Into<VariantId>, ctor: F) -> Self
    where
        F: Fn(&Condition) -> P + Send + Sync + 'static,
    {
        self.constructors
            .insert((container.into(), variant.into()), Box::new(ctor));
        self
    }

    pub fn variants(&self, container: &str) -> Vec<&VariantId> {
        let mut ids: Vec<&VariantId> = self
            .constructors
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, id)| id)
            .collect();
        ids.sort();
        ids
    }

    /// Invoke the bound resolver once and check a constructor exists.
    pub fn resolve(&self, container: &str, condition: &Condition) -> HarnessResult<VariantId> {
        let resolver = self
            .resolvers
            .get(container)
            .ok_or_else(|| HarnessError::NoResolverBound(container.to_string()))?;
        let variant = resolver.resolve(condition)?;
        if !self
            .constructors
            .contains_key(&(container.to_string(), variant.clone()))
        {
            return Err(HarnessError::ResolutionAmbiguity {
                container: container.to_string(),
                reason: format!("resolver chose unregistered variant '{variant}'"),
            });
        }
        Ok(variant)
    }

    /// Construct a new instance of `container` for `condition`.
    ///
    /// The variant is resolved on every call; the result is remembered only by
    /// the returned instance.
    pub fn construct(&self, container: &str, condition: &Condition) -> HarnessResult<Resolved<P>> {
        let variant = self.resolve(container, condition)?;
        let key = (container.to_string(), variant);
        let ctor = self.constructors.get(&key).ok_or_else(|| {
            HarnessError::NotRegistered {
                kind: "container variant",
                name: format!("{}/{}", key.0, key.1),
            }
        })?;
        debug!(container, variant = %key.1, "Resolved container variant");
        let inner = ctor(condition);
        let (container, variant) = key;
        Ok(Resolved {
            container,
            variant,
            inner,
        })
    }
}

/// A constructed container together with the variant chosen for it.
#[derive(Debug)]
pub struct Resolved<P> {
    container: String,
    variant: VariantId,
    inner: P,
}

impl<P> Resolved<P> {
    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn variant(&self) -> &VariantId {
        &self.variant
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P> Deref for Resolved<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.inner
    }
}
