//! Target platform matching

use tracing::debug;

use crate::method::MethodDescriptor;

/// Decides whether a declared target platform matches the current context.
///
/// Implementations may override [`matches`](PlatformMatcher::matches) for
/// richer comparisons, but must stay reflexive and must never match an empty
/// context name.
pub trait PlatformMatcher: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, context: &str) -> bool {
        !context.is_empty() && self.name() == context
    }
}

/// Exact, case-sensitive platform name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPlatform(String);

impl NamedPlatform {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl PlatformMatcher for NamedPlatform {
    fn name(&self) -> &str {
        &self.0
    }
}

/// One stage of an ordered rollout, tagged with a colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub name: String,
    pub color: String,
}

/// Ordered rollout phases. A target phase matches a context at or beyond it.
#[derive(Debug, Clone)]
pub struct RolloutPhase {
    phases: Vec<Phase>,
    target: usize,
}

impl RolloutPhase {
    /// `None` when `target` is not one of `phases`.
    pub fn new(phases: Vec<Phase>, target: &str) -> Option<Self> {
        let target = phases.iter().position(|p| p.name == target)?;
        Some(Self { phases, target })
    }

    pub fn color(&self) -> &str {
        &self.phases[self.target].color
    }

    fn ordinal(&self, name: &str) -> Option<usize> {
        self.phases.iter().position(|p| p.name == name)
    }
}

impl PlatformMatcher for RolloutPhase {
    fn name(&self) -> &str {
        &self.phases[self.target].name
    }

    fn matches(&self, context: &str) -> bool {
        if context.is_empty() {
            return false;
        }
        match self.ordinal(context) {
            Some(ordinal) => ordinal >= self.target,
            None => false,
        }
    }
}

/// Evaluate a (possibly absent) declared target against the context platform.
///
/// An absent target always matches. A declared target never matches an
/// absent or empty context.
pub fn matches(declared: Option<&dyn PlatformMatcher>, context: Option<&str>) -> bool {
    match declared {
        None => true,
        Some(target) => match context {
            Some(ctx) if !ctx.is_empty() => target.matches(ctx),
            _ => false,
        },
    }
}

/// Filters test methods by the platform the suite runs against.
pub struct PlatformFilter {
    context: Option<String>,
    phases: Option<Vec<Phase>>,
}

impl PlatformFilter {
    pub fn new(context: Option<String>) -> Self {
        Self {
            context: context.filter(|c| !c.is_empty()),
            phases: None,
        }
    }

    /// Interpret declared targets as rollout phases instead of plain names.
    pub fn with_phases(mut self, phases: Vec<Phase>) -> Self {
        self.phases = Some(phases);
        self
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn matcher_for(&self, target: &str) -> Box<dyn PlatformMatcher> {
        if let Some(phases) = &self.phases {
            if let Some(phase) = RolloutPhase::new(phases.clone(), target) {
                return Box::new(phase);
            }
        }
        Box::new(NamedPlatform::new(target))
    }

    pub fn should_run(&self, method: &MethodDescriptor) -> bool {
        let matcher = method.target_platform.as_deref().map(|t| self.matcher_for(t));
        let run = matches(matcher.as_deref(), self.context());
        if !run {
            debug!(
                method = %method.name,
                target = ?method.target_platform,
                context = ?self.context,
                "Skipping method for non-matching platform"
            );
        }
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn phases() -> Vec<Phase> {
        [("phase-1", "green"), ("phase-2", "amber"), ("phase-3", "coral")]
            .into_iter()
            .map(|(name, color)| Phase {
                name: name.to_string(),
                color: color.to_string(),
            })
            .collect()
    }

    #[test_case("windows", "windows" => true; "identical names")]
    #[test_case("windows", "" => false; "empty context")]
    #[test_case("windows", "Windows" => false; "case sensitive")]
    #[test_case("windows", "mac" => false; "different names")]
    fn named_platform(target: &str, context: &str) -> bool {
        NamedPlatform::new(target).matches(context)
    }

    #[test_case(None, Some("android") => true; "undeclared matches any name")]
    #[test_case(None, None => true; "undeclared matches unspecified context")]
    #[test_case(Some("android"), None => false; "declared never matches missing context")]
    #[test_case(Some("android"), Some("") => false; "declared never matches empty context")]
    #[test_case(Some("android"), Some("android") => true; "declared matches same name")]
    fn declared_target(target: Option<&str>, context: Option<&str>) -> bool {
        let matcher = target.map(NamedPlatform::new);
        matches(matcher.as_ref().map(|m| m as &dyn PlatformMatcher), context)
    }

    #[test]
    fn test_rollout_phase_ordering() {
        let phase2 = RolloutPhase::new(phases(), "phase-2").unwrap();
        assert_eq!(phase2.color(), "amber");
        assert!(phase2.matches("phase-2"));
        assert!(phase2.matches("phase-3"));
        assert!(!phase2.matches("phase-1"));
        assert!(!phase2.matches(""));
        assert!(!phase2.matches("phase-9"));
        assert!(RolloutPhase::new(phases(), "phase-9").is_none());
    }

    #[test]
    fn test_filter_uses_phases_when_configured() {
        let filter = PlatformFilter::new(Some("phase-3".into())).with_phases(phases());
        let mut method = MethodDescriptor::test("Rollout", "checkout");
        method.target_platform = Some("phase-1".into());
        assert!(filter.should_run(&method));

        let plain = PlatformFilter::new(Some("phase-3".into()));
        assert!(!plain.should_run(&method));
    }

    #[test]
    fn test_filter_treats_empty_context_as_unspecified() {
        let filter = PlatformFilter::new(Some(String::new()));
        assert_eq!(filter.context(), None);
        assert!(filter.should_run(&MethodDescriptor::test("Any", "runs")));
    }
}
