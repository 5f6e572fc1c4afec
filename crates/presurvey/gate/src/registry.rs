//! Guard registry: maps configured guard names to implementations
//!
//! Programs supply an ordered list of names; the registry turns that list
//! into concrete guards at pipeline start. Unknown names fail closed.

use std::collections::HashMap;
use std::sync::Arc;

use presurvey_types::{PresurveyError, PresurveyResult, Program};

use crate::config::PipelineConfig;
use crate::guards::{
    ConsentGuard, IesMembershipGuard, ParamTransformGuard, PreviewAgreementGuard,
    SkipToFirstSessionGuard,
};
use crate::orchestrator::PipelineDeps;
use crate::traits::GuardStep;

/// Names under which the standard guards are registered
pub mod guard_names {
    pub const CONSENT: &str = "consent";
    pub const IES_MEMBERSHIP: &str = "ies_membership";
    pub const PREVIEW_AGREEMENT: &str = "preview_agreement";
    pub const SKIP_TO_FIRST_SESSION: &str = "skip_to_first_session";
    pub const BLOCK_SWITCHER: &str = "block_switcher";
}

/// Registry of guard implementations
#[derive(Clone, Default)]
pub struct GuardRegistry {
    guards: HashMap<String, Arc<dyn GuardStep>>,
}

impl GuardRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the five standard guards wired to `deps`
    pub fn standard(deps: &PipelineDeps, config: &PipelineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ConsentGuard::new()));
        registry.register(Arc::new(IesMembershipGuard::new(
            deps.membership.clone(),
            config.ies.salt.clone(),
        )));
        registry.register(Arc::new(PreviewAgreementGuard::new()));
        registry.register(Arc::new(SkipToFirstSessionGuard::new(
            deps.participants.clone(),
            deps.programs.clone(),
            deps.store.clone(),
        )));
        registry.register(Arc::new(ParamTransformGuard::new()));
        registry
    }

    /// Register a guard under its own name, replacing any previous one
    pub fn register(&mut self, guard: Arc<dyn GuardStep>) {
        let name = guard.name().to_string();
        if self.guards.insert(name.clone(), guard).is_some() {
            tracing::debug!(guard = %name, "Guard implementation replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn GuardStep>> {
        self.guards.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.guards.len()
    }

    /// Ordered guard names for a program.
    ///
    /// The program's own presurvey states win over the configured default.
    /// The membership guard is not program-configurable: it is dropped from
    /// any configured list and appended last for the designated program only.
    pub fn guard_order(program: &Program, config: &PipelineConfig) -> Vec<String> {
        let configured = if program.presurvey_states.is_empty() {
            &config.default_presurvey_states
        } else {
            &program.presurvey_states
        };

        let mut names: Vec<String> = configured
            .iter()
            .filter(|n| n.as_str() != guard_names::IES_MEMBERSHIP)
            .cloned()
            .collect();
        if config.ies.applies_to(&program.label) {
            names.push(guard_names::IES_MEMBERSHIP.to_string());
        }
        names
    }

    /// Resolve the ordered guard list for a program
    pub fn resolve(
        &self,
        program: &Program,
        config: &PipelineConfig,
    ) -> PresurveyResult<Vec<Arc<dyn GuardStep>>> {
        let order = Self::guard_order(program, config);
        if order.iter().any(|n| n == guard_names::IES_MEMBERSHIP)
            && config.ies.salt.trim().is_empty()
        {
            return Err(PresurveyError::MissingSalt {
                program: program.label.clone(),
            });
        }

        order
            .into_iter()
            .map(|name| {
                self.get(&name).ok_or_else(|| PresurveyError::UnknownGuard {
                    program: program.label.clone(),
                    guard: name,
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for GuardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.guards.keys().collect();
        names.sort();
        f.debug_struct("GuardRegistry").field("guards", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::test_deps;

    fn names(guards: &[Arc<dyn GuardStep>]) -> Vec<String> {
        guards.iter().map(|g| g.name().to_string()).collect()
    }

    fn salted() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.ies.salt = "pepper".into();
        config
    }

    #[test]
    fn standard_registry_has_all_guards() {
        let registry = GuardRegistry::standard(&test_deps().deps(), &PipelineConfig::default());
        assert_eq!(registry.count(), 5);
        for name in [
            guard_names::CONSENT,
            guard_names::IES_MEMBERSHIP,
            guard_names::PREVIEW_AGREEMENT,
            guard_names::SKIP_TO_FIRST_SESSION,
            guard_names::BLOCK_SWITCHER,
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
    }

    #[test]
    fn program_order_wins_over_default() {
        let config = PipelineConfig::default();
        let registry = GuardRegistry::standard(&test_deps().deps(), &config);
        let program =
            Program::new("cg17").with_presurvey_states(["block_switcher", "consent"]);

        let guards = registry.resolve(&program, &config).unwrap();
        assert_eq!(names(&guards), vec!["block_switcher", "consent"]);
    }

    #[test]
    fn empty_program_states_use_default() {
        let config = PipelineConfig::default();
        let registry = GuardRegistry::standard(&test_deps().deps(), &config);

        let guards = registry.resolve(&Program::new("cg17"), &config).unwrap();
        assert_eq!(names(&guards), config.default_presurvey_states);
    }

    #[test]
    fn membership_guard_appended_once_for_designated_program() {
        let config = PipelineConfig::default();
        let program = Program::new("ep19").with_presurvey_states(["consent"]);
        assert_eq!(
            GuardRegistry::guard_order(&program, &config),
            vec!["consent", "ies_membership"]
        );

        let explicit =
            Program::new("ep19").with_presurvey_states(["ies_membership", "consent"]);
        assert_eq!(
            GuardRegistry::guard_order(&explicit, &config),
            vec!["consent", "ies_membership"]
        );
    }

    #[test]
    fn membership_guard_never_runs_for_other_programs() {
        let config = salted();
        let registry = GuardRegistry::standard(&test_deps().deps(), &config);
        let program =
            Program::new("cg17").with_presurvey_states(["ies_membership", "consent"]);

        assert_eq!(GuardRegistry::guard_order(&program, &config), vec!["consent"]);
        let guards = registry.resolve(&program, &config).unwrap();
        assert_eq!(names(&guards), vec!["consent"]);
    }

    #[test]
    fn membership_guard_without_salt_fails_closed() {
        let config = PipelineConfig::default();
        let registry = GuardRegistry::standard(&test_deps().deps(), &config);

        let err = registry
            .resolve(&Program::new("ep19"), &config)
            .map(|g| names(&g))
            .unwrap_err();
        assert_eq!(
            err,
            PresurveyError::MissingSalt {
                program: "ep19".into()
            }
        );
        assert_eq!(err.kind(), presurvey_types::ErrorKind::ConfigurationGap);

        // Programs without the membership guard do not need a salt
        assert!(registry.resolve(&Program::new("cg17"), &config).is_ok());
        assert!(registry.resolve(&Program::new("ep19"), &salted()).is_ok());
    }

    #[test]
    fn unknown_guard_fails_closed() {
        let config = PipelineConfig::default();
        let registry = GuardRegistry::standard(&test_deps().deps(), &config);
        let program = Program::new("cg17").with_presurvey_states(["consent", "realization"]);

        match registry.resolve(&program, &config) {
            Err(PresurveyError::UnknownGuard { program, guard }) => {
                assert_eq!(program, "cg17");
                assert_eq!(guard, "realization");
            }
            other => panic!("expected UnknownGuard, got {:?}", other.map(|g| names(&g))),
        }
    }
}
