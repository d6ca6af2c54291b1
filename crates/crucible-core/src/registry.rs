//! Explicit registration table mapping capability tags to plan-author
//! constructors. Built once at startup and passed by reference.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::collaborators::PlanAuthor;

pub type PlanAuthorFactory = Box<dyn Fn() -> Arc<dyn PlanAuthor> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("capability tag '{0}' is already registered")]
    Duplicate(String),

    #[error("no agent registered for capability tag '{0}'")]
    Unknown(String),
}

#[derive(Default)]
pub struct AgentRegistry {
    factories: BTreeMap<String, PlanAuthorFactory>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Arc<dyn PlanAuthor> + Send + Sync + 'static,
    {
        let tag = tag.into();
        if self.factories.contains_key(&tag) {
            return Err(RegistryError::Duplicate(tag));
        }
        self.factories.insert(tag, Box::new(factory));
        Ok(())
    }

    /// Construct a fresh agent for `tag`.
    pub fn build(&self, tag: &str) -> Result<Arc<dyn PlanAuthor>, RegistryError> {
        self.factories
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::Unknown(tag.to_string()))
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("tags", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlanError, PlanValidationError};
    use crate::fakes::StaticPlanAuthor;

    fn author() -> Arc<dyn PlanAuthor> {
        Arc::new(StaticPlanAuthor::with_result(Err(PlanError::Invalid(
            PlanValidationError::EmptyFileStructure,
        ))))
    }

    #[test]
    fn test_register_and_build() {
        let mut registry = AgentRegistry::new();
        registry.register("planner", author).unwrap();
        assert!(registry.build("planner").is_ok());
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["planner"]);
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut registry = AgentRegistry::new();
        registry.register("planner", author).unwrap();
        assert_eq!(
            registry.register("planner", author).unwrap_err(),
            RegistryError::Duplicate("planner".to_string())
        );
    }

    #[test]
    fn test_unknown_tag() {
        let registry = AgentRegistry::new();
        assert!(matches!(
            registry.build("missing"),
            Err(RegistryError::Unknown(tag)) if tag == "missing"
        ));
    }
}
