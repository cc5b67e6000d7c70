//! Dialog definitions and the registry they are looked up in

use super::{StepContext, StepInput, StepResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

type StepFn = dyn Fn(&mut StepContext<'_>, StepInput) -> StepResult + Send + Sync;

/// A single named unit of conversation logic
#[derive(Clone)]
pub struct WaterfallStep {
    name: String,
    run: Arc<StepFn>,
}

impl WaterfallStep {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut StepContext<'_>, StepInput) -> StepResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, ctx: &mut StepContext<'_>, input: StepInput) -> StepResult {
        (self.run)(ctx, input)
    }
}

impl fmt::Debug for WaterfallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WaterfallStep").field(&self.name).finish()
    }
}

/// An ordered list of steps under a unique name. Immutable once registered.
#[derive(Debug, Clone)]
pub struct DialogDefinition {
    name: String,
    steps: Vec<WaterfallStep>,
    initial_step: usize,
}

impl DialogDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            initial_step: 0,
        }
    }

    pub fn step<F>(mut self, name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut StepContext<'_>, StepInput) -> StepResult + Send + Sync + 'static,
    {
        self.steps.push(WaterfallStep::new(name, run));
        self
    }

    /// Start new frames at `index` instead of the first step (clamped to the step count)
    #[cfg(test)]
    pub fn starting_at(mut self, index: usize) -> Self {
        self.initial_step = index;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[WaterfallStep] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn initial_step(&self) -> usize {
        self.initial_step.min(self.steps.len())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Dialog already registered: {0}")]
    Duplicate(String),
}

/// All dialogs a conversation can begin, shared by every session
#[derive(Debug, Clone, Default)]
pub struct DialogRegistry {
    dialogs: HashMap<String, Arc<DialogDefinition>>,
}

impl DialogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: DialogDefinition) -> Result<(), RegistryError> {
        if self.dialogs.contains_key(definition.name()) {
            return Err(RegistryError::Duplicate(definition.name().to_string()));
        }
        self.dialogs
            .insert(definition.name().to_string(), Arc::new(definition));
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, definition: DialogDefinition) -> Result<Self, RegistryError> {
        self.register(definition)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&DialogDefinition> {
        self.dialogs.get(name).map(AsRef::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dialogs.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialogs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut StepContext<'_>, _: StepInput) -> StepResult {
        StepResult::end(())
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = DialogRegistry::new();
        registry
            .register(DialogDefinition::new("a").step("only", noop))
            .unwrap();
        let err = registry
            .register(DialogDefinition::new("a").step("other", noop))
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("a".to_string()));
        assert_eq!(registry.get("a").unwrap().steps()[0].name(), "only");
    }

    #[test]
    fn test_initial_step_is_clamped() {
        let def = DialogDefinition::new("a")
            .step("one", noop)
            .starting_at(7);
        assert_eq!(def.initial_step(), 1);
        assert_eq!(def.step_count(), 1);
    }

    #[test]
    fn test_names_sorted() {
        let registry = DialogRegistry::new()
            .with(DialogDefinition::new("b"))
            .and_then(|r| r.with(DialogDefinition::new("a")))
            .unwrap();
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.contains("a"));
        assert!(registry.get("c").is_none());
    }
}
