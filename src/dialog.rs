//! Waterfall dialog building blocks
//!
//! Steps, prompts, typed per-frame values and the registry of dialog
//! definitions that the state machine dispatches into.

mod activity;
mod prompt;
mod registry;
mod step;
mod values;

pub use activity::{Activity, ChannelSignal};
pub use prompt::{Answer, ChoiceOption, PromptSpec};
pub use registry::{DialogDefinition, DialogRegistry, RegistryError};
pub use step::{StepContext, StepInput, StepResult};
pub use values::{ValueKey, Values};
