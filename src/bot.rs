//! The English Ready conversation
//!
//! Concrete waterfall dialogs and the registry that holds them.

mod cards;
mod exercise;
mod grammar;
mod hello;
mod main_menu;
mod tips;
mod welcome;

use crate::dialog::{DialogRegistry, RegistryError};

pub const MAIN: &str = "main";
pub const OPTIONS: &str = "options";
pub const WELCOME: &str = "welcome";
pub const PROFILE: &str = "profile";
pub const GRAMMAR: &str = "grammar";
pub const MORE_GRAMMAR: &str = "more_grammar";
pub const EXERCISE: &str = "exercise";
pub const WRITING_TIPS: &str = "writing_tips";
pub const HELLO_CHAIN: &str = "hello_chain";

/// Every dialog the bot can begin, keyed by name
pub fn registry() -> Result<DialogRegistry, RegistryError> {
    DialogRegistry::new()
        .with(main_menu::main_dialog())?
        .with(main_menu::options_dialog())?
        .with(welcome::welcome_dialog())?
        .with(welcome::profile_dialog())?
        .with(grammar::grammar_dialog())?
        .with(grammar::more_grammar_dialog())?
        .with(exercise::exercise_dialog())?
        .with(tips::writing_tips_dialog())?
        .with(hello::hello_chain_dialog())
}
