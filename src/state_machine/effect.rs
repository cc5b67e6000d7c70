//! Effects produced by state transitions

use crate::dialog::Activity;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver an activity to the user (transcript + subscribers)
    SendActivity(Activity),

    /// Persist the new state
    PersistState,
}
