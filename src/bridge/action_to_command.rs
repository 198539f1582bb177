//! Typed action to legacy command.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::to_legacy::ColdOrHotToLegacyAdapter;
use crate::boxing::IntoBoxedError;
use crate::context::ContextRef;
use crate::error::BridgeError;
use crate::legacy::{LegacyCommand, LegacySignal};
use crate::typed::{Action, Payload};

/// Exposes a typed action as a legacy command.
///
/// The command is enabled while the action is, and each execution applies
/// the action once to the decoded input. Inputs that do not decode fail the
/// execution without touching the action.
#[derive(Debug, Clone, Default)]
pub struct ActionToCommandAdapter {
    context: ContextRef,
    allows_concurrent_execution: bool,
}

impl ActionToCommandAdapter {
    pub fn new(context: ContextRef) -> Self {
        Self {
            context,
            allows_concurrent_execution: false,
        }
    }

    /// Let the produced commands accept executions while one is in flight.
    /// The action's own enabled state still gates them.
    pub fn with_concurrent_execution(mut self, allows: bool) -> Self {
        self.allows_concurrent_execution = allows;
        self
    }

    pub fn as_legacy_command<I, O, E>(&self, action: &Action<I, O, E>) -> LegacyCommand
    where
        I: DeserializeOwned + Payload,
        O: Serialize + Payload,
        E: IntoBoxedError + Payload,
    {
        let to_legacy = ColdOrHotToLegacyAdapter::new(self.context.clone());
        let enabled = to_legacy.wrap_cold(&action.enabled().producer());

        let action = action.clone();
        let command = LegacyCommand::with_enabled(enabled, move |input: Value| {
            match serde_json::from_value::<I>(input) {
                Ok(input) => to_legacy.wrap_cold(&action.apply(input)),
                Err(err) => {
                    tracing::warn!(error = %err, "Command input did not decode");
                    LegacySignal::error(BridgeError::decode::<I>(&err).into_boxed_error())
                }
            }
        });
        command.set_allows_concurrent_execution(self.allows_concurrent_execution);
        command
    }
}
