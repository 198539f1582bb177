//! Adapters between the legacy and typed models.
//!
//! Every adapter is built with a [`ContextRef`] and delivers all forwarded
//! events through it. [`Bridge`] bundles one context with the adapters and
//! offers one-call shortcuts for the common conversions.

pub mod action_to_command;
pub mod capability;
pub mod command_to_action;
pub mod hot_to_cold;
pub mod to_legacy;

pub use action_to_command::ActionToCommandAdapter;
pub use capability::{Startable, Subscribable};
pub use command_to_action::CommandToActionAdapter;
pub use hot_to_cold::HotToColdAdapter;
pub use to_legacy::ColdOrHotToLegacyAdapter;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;

use crate::boxing::IntoBoxedError;
use crate::config::BridgeConfig;
use crate::context::ContextRef;
use crate::error::{BridgeError, Result};
use crate::legacy::{LegacyCommand, LegacySignal};
use crate::typed::{Action, Payload, Signal, SignalProducer};

/// One execution context plus the adapters that use it.
#[derive(Debug, Clone, Default)]
pub struct Bridge {
    context: ContextRef,
    allows_concurrent_execution: bool,
}

impl Bridge {
    pub fn new(context: ContextRef) -> Self {
        Self {
            context,
            allows_concurrent_execution: false,
        }
    }

    /// Bridge delivering on the caller's turn.
    pub fn immediate() -> Self {
        Self::new(ContextRef::immediate())
    }

    /// Build the context a config asks for.
    ///
    /// A serial context runs on `handle`, or on the current runtime when no
    /// handle is given.
    pub fn from_config(config: &BridgeConfig, handle: Option<&Handle>) -> Result<Self> {
        let context = config.build_context(handle)?;
        tracing::debug!(context = context.label(), "Bridge configured");
        Ok(Self {
            context,
            allows_concurrent_execution: config.command.allows_concurrent_execution,
        })
    }

    pub fn context(&self) -> &ContextRef {
        &self.context
    }

    pub fn hot_to_cold(&self) -> HotToColdAdapter {
        HotToColdAdapter::new(self.context.clone())
    }

    pub fn to_legacy(&self) -> ColdOrHotToLegacyAdapter {
        ColdOrHotToLegacyAdapter::new(self.context.clone())
    }

    pub fn command_to_action(&self) -> CommandToActionAdapter {
        CommandToActionAdapter::new(self.context.clone())
    }

    pub fn action_to_command(&self) -> ActionToCommandAdapter {
        ActionToCommandAdapter::new(self.context.clone()).with_concurrent_execution(self.allows_concurrent_execution)
    }

    pub fn producer_from_legacy<T, E>(&self, signal: &LegacySignal) -> SignalProducer<T, E>
    where
        T: DeserializeOwned + Payload,
        E: From<BridgeError> + Payload,
    {
        self.hot_to_cold().wrap(signal)
    }

    pub fn legacy_from_signal<T, E>(&self, signal: &Signal<T, E>) -> LegacySignal
    where
        T: Serialize + Payload,
        E: IntoBoxedError + Payload,
    {
        self.to_legacy().wrap_hot(signal)
    }

    pub fn legacy_from_producer<T, E>(&self, producer: &SignalProducer<T, E>) -> LegacySignal
    where
        T: Serialize + Payload,
        E: IntoBoxedError + Payload,
    {
        self.to_legacy().wrap_cold(producer)
    }

    pub fn as_action<I, O, E>(&self, command: &LegacyCommand) -> Action<I, O, E>
    where
        I: Serialize + Payload,
        O: DeserializeOwned + Payload,
        E: From<BridgeError> + Payload,
    {
        self.command_to_action().as_action(command)
    }

    pub fn as_legacy_command<I, O, E>(&self, action: &Action<I, O, E>) -> LegacyCommand
    where
        I: DeserializeOwned + Payload,
        O: Serialize + Payload,
        E: IntoBoxedError + Payload,
    {
        self.action_to_command().as_legacy_command(action)
    }
}
