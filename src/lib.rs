//! Streambridge - adapters between a legacy and a typed reactive model
//!
//! The legacy model carries dynamically-typed JSON values and boxed
//! `(domain, code)` errors through creation-block signals and commands. The
//! typed model carries statically-typed values and errors through hot
//! signals, cold producers, properties and actions. The adapters in
//! [`bridge`] convert in both directions while preserving hot/cold
//! semantics, disposal, and enabled/executing state.

mod bag;

pub mod boxing;
pub mod bridge;
pub mod config;
pub mod context;
pub mod disposable;
pub mod error;
pub mod legacy;
pub mod typed;

pub use boxing::{BoxedError, IntoBoxedError, LegacyCompatibleError, to_boxed_error};
pub use bridge::{
    ActionToCommandAdapter, Bridge, ColdOrHotToLegacyAdapter, CommandToActionAdapter, HotToColdAdapter, Startable,
    Subscribable,
};
pub use config::{BridgeConfig, CommandConfig, ContextKind};
pub use context::{ContextRef, ExecutionContext, Immediate, SerialQueue};
pub use disposable::{Disposable, DisposeOnDrop};
pub use error::{BRIDGE_ERROR_DOMAIN, BridgeError, Result};
pub use legacy::{LegacyCommand, LegacyEvent, LegacySignal, LegacySubject, LegacySubscriber, Replay};
pub use typed::{Action, ActionError, Event, MutableProperty, Never, Observer, Property, Signal, SignalProducer};
