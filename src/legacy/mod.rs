//! Legacy reactive model.
//!
//! Values are dynamically typed (`serde_json::Value`) and errors are boxed
//! `(domain, code)` pairs. A [`LegacySignal`] built from a creation block
//! re-runs the block for every subscription, while a [`LegacySubject`] is a
//! single hot source multicast to everyone attached. [`LegacyCommand`] gates
//! work on a boolean enabled stream and hands out one signal per execution.

pub mod command;
pub mod signal;
pub mod subject;
pub mod subscriber;

pub use command::{COMMAND_ERROR_DOMAIN, COMMAND_NOT_ENABLED, LegacyCommand};
pub use signal::LegacySignal;
pub use subject::{LegacySubject, Replay};
pub use subscriber::{LegacyEvent, LegacySubscriber};
