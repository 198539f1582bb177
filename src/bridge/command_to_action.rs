//! Legacy command to typed action.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::hot_to_cold::HotToColdAdapter;
use crate::context::ContextRef;
use crate::disposable::Disposable;
use crate::error::BridgeError;
use crate::legacy::LegacyCommand;
use crate::typed::{Action, MutableProperty, Observer, Payload, SignalProducer};

/// Exposes a legacy command as a typed action.
///
/// The action's enabled state follows the command's enabled signal,
/// delivered through the context, so it is eventually consistent with the
/// command. Each start executes the command once and adapts that
/// execution's result signal.
#[derive(Debug, Clone, Default)]
pub struct CommandToActionAdapter {
    context: ContextRef,
}

impl CommandToActionAdapter {
    pub fn new(context: ContextRef) -> Self {
        Self { context }
    }

    pub fn as_action<I, O, E>(&self, command: &LegacyCommand) -> Action<I, O, E>
    where
        I: Serialize + Payload,
        O: DeserializeOwned + Payload,
        E: From<BridgeError> + Payload,
    {
        let enabled = MutableProperty::new(command.is_enabled());
        let sink = enabled.clone();
        let context = self.context.clone();
        let mirror = command.enabled().subscribe_next(move |value| match value.as_bool() {
            Some(flag) => {
                let sink = sink.clone();
                context.run(move || sink.set(flag));
            }
            None => tracing::warn!(value = %value, "Ignoring non-boolean command enabled value"),
        });

        let command = command.clone();
        let hot_to_cold = HotToColdAdapter::new(self.context.clone());
        Action::with_enabled(enabled.read_only(), move |input: I| {
            let value = match serde_json::to_value(&input) {
                Ok(value) => value,
                Err(err) => return SignalProducer::failed(E::from(BridgeError::encode(&err))),
            };
            let command = command.clone();
            let hot_to_cold = hot_to_cold.clone();
            SignalProducer::<O, E>::new(move |observer: Observer<O, E>, lifetime: &Disposable| {
                tracing::debug!(input = %value, "Executing legacy command for action");
                let execution = command.execute(value.clone());
                lifetime.add_disposable(hot_to_cold.wrap::<O, E>(&execution).start(observer));
            })
        })
        .bind_lifetime(mirror)
    }
}
