#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in otactl
//!
//! This crate provides the single-writer channel carrying session state,
//! progress, and failure information from the install controller to any
//! number of observers. All observable output from the library crates goes
//! through events - no direct logging or printing outside the consumer.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: Events grouped by functional domain
//!   (Install, Staging, General)
//! - **Unified `EventEmitter` trait**: Single, consistent API for all event
//!   emissions
//! - **Tracing integration**: Every event knows its log level and target so
//!   consumers can bridge the stream into structured logging

pub mod events;
pub use events::{AppEvent, FailureContext, GeneralEvent, InstallEvent, StagingEvent};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel with the `AppEvent` system
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout the otactl system
///
/// This trait provides a single, consistent API for emitting events
/// regardless of whether you have a raw `EventSender` or a struct that
/// contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if the receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit an operation started event
    fn emit_operation_started(&self, operation: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::OperationStarted {
            operation: operation.into(),
        }));
    }

    /// Emit an operation completed event
    fn emit_operation_completed(&self, operation: impl Into<String>, success: bool) {
        self.emit(AppEvent::General(GeneralEvent::OperationCompleted {
            operation: operation.into(),
            success,
        }));
    }

    /// Emit an operation failed event
    fn emit_operation_failed(&self, operation: impl Into<String>, failure: FailureContext) {
        self.emit(AppEvent::General(GeneralEvent::OperationFailed {
            operation: operation.into(),
            failure,
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

/// Bridge an event into the `tracing` ecosystem at its preferred level.
pub fn log_event(event: &AppEvent) {
    let source = event.log_target();
    match event.log_level() {
        tracing::Level::ERROR => tracing::error!(source, event = ?event, "application event"),
        tracing::Level::WARN => tracing::warn!(source, event = ?event, "application event"),
        tracing::Level::INFO => tracing::info!(source, event = ?event, "application event"),
        tracing::Level::DEBUG => tracing::debug!(source, event = ?event, "application event"),
        tracing::Level::TRACE => tracing::trace!(source, event = ?event, "application event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_delivers_in_order() {
        let (tx, mut rx) = channel();
        tx.emit_operation_started("staging");
        tx.emit_operation_completed("staging", true);

        match rx.try_recv() {
            Ok(AppEvent::General(GeneralEvent::OperationStarted { operation })) => {
                assert_eq!(operation, "staging");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.try_recv() {
            Ok(AppEvent::General(GeneralEvent::OperationCompleted { success, .. })) => {
                assert!(success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn emit_without_receiver_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit_debug("nobody listening");
    }
}
