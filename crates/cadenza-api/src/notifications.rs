//! Notification delivery for governance events.
//!
//! Subscribes to the [`EventBus`] and delivers the rendered line of every
//! permission change to the log sink. Other governance events are traced at
//! debug level only.

use cadenza_core::{EventBus, EventEnvelope, ServerEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Subscribe now and deliver in a background task.
///
/// The task ends when every [`EventBus`] handle is dropped and returns the
/// number of notifications it delivered.
pub fn spawn_notification_dispatcher(events: &EventBus) -> JoinHandle<u64> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        let mut delivered = 0u64;
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    if deliver(&envelope) {
                        delivered += 1;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(
                        subsystem = "api",
                        component = "notifications",
                        missed = n,
                        "Notification dispatcher lagged"
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
        delivered
    })
}

fn deliver(envelope: &EventEnvelope) -> bool {
    match &envelope.payload {
        ServerEvent::TagPermissionChanged {
            tag,
            target_user_id,
            message: Some(message),
            ..
        } => {
            tracing::info!(
                subsystem = "api",
                component = "notifications",
                event_id = %envelope.event_id,
                tag = %tag,
                user_id = %target_user_id,
                "{}",
                message
            );
            true
        }
        _ => {
            tracing::debug!(
                subsystem = "api",
                component = "notifications",
                event_type = envelope.event_type,
                entity_id = %envelope.entity_id,
                "Governance event"
            );
            false
        }
    }
}
