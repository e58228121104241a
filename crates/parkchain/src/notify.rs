//! Notification gateway and dispatch.
//!
//! Delivering a message to a user (push provider, device tokens, e-mail) is
//! owned by an external service reached through [`NotificationGateway`].
//! [`Dispatcher`] decides *how* notifications are handed to the gateway:
//!
//! - [`DispatchMode::Background`]: spawned on the tokio runtime and not
//!   awaited. The request that changed a relation returns immediately, and a
//!   cancelled or failed delivery never rolls that change back.
//! - [`DispatchMode::Inline`]: awaited in order before returning. Used by the
//!   CLI and by tests that assert on what was sent.
//!
//! In both modes delivery is best-effort: gateway failures are logged and
//! never surfaced to the caller.

use crate::domain::{Notification, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a notification gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider rejected or lost the message.
    #[error("delivery to {recipient} failed: {reason}")]
    Delivery {
        /// Intended recipient
        recipient: UserId,
        /// Provider message
        reason: String,
    },

    /// The provider could not be reached at all.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Delivers a single message to a single user.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver `notification` to its recipient.
    async fn dispatch(&self, notification: &Notification) -> Result<(), GatewayError>;
}

/// A gateway that only logs each notification.
///
/// Stands in for a push provider in the CLI and in deployments without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogGateway;

#[async_trait]
impl NotificationGateway for LogGateway {
    async fn dispatch(&self, notification: &Notification) -> Result<(), GatewayError> {
        tracing::info!(
            recipient = %notification.recipient,
            kind = %notification.kind,
            car = %notification.context.subject_car,
            counterpart = %notification.context.counterpart_car,
            "Notification sent"
        );
        Ok(())
    }
}

/// How notifications are handed to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Fire-and-forget on a spawned task
    #[default]
    Background,

    /// Awaited before the request returns
    Inline,
}

/// Hands batches of notifications to a gateway.
#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<dyn NotificationGateway>,
    mode: DispatchMode,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("gateway", &"<dyn NotificationGateway>")
            .field("mode", &self.mode)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher for `gateway`
    pub fn new(gateway: Arc<dyn NotificationGateway>, mode: DispatchMode) -> Self {
        Self { gateway, mode }
    }

    /// Send a batch of notifications.
    ///
    /// Returns once the batch is delivered (inline) or handed off
    /// (background). Never fails.
    pub async fn send(&self, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }

        match self.mode {
            DispatchMode::Inline => deliver(self.gateway.as_ref(), &notifications).await,
            DispatchMode::Background => {
                let gateway = Arc::clone(&self.gateway);
                tokio::spawn(async move {
                    deliver(gateway.as_ref(), &notifications).await;
                });
            }
        }
    }
}

async fn deliver(gateway: &dyn NotificationGateway, notifications: &[Notification]) {
    for notification in notifications {
        if let Err(e) = gateway.dispatch(notification).await {
            tracing::warn!(
                recipient = %notification.recipient,
                kind = %notification.kind,
                error = %e,
                "Notification delivery failed"
            );
        }
    }
}

// ========== Test Utilities ==========

/// A gateway that records every notification it receives.
///
/// Optionally fails for a chosen recipient, to exercise the best-effort
/// delivery path.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct RecordingGateway {
    sent: std::sync::Mutex<Vec<Notification>>,
    failing_recipient: Option<UserId>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingGateway {
    /// Create a gateway that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway that rejects messages for `recipient`
    pub fn failing_for(recipient: UserId) -> Self {
        Self {
            sent: std::sync::Mutex::default(),
            failing_recipient: Some(recipient),
        }
    }

    /// Everything delivered so far, in delivery order
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn dispatch(&self, notification: &Notification) -> Result<(), GatewayError> {
        if self.failing_recipient == Some(notification.recipient) {
            return Err(GatewayError::Delivery {
                recipient: notification.recipient,
                reason: "device token expired".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(*notification);
        }
        Ok(())
    }
}
