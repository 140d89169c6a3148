// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Domain Events
//
// In-memory event streaming over tokio broadcast channels. Carries tenant
// lifecycle notifications to the lifecycle listener and reconciliation
// outcomes to observers (CLI `run`, tests).
//
// Lifecycle events are additionally sent on a dedicated channel read by the
// listener, so a burst of reconciliation outcomes never evicts them.
//
// Events are not persisted; a restart relies on the startup reconciliation pass.

use crate::domain::events::{ReconciliationEvent, TenantLifecycleEvent};
use crate::domain::tenant::TenantId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TenantLifecycle(TenantLifecycleEvent),
    Reconciliation(ReconciliationEvent),
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
    lifecycle: Arc<broadcast::Sender<TenantLifecycleEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity.
    /// Capacity determines how many events can be buffered before slow
    /// subscribers start lagging; it applies to each channel.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let (lifecycle, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
            lifecycle: Arc::new(lifecycle),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish a tenant lifecycle event
    pub fn publish_tenant_event(&self, event: TenantLifecycleEvent) {
        if self.lifecycle.send(event.clone()).is_err() {
            debug!("No lifecycle subscribers listening to event");
        }
        self.publish(DomainEvent::TenantLifecycle(event));
    }

    /// Publish a reconciliation outcome
    pub fn publish_reconciliation_event(&self, event: ReconciliationEvent) {
        self.publish(DomainEvent::Reconciliation(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        // send() only fails when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to tenant lifecycle events only
    pub fn subscribe_lifecycle(&self) -> LifecycleReceiver {
        LifecycleReceiver {
            receiver: self.lifecycle.subscribe(),
        }
    }

    /// Subscribe to reconciliation outcomes for a single tenant
    pub fn subscribe_tenant(&self, tenant_id: TenantId) -> TenantReconciliationReceiver {
        TenantReconciliationReceiver {
            receiver: self.sender.subscribe(),
            tenant_id,
        }
    }

    /// Get the number of active subscribers to all domain events
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the number of active lifecycle-only subscribers
    pub fn lifecycle_subscriber_count(&self) -> usize {
        self.lifecycle.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for the dedicated tenant lifecycle channel
pub struct LifecycleReceiver {
    receiver: broadcast::Receiver<TenantLifecycleEvent>,
}

impl LifecycleReceiver {
    pub async fn recv(&mut self) -> Result<TenantLifecycleEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }
}

/// Receiver for one tenant's reconciliation outcomes (filtered)
pub struct TenantReconciliationReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    tenant_id: TenantId,
}

impl TenantReconciliationReceiver {
    /// Receive the next reconciliation event for the subscribed tenant,
    /// skipping everything else
    pub async fn recv(&mut self) -> Result<ReconciliationEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;

            if let DomainEvent::Reconciliation(event) = event {
                if event.tenant_id() == &self.tenant_id {
                    return Ok(event);
                }
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
