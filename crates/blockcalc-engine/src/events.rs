//! Event types for observing graph changes
//!
//! Events are sent from the engine to the rendering layer (or any consumer)
//! after every committed mutation and every Result write-back.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::types::{BlockId, BlockType, ConnectionId, Position};

/// Trait for receiving graph events
///
/// This abstracts over the transport mechanism (UI callback, channel, log)
/// so the engine can be hosted in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: GraphEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone, thiserror::Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

impl EventError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn channel_closed() -> Self {
        Self::new("Channel closed")
    }
}

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    /// A block was dropped onto the canvas
    #[serde(rename_all = "camelCase")]
    BlockAdded {
        block_id: BlockId,
        block_type: BlockType,
    },

    /// A block and its incident connections were deleted
    #[serde(rename_all = "camelCase")]
    BlockRemoved {
        block_id: BlockId,
        removed_connections: Vec<ConnectionId>,
    },

    /// A block was moved on the canvas
    #[serde(rename_all = "camelCase")]
    BlockMoved {
        block_id: BlockId,
        position: Position,
    },

    /// The user edited a Primitive block's value
    #[serde(rename_all = "camelCase")]
    ValueEdited { block_id: BlockId, value: String },

    /// A connection was accepted
    #[serde(rename_all = "camelCase")]
    ConnectionAdded {
        connection_id: ConnectionId,
        source: BlockId,
        target: BlockId,
    },

    /// A candidate connection was refused
    #[serde(rename_all = "camelCase")]
    ConnectionRejected {
        source: BlockId,
        target: BlockId,
        reason: String,
    },

    /// A connection was deleted
    #[serde(rename_all = "camelCase")]
    ConnectionRemoved { connection_id: ConnectionId },

    /// Chains were re-extracted after a mutation
    #[serde(rename_all = "camelCase")]
    ChainsRecomputed { chain_count: usize, changed: bool },

    /// A Result block received a new value
    #[serde(rename_all = "camelCase")]
    ResultUpdated { block_id: BlockId, value: String },
}

impl GraphEvent {
    /// Create a result update event
    pub fn result_updated(block_id: &str, value: &str) -> Self {
        Self::ResultUpdated {
            block_id: block_id.to_string(),
            value: value.to_string(),
        }
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: GraphEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<GraphEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of `ResultUpdated` events collected so far
    pub fn result_writes(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, GraphEvent::ResultUpdated { .. }))
            .count()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: GraphEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError::new("Event buffer poisoned"))?
            .push(event);
        Ok(())
    }
}
