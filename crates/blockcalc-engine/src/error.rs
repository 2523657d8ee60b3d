//! Error types for the calculator engine

use thiserror::Error;

use crate::types::{BlockId, BlockType, ConnectionId};
use crate::validation::ConnectionRejection;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur when mutating or configuring the engine
///
/// Evaluation problems are not errors: they surface as the `NA` value on
/// the affected Result block.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No block with this ID exists in the graph
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    /// No connection with this ID exists in the graph
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// The connection validator refused a candidate edge
    #[error("Connection rejected: {0}")]
    ConnectionRejected(#[from] ConnectionRejection),

    /// Only Primitive blocks accept user-entered values
    #[error("Block '{block_id}' of type {block_type} is not editable")]
    NotEditable {
        block_id: BlockId,
        block_type: BlockType,
    },

    /// An operator block was requested without a symbol
    #[error("Operator blocks require an operator symbol")]
    MissingOperatorSymbol,

    /// A drop payload named a block type that does not exist
    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),

    /// A token or payload named an operator that does not exist
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create an invalid configuration error with a message
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
