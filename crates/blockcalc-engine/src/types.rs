//! Core types for calculator graphs
//!
//! These types define the blocks (nodes) and connections (edges) of a
//! calculator canvas. Field names serialize in the camelCase shape the
//! canvas layer exchanges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::constants;
use crate::error::{EngineError, Result};

/// Unique identifier for a block
pub type BlockId = String;

/// Unique identifier for a connection
pub type ConnectionId = String;

/// Identifier of a port on a block
pub type HandleId = String;

/// The three kinds of block, without their payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Numeric input entered by the user
    Primitive,
    /// Binary arithmetic operator
    Operator,
    /// Display sink for a computed chain
    Result,
}

impl BlockType {
    /// Whether blocks of this type expose an output handle
    pub fn has_output(&self) -> bool {
        match self {
            BlockType::Primitive | BlockType::Operator => true,
            BlockType::Result => false,
        }
    }

    /// Lowercase name used in drop payloads and generated IDs
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Primitive => "primitive",
            BlockType::Operator => "operator",
            BlockType::Result => "result",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primitive" => Ok(BlockType::Primitive),
            "operator" => Ok(BlockType::Operator),
            "result" => Ok(BlockType::Result),
            _ => Err(EngineError::UnknownBlockType(s.to_string())),
        }
    }
}

/// Supported binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorSymbol {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "×", alias = "*", alias = "x", alias = "X")]
    Multiply,
    #[serde(rename = "/", alias = "÷")]
    Divide,
}

impl OperatorSymbol {
    /// All operators, in palette order
    pub const ALL: [OperatorSymbol; 4] = [
        OperatorSymbol::Add,
        OperatorSymbol::Subtract,
        OperatorSymbol::Multiply,
        OperatorSymbol::Divide,
    ];

    /// Canonical display symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorSymbol::Add => "+",
            OperatorSymbol::Subtract => "-",
            OperatorSymbol::Multiply => "×",
            OperatorSymbol::Divide => "/",
        }
    }

    /// Apply the operator to two operands
    ///
    /// Returns `None` for division by zero.
    pub fn apply(&self, lhs: f64, rhs: f64) -> Option<f64> {
        match self {
            OperatorSymbol::Add => Some(lhs + rhs),
            OperatorSymbol::Subtract => Some(lhs - rhs),
            OperatorSymbol::Multiply => Some(lhs * rhs),
            OperatorSymbol::Divide if rhs == 0.0 => None,
            OperatorSymbol::Divide => Some(lhs / rhs),
        }
    }
}

impl fmt::Display for OperatorSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatorSymbol {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "+" => Ok(OperatorSymbol::Add),
            "-" => Ok(OperatorSymbol::Subtract),
            "×" | "*" | "x" | "X" => Ok(OperatorSymbol::Multiply),
            "/" | "÷" => Ok(OperatorSymbol::Divide),
            _ => Err(EngineError::UnknownOperator(s.to_string())),
        }
    }
}

/// Position on the canvas
///
/// Owned by the rendering layer; the engine only stores it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Create a position from canvas coordinates
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Kind-specific payload of a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// User-entered number; empty means unset
    Primitive {
        #[serde(default)]
        value: String,
    },
    /// Binary operator
    Operator { symbol: OperatorSymbol },
    /// Computed result, `NA`, or empty when nothing feeds it
    Result {
        #[serde(default)]
        value: String,
    },
}

impl BlockKind {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockKind::Primitive { .. } => BlockType::Primitive,
            BlockKind::Operator { .. } => BlockType::Operator,
            BlockKind::Result { .. } => BlockType::Result,
        }
    }
}

/// A block instance on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Unique identifier for this block
    pub id: BlockId,
    /// Kind and kind-specific data
    #[serde(flatten)]
    pub kind: BlockKind,
    /// Position in the UI
    #[serde(default)]
    pub position: Position,
}

impl Block {
    /// Create an unset Primitive block
    pub fn primitive(id: impl Into<BlockId>, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: BlockKind::Primitive {
                value: String::new(),
            },
            position,
        }
    }

    /// Create an Operator block
    pub fn operator(id: impl Into<BlockId>, symbol: OperatorSymbol, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: BlockKind::Operator { symbol },
            position,
        }
    }

    /// Create an empty Result block
    pub fn result(id: impl Into<BlockId>, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: BlockKind::Result {
                value: String::new(),
            },
            position,
        }
    }

    /// Set the value of a Primitive or Result block (builder style)
    ///
    /// Has no effect on Operator blocks.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        match &mut self.kind {
            BlockKind::Primitive { value: v } | BlockKind::Result { value: v } => *v = value.into(),
            BlockKind::Operator { .. } => {}
        }
        self
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    /// Stored value for Primitive and Result blocks
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Primitive { value } | BlockKind::Result { value } => Some(value),
            BlockKind::Operator { .. } => None,
        }
    }

    /// Operator symbol for Operator blocks
    pub fn symbol(&self) -> Option<OperatorSymbol> {
        match &self.kind {
            BlockKind::Operator { symbol } => Some(*symbol),
            _ => None,
        }
    }

    /// The string the rendering layer shows for this block
    pub fn display_value(&self) -> String {
        match &self.kind {
            BlockKind::Primitive { value } | BlockKind::Result { value } => value.clone(),
            BlockKind::Operator { symbol } => symbol.as_str().to_string(),
        }
    }
}

/// Arrowhead style for a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    #[default]
    Arrow,
}

/// Visual marker carried by every accepted connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMarker {
    pub id: String,
    pub kind: MarkerKind,
    pub color: String,
    pub width: f32,
    pub height: f32,
}

impl Default for EdgeMarker {
    fn default() -> Self {
        Self {
            id: constants::marker::ID.to_string(),
            kind: MarkerKind::Arrow,
            color: constants::marker::COLOR.to_string(),
            width: constants::marker::SIZE,
            height: constants::marker::SIZE,
        }
    }
}

/// A connection between two blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Source block ID
    pub source: BlockId,
    /// Source handle (`None` means the default output)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<HandleId>,
    /// Target block ID
    pub target: BlockId,
    /// Target handle (`None` means the default input)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<HandleId>,
    /// Marker drawn at the target end
    #[serde(default)]
    pub marker: EdgeMarker,
}

impl Connection {
    /// Effective source handle
    pub fn source_port(&self) -> &str {
        self.source_handle
            .as_deref()
            .unwrap_or(constants::handles::OUTPUT)
    }

    /// Effective target handle
    pub fn target_port(&self) -> &str {
        self.target_handle
            .as_deref()
            .unwrap_or(constants::handles::INPUT)
    }
}

/// A user-drawn candidate edge, not yet accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub source: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<HandleId>,
    pub target: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<HandleId>,
}

impl ConnectionRequest {
    /// Request a connection between the default handles of two blocks
    pub fn new(source: impl Into<BlockId>, target: impl Into<BlockId>) -> Self {
        Self {
            source: source.into(),
            source_handle: None,
            target: target.into(),
            target_handle: None,
        }
    }

    /// Set explicit handles
    pub fn with_handles(
        mut self,
        source_handle: impl Into<HandleId>,
        target_handle: impl Into<HandleId>,
    ) -> Self {
        self.source_handle = Some(source_handle.into());
        self.target_handle = Some(target_handle.into());
        self
    }

    /// Requested source handle, defaulting to the block's output
    pub fn source_port(&self) -> &str {
        self.source_handle
            .as_deref()
            .unwrap_or(constants::handles::OUTPUT)
    }

    /// Requested target handle, defaulting to the block's input
    pub fn target_port(&self) -> &str {
        self.target_handle
            .as_deref()
            .unwrap_or(constants::handles::INPUT)
    }

    /// Turn an accepted request into a connection with the given ID
    pub fn into_connection(self, id: impl Into<ConnectionId>) -> Connection {
        Connection {
            id: id.into(),
            source: self.source,
            source_handle: self.source_handle,
            target: self.target,
            target_handle: self.target_handle,
            marker: EdgeMarker::default(),
        }
    }
}

/// A complete calculator graph snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Blocks on the canvas
    #[serde(rename = "nodes", default)]
    pub blocks: Vec<Block>,
    /// Connections between blocks
    #[serde(rename = "edges", default)]
    pub connections: Vec<Connection>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot exchanged with the canvas layer
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize a snapshot for the canvas layer
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Find a block by ID
    pub fn find_block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Find a block by ID (mutable)
    pub fn find_block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// Find a connection by ID
    pub fn find_connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Get connections coming into a block
    pub fn incoming<'a>(&'a self, block_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.target == block_id)
    }

    /// Get connections going out of a block
    pub fn outgoing<'a>(&'a self, block_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.source == block_id)
    }

    /// Result blocks in canvas order
    pub fn result_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| b.block_type() == BlockType::Result)
    }

    /// Overwrite a Result block's value
    ///
    /// Returns `true` only when the stored value actually changed.
    pub(crate) fn write_result_value(&mut self, block_id: &str, new_value: &str) -> bool {
        match self.find_block_mut(block_id).map(|b| &mut b.kind) {
            Some(BlockKind::Result { value }) if value != new_value => {
                *value = new_value.to_string();
                true
            }
            _ => false,
        }
    }
}
