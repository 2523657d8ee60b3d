//! Block templates offered by the palette
//!
//! The drop handler turns a palette payload into a [`BlockTemplate`], and
//! the engine instantiates the template at the drop position.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::{Block, BlockId, BlockType, OperatorSymbol, Position};

/// What kind of block to create on drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "symbol", rename_all = "snake_case")]
pub enum BlockTemplate {
    Primitive,
    Operator(OperatorSymbol),
    Result,
}

impl BlockTemplate {
    /// Parse a drop payload such as `("operator", Some("+"))`
    ///
    /// Operator payloads must carry a symbol; other kinds ignore it.
    pub fn parse(kind: &str, symbol: Option<&str>) -> Result<Self> {
        match kind.parse::<BlockType>()? {
            BlockType::Primitive => Ok(BlockTemplate::Primitive),
            BlockType::Result => Ok(BlockTemplate::Result),
            BlockType::Operator => {
                let symbol = symbol.ok_or(EngineError::MissingOperatorSymbol)?;
                Ok(BlockTemplate::Operator(symbol.parse()?))
            }
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            BlockTemplate::Primitive => BlockType::Primitive,
            BlockTemplate::Operator(_) => BlockType::Operator,
            BlockTemplate::Result => BlockType::Result,
        }
    }

    /// Label shown in the palette
    pub fn label(&self) -> String {
        match self {
            BlockTemplate::Primitive => "Primitive".to_string(),
            BlockTemplate::Operator(symbol) => symbol.as_str().to_string(),
            BlockTemplate::Result => "Result".to_string(),
        }
    }

    /// Create a fresh block from this template
    pub fn instantiate(&self, id: impl Into<BlockId>, position: Position) -> Block {
        match self {
            BlockTemplate::Primitive => Block::primitive(id, position),
            BlockTemplate::Operator(symbol) => Block::operator(id, *symbol, position),
            BlockTemplate::Result => Block::result(id, position),
        }
    }
}

/// One draggable palette item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub label: String,
    pub template: BlockTemplate,
}

/// All draggable items, in display order
pub fn palette() -> Vec<PaletteEntry> {
    std::iter::once(BlockTemplate::Primitive)
        .chain(OperatorSymbol::ALL.into_iter().map(BlockTemplate::Operator))
        .chain(std::iter::once(BlockTemplate::Result))
        .map(|template| PaletteEntry {
            label: template.label(),
            template,
        })
        .collect()
}
