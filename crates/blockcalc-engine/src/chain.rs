//! Chain extraction
//!
//! Walks backward from every Result block to the root operand feeding it,
//! producing the ordered token sequence (operand, operator, operand, ...)
//! that the evaluator reduces.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::constants;
use crate::types::{Block, BlockId, BlockKind, BlockType, Connection};

/// Ordered tokens feeding one Result block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    /// The Result block this chain feeds
    pub result_block_id: BlockId,
    /// Tokens in start-to-end order
    pub tokens: Vec<String>,
}

/// Extract the chain feeding every connected Result block
///
/// Result blocks without exactly one usable incoming connection are absent
/// from the output. Chains appear in the order their Result blocks appear
/// in `blocks`.
pub fn extract_chains(blocks: &[Block], connections: &[Connection]) -> Vec<Chain> {
    let by_id: HashMap<&str, &Block> = blocks.iter().map(|b| (b.id.as_str(), b)).collect();

    let mut incoming: HashMap<&str, Vec<&Connection>> = HashMap::new();
    for conn in connections {
        incoming.entry(conn.target.as_str()).or_default().push(conn);
    }

    let walker = ChainWalker { by_id, incoming };

    blocks
        .iter()
        .filter(|b| b.block_type() == BlockType::Result)
        .filter_map(|result| walker.trace(result))
        .collect()
}

struct ChainWalker<'a> {
    by_id: HashMap<&'a str, &'a Block>,
    incoming: HashMap<&'a str, Vec<&'a Connection>>,
}

impl<'a> ChainWalker<'a> {
    /// The block feeding `block_id`, if there is exactly one and it exists
    fn upstream(&self, block_id: &str) -> Option<&'a Block> {
        match self.incoming.get(block_id).map(Vec::as_slice) {
            Some([conn]) => self.by_id.get(conn.source.as_str()).copied(),
            _ => None,
        }
    }

    fn trace(&self, result: &Block) -> Option<Chain> {
        let mut current = self.upstream(&result.id)?;
        let mut tokens = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();

        loop {
            // Guards against cyclic snapshots that bypassed the validator
            if !visited.insert(current.id.as_str()) {
                break;
            }

            match &current.kind {
                BlockKind::Primitive { value } if value.trim().is_empty() => {
                    tokens.push(constants::NA.to_string());
                }
                BlockKind::Primitive { value } => tokens.push(value.clone()),
                BlockKind::Operator { symbol } => tokens.push(symbol.as_str().to_string()),
                // Result blocks are sinks and never contribute tokens
                BlockKind::Result { .. } => break,
            }

            match self.upstream(&current.id) {
                Some(next) => current = next,
                None => break,
            }
        }

        tokens.reverse();
        Some(Chain {
            result_block_id: result.id.clone(),
            tokens,
        })
    }
}
