//! Connection and graph validation
//!
//! `check_connection` gates interactive edge drawing: it decides whether a
//! single candidate may join the current graph. `validate_graph` inspects an
//! externally supplied snapshot and reports every structural problem.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::config::constants::handles;
use crate::types::{Block, BlockId, BlockType, Connection, ConnectionId, ConnectionRequest, Graph};

/// Why a candidate connection was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionRejection {
    /// An endpoint does not exist
    #[error("Block '{0}' does not exist")]
    UnknownBlock(BlockId),

    /// Source and target are the same block
    #[error("Cannot connect block '{0}' to itself")]
    SelfLoop(BlockId),

    /// Result blocks have no output handle
    #[error("Result block '{0}' cannot be a connection source")]
    ResultAsSource(BlockId),

    /// Chains must alternate operand and operator
    #[error("Cannot connect two {0} blocks")]
    SameKind(BlockType),

    /// A Result must not sit directly next to an Operator
    #[error("Operator and Result blocks cannot be adjacent")]
    OperatorResultAdjacent,

    /// The block has no port with this name
    #[error("Block '{block_id}' has no handle '{handle}'")]
    UnknownHandle { block_id: BlockId, handle: String },

    /// The source handle already feeds another block
    #[error("Output '{handle}' of block '{block_id}' is already connected")]
    SourceHandleInUse { block_id: BlockId, handle: String },

    /// The target handle already receives from another block
    #[error("Input '{handle}' of block '{block_id}' is already connected")]
    TargetHandleInUse { block_id: BlockId, handle: String },

    /// The target can already reach the source
    #[error("Connection would create a cycle")]
    WouldCreateCycle,
}

/// Decide whether a candidate connection is structurally legal
///
/// Pure predicate over the current snapshot. Rules are checked in a fixed
/// order and the first failure is returned.
pub fn check_connection(
    candidate: &ConnectionRequest,
    blocks: &[Block],
    connections: &[Connection],
) -> Result<(), ConnectionRejection> {
    let find = |id: &str| blocks.iter().find(|b| b.id == id);

    let source = find(&candidate.source)
        .ok_or_else(|| ConnectionRejection::UnknownBlock(candidate.source.clone()))?;
    let target = find(&candidate.target)
        .ok_or_else(|| ConnectionRejection::UnknownBlock(candidate.target.clone()))?;

    if source.id == target.id {
        return Err(ConnectionRejection::SelfLoop(source.id.clone()));
    }

    check_pairing(source, target)?;

    let source_port = candidate.source_port();
    let target_port = candidate.target_port();
    check_ports(source, source_port, target, target_port)?;

    if connections
        .iter()
        .any(|c| c.source == source.id && c.source_port() == source_port)
    {
        return Err(ConnectionRejection::SourceHandleInUse {
            block_id: source.id.clone(),
            handle: source_port.to_string(),
        });
    }

    if connections
        .iter()
        .any(|c| c.target == target.id && c.target_port() == target_port)
    {
        return Err(ConnectionRejection::TargetHandleInUse {
            block_id: target.id.clone(),
            handle: target_port.to_string(),
        });
    }

    if would_create_cycle(connections, &source.id, &target.id) {
        return Err(ConnectionRejection::WouldCreateCycle);
    }

    Ok(())
}

/// Boolean form of [`check_connection`] for gating connection drawing
pub fn is_valid_connection(
    candidate: &ConnectionRequest,
    blocks: &[Block],
    connections: &[Connection],
) -> bool {
    check_connection(candidate, blocks, connections).is_ok()
}

/// Kind compatibility between two blocks, in source -> target direction
fn check_pairing(source: &Block, target: &Block) -> Result<(), ConnectionRejection> {
    match (source.block_type(), target.block_type()) {
        (BlockType::Result, _) => Err(ConnectionRejection::ResultAsSource(source.id.clone())),
        (BlockType::Primitive, BlockType::Primitive) => {
            Err(ConnectionRejection::SameKind(BlockType::Primitive))
        }
        (BlockType::Operator, BlockType::Operator) => {
            Err(ConnectionRejection::SameKind(BlockType::Operator))
        }
        (BlockType::Operator, BlockType::Result) => {
            Err(ConnectionRejection::OperatorResultAdjacent)
        }
        (BlockType::Primitive, BlockType::Operator)
        | (BlockType::Operator, BlockType::Primitive)
        | (BlockType::Primitive, BlockType::Result) => Ok(()),
    }
}

/// Every block exposes exactly one input (`in`) and, unless it is a Result,
/// one output (`out`)
fn check_ports(
    source: &Block,
    source_port: &str,
    target: &Block,
    target_port: &str,
) -> Result<(), ConnectionRejection> {
    if !source.block_type().has_output() || source_port != handles::OUTPUT {
        return Err(ConnectionRejection::UnknownHandle {
            block_id: source.id.clone(),
            handle: source_port.to_string(),
        });
    }
    if target_port != handles::INPUT {
        return Err(ConnectionRejection::UnknownHandle {
            block_id: target.id.clone(),
            handle: target_port.to_string(),
        });
    }
    Ok(())
}

/// Depth-first walk from `to` along outgoing connections looking for `from`
fn would_create_cycle(connections: &[Connection], from: &str, to: &str) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![to];

    while let Some(current) = stack.pop() {
        if current == from {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        for conn in connections {
            if conn.source == current {
                stack.push(&conn.target);
            }
        }
    }

    false
}

/// Structural problem found in a graph snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Cycle detected in the graph
    #[error("Cycle detected in graph")]
    CycleDetected,

    /// A connection references a block that does not exist
    #[error("Connection '{connection_id}' references unknown block '{block_id}'")]
    UnknownBlock {
        connection_id: ConnectionId,
        block_id: BlockId,
    },

    /// A connection joins two kinds of block that may not be adjacent
    #[error("Connection '{connection_id}' joins {source_type} to {target_type}")]
    IllegalPairing {
        connection_id: ConnectionId,
        source_type: BlockType,
        target_type: BlockType,
    },

    /// A connection loops back to its own block
    #[error("Connection '{connection_id}' connects block '{block_id}' to itself")]
    SelfLoop {
        connection_id: ConnectionId,
        block_id: BlockId,
    },

    /// A connection uses a handle the block does not have
    #[error("Connection '{connection_id}' uses unknown handle '{handle}' on block '{block_id}'")]
    UnknownHandle {
        connection_id: ConnectionId,
        block_id: BlockId,
        handle: String,
    },

    /// An output handle feeds more than one connection
    #[error("Output '{handle}' of block '{block_id}' has {count} connections")]
    FanOut {
        block_id: BlockId,
        handle: String,
        count: usize,
    },

    /// An input handle receives more than one connection
    #[error("Input '{handle}' of block '{block_id}' has {count} connections")]
    FanIn {
        block_id: BlockId,
        handle: String,
        count: usize,
    },
}

/// Validate a whole graph snapshot
///
/// Returns all validation errors found (not just the first).
pub fn validate_graph(graph: &Graph) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_connection_endpoints(graph, &mut errors);
    validate_handle_occupancy(graph, &mut errors);
    detect_cycles(graph, &mut errors);

    errors
}

/// Check that every connection references existing blocks of compatible kinds
fn validate_connection_endpoints(graph: &Graph, errors: &mut Vec<ValidationError>) {
    let blocks: HashMap<&str, &Block> = graph.blocks.iter().map(|b| (b.id.as_str(), b)).collect();

    for conn in &graph.connections {
        let source = blocks.get(conn.source.as_str());
        let target = blocks.get(conn.target.as_str());

        if source.is_none() {
            errors.push(ValidationError::UnknownBlock {
                connection_id: conn.id.clone(),
                block_id: conn.source.clone(),
            });
        }
        if target.is_none() {
            errors.push(ValidationError::UnknownBlock {
                connection_id: conn.id.clone(),
                block_id: conn.target.clone(),
            });
        }

        let (Some(source), Some(target)) = (source, target) else {
            continue;
        };

        if source.id == target.id {
            errors.push(ValidationError::SelfLoop {
                connection_id: conn.id.clone(),
                block_id: source.id.clone(),
            });
        } else if check_pairing(source, target).is_err() {
            errors.push(ValidationError::IllegalPairing {
                connection_id: conn.id.clone(),
                source_type: source.block_type(),
                target_type: target.block_type(),
            });
        }
    }
}

/// Check handle names and the one-connection-per-handle invariant
///
/// Occupancy is counted per block rather than per handle name, so a
/// made-up handle cannot hide a second connection.
fn validate_handle_occupancy(graph: &Graph, errors: &mut Vec<ValidationError>) {
    let mut outputs: HashMap<&str, usize> = HashMap::new();
    let mut inputs: HashMap<&str, usize> = HashMap::new();

    for conn in &graph.connections {
        if conn.source_port() != handles::OUTPUT {
            errors.push(ValidationError::UnknownHandle {
                connection_id: conn.id.clone(),
                block_id: conn.source.clone(),
                handle: conn.source_port().to_string(),
            });
        }
        if conn.target_port() != handles::INPUT {
            errors.push(ValidationError::UnknownHandle {
                connection_id: conn.id.clone(),
                block_id: conn.target.clone(),
                handle: conn.target_port().to_string(),
            });
        }

        *outputs.entry(conn.source.as_str()).or_insert(0) += 1;
        *inputs.entry(conn.target.as_str()).or_insert(0) += 1;
    }

    let mut fan_out: Vec<_> = outputs.into_iter().filter(|(_, n)| *n > 1).collect();
    fan_out.sort();
    for (block_id, count) in fan_out {
        errors.push(ValidationError::FanOut {
            block_id: block_id.to_string(),
            handle: handles::OUTPUT.to_string(),
            count,
        });
    }

    let mut fan_in: Vec<_> = inputs.into_iter().filter(|(_, n)| *n > 1).collect();
    fan_in.sort();
    for (block_id, count) in fan_in {
        errors.push(ValidationError::FanIn {
            block_id: block_id.to_string(),
            handle: handles::INPUT.to_string(),
            count,
        });
    }
}

/// Detect cycles using Kahn's algorithm (topological sort)
fn detect_cycles(graph: &Graph, errors: &mut Vec<ValidationError>) {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for block in &graph.blocks {
        in_degree.insert(&block.id, 0);
    }
    for conn in &graph.connections {
        if let Some(deg) = in_degree.get_mut(conn.target.as_str()) {
            *deg += 1;
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut visited = 0;
    while let Some(block_id) = queue.pop_front() {
        visited += 1;
        for conn in &graph.connections {
            if conn.source == block_id {
                if let Some(deg) = in_degree.get_mut(conn.target.as_str()) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(&conn.target);
                    }
                }
            }
        }
    }

    if visited < graph.blocks.len() {
        errors.push(ValidationError::CycleDetected);
    }
}
