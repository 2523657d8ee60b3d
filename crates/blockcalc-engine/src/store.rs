//! Graph store
//!
//! Single owner of every block and connection on the canvas. All user
//! mutations go through here; connection requests are gated by the
//! validator so the one-path invariant always holds for store-built graphs.

use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::palette::BlockTemplate;
use crate::types::{
    BlockId, BlockKind, BlockType, Connection, ConnectionId, ConnectionRequest, Graph, Position,
};
use crate::validation::check_connection;

/// Generates collision-resistant, optionally namespaced IDs
#[derive(Debug, Clone, Default)]
struct IdGenerator {
    prefix: String,
}

impl IdGenerator {
    fn block_id(&self, block_type: BlockType) -> BlockId {
        format!("{}{}-{}", self.prefix, block_type, Uuid::new_v4())
    }

    fn connection_id(&self) -> ConnectionId {
        format!("{}edge-{}", self.prefix, Uuid::new_v4())
    }
}

/// Owner of the current graph
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    graph: Graph,
    ids: IdGenerator,
}

impl GraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose generated IDs start with `prefix`
    pub fn with_id_prefix(prefix: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(),
            ids: IdGenerator {
                prefix: prefix.into(),
            },
        }
    }

    /// Current graph snapshot
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Replace the whole graph, returning the previous one
    pub fn replace(&mut self, graph: Graph) -> Graph {
        std::mem::replace(&mut self.graph, graph)
    }

    /// Create a block from a template with a fresh ID
    pub fn add_block(&mut self, template: BlockTemplate, position: Position) -> BlockId {
        let id = self.ids.block_id(template.block_type());
        self.graph.blocks.push(template.instantiate(id.clone(), position));
        id
    }

    /// Delete a block together with every connection touching it
    pub fn remove_block(&mut self, block_id: &str) -> Result<Vec<Connection>> {
        let index = self
            .graph
            .blocks
            .iter()
            .position(|b| b.id == block_id)
            .ok_or_else(|| EngineError::BlockNotFound(block_id.to_string()))?;
        self.graph.blocks.remove(index);

        let (removed, kept): (Vec<Connection>, Vec<Connection>) =
            std::mem::take(&mut self.graph.connections)
                .into_iter()
                .partition(|c| c.source == block_id || c.target == block_id);
        self.graph.connections = kept;

        Ok(removed)
    }

    /// Move a block on the canvas
    pub fn move_block(&mut self, block_id: &str, position: Position) -> Result<()> {
        let block = self
            .graph
            .find_block_mut(block_id)
            .ok_or_else(|| EngineError::BlockNotFound(block_id.to_string()))?;
        block.position = position;
        Ok(())
    }

    /// Commit a user edit to a Primitive block
    ///
    /// Returns whether the stored value changed.
    pub fn set_primitive_value(
        &mut self,
        block_id: &str,
        new_value: impl Into<String>,
    ) -> Result<bool> {
        let block = self
            .graph
            .find_block_mut(block_id)
            .ok_or_else(|| EngineError::BlockNotFound(block_id.to_string()))?;

        match &mut block.kind {
            BlockKind::Primitive { value } => {
                let new_value = new_value.into();
                if *value == new_value {
                    return Ok(false);
                }
                *value = new_value;
                Ok(true)
            }
            other => Err(EngineError::NotEditable {
                block_id: block_id.to_string(),
                block_type: other.block_type(),
            }),
        }
    }

    /// Validate and commit a new connection
    pub fn add_connection(&mut self, request: ConnectionRequest) -> Result<ConnectionId> {
        check_connection(&request, &self.graph.blocks, &self.graph.connections)?;

        let id = self.ids.connection_id();
        self.graph.connections.push(request.into_connection(id.clone()));
        Ok(id)
    }

    /// Delete a connection
    pub fn remove_connection(&mut self, connection_id: &str) -> Result<Connection> {
        let index = self
            .graph
            .connections
            .iter()
            .position(|c| c.id == connection_id)
            .ok_or_else(|| EngineError::ConnectionNotFound(connection_id.to_string()))?;
        Ok(self.graph.connections.remove(index))
    }
}
