//! Fluent builder for calculator graphs
//!
//! Provides a compact API for constructing graphs programmatically, mostly
//! for fixtures and host-side scripted setups. Connections added here are
//! not validated; run [`crate::validation::validate_graph`] on the result
//! if the input is untrusted.

use crate::types::{Block, BlockId, ConnectionRequest, Graph, OperatorSymbol, Position};

/// Horizontal spacing used for auto-placed blocks
const AUTO_SPACING: f64 = 150.0;

/// Fluent builder for constructing calculator graphs
///
/// # Example
///
/// ```
/// use blockcalc_engine::{GraphBuilder, OperatorSymbol};
///
/// let graph = GraphBuilder::new()
///     .primitive("a", "5")
///     .operator("plus", OperatorSymbol::Add)
///     .primitive("b", "3")
///     .result("sum")
///     .connect("a", "plus")
///     .connect("plus", "b")
///     .connect("b", "sum")
///     .build();
///
/// assert_eq!(graph.blocks.len(), 4);
/// assert_eq!(graph.connections.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
    edge_counter: usize,
}

impl GraphBuilder {
    /// Create a new graph builder
    pub fn new() -> Self {
        Self::default()
    }

    fn next_position(&self) -> Position {
        Position::new(self.graph.blocks.len() as f64 * AUTO_SPACING, 0.0)
    }

    /// Add a Primitive block holding `value` (empty string for unset)
    pub fn primitive(mut self, id: impl Into<BlockId>, value: impl Into<String>) -> Self {
        let block = Block::primitive(id, self.next_position()).with_value(value);
        self.graph.blocks.push(block);
        self
    }

    /// Add an Operator block
    pub fn operator(mut self, id: impl Into<BlockId>, symbol: OperatorSymbol) -> Self {
        let block = Block::operator(id, symbol, self.next_position());
        self.graph.blocks.push(block);
        self
    }

    /// Add an empty Result block
    pub fn result(mut self, id: impl Into<BlockId>) -> Self {
        let block = Block::result(id, self.next_position());
        self.graph.blocks.push(block);
        self
    }

    /// Move the most recently added block
    ///
    /// Must be called immediately after adding a block.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        if let Some(block) = self.graph.blocks.last_mut() {
            block.position = Position::new(x, y);
        }
        self
    }

    /// Connect the default handles of two blocks (auto-generates connection ID)
    pub fn connect(self, source: impl Into<BlockId>, target: impl Into<BlockId>) -> Self {
        self.push(ConnectionRequest::new(source, target))
    }

    /// Connect two blocks through explicit handles
    pub fn connect_handles(
        self,
        source: impl Into<BlockId>,
        source_handle: impl Into<String>,
        target: impl Into<BlockId>,
        target_handle: impl Into<String>,
    ) -> Self {
        self.push(ConnectionRequest::new(source, target).with_handles(source_handle, target_handle))
    }

    /// Add a connection with an explicit ID
    pub fn connect_with_id(
        mut self,
        id: impl Into<String>,
        source: impl Into<BlockId>,
        target: impl Into<BlockId>,
    ) -> Self {
        let conn = ConnectionRequest::new(source, target).into_connection(id);
        self.graph.connections.push(conn);
        self
    }

    fn push(mut self, request: ConnectionRequest) -> Self {
        self.edge_counter += 1;
        let conn = request.into_connection(format!("edge-{}", self.edge_counter));
        self.graph.connections.push(conn);
        self
    }

    /// Build the graph without validation
    pub fn build(self) -> Graph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockType;

    #[test]
    fn test_auto_ids_and_positions() {
        let graph = GraphBuilder::new()
            .primitive("a", "1")
            .operator("op", OperatorSymbol::Add)
            .at(10.0, 20.0)
            .primitive("b", "")
            .connect("a", "op")
            .connect("op", "b")
            .build();

        assert_eq!(graph.blocks[0].position, Position::new(0.0, 0.0));
        assert_eq!(graph.blocks[1].position, Position::new(10.0, 20.0));
        assert_eq!(graph.blocks[2].position, Position::new(300.0, 0.0));
        assert_eq!(graph.blocks[2].value(), Some(""));

        let ids: Vec<_> = graph.connections.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["edge-1", "edge-2"]);
    }

    #[test]
    fn test_explicit_handles_and_ids() {
        let graph = GraphBuilder::new()
            .primitive("a", "1")
            .result("r")
            .connect_handles("a", "b", "r", "in")
            .connect_with_id("custom", "a", "r")
            .build();

        assert_eq!(graph.connections[0].source_handle.as_deref(), Some("b"));
        assert_eq!(graph.connections[1].id, "custom");
        assert_eq!(graph.find_block("r").unwrap().block_type(), BlockType::Result);
    }
}
