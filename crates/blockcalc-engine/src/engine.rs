//! Calculator engine facade
//!
//! This is the surface the UI event handlers talk to. Every mutation is
//! committed to the [`GraphStore`], subscribers are notified, and then the
//! [`PropagationController`] runs synchronously so Result values are settled
//! before the call returns.

use std::sync::Arc;

use crate::chain::Chain;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{EventSink, GraphEvent};
use crate::palette::BlockTemplate;
use crate::propagation::{PropagationController, PropagationReport};
use crate::store::GraphStore;
use crate::types::{BlockId, Connection, ConnectionId, ConnectionRequest, Graph, Position};
use crate::validation::{is_valid_connection, validate_graph};

/// Expression-graph engine for a single canvas
pub struct CalculatorEngine {
    config: EngineConfig,
    store: GraphStore,
    propagation: PropagationController,
    subscribers: Vec<Arc<dyn EventSink>>,
    last_report: PropagationReport,
}

impl Default for CalculatorEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CalculatorEngine {
    /// Create an engine with an empty graph
    pub fn new(config: EngineConfig) -> Self {
        let store = match &config.id_prefix {
            Some(prefix) => GraphStore::with_id_prefix(prefix.clone()),
            None => GraphStore::new(),
        };
        Self {
            propagation: PropagationController::new(&config),
            config,
            store,
            subscribers: Vec::new(),
            last_report: PropagationReport::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register an observer notified of every committed change
    pub fn subscribe(&mut self, sink: Arc<dyn EventSink>) {
        self.subscribers.push(sink);
    }

    /// Current graph snapshot
    pub fn graph(&self) -> &Graph {
        self.store.graph()
    }

    /// Chains computed by the most recent propagation pass
    pub fn chains(&self) -> &[Chain] {
        self.propagation.chains()
    }

    /// Report of the most recent propagation pass
    pub fn last_report(&self) -> &PropagationReport {
        &self.last_report
    }

    /// The value the rendering layer should show for a block
    pub fn display_value(&self, block_id: &str) -> Option<String> {
        self.graph().find_block(block_id).map(|b| b.display_value())
    }

    /// Gate for interactive connection drawing
    pub fn is_valid_connection(&self, request: &ConnectionRequest) -> bool {
        let graph = self.graph();
        is_valid_connection(request, &graph.blocks, &graph.connections)
    }

    /// Create a block from a palette template at the drop position
    pub fn drop_block(&mut self, template: BlockTemplate, position: Position) -> Result<BlockId> {
        let block_id = self.store.add_block(template, position);
        self.emit(GraphEvent::BlockAdded {
            block_id: block_id.clone(),
            block_type: template.block_type(),
        });
        self.propagate();
        Ok(block_id)
    }

    /// Delete a block and its incident connections
    pub fn remove_block(&mut self, block_id: &str) -> Result<Vec<Connection>> {
        let removed = self.store.remove_block(block_id)?;
        self.emit(GraphEvent::BlockRemoved {
            block_id: block_id.to_string(),
            removed_connections: removed.iter().map(|c| c.id.clone()).collect(),
        });
        self.propagate();
        Ok(removed)
    }

    /// Move a block on the canvas
    pub fn move_block(&mut self, block_id: &str, position: Position) -> Result<()> {
        self.store.move_block(block_id, position)?;
        self.emit(GraphEvent::BlockMoved {
            block_id: block_id.to_string(),
            position,
        });
        self.propagate();
        Ok(())
    }

    /// Commit a user edit to a Primitive block
    pub fn edit_value(&mut self, block_id: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        if self.store.set_primitive_value(block_id, value.clone())? {
            self.emit(GraphEvent::ValueEdited {
                block_id: block_id.to_string(),
                value,
            });
        }
        self.propagate();
        Ok(())
    }

    /// Validate and commit a user-drawn connection
    ///
    /// On rejection the graph is left unchanged.
    pub fn connect(&mut self, request: ConnectionRequest) -> Result<ConnectionId> {
        let (source, target) = (request.source.clone(), request.target.clone());

        match self.store.add_connection(request) {
            Ok(connection_id) => {
                self.emit(GraphEvent::ConnectionAdded {
                    connection_id: connection_id.clone(),
                    source,
                    target,
                });
                self.propagate();
                Ok(connection_id)
            }
            Err(EngineError::ConnectionRejected(reason)) => {
                log::debug!("Rejected connection {} -> {}: {}", source, target, reason);
                self.emit(GraphEvent::ConnectionRejected {
                    source,
                    target,
                    reason: reason.to_string(),
                });
                Err(EngineError::ConnectionRejected(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a connection
    pub fn disconnect(&mut self, connection_id: &str) -> Result<Connection> {
        let removed = self.store.remove_connection(connection_id)?;
        self.emit(GraphEvent::ConnectionRemoved {
            connection_id: connection_id.to_string(),
        });
        self.propagate();
        Ok(removed)
    }

    /// Replace the whole graph with a snapshot from the canvas layer
    ///
    /// Structural problems are logged but do not block the snapshot; they
    /// degrade to terminated walks and `NA` results. Result values carried by
    /// the snapshot are not trusted and are reconciled with their chains.
    pub fn sync_snapshot(&mut self, graph: Graph) -> PropagationReport {
        for problem in validate_graph(&graph) {
            log::warn!("Snapshot problem: {}", problem);
        }
        self.store.replace(graph);
        self.propagation.invalidate();
        self.propagate()
    }

    /// Run a propagation pass and notify subscribers of every write
    pub fn propagate(&mut self) -> PropagationReport {
        let report = self.propagation.on_commit(self.store.graph_mut());

        self.emit(GraphEvent::ChainsRecomputed {
            chain_count: report.chain_count,
            changed: report.changed,
        });
        for write in &report.writes {
            self.emit(GraphEvent::result_updated(&write.block_id, &write.value));
        }

        self.last_report = report.clone();
        report
    }

    fn emit(&self, event: GraphEvent) {
        for sink in &self.subscribers {
            if let Err(e) = sink.send(event.clone()) {
                log::warn!("Failed to deliver graph event: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventError, VecEventSink};
    use crate::types::OperatorSymbol;
    use crate::validation::ConnectionRejection;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Drop blocks in order and wire them into a single chain ending in a Result
    fn build_chain(engine: &mut CalculatorEngine, items: &[BlockTemplate]) -> Vec<BlockId> {
        let ids: Vec<BlockId> = items
            .iter()
            .enumerate()
            .map(|(i, t)| {
                engine
                    .drop_block(*t, Position::new(i as f64 * 150.0, 0.0))
                    .unwrap()
            })
            .collect();
        for pair in ids.windows(2) {
            engine
                .connect(ConnectionRequest::new(&pair[0], &pair[1]))
                .unwrap();
        }
        ids
    }

    fn value(engine: &CalculatorEngine, id: &str) -> String {
        engine.display_value(id).unwrap_or_default()
    }

    #[test]
    fn test_scenario_addition() {
        init_logging();
        let mut engine = CalculatorEngine::default();
        let ids = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Add),
                BlockTemplate::Primitive,
                BlockTemplate::Result,
            ],
        );
        engine.edit_value(&ids[0], "5").unwrap();
        engine.edit_value(&ids[2], "3").unwrap();

        assert_eq!(engine.chains()[0].tokens, vec!["5", "+", "3"]);
        assert_eq!(value(&engine, &ids[3]), "8");
    }

    #[test]
    fn test_scenario_unset_operand() {
        let mut engine = CalculatorEngine::default();
        let ids = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Divide),
                BlockTemplate::Primitive,
                BlockTemplate::Result,
            ],
        );
        engine.edit_value(&ids[2], "2").unwrap();

        assert_eq!(engine.chains()[0].tokens, vec!["NA", "/", "2"]);
        assert_eq!(value(&engine, &ids[3]), "NA");
    }

    #[test]
    fn test_scenario_division_by_zero() {
        let mut engine = CalculatorEngine::default();
        let ids = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Divide),
                BlockTemplate::Primitive,
                BlockTemplate::Result,
            ],
        );
        engine.edit_value(&ids[0], "10").unwrap();
        engine.edit_value(&ids[2], "0").unwrap();

        assert_eq!(value(&engine, &ids[3]), "NA");

        engine.edit_value(&ids[2], "4").unwrap();
        assert_eq!(value(&engine, &ids[3]), "2.5");
    }

    #[test]
    fn test_scenario_left_to_right() {
        let mut engine = CalculatorEngine::default();
        let ids = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Add),
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Multiply),
                BlockTemplate::Primitive,
                BlockTemplate::Result,
            ],
        );
        engine.edit_value(&ids[0], "2").unwrap();
        engine.edit_value(&ids[2], "2").unwrap();
        engine.edit_value(&ids[4], "3").unwrap();

        assert_eq!(engine.chains()[0].tokens, vec!["2", "+", "2", "×", "3"]);
        assert_eq!(value(&engine, &ids[5]), "12");
    }

    #[test]
    fn test_scenario_primitive_to_primitive_rejected() {
        let mut engine = CalculatorEngine::default();
        let a = engine
            .drop_block(BlockTemplate::Primitive, Position::default())
            .unwrap();
        let b = engine
            .drop_block(BlockTemplate::Primitive, Position::default())
            .unwrap();
        let before = engine.graph().connections.clone();

        assert!(!engine.is_valid_connection(&ConnectionRequest::new(&a, &b)));
        let err = engine.connect(ConnectionRequest::new(&a, &b)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ConnectionRejected(ConnectionRejection::SameKind(_))
        ));
        assert_eq!(engine.graph().connections, before);
    }

    #[test]
    fn test_scenario_cycle_rejected() {
        let mut engine = CalculatorEngine::default();
        let ids = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Add),
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Subtract),
            ],
        );
        let edges_before = engine.graph().connections.len();

        // ids[0] already reaches ids[3]; closing the loop must fail
        let err = engine
            .connect(ConnectionRequest::new(&ids[3], &ids[0]))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::ConnectionRejected(ConnectionRejection::WouldCreateCycle)
        ));
        assert_eq!(engine.graph().connections.len(), edges_before);
    }

    #[test]
    fn test_repropagation_is_idempotent() {
        let sink = Arc::new(VecEventSink::new());
        let mut engine = CalculatorEngine::default();
        engine.subscribe(sink.clone());

        let ids = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Add),
                BlockTemplate::Primitive,
                BlockTemplate::Result,
            ],
        );
        engine.edit_value(&ids[0], "1").unwrap();
        engine.edit_value(&ids[2], "1").unwrap();
        assert_eq!(value(&engine, &ids[3]), "2");

        sink.clear();
        let report = engine.propagate();
        assert_eq!(report.write_count(), 0);
        assert!(!report.changed);
        assert_eq!(sink.result_writes(), 0);

        // Editing to the same value is not a change either
        engine.edit_value(&ids[0], "1").unwrap();
        assert_eq!(sink.result_writes(), 0);
    }

    #[test]
    fn test_each_write_is_reported_once() {
        let sink = Arc::new(VecEventSink::new());
        let mut engine = CalculatorEngine::default();
        engine.subscribe(sink.clone());

        let ids = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Subtract),
                BlockTemplate::Primitive,
                BlockTemplate::Result,
            ],
        );
        sink.clear();

        engine.edit_value(&ids[0], "9").unwrap();
        engine.edit_value(&ids[2], "4").unwrap();

        let writes: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                GraphEvent::ResultUpdated { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        // "NA" was already shown while ids[2] was unset, so only the final value is written
        assert_eq!(writes, vec!["5"]);
        assert_eq!(engine.last_report().write_count(), 1);
    }

    #[test]
    fn test_disconnect_and_remove_reset_results() {
        let mut engine = CalculatorEngine::default();
        let a = engine
            .drop_block(BlockTemplate::Primitive, Position::default())
            .unwrap();
        let r = engine
            .drop_block(BlockTemplate::Result, Position::default())
            .unwrap();
        engine.edit_value(&a, "7").unwrap();
        let edge = engine.connect(ConnectionRequest::new(&a, &r)).unwrap();
        assert_eq!(value(&engine, &r), "7");

        engine.disconnect(&edge).unwrap();
        assert_eq!(value(&engine, &r), "");

        engine.connect(ConnectionRequest::new(&a, &r)).unwrap();
        assert_eq!(value(&engine, &r), "7");

        let removed = engine.remove_block(&a).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(engine.graph().connections.is_empty());
        assert_eq!(value(&engine, &r), "");
    }

    #[test]
    fn test_sibling_chains_independent() {
        let mut engine = CalculatorEngine::default();
        let bad = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Divide),
                BlockTemplate::Primitive,
                BlockTemplate::Result,
            ],
        );
        let good = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Multiply),
                BlockTemplate::Primitive,
                BlockTemplate::Result,
            ],
        );
        engine.edit_value(&bad[0], "1").unwrap();
        engine.edit_value(&bad[2], "0").unwrap();
        engine.edit_value(&good[0], "6").unwrap();
        engine.edit_value(&good[2], "7").unwrap();

        assert_eq!(value(&engine, &bad[3]), "NA");
        assert_eq!(value(&engine, &good[3]), "42");
    }

    #[test]
    fn test_only_primitives_are_editable() {
        let mut engine = CalculatorEngine::default();
        let op = engine
            .drop_block(
                BlockTemplate::Operator(OperatorSymbol::Add),
                Position::default(),
            )
            .unwrap();
        let r = engine
            .drop_block(BlockTemplate::Result, Position::default())
            .unwrap();

        assert!(matches!(
            engine.edit_value(&op, "1"),
            Err(EngineError::NotEditable { .. })
        ));
        assert!(matches!(
            engine.edit_value(&r, "1"),
            Err(EngineError::NotEditable { .. })
        ));
        assert_eq!(value(&engine, &op), "+");
    }

    #[test]
    fn test_move_block_performs_no_writes() {
        let sink = Arc::new(VecEventSink::new());
        let mut engine = CalculatorEngine::default();
        engine.subscribe(sink.clone());
        let a = engine
            .drop_block(BlockTemplate::Primitive, Position::default())
            .unwrap();
        sink.clear();

        engine.move_block(&a, Position::new(40.0, 80.0)).unwrap();
        assert_eq!(engine.last_report().write_count(), 0);
        assert!(matches!(
            sink.events()[0],
            GraphEvent::BlockMoved { .. }
        ));
        assert_eq!(
            engine.graph().find_block(&a).unwrap().position,
            Position::new(40.0, 80.0)
        );
    }

    #[test]
    fn test_sync_snapshot() {
        let json = r#"{
            "nodes": [
                {"id": "a", "type": "primitive", "value": "6"},
                {"id": "op", "type": "operator", "symbol": "/"},
                {"id": "b", "type": "primitive", "value": "4"},
                {"id": "r", "type": "result"}
            ],
            "edges": [
                {"id": "e1", "source": "a", "target": "op"},
                {"id": "e2", "source": "op", "target": "b"},
                {"id": "e3", "source": "b", "target": "r"}
            ]
        }"#;
        let mut engine = CalculatorEngine::default();

        let report = engine.sync_snapshot(Graph::from_json(json).unwrap());
        assert_eq!(report.write_count(), 1);
        assert_eq!(value(&engine, "r"), "1.5");

        let same = engine.graph().clone();
        let report = engine.sync_snapshot(same);
        assert_eq!(report.write_count(), 0);
    }

    #[test]
    fn test_resync_overrides_stale_result_values() {
        let snapshot = |result: &str| {
            format!(
                r#"{{
                    "nodes": [
                        {{"id": "a", "type": "primitive", "value": "6"}},
                        {{"id": "op", "type": "operator", "symbol": "/"}},
                        {{"id": "b", "type": "primitive", "value": "4"}},
                        {{"id": "r", "type": "result"{}}}
                    ],
                    "edges": [
                        {{"id": "e1", "source": "a", "target": "op"}},
                        {{"id": "e2", "source": "op", "target": "b"}},
                        {{"id": "e3", "source": "b", "target": "r"}}
                    ]
                }}"#,
                result
            )
        };
        let mut engine = CalculatorEngine::default();
        engine.sync_snapshot(Graph::from_json(&snapshot("")).unwrap());
        assert_eq!(value(&engine, "r"), "1.5");

        let report = engine.sync_snapshot(Graph::from_json(&snapshot("")).unwrap());
        assert_eq!(report.write_count(), 1);
        assert_eq!(value(&engine, "r"), "1.5");

        let report =
            engine.sync_snapshot(Graph::from_json(&snapshot(r#", "value": "999""#)).unwrap());
        assert_eq!(report.write_count(), 1);
        assert_eq!(value(&engine, "r"), "1.5");
    }

    #[test]
    fn test_made_up_handle_cannot_split_a_live_chain() {
        let mut engine = CalculatorEngine::default();
        let ids = build_chain(
            &mut engine,
            &[
                BlockTemplate::Primitive,
                BlockTemplate::Operator(OperatorSymbol::Add),
                BlockTemplate::Primitive,
                BlockTemplate::Result,
            ],
        );
        engine.edit_value(&ids[0], "5").unwrap();
        engine.edit_value(&ids[2], "3").unwrap();
        let extra = engine
            .drop_block(BlockTemplate::Primitive, Position::default())
            .unwrap();

        let err = engine
            .connect(ConnectionRequest::new(&extra, &ids[1]).with_handles("out", "in-2"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::ConnectionRejected(ConnectionRejection::UnknownHandle { .. })
        ));
        assert_eq!(engine.graph().incoming(&ids[1]).count(), 1);
        assert_eq!(value(&engine, &ids[3]), "8");
        assert_eq!(engine.chains()[0].tokens, vec!["5", "+", "3"]);
    }

    #[test]
    fn test_id_prefix_from_config() {
        let mut engine = CalculatorEngine::new(EngineConfig::default().with_id_prefix("c1-"));
        let id = engine
            .drop_block(BlockTemplate::Result, Position::default())
            .unwrap();
        assert!(id.starts_with("c1-result-"));
    }

    struct ClosedSink;

    impl EventSink for ClosedSink {
        fn send(&self, _event: GraphEvent) -> std::result::Result<(), EventError> {
            Err(EventError::channel_closed())
        }
    }

    #[test]
    fn test_failing_sink_does_not_abort_mutation() {
        let mut engine = CalculatorEngine::default();
        engine.subscribe(Arc::new(ClosedSink));

        let a = engine
            .drop_block(BlockTemplate::Primitive, Position::default())
            .unwrap();
        engine.edit_value(&a, "3").unwrap();
        assert_eq!(value(&engine, &a), "3");
    }

    #[test]
    fn test_no_accepted_connection_set_contains_a_cycle() {
        let mut engine = CalculatorEngine::default();
        let templates = [
            BlockTemplate::Primitive,
            BlockTemplate::Operator(OperatorSymbol::Add),
            BlockTemplate::Primitive,
            BlockTemplate::Operator(OperatorSymbol::Multiply),
            BlockTemplate::Result,
        ];
        let ids: Vec<_> = templates
            .iter()
            .map(|t| engine.drop_block(*t, Position::default()).unwrap())
            .collect();

        // Try every ordered pair; the validator decides which survive
        for source in &ids {
            for target in &ids {
                let _ = engine.connect(ConnectionRequest::new(source, target));
            }
        }

        let errors = validate_graph(engine.graph());
        assert!(errors.is_empty(), "Expected no errors, got: {:?}", errors);
    }
}
