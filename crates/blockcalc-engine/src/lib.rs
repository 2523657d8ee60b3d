//! Blockcalc Engine - Expression-graph core for a visual block calculator
//!
//! Users drop Primitive, Operator and Result blocks on a canvas and wire
//! them into chains. This crate keeps the graph consistent and keeps every
//! Result block showing the value of the chain feeding it. It supports:
//!
//! - Connection validation (pairing rules, single-use handles, no cycles)
//! - Chain extraction by walking upstream from each Result block
//! - Strict left-to-right evaluation with `NA` for anything unusable
//! - Change-guarded propagation that never rewrites an unchanged value
//!
//! # Architecture
//!
//! - `GraphStore`: single owner of blocks and connections
//! - `PropagationController`: re-extracts chains and writes Result values
//! - `CalculatorEngine`: facade used by UI handlers, emits `GraphEvent`s
//! - `EventSink`: observer for the rendering layer (not tied to any UI)
//!
//! # Example
//!
//! ```
//! use blockcalc_engine::{
//!     BlockTemplate, CalculatorEngine, ConnectionRequest, OperatorSymbol, Position,
//! };
//!
//! let mut engine = CalculatorEngine::default();
//! let a = engine.drop_block(BlockTemplate::Primitive, Position::default()).unwrap();
//! let add = BlockTemplate::Operator(OperatorSymbol::Add);
//! let plus = engine.drop_block(add, Position::default()).unwrap();
//! let b = engine.drop_block(BlockTemplate::Primitive, Position::default()).unwrap();
//! let result = engine.drop_block(BlockTemplate::Result, Position::default()).unwrap();
//!
//! engine.connect(ConnectionRequest::new(&a, &plus)).unwrap();
//! engine.connect(ConnectionRequest::new(&plus, &b)).unwrap();
//! engine.connect(ConnectionRequest::new(&b, &result)).unwrap();
//! engine.edit_value(&a, "5").unwrap();
//! engine.edit_value(&b, "3").unwrap();
//!
//! assert_eq!(engine.display_value(&result).as_deref(), Some("8"));
//! ```

pub mod builder;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod palette;
pub mod propagation;
pub mod store;
pub mod types;
pub mod validation;

// Re-export key types
pub use builder::GraphBuilder;
pub use chain::{extract_chains, Chain};
pub use config::EngineConfig;
pub use engine::CalculatorEngine;
pub use error::{EngineError, Result};
pub use evaluator::{evaluate, format_number, Evaluator, Outcome};
pub use events::{EventError, EventSink, GraphEvent, NullEventSink, VecEventSink};
pub use palette::{palette, BlockTemplate, PaletteEntry};
pub use propagation::{PropagationController, PropagationReport, ResultWrite};
pub use store::GraphStore;
pub use types::{
    Block, BlockId, BlockKind, BlockType, Connection, ConnectionId, ConnectionRequest, Graph,
    OperatorSymbol, Position,
};
pub use validation::{
    check_connection, is_valid_connection, validate_graph, ConnectionRejection, ValidationError,
};
