//! Change propagation into Result blocks
//!
//! After every committed mutation the controller re-extracts all chains and
//! compares them with the chains of the previous pass.
//!
//! # Key Concepts
//!
//! - **Change guard**: identical chain sets mean nothing to do, so repeated
//!   notifications for the same graph perform zero writes
//! - **Incremental evaluation**: only chains that are new or differ from the
//!   previous pass are evaluated
//! - **Write suppression**: a Result block already holding the outcome is
//!   not written again
//! - **Invalidation**: after the whole graph is replaced the previous chains
//!   say nothing about the stored values, so the next pass checks every chain
//! - **Single pass**: Result blocks never feed a chain, so writing them can't
//!   change any chain and one pass always reaches a fixed point

use serde::{Deserialize, Serialize};

use crate::chain::{extract_chains, Chain};
use crate::config::EngineConfig;
use crate::evaluator::Evaluator;
use crate::types::{BlockId, Graph};

/// A value written into a Result block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultWrite {
    pub block_id: BlockId,
    pub value: String,
}

/// Summary of one propagation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationReport {
    /// Number of chains in the graph after the pass
    pub chain_count: usize,
    /// Whether the chain set differed from the previous pass
    pub changed: bool,
    /// Writes performed, in order
    pub writes: Vec<ResultWrite>,
}

impl PropagationReport {
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }
}

/// Keeps Result block values consistent with the graph
#[derive(Debug, Clone)]
pub struct PropagationController {
    /// Chains seen by the previous pass
    previous: Vec<Chain>,
    /// Set when `previous` no longer describes the graph's stored values
    invalidated: bool,
    evaluator: Evaluator,
    reset_disconnected: bool,
}

impl Default for PropagationController {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl PropagationController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            previous: Vec::new(),
            invalidated: false,
            evaluator: Evaluator::from_config(config),
            reset_disconnected: config.reset_disconnected_results,
        }
    }

    /// Chains computed by the most recent pass
    pub fn chains(&self) -> &[Chain] {
        &self.previous
    }

    /// Force the next pass to evaluate every chain and reconcile every Result
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Run one pass after a mutation has been committed to `graph`
    pub fn on_commit(&mut self, graph: &mut Graph) -> PropagationReport {
        let chains = extract_chains(&graph.blocks, &graph.connections);
        let full_pass = std::mem::take(&mut self.invalidated);

        if !full_pass && chains == self.previous {
            log::debug!("Chains unchanged ({}), skipping propagation", chains.len());
            return PropagationReport {
                chain_count: chains.len(),
                changed: false,
                writes: Vec::new(),
            };
        }

        let changed = chains != self.previous;
        let mut writes = Vec::new();

        for chain in chains
            .iter()
            .filter(|c| full_pass || !self.previous.contains(c))
        {
            let outcome = self.evaluator.evaluate(&chain.tokens);
            log::debug!(
                "Chain for '{}' {:?} => {}",
                chain.result_block_id,
                chain.tokens,
                outcome
            );
            if graph.write_result_value(&chain.result_block_id, outcome.as_str()) {
                writes.push(ResultWrite {
                    block_id: chain.result_block_id.clone(),
                    value: outcome.as_str().to_string(),
                });
            }
        }

        if self.reset_disconnected {
            let stale: Vec<BlockId> = if full_pass {
                graph
                    .result_blocks()
                    .map(|b| b.id.clone())
                    .filter(|id| !chains.iter().any(|c| &c.result_block_id == id))
                    .collect()
            } else {
                self.previous
                    .iter()
                    .map(|p| p.result_block_id.clone())
                    .filter(|id| !chains.iter().any(|c| &c.result_block_id == id))
                    .collect()
            };

            for block_id in stale {
                if graph.write_result_value(&block_id, "") {
                    writes.push(ResultWrite {
                        block_id,
                        value: String::new(),
                    });
                }
            }
        }

        log::debug!(
            "Propagated {} chains with {} writes",
            chains.len(),
            writes.len()
        );

        self.previous = chains;
        PropagationReport {
            chain_count: self.previous.len(),
            changed,
            writes,
        }
    }
}
