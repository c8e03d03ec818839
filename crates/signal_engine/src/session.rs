use std::sync::Arc;

use core_types::{new_id, EngineError, Evaluation, Outcome};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{observe_decision, EngineConfig, SignalEngine};

/// Snapshot published after every tick or reset of one table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableEvent {
    pub table_id: String,
    /// Per-table sequence, starting at 1.
    pub seq: u64,
    pub ts_ms: i64,
    /// `None` for a reset.
    pub outcome: Option<Outcome>,
    pub evaluation: Evaluation,
}

#[derive(Clone)]
pub struct SnapshotBus {
    tx: broadcast::Sender<TableEvent>,
}

impl SnapshotBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(16));
        Self { tx }
    }

    /// Returns the number of receivers reached. Zero subscribers is not an error.
    pub fn publish(&self, event: TableEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                metrics::counter!("session.publish_unobserved").increment(1);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

struct TableSlot {
    engine: SignalEngine,
    seq: u64,
}

/// One engine per table; ticks on the same table are serialised by its lock.
pub struct TableRegistry {
    cfg: EngineConfig,
    tables: DashMap<String, Arc<Mutex<TableSlot>>>,
    bus: SnapshotBus,
}

impl TableRegistry {
    pub fn new(cfg: EngineConfig, bus_capacity: usize) -> Result<Self, EngineError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            tables: DashMap::new(),
            bus: SnapshotBus::new(bus_capacity),
        })
    }

    pub fn cfg(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn open_table(&self) -> String {
        let id = new_id();
        self.open_table_with_id(&id);
        id
    }

    /// Opening an existing id keeps its state.
    pub fn open_table_with_id(&self, table_id: &str) {
        self.tables.entry(table_id.to_string()).or_insert_with(|| {
            tracing::info!(table_id, "table opened");
            Arc::new(Mutex::new(TableSlot {
                engine: SignalEngine::build(self.cfg.clone()),
                seq: 0,
            }))
        });
    }

    pub fn close_table(&self, table_id: &str) -> bool {
        let removed = self.tables.remove(table_id).is_some();
        if removed {
            tracing::info!(table_id, "table closed");
        }
        removed
    }

    pub fn record(&self, table_id: &str, outcome: Outcome) -> Result<Evaluation, EngineError> {
        let table = self.slot(table_id)?;
        // Publish under the table lock so subscribers see this table's seq in order.
        let mut slot = table.lock();
        slot.engine.record_outcome(outcome);
        slot.seq += 1;
        let evaluation = slot.engine.evaluate();
        observe_decision(&evaluation);
        self.bus.publish(TableEvent {
            table_id: table_id.to_string(),
            seq: slot.seq,
            ts_ms: chrono::Utc::now().timestamp_millis(),
            outcome: Some(outcome),
            evaluation: evaluation.clone(),
        });
        Ok(evaluation)
    }

    pub fn record_symbol(&self, table_id: &str, raw: &str) -> Result<Evaluation, EngineError> {
        let outcome: Outcome = raw.parse()?;
        self.record(table_id, outcome)
    }

    pub fn reset(&self, table_id: &str) -> Result<Evaluation, EngineError> {
        let table = self.slot(table_id)?;
        let mut slot = table.lock();
        slot.engine.reset();
        slot.seq += 1;
        let evaluation = slot.engine.evaluate();
        self.bus.publish(TableEvent {
            table_id: table_id.to_string(),
            seq: slot.seq,
            ts_ms: chrono::Utc::now().timestamp_millis(),
            outcome: None,
            evaluation: evaluation.clone(),
        });
        Ok(evaluation)
    }

    pub fn evaluate(&self, table_id: &str) -> Result<Evaluation, EngineError> {
        let slot = self.slot(table_id)?;
        let evaluation = slot.lock().engine.evaluate();
        Ok(evaluation)
    }

    pub fn history(&self, table_id: &str) -> Result<Vec<Outcome>, EngineError> {
        let slot = self.slot(table_id)?;
        let history = slot.lock().engine.history();
        Ok(history)
    }

    pub fn table_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &SnapshotBus {
        &self.bus
    }

    // Clone the Arc out so the map shard is not held while the table lock is.
    fn slot(&self, table_id: &str) -> Result<Arc<Mutex<TableSlot>>, EngineError> {
        self.tables
            .get(table_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::UnknownTable(table_id.to_string()))
    }
}
