pub mod config_loader;
pub mod session;

use alternation_detector::{AlternationConfig, AlternationDetector};
use block_structure::{
    extract_blocks, leading_block, read_continuity, ContinuityConfig, RegimeClassifier,
    RegimeConfig,
};
use core_types::{EngineError, Evaluation, Outcome, RegimeLabel};
use decision_fusion::{DecisionFusion, FusionConfig, FusionInputs};
use manipulation_scorer::{ManipulationConfig, ManipulationScorer};
use outcome_history::{CycleMemory, DrawPressure, HistoryBuffer, HistoryConfig};
use probability_engine::{ProbabilityEngine, ProbabilityEngineConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub history: HistoryConfig,
    pub alternation: AlternationConfig,
    pub regime: RegimeConfig,
    pub manipulation: ManipulationConfig,
    pub probability: ProbabilityEngineConfig,
    pub fusion: FusionConfig,
    pub continuity: ContinuityConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| -> Result<(), EngineError> {
            Err(EngineError::InvalidConfig(msg))
        };
        if self.history.capacity == 0 {
            return invalid("history.capacity must be > 0".to_string());
        }
        if self.history.cycle_memory_capacity == 0 {
            return invalid("history.cycle_memory_capacity must be > 0".to_string());
        }
        for (name, value) in [
            ("alternation.window", self.alternation.window),
            ("regime.window_blocks", self.regime.window_blocks),
            ("manipulation.window_blocks", self.manipulation.window_blocks),
        ] {
            if value < 2 {
                return invalid(format!("{name} must be >= 2, got {value}"));
            }
        }
        let threshold = self.alternation.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return invalid(format!("alternation.threshold must be in (0, 1], got {threshold}"));
        }
        if self.alternation.bias_min_count > self.alternation.bias_window {
            return invalid(format!(
                "alternation.bias_min_count {} exceeds bias_window {}",
                self.alternation.bias_min_count, self.alternation.bias_window
            ));
        }
        if self.manipulation.draw_trap_pressure > self.manipulation.draw_lock_pressure {
            return invalid(format!(
                "manipulation.draw_trap_pressure {} exceeds draw_lock_pressure {}",
                self.manipulation.draw_trap_pressure, self.manipulation.draw_lock_pressure
            ));
        }
        if self.fusion.short_directional_min_level > self.fusion.short_directional_max_level {
            return invalid("fusion short directional band is empty".to_string());
        }
        for (name, value) in [
            ("probability.alternation_gain", self.probability.alternation_gain),
            ("probability.alternation_penalty", self.probability.alternation_penalty),
            ("probability.streak_bonus", self.probability.streak_bonus),
            ("probability.draw_bonus", self.probability.draw_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be a finite value >= 0, got {value}"));
            }
        }
        Ok(())
    }
}

/// Per-table signal engine. Mutated only through `record_outcome` and
/// `reset`; `evaluate` never touches state.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    cfg: EngineConfig,
    history: HistoryBuffer,
    draw_pressure: DrawPressure,
    cycle_memory: CycleMemory,
    alternation: AlternationDetector,
    regime: RegimeClassifier,
    manipulation: ManipulationScorer,
    probability: ProbabilityEngine,
    fusion: DecisionFusion,
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

impl SignalEngine {
    pub fn new(cfg: EngineConfig) -> Result<Self, EngineError> {
        cfg.validate()?;
        Ok(Self::build(cfg))
    }

    fn build(cfg: EngineConfig) -> Self {
        Self {
            history: HistoryBuffer::new(cfg.history.capacity),
            draw_pressure: DrawPressure::default(),
            cycle_memory: CycleMemory::new(cfg.history.cycle_memory_capacity),
            alternation: AlternationDetector::new(cfg.alternation.clone()),
            regime: RegimeClassifier::new(cfg.regime.clone()),
            manipulation: ManipulationScorer::new(cfg.manipulation.clone()),
            probability: ProbabilityEngine::new(cfg.probability.clone()),
            fusion: DecisionFusion::new(cfg.fusion.clone()),
            cfg,
        }
    }

    pub fn cfg(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Swaps thresholds in place. History and draw pressure survive; a smaller
    /// capacity drops the oldest outcomes.
    pub fn set_cfg(&mut self, cfg: EngineConfig) -> Result<(), EngineError> {
        cfg.validate()?;
        self.history.set_capacity(cfg.history.capacity);
        self.cycle_memory.set_capacity(cfg.history.cycle_memory_capacity);
        self.alternation.set_cfg(cfg.alternation.clone());
        self.regime.set_cfg(cfg.regime.clone());
        self.manipulation.set_cfg(cfg.manipulation.clone());
        self.probability.set_cfg(cfg.probability.clone());
        self.fusion.set_cfg(cfg.fusion.clone());
        self.cfg = cfg;
        Ok(())
    }

    pub fn record_outcome(&mut self, outcome: Outcome) {
        self.history.record(outcome);
        self.draw_pressure.update(outcome);
        let blocks = extract_blocks(&self.history.snapshot());
        let regime = self.regime.classify(&blocks);
        let appended = self.cycle_memory.push(regime);

        metrics::counter!("engine.outcome_recorded", "outcome" => outcome.to_string())
            .increment(1);
        tracing::debug!(
            %outcome,
            %regime,
            appended,
            draw_pressure = self.draw_pressure.rounds(),
            history_len = self.history.len(),
            "outcome recorded"
        );
    }

    /// Parses a raw symbol (`H`, `away`, a table glyph, ...) and records it.
    pub fn record_symbol(&mut self, raw: &str) -> Result<Outcome, EngineError> {
        let outcome: Outcome = raw.parse()?;
        self.record_outcome(outcome);
        Ok(outcome)
    }

    pub fn reset(&mut self) {
        self.history.reset();
        self.draw_pressure.reset();
        self.cycle_memory.reset();
        metrics::counter!("engine.reset").increment(1);
        tracing::info!("engine reset");
    }

    pub fn evaluate(&self) -> Evaluation {
        let history = self.history.snapshot();
        let blocks = extract_blocks(&history);
        let draw_pressure = self.draw_pressure.rounds();

        let regime = self.regime.classify(&blocks);
        let alternation = self.alternation.evaluate(&history);
        let manipulation = self
            .manipulation
            .score(history.len(), &blocks, draw_pressure);
        let probabilities = self
            .probability
            .estimate(&history, &blocks, &alternation, draw_pressure);

        let inputs = FusionInputs {
            regime,
            manipulation: manipulation.clone(),
            alternation: alternation.clone(),
            leading_side: leading_block(&blocks).map(|b| b.symbol),
            short_term_bias: self.alternation.short_term_bias(&history),
            draw_pressure,
            sufficient_history: history.len() >= self.cfg.manipulation.min_outcomes,
        };
        let (rule, decision) = self.fusion.decide_with_rule(&inputs);

        let cycle_memory = self.cycle_memory.labels();
        let continuity =
            read_continuity(&self.cfg.continuity, history.len(), &blocks, &cycle_memory);

        tracing::debug!(
            %regime,
            level = manipulation.level,
            rule = rule.name(),
            action = %decision.action,
            confidence = decision.confidence,
            "evaluation"
        );

        Evaluation {
            regime,
            manipulation,
            alternation,
            probabilities,
            decision,
            cycle_memory,
            draw_pressure,
            history_len: history.len(),
            continuity,
        }
    }

    /// Most-recent-first copy of the stored outcomes.
    pub fn history(&self) -> Vec<Outcome> {
        self.history.snapshot()
    }

    pub fn draw_pressure(&self) -> u32 {
        self.draw_pressure.rounds()
    }

    pub fn cycle_memory(&self) -> Vec<RegimeLabel> {
        self.cycle_memory.labels()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Counts the decision and its confidence for whoever consumed the tick.
pub fn observe_decision(evaluation: &Evaluation) {
    let action = evaluation.decision.action.metric_label();
    metrics::counter!("engine.decision", "action" => action).increment(1);
    metrics::histogram!("engine.confidence", "action" => action)
        .record(evaluation.decision.confidence as f64);
    metrics::gauge!("engine.draw_pressure").set(evaluation.draw_pressure as f64);
}
