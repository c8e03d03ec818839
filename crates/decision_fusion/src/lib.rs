use core_types::{AlternationSignal, Decision, ManipulationLevel, Outcome, RegimeLabel};
use serde::{Deserialize, Serialize};

pub const RATIONALE_ALTERNATION: &str = "real alternation";
pub const RATIONALE_STRONG: &str = "strong directional";
pub const RATIONALE_DRAW: &str = "draw pressure";
pub const RATIONALE_NO_EDGE: &str = "no edge";
pub const RATIONALE_INSUFFICIENT: &str = "insufficient data";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    /// Alternation entries score `base + round(ratio * span)`, capped at `base + span`.
    pub alternation_base_confidence: u8,
    pub alternation_confidence_span: u8,
    pub strong_directional_confidence: u8,
    /// Inclusive manipulation-level band where a short-term bias is tradable.
    pub short_directional_min_level: u8,
    pub short_directional_max_level: u8,
    pub short_directional_confidence: u8,
    pub draw_entry_pressure: u32,
    pub draw_entry_confidence: u8,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            alternation_base_confidence: 60,
            alternation_confidence_span: 10,
            strong_directional_confidence: 62,
            short_directional_min_level: 3,
            short_directional_max_level: 5,
            short_directional_confidence: 56,
            draw_entry_pressure: 30,
            draw_entry_confidence: 65,
        }
    }
}

/// Everything the cascade looks at for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionInputs {
    pub regime: RegimeLabel,
    pub manipulation: ManipulationLevel,
    pub alternation: AlternationSignal,
    /// Symbol of the most recent non-Draw block.
    pub leading_side: Option<Outcome>,
    /// Side dominating the last few non-Draw outcomes, if any.
    pub short_term_bias: Option<Outcome>,
    pub draw_pressure: u32,
    /// False until enough outcomes exist for a structural reading.
    pub sufficient_history: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionRule {
    HardStop,
    RealAlternation,
    StrongDirectional,
    ShortDirectional,
    DrawPressure,
    NoEdge,
}

impl FusionRule {
    /// Evaluation order. `NoEdge` always matches, so the cascade is total.
    pub const CASCADE: [FusionRule; 6] = [
        FusionRule::HardStop,
        FusionRule::RealAlternation,
        FusionRule::StrongDirectional,
        FusionRule::ShortDirectional,
        FusionRule::DrawPressure,
        FusionRule::NoEdge,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::HardStop => "hard_stop",
            Self::RealAlternation => "real_alternation",
            Self::StrongDirectional => "strong_directional",
            Self::ShortDirectional => "short_directional",
            Self::DrawPressure => "draw_pressure",
            Self::NoEdge => "no_edge",
        }
    }

    pub fn apply(&self, cfg: &FusionConfig, inputs: &FusionInputs) -> Option<Decision> {
        match self {
            Self::HardStop => inputs
                .manipulation
                .is_hard_stop()
                .then(|| Decision::abstain(inputs.manipulation.label.clone())),
            Self::RealAlternation => {
                if !inputs.alternation.is_alternating
                    || inputs.regime == RegimeLabel::DirectionalStrong
                {
                    return None;
                }
                let side = inputs.alternation.anchor?.opposite()?;
                let base = cfg.alternation_base_confidence;
                let cap = base.saturating_add(cfg.alternation_confidence_span);
                let bonus = (inputs.alternation.ratio * cfg.alternation_confidence_span as f64)
                    .round()
                    .max(0.0) as u8;
                let confidence = base.saturating_add(bonus).clamp(base, cap);
                Some(Decision::enter(side, confidence, RATIONALE_ALTERNATION))
            }
            Self::StrongDirectional => {
                if inputs.regime != RegimeLabel::DirectionalStrong {
                    return None;
                }
                let side = inputs.leading_side?;
                Some(Decision::enter(
                    side,
                    cfg.strong_directional_confidence,
                    RATIONALE_STRONG,
                ))
            }
            Self::ShortDirectional => {
                let level = inputs.manipulation.level;
                if level < cfg.short_directional_min_level || level > cfg.short_directional_max_level
                {
                    return None;
                }
                let side = inputs.short_term_bias?;
                Some(Decision::enter(
                    side,
                    cfg.short_directional_confidence,
                    format!("short directional (level {level})"),
                ))
            }
            Self::DrawPressure => (inputs.draw_pressure >= cfg.draw_entry_pressure
                && inputs.regime != RegimeLabel::Choppy)
                .then(|| Decision::enter(Outcome::Draw, cfg.draw_entry_confidence, RATIONALE_DRAW)),
            Self::NoEdge => Some(if inputs.sufficient_history {
                Decision::wait(RATIONALE_NO_EDGE)
            } else {
                Decision::wait(RATIONALE_INSUFFICIENT)
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecisionFusion {
    cfg: FusionConfig,
}

impl DecisionFusion {
    pub fn new(cfg: FusionConfig) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &FusionConfig {
        &self.cfg
    }

    pub fn set_cfg(&mut self, cfg: FusionConfig) {
        self.cfg = cfg;
    }

    pub fn decide(&self, inputs: &FusionInputs) -> Decision {
        self.decide_with_rule(inputs).1
    }

    /// Decision plus the rule that produced it.
    pub fn decide_with_rule(&self, inputs: &FusionInputs) -> (FusionRule, Decision) {
        for rule in FusionRule::CASCADE {
            if let Some(decision) = rule.apply(&self.cfg, inputs) {
                return (rule, decision);
            }
        }
        (FusionRule::NoEdge, Decision::wait(RATIONALE_NO_EDGE))
    }
}
