use core_types::{
    Block, BlockMaturity, ContinuityPhase, ContinuityReading, Outcome, RegimeLabel, TrapKind,
};
use serde::{Deserialize, Serialize};

/// Run-length decomposition, most-recent-first. Pure, O(n).
pub fn extract_blocks(history: &[Outcome]) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for &outcome in history {
        match blocks.last_mut() {
            Some(block) if block.symbol == outcome => block.length += 1,
            _ => blocks.push(Block {
                symbol: outcome,
                length: 1,
            }),
        }
    }
    blocks
}

/// Inverse of [`extract_blocks`].
pub fn expand_blocks(blocks: &[Block]) -> Vec<Outcome> {
    blocks
        .iter()
        .flat_map(|b| std::iter::repeat(b.symbol).take(b.length))
        .collect()
}

/// First `k` lengths of non-Draw blocks. Draw blocks are skipped, not merged.
pub fn non_draw_sizes(blocks: &[Block], k: usize) -> Vec<usize> {
    blocks
        .iter()
        .filter(|b| !b.symbol.is_draw())
        .take(k)
        .map(|b| b.length)
        .collect()
}

/// Most recent non-Draw block.
pub fn leading_block(blocks: &[Block]) -> Option<Block> {
    blocks.iter().find(|b| !b.symbol.is_draw()).copied()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegimeConfig {
    /// Non-Draw block sizes examined (K).
    pub window_blocks: usize,
    /// A block at least this long marks a strong directional regime.
    pub strong_block_cap: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            window_blocks: 6,
            strong_block_cap: 6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    cfg: RegimeConfig,
}

impl RegimeClassifier {
    pub fn new(cfg: RegimeConfig) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &RegimeConfig {
        &self.cfg
    }

    pub fn set_cfg(&mut self, cfg: RegimeConfig) {
        self.cfg = cfg;
    }

    pub fn classify(&self, blocks: &[Block]) -> RegimeLabel {
        let sizes = non_draw_sizes(blocks, self.cfg.window_blocks);
        classify_sizes(&sizes, self.cfg.strong_block_cap)
    }
}

// Fixed precedence: Choppy, DirectionalStrong, FalseBreak, Mixed.
fn classify_sizes(sizes: &[usize], strong_block_cap: usize) -> RegimeLabel {
    if sizes.len() >= 4 && sizes[..4].iter().all(|s| *s == 1) {
        return RegimeLabel::Choppy;
    }
    if sizes.iter().any(|s| *s >= strong_block_cap.max(1)) {
        return RegimeLabel::DirectionalStrong;
    }
    if sizes.len() >= 3 && sizes[1] == 1 && sizes[0] >= 3 {
        return RegimeLabel::FalseBreak;
    }
    RegimeLabel::Mixed
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContinuityConfig {
    /// Outcomes needed before any reading.
    pub min_history: usize,
    /// Active block length considered mature.
    pub mature_length: usize,
    /// DirectionalStrong entries in cycle memory that mark saturation.
    pub saturation_count: usize,
    pub base_confidence: u8,
    pub confidence_per_outcome: u8,
    pub max_confidence_bonus: u8,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            min_history: 3,
            mature_length: 3,
            saturation_count: 2,
            base_confidence: 60,
            confidence_per_outcome: 3,
            max_confidence_bonus: 12,
        }
    }
}

/// Reads whether the active block has matured into something worth
/// following or looks like a trap. Uses every block, Draws included.
pub fn read_continuity(
    cfg: &ContinuityConfig,
    history_len: usize,
    blocks: &[Block],
    cycle_memory: &[RegimeLabel],
) -> ContinuityReading {
    let active = match blocks.first() {
        Some(block) if history_len >= cfg.min_history => *block,
        _ => return phase_only(ContinuityPhase::Warmup, None),
    };
    if active.symbol.is_draw() {
        return phase_only(ContinuityPhase::DrawLock, Some(active));
    }
    if active.length < cfg.mature_length {
        return phase_only(ContinuityPhase::Forming, Some(active));
    }
    let saturated = cycle_memory
        .iter()
        .filter(|l| **l == RegimeLabel::DirectionalStrong)
        .count();
    if saturated >= cfg.saturation_count.max(1) {
        return phase_only(ContinuityPhase::Saturated, Some(active));
    }
    let preceding = blocks.get(1);
    if active.length == cfg.mature_length
        && preceding.map(|b| Some(b.symbol) == active.symbol.opposite()) == Some(true)
    {
        return phase_only(ContinuityPhase::Trap(TrapKind::ShortStreak), Some(active));
    }
    if blocks.len() >= 3 && blocks[1..blocks.len().min(4)].iter().any(|b| b.length == active.length)
    {
        return phase_only(ContinuityPhase::Trap(TrapKind::FalseContinuity), Some(active));
    }
    if preceding.map(|b| b.length) == Some(active.length) {
        return phase_only(ContinuityPhase::Trap(TrapKind::SymmetricBreak), Some(active));
    }

    let step = (cfg.confidence_per_outcome as usize).saturating_mul(active.length);
    let bonus = step.min(cfg.max_confidence_bonus as usize) as u8;
    ContinuityReading {
        phase: ContinuityPhase::Continuation,
        active_block: Some(active),
        maturity: Some(BlockMaturity::from_length(active.length)),
        suggestion: Some(active.symbol),
        confidence: cfg.base_confidence.saturating_add(bonus).min(100),
    }
}

fn phase_only(phase: ContinuityPhase, active: Option<Block>) -> ContinuityReading {
    ContinuityReading {
        phase,
        active_block: active,
        maturity: active.map(|b| BlockMaturity::from_length(b.length)),
        suggestion: None,
        confidence: 0,
    }
}
