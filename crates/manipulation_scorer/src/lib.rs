use block_structure::non_draw_sizes;
use core_types::{Block, ManipulationLevel};
use serde::{Deserialize, Serialize};

pub const LABEL_INSUFFICIENT: &str = "insufficient data";
pub const LABEL_DRAW_LOCK: &str = "active manipulation (draw)";
pub const LABEL_DRAW_TRAP: &str = "false break under draw pressure";
pub const LABEL_CONTROLLED: &str = "controlled alternation";
pub const LABEL_SHORT: &str = "short directional";
pub const LABEL_MEDIUM: &str = "medium directional";
pub const LABEL_STRONG: &str = "strong directional";
pub const LABEL_FALSE_BREAK: &str = "false break";
pub const LABEL_WEAK: &str = "weak pattern";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManipulationConfig {
    /// Outcomes required before any structural reading.
    pub min_outcomes: usize,
    /// Non-Draw block sizes examined.
    pub window_blocks: usize,
    /// Draw pressure that locks the table at level 9. At or below the fusion
    /// `draw_entry_pressure` (30) the lock fires first, so a long run without a
    /// Draw abstains instead of entering Draw; 28..=30 trades that entry away.
    pub draw_lock_pressure: u32,
    /// Draw pressure at which a false break escalates to level 8.
    pub draw_trap_pressure: u32,
    /// Single-length blocks needed for "controlled alternation".
    pub controlled_min_blocks: usize,
}

impl Default for ManipulationConfig {
    fn default() -> Self {
        Self {
            min_outcomes: 6,
            window_blocks: 6,
            draw_lock_pressure: 35,
            draw_trap_pressure: 30,
            controlled_min_blocks: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManipulationScorer {
    cfg: ManipulationConfig,
}

impl ManipulationScorer {
    pub fn new(cfg: ManipulationConfig) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &ManipulationConfig {
        &self.cfg
    }

    pub fn set_cfg(&mut self, cfg: ManipulationConfig) {
        self.cfg = cfg;
    }

    /// First matching rule wins.
    pub fn score(&self, history_len: usize, blocks: &[Block], draw_pressure: u32) -> ManipulationLevel {
        if history_len < self.cfg.min_outcomes {
            return ManipulationLevel::new(1, LABEL_INSUFFICIENT);
        }
        if draw_pressure >= self.cfg.draw_lock_pressure {
            return ManipulationLevel::new(9, LABEL_DRAW_LOCK);
        }

        let sizes = non_draw_sizes(blocks, self.cfg.window_blocks);
        let false_break = sizes.len() >= 2 && sizes[0] >= 4 && sizes[1] == 1;
        if false_break && draw_pressure >= self.cfg.draw_trap_pressure {
            return ManipulationLevel::new(8, LABEL_DRAW_TRAP);
        }
        if sizes.len() >= self.cfg.controlled_min_blocks.max(1) && sizes.iter().all(|s| *s == 1) {
            return ManipulationLevel::new(3, LABEL_CONTROLLED);
        }
        match sizes.iter().max().copied() {
            Some(2..=3) => return ManipulationLevel::new(4, LABEL_SHORT),
            Some(4..=5) => return ManipulationLevel::new(5, LABEL_MEDIUM),
            Some(max) if max >= 6 => return ManipulationLevel::new(6, LABEL_STRONG),
            _ => {}
        }
        // Shadowed by the size ladder whenever size[0] >= 4.
        if false_break {
            return ManipulationLevel::new(7, LABEL_FALSE_BREAK);
        }
        ManipulationLevel::new(2, LABEL_WEAK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use block_structure::extract_blocks;
    use core_types::Outcome::{self, Away as A, Draw as D, Home as H};

    fn score(history: &[Outcome], draw_pressure: u32) -> ManipulationLevel {
        ManipulationScorer::default().score(history.len(), &extract_blocks(history), draw_pressure)
    }

    fn repeat(pattern: &[Outcome], n: usize) -> Vec<Outcome> {
        pattern.iter().copied().cycle().take(n).collect()
    }

    #[test]
    fn insufficient_data_first() {
        let lvl = score(&[H, H, H, H, H], 40);
        assert_eq!(lvl.level, 1);
        assert_eq!(lvl.label, LABEL_INSUFFICIENT);
    }

    #[test]
    fn draw_lock_beats_structure() {
        let lvl = score(&repeat(&[H, A], 12), 35);
        assert_eq!(lvl.level, 9);
        assert!(lvl.is_hard_stop());
    }

    #[test]
    fn lock_at_thirty_turns_draw_entry_pressure_into_hard_stop() {
        let history = repeat(&[H, H, A, A, A], 30);
        let blocks = extract_blocks(&history);
        assert_eq!(ManipulationScorer::default().score(30, &blocks, 30).level, 4);
        let tight = ManipulationScorer::new(ManipulationConfig {
            draw_lock_pressure: 30,
            ..ManipulationConfig::default()
        });
        assert_eq!(tight.score(30, &blocks, 30).level, 9);
    }

    #[test]
    fn false_break_under_draw_pressure_is_level_8() {
        let mut history = vec![H, H, H, H, A];
        history.extend(repeat(&[H, H, A, A, A], 25));
        assert_eq!(score(&history, 30).level, 8);
        // same shape without the pressure falls through to the size ladder
        assert_eq!(score(&history, 10).level, 5);
    }

    #[test]
    fn controlled_alternation() {
        let lvl = score(&repeat(&[H, A], 8), 8);
        assert_eq!(lvl.level, 3);
        assert_eq!(lvl.label, LABEL_CONTROLLED);
    }

    #[test]
    fn size_ladder() {
        assert_eq!(score(&[H, H, A, A, A, H], 6).level, 4);
        assert_eq!(score(&[H, H, H, H, H, A, H], 7).level, 5);
        assert_eq!(score(&[H, H, H, H, H, H], 6).label, LABEL_STRONG);
    }

    #[test]
    fn draw_blocks_do_not_count_as_sizes() {
        // non-Draw sizes are [1, 1, 1, 1, 1] once the draw runs are skipped
        let lvl = score(&[H, D, D, D, A, H, D, D, A, H], 0);
        assert_eq!(lvl.level, 3);
    }

    #[test]
    fn weak_pattern_default() {
        assert_eq!(score(&[H, A, D, D, D, D, D, H], 0).level, 2);
    }
}
