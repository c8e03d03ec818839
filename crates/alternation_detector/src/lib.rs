use core_types::{AlternationSignal, Outcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlternationConfig {
    /// Non-Draw outcomes examined (W). Values 5..=8 are typical.
    pub window: usize,
    /// Change ratio at or above which the table counts as alternating.
    pub threshold: f64,
    /// Non-Draw outcomes examined for a short-term side bias.
    pub bias_window: usize,
    /// Occurrences of one side inside `bias_window` that count as a bias.
    pub bias_min_count: usize,
}

impl Default for AlternationConfig {
    fn default() -> Self {
        Self {
            window: 6,
            threshold: 0.70,
            bias_window: 5,
            bias_min_count: 4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlternationDetector {
    cfg: AlternationConfig,
}

impl AlternationDetector {
    pub fn new(cfg: AlternationConfig) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &AlternationConfig {
        &self.cfg
    }

    pub fn set_cfg(&mut self, cfg: AlternationConfig) {
        self.cfg = cfg;
    }

    /// `history` is most-recent-first. Draws are dropped before the window is
    /// built, so they neither break a run nor count as a change.
    pub fn evaluate(&self, history: &[Outcome]) -> AlternationSignal {
        let window = self.cfg.window.max(2);
        let sides: Vec<Outcome> = non_draw_prefix(history, window);
        let anchor = sides.first().copied();
        if sides.len() < window {
            return AlternationSignal::insufficient(anchor);
        }

        let changes = sides.windows(2).filter(|w| w[0] != w[1]).count();
        let raw_ratio = changes as f64 / (window - 1) as f64;
        // Small tolerance so 0.7 from 7/10 still meets a 0.70 threshold.
        let is_alternating = raw_ratio + 1e-9 >= self.cfg.threshold;

        AlternationSignal {
            is_alternating,
            ratio: round2(raw_ratio),
            sufficient: true,
            anchor,
        }
    }

    /// Side that shows up at least `bias_min_count` times among the last
    /// `bias_window` non-Draw outcomes.
    pub fn short_term_bias(&self, history: &[Outcome]) -> Option<Outcome> {
        let sides = non_draw_prefix(history, self.cfg.bias_window.max(1));
        let min_count = self.cfg.bias_min_count.max(1);
        [Outcome::Home, Outcome::Away]
            .into_iter()
            .find(|side| sides.iter().filter(|o| *o == side).count() >= min_count)
    }
}

fn non_draw_prefix(history: &[Outcome], len: usize) -> Vec<Outcome> {
    history
        .iter()
        .filter(|o| !o.is_draw())
        .take(len)
        .copied()
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
