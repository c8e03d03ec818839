use block_structure::leading_block;
use core_types::{AlternationSignal, Block, Outcome, ProbabilityDistribution};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbabilityEngineConfig {
    /// Points per unit of alternation ratio added to the side opposite the anchor.
    pub alternation_gain: f64,
    /// Points taken from the anchor side while alternating.
    pub alternation_penalty: f64,
    /// Leading non-Draw block length that earns the streak bonus.
    pub streak_min_len: usize,
    pub streak_bonus: f64,
    /// Draw pressure that earns the draw bonus.
    pub draw_bias_pressure: u32,
    pub draw_bonus: f64,
}

impl Default for ProbabilityEngineConfig {
    fn default() -> Self {
        Self {
            alternation_gain: 16.0,
            alternation_penalty: 8.0,
            streak_min_len: 4,
            streak_bonus: 15.0,
            draw_bias_pressure: 28,
            draw_bonus: 20.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbabilityEngine {
    cfg: ProbabilityEngineConfig,
}

impl Default for ProbabilityEngine {
    fn default() -> Self {
        Self::new(ProbabilityEngineConfig::default())
    }
}

impl ProbabilityEngine {
    pub fn new(cfg: ProbabilityEngineConfig) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &ProbabilityEngineConfig {
        &self.cfg
    }

    pub fn set_cfg(&mut self, cfg: ProbabilityEngineConfig) {
        self.cfg = cfg;
    }

    pub fn estimate(
        &self,
        history: &[Outcome],
        blocks: &[Block],
        alternation: &AlternationSignal,
        draw_pressure: u32,
    ) -> ProbabilityDistribution {
        let mut shares = empirical_shares(history);

        if alternation.is_alternating {
            if let Some(anchor) = alternation.anchor {
                if let Some(opposite) = anchor.opposite() {
                    shares[slot(opposite)] += alternation.ratio * self.cfg.alternation_gain;
                    shares[slot(anchor)] -= self.cfg.alternation_penalty;
                }
            }
        }

        if let Some(lead) = leading_block(blocks) {
            if lead.length >= self.cfg.streak_min_len.max(1) {
                shares[slot(lead.symbol)] += self.cfg.streak_bonus;
            }
        }

        if draw_pressure >= self.cfg.draw_bias_pressure {
            shares[slot(Outcome::Draw)] += self.cfg.draw_bonus;
        }

        normalize(shares)
    }
}

fn slot(outcome: Outcome) -> usize {
    match outcome {
        Outcome::Home => 0,
        Outcome::Away => 1,
        Outcome::Draw => 2,
    }
}

fn empirical_shares(history: &[Outcome]) -> [f64; 3] {
    if history.is_empty() {
        let prior = ProbabilityDistribution::uniform();
        return [prior.home, prior.away, prior.draw];
    }
    let mut counts = [0usize; 3];
    for outcome in history {
        counts[slot(*outcome)] += 1;
    }
    let total = history.len() as f64;
    counts.map(|c| c as f64 * 100.0 / total)
}

/// Clamp, rescale to 100 and round to tenths; the largest share absorbs the
/// rounding residual so the three always sum to exactly 1000 tenths.
fn normalize(shares: [f64; 3]) -> ProbabilityDistribution {
    let clamped = shares.map(|s| if s.is_finite() { s.max(0.0) } else { 0.0 });
    let sum: f64 = clamped.iter().sum();
    if sum <= f64::EPSILON {
        return ProbabilityDistribution::uniform();
    }

    let mut tenths = clamped.map(|s| (s / sum * 1_000.0).round() as i64);
    let residual = 1_000 - tenths.iter().sum::<i64>();
    let mut largest = 0;
    for i in 1..tenths.len() {
        if tenths[i] > tenths[largest] {
            largest = i;
        }
    }
    tenths[largest] += residual;

    ProbabilityDistribution::from_tenths(tenths[0], tenths[1], tenths[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alternation_detector::AlternationDetector;
    use block_structure::extract_blocks;
    use core_types::Outcome::{Away as A, Draw as D, Home as H};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn no_alternation() -> AlternationSignal {
        AlternationSignal::insufficient(None)
    }

    fn is_one_decimal(v: f64) -> bool {
        ((v * 10.0).round() - v * 10.0).abs() < 1e-6
    }

    #[test]
    fn empty_history_uses_uniform_prior() {
        let engine = ProbabilityEngine::default();
        let p = engine.estimate(&[], &[], &no_alternation(), 0);
        assert_eq!(p, ProbabilityDistribution::uniform());
    }

    #[test]
    fn empirical_frequency_without_biases() {
        let engine = ProbabilityEngine::default();
        let history = [H, A, H, D];
        let p = engine.estimate(&history, &extract_blocks(&history), &no_alternation(), 0);
        assert_eq!(p, ProbabilityDistribution::from_tenths(500, 250, 250));
    }

    #[test]
    fn thirds_round_with_residual_on_largest() {
        assert_eq!(
            normalize([1.0, 1.0, 1.0]),
            ProbabilityDistribution::from_tenths(334, 333, 333)
        );
        assert_eq!(normalize([-5.0, 0.0, 0.0]), ProbabilityDistribution::uniform());
    }

    #[test]
    fn alternation_shifts_weight_to_opposite_side() {
        let engine = ProbabilityEngine::default();
        let history = [H, A, H, A, H, A, H, A];
        let alternation = AlternationDetector::default().evaluate(&history);
        let p = engine.estimate(&history, &extract_blocks(&history), &alternation, 8);
        // 50 + 16 vs 50 - 8, rescaled over 108
        assert_eq!(p, ProbabilityDistribution::from_tenths(389, 611, 0));
    }

    #[test]
    fn streak_and_draw_bonuses() {
        let engine = ProbabilityEngine::default();
        let history = [H, H, H, H, A, A, A, A];
        let p = engine.estimate(&history, &extract_blocks(&history), &no_alternation(), 30);
        // 65 / 50 / 20 over 135; the one-tenth residual lands on Home
        assert_eq!(p, ProbabilityDistribution::from_tenths(482, 370, 148));
    }

    #[test]
    fn normalization_holds_for_random_states() {
        let engine = ProbabilityEngine::default();
        let detector = AlternationDetector::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let len = rng.gen_range(0..=120);
            let history: Vec<Outcome> = (0..len).map(|_| Outcome::ALL[rng.gen_range(0..3)]).collect();
            let blocks = extract_blocks(&history);
            let alternation = detector.evaluate(&history);
            let pressure = rng.gen_range(0..60);
            let p = engine.estimate(&history, &blocks, &alternation, pressure);
            assert!(p.home >= 0.0 && p.away >= 0.0 && p.draw >= 0.0);
            assert!((p.total() - 100.0).abs() < 1e-9, "{p:?}");
            assert!(is_one_decimal(p.home) && is_one_decimal(p.away) && is_one_decimal(p.draw));
        }
    }
}
