use std::collections::VecDeque;

use core_types::{Outcome, RegimeLabel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum outcomes kept; the oldest is evicted past this.
    pub capacity: usize,
    /// Regime labels kept in the cycle memory.
    pub cycle_memory_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 120,
            cycle_memory_capacity: 3,
        }
    }
}

/// Bounded most-recent-first outcome log.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    // front == most recent
    outcomes: VecDeque<Outcome>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.outcomes.push_front(outcome);
        while self.outcomes.len() > self.capacity {
            self.outcomes.pop_back();
        }
    }

    pub fn reset(&mut self) {
        self.outcomes.clear();
    }

    /// Shrinking the capacity drops the oldest entries immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.outcomes.truncate(self.capacity);
    }

    pub fn snapshot(&self) -> Vec<Outcome> {
        self.outcomes.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Rounds elapsed since the last Draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawPressure {
    rounds: u32,
}

impl DrawPressure {
    pub fn update(&mut self, outcome: Outcome) {
        if outcome.is_draw() {
            self.rounds = 0;
        } else {
            self.rounds = self.rounds.saturating_add(1);
        }
    }

    pub fn reset(&mut self) {
        self.rounds = 0;
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }
}

/// Trailing log of regime labels, oldest first, with no two adjacent
/// entries equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleMemory {
    labels: VecDeque<RegimeLabel>,
    capacity: usize,
}

impl CycleMemory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            labels: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Returns false when the label repeated the newest entry and was skipped.
    pub fn push(&mut self, label: RegimeLabel) -> bool {
        if self.labels.back() == Some(&label) {
            return false;
        }
        self.labels.push_back(label);
        while self.labels.len() > self.capacity {
            self.labels.pop_front();
        }
        true
    }

    pub fn reset(&mut self) {
        self.labels.clear();
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.labels.len() > self.capacity {
            self.labels.pop_front();
        }
    }

    pub fn labels(&self) -> Vec<RegimeLabel> {
        self.labels.iter().copied().collect()
    }

    pub fn count(&self, label: RegimeLabel) -> usize {
        self.labels.iter().filter(|l| **l == label).count()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for CycleMemory {
    fn default() -> Self {
        Self::new(HistoryConfig::default().cycle_memory_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_outcome(rng: &mut StdRng) -> Outcome {
        Outcome::ALL[rng.gen_range(0..3)]
    }

    #[test]
    fn record_inserts_at_front() {
        let mut history = HistoryBuffer::new(5);
        history.record(Outcome::Home);
        history.record(Outcome::Away);
        assert_eq!(history.snapshot(), vec![Outcome::Away, Outcome::Home]);
    }

    #[test]
    fn bounded_history_evicts_oldest_first() {
        let mut rng = StdRng::seed_from_u64(7);
        let capacity = 120;
        let mut history = HistoryBuffer::new(capacity);
        let mut inserted = Vec::new();
        for _ in 0..400 {
            let outcome = random_outcome(&mut rng);
            history.record(outcome);
            inserted.push(outcome);
            assert!(history.len() <= capacity);
            let expected: Vec<Outcome> = inserted.iter().rev().take(capacity).copied().collect();
            assert_eq!(history.snapshot(), expected);
        }
    }

    #[test]
    fn reset_and_shrink() {
        let mut history = HistoryBuffer::new(4);
        for o in [Outcome::Home, Outcome::Away, Outcome::Draw, Outcome::Home] {
            history.record(o);
        }
        history.set_capacity(2);
        assert_eq!(history.snapshot(), vec![Outcome::Home, Outcome::Draw]);
        history.reset();
        assert!(history.is_empty());
        assert_eq!(HistoryBuffer::new(0).capacity(), 1);
    }

    #[test]
    fn draw_pressure_counts_rounds_since_last_draw() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let mut pressure = DrawPressure::default();
            let mut seq = Vec::new();
            for _ in 0..rng.gen_range(0..80) {
                let outcome = random_outcome(&mut rng);
                pressure.update(outcome);
                seq.push(outcome);
                if outcome.is_draw() {
                    assert_eq!(pressure.rounds(), 0);
                }
            }
            let expected = match seq.iter().rposition(|o| o.is_draw()) {
                Some(idx) => seq.len() - idx - 1,
                None => seq.len(),
            };
            assert_eq!(pressure.rounds() as usize, expected);
        }
    }

    #[test]
    fn cycle_memory_dedupes_and_truncates() {
        let mut mem = CycleMemory::new(3);
        assert!(mem.push(RegimeLabel::Mixed));
        assert!(!mem.push(RegimeLabel::Mixed));
        mem.push(RegimeLabel::Choppy);
        mem.push(RegimeLabel::DirectionalStrong);
        mem.push(RegimeLabel::Mixed);
        assert_eq!(
            mem.labels(),
            vec![
                RegimeLabel::Choppy,
                RegimeLabel::DirectionalStrong,
                RegimeLabel::Mixed
            ]
        );
        mem.push(RegimeLabel::DirectionalStrong);
        assert_eq!(mem.count(RegimeLabel::DirectionalStrong), 2);
        let labels = mem.labels();
        assert!(labels.windows(2).all(|w| w[0] != w[1]));
    }
}
