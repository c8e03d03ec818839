use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Level at and above which the table is treated as "do not operate".
pub const HARD_STOP_LEVEL: u8 = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Home,
    Away,
    Draw,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Away, Outcome::Draw];

    /// Home and Away mirror each other; Draw has no opposite side.
    pub fn opposite(self) -> Option<Outcome> {
        match self {
            Self::Home => Some(Self::Away),
            Self::Away => Some(Self::Home),
            Self::Draw => None,
        }
    }

    pub fn is_draw(self) -> bool {
        matches!(self, Self::Draw)
    }

    /// Table colour used by the studio UI.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Home => "🔴",
            Self::Away => "🔵",
            Self::Draw => "🟡",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Home => "home",
            Self::Away => "away",
            Self::Draw => "draw",
        };
        f.write_str(value)
    }
}

impl FromStr for Outcome {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        match raw.to_ascii_lowercase().as_str() {
            "h" | "home" | "🔴" => Ok(Self::Home),
            "a" | "away" | "🔵" => Ok(Self::Away),
            "d" | "draw" | "🟡" => Ok(Self::Draw),
            _ => Err(EngineError::InvalidOutcome(raw.to_string())),
        }
    }
}

impl TryFrom<char> for Outcome {
    type Error = EngineError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase() {
            'h' => Ok(Self::Home),
            'a' => Ok(Self::Away),
            'd' => Ok(Self::Draw),
            '🔴' => Ok(Self::Home),
            '🔵' => Ok(Self::Away),
            '🟡' => Ok(Self::Draw),
            other => Err(EngineError::InvalidOutcome(other.to_string())),
        }
    }
}

/// A maximal run of identical consecutive outcomes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub symbol: Outcome,
    pub length: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RegimeLabel {
    Choppy,
    DirectionalStrong,
    FalseBreak,
    Mixed,
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Choppy => "choppy",
            Self::DirectionalStrong => "directional_strong",
            Self::FalseBreak => "false_break",
            Self::Mixed => "mixed",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManipulationLevel {
    /// Severity in 1..=9.
    pub level: u8,
    pub label: String,
}

impl ManipulationLevel {
    pub fn new(level: u8, label: impl Into<String>) -> Self {
        Self {
            level: level.clamp(1, 9),
            label: label.into(),
        }
    }

    pub fn is_hard_stop(&self) -> bool {
        self.level >= HARD_STOP_LEVEL
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternationSignal {
    pub is_alternating: bool,
    /// Share of adjacent non-Draw pairs that differ, rounded to 2 decimals.
    pub ratio: f64,
    /// False when fewer than `window` non-Draw outcomes exist.
    #[serde(default)]
    pub sufficient: bool,
    /// Most recent non-Draw outcome, if any.
    #[serde(default)]
    pub anchor: Option<Outcome>,
}

impl AlternationSignal {
    pub fn insufficient(anchor: Option<Outcome>) -> Self {
        Self {
            is_alternating: false,
            ratio: 0.0,
            sufficient: false,
            anchor,
        }
    }
}

/// Percentages over {Home, Away, Draw}; each share has one decimal and the
/// three sum to 100.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProbabilityDistribution {
    pub home: f64,
    pub away: f64,
    pub draw: f64,
}

impl ProbabilityDistribution {
    pub fn uniform() -> Self {
        Self {
            home: 33.0,
            away: 33.0,
            draw: 34.0,
        }
    }

    /// Build from integer tenths of a percent (e.g. 333 == 33.3%).
    pub fn from_tenths(home: i64, away: i64, draw: i64) -> Self {
        Self {
            home: home as f64 / 10.0,
            away: away as f64 / 10.0,
            draw: draw as f64 / 10.0,
        }
    }

    pub fn share(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Away => self.away,
            Outcome::Draw => self.draw,
        }
    }

    pub fn total(&self) -> f64 {
        self.home + self.away + self.draw
    }

    /// Outcome with the largest share; ties resolve Home, Away, Draw.
    pub fn favourite(&self) -> Outcome {
        let mut best = Outcome::Home;
        for outcome in [Outcome::Away, Outcome::Draw] {
            if self.share(outcome) > self.share(best) {
                best = outcome;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Enter(Outcome),
    Wait,
    Abstain,
}

impl Action {
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Enter(Outcome::Home) => "enter_home",
            Self::Enter(Outcome::Away) => "enter_away",
            Self::Enter(Outcome::Draw) => "enter_draw",
            Self::Wait => "wait",
            Self::Abstain => "abstain",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter(outcome) => write!(f, "enter {outcome}"),
            Self::Wait => f.write_str("wait"),
            Self::Abstain => f.write_str("abstain"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    /// Percent in 0..=100. Wait and Abstain always carry 0.
    pub confidence: u8,
    pub rationale: String,
}

impl Decision {
    pub fn enter(outcome: Outcome, confidence: u8, rationale: impl Into<String>) -> Self {
        Self {
            action: Action::Enter(outcome),
            confidence: confidence.min(100),
            rationale: rationale.into(),
        }
    }

    pub fn wait(rationale: impl Into<String>) -> Self {
        Self {
            action: Action::Wait,
            confidence: 0,
            rationale: rationale.into(),
        }
    }

    pub fn abstain(rationale: impl Into<String>) -> Self {
        Self {
            action: Action::Abstain,
            confidence: 0,
            rationale: rationale.into(),
        }
    }
}

/// Maturity class of the active block, by length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockMaturity {
    Choppy,
    Short,
    Streak,
    StrongStreak,
}

impl BlockMaturity {
    pub fn from_length(length: usize) -> Self {
        match length {
            0 | 1 => Self::Choppy,
            2 => Self::Short,
            3 => Self::Streak,
            _ => Self::StrongStreak,
        }
    }
}

impl fmt::Display for BlockMaturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Choppy => "choppy",
            Self::Short => "short",
            Self::Streak => "streak",
            Self::StrongStreak => "strong_streak",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrapKind {
    /// A three-long block sitting right after the opposite side.
    ShortStreak,
    /// The active length already appeared among the previous blocks.
    FalseContinuity,
    /// The active block mirrors the length of the one before it.
    SymmetricBreak,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContinuityPhase {
    Warmup,
    DrawLock,
    Forming,
    Saturated,
    Trap(TrapKind),
    Continuation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContinuityReading {
    pub phase: ContinuityPhase,
    #[serde(default)]
    pub active_block: Option<Block>,
    #[serde(default)]
    pub maturity: Option<BlockMaturity>,
    /// Only set for `Continuation`.
    #[serde(default)]
    pub suggestion: Option<Outcome>,
    pub confidence: u8,
}

impl ContinuityReading {
    pub fn note(&self) -> String {
        match self.phase {
            ContinuityPhase::Warmup => "no reading".to_string(),
            ContinuityPhase::DrawLock => "draw locks the table".to_string(),
            ContinuityPhase::Forming => "immature block".to_string(),
            ContinuityPhase::Saturated => "saturated cycle".to_string(),
            ContinuityPhase::Trap(TrapKind::ShortStreak) => "suspicious short streak".to_string(),
            ContinuityPhase::Trap(TrapKind::FalseContinuity) => "false continuity".to_string(),
            ContinuityPhase::Trap(TrapKind::SymmetricBreak) => "symmetric break".to_string(),
            ContinuityPhase::Continuation => match self.maturity {
                Some(maturity) => format!("{maturity} matured"),
                None => "continuation".to_string(),
            },
        }
    }
}

/// Full signal snapshot published after each tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub regime: RegimeLabel,
    pub manipulation: ManipulationLevel,
    pub alternation: AlternationSignal,
    pub probabilities: ProbabilityDistribution,
    pub decision: Decision,
    /// Oldest first.
    pub cycle_memory: Vec<RegimeLabel>,
    #[serde(default)]
    pub draw_pressure: u32,
    #[serde(default)]
    pub history_len: usize,
    pub continuity: ContinuityReading,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid outcome: {0:?}")]
    InvalidOutcome(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_parses_letters_words_and_glyphs() {
        assert_eq!("H".parse::<Outcome>(), Ok(Outcome::Home));
        assert_eq!(" away ".parse::<Outcome>(), Ok(Outcome::Away));
        assert_eq!("🟡".parse::<Outcome>(), Ok(Outcome::Draw));
        assert_eq!(Outcome::try_from('d'), Ok(Outcome::Draw));
        assert_eq!(
            "x".parse::<Outcome>(),
            Err(EngineError::InvalidOutcome("x".to_string()))
        );
        assert!(Outcome::try_from('?').is_err());
    }

    #[test]
    fn opposite_side_mapping() {
        assert_eq!(Outcome::Home.opposite(), Some(Outcome::Away));
        assert_eq!(Outcome::Away.opposite(), Some(Outcome::Home));
        assert_eq!(Outcome::Draw.opposite(), None);
    }

    #[test]
    fn decision_constructors_zero_confidence_for_non_entries() {
        assert_eq!(Decision::wait("no edge").confidence, 0);
        assert_eq!(Decision::abstain("x").confidence, 0);
        assert_eq!(Decision::enter(Outcome::Home, 250, "x").confidence, 100);
    }

    #[test]
    fn manipulation_level_hard_stop_boundary() {
        assert!(!ManipulationLevel::new(7, "false break").is_hard_stop());
        assert!(ManipulationLevel::new(8, "trap").is_hard_stop());
        assert_eq!(ManipulationLevel::new(12, "x").level, 9);
    }

    #[test]
    fn distribution_from_tenths_and_favourite() {
        let p = ProbabilityDistribution::from_tenths(412, 301, 287);
        assert!((p.total() - 100.0).abs() < 1e-9);
        assert_eq!(p.favourite(), Outcome::Home);
        assert_eq!(ProbabilityDistribution::uniform().favourite(), Outcome::Draw);
    }

    #[test]
    fn action_json_shape() {
        let raw = serde_json::to_string(&Action::Enter(Outcome::Away)).expect("serialize");
        assert_eq!(raw, r#"{"enter":"away"}"#);
        let wait: Action = serde_json::from_str(r#""wait""#).expect("deserialize");
        assert_eq!(wait, Action::Wait);
        assert_eq!(Action::Enter(Outcome::Draw).to_string(), "enter draw");
    }

    #[test]
    fn continuity_note_mentions_maturity() {
        let reading = ContinuityReading {
            phase: ContinuityPhase::Continuation,
            active_block: Some(Block {
                symbol: Outcome::Home,
                length: 4,
            }),
            maturity: Some(BlockMaturity::from_length(4)),
            suggestion: Some(Outcome::Home),
            confidence: 72,
        };
        assert_eq!(reading.note(), "strong_streak matured");
    }
}
