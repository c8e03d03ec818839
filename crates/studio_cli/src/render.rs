use std::fmt::Write as _;

use core_types::{Action, Evaluation, Outcome, RegimeLabel};

pub const GRID_COLUMNS: usize = 9;
pub const GRID_ROWS: usize = 10;

/// Most-recent-first glyph grid, `GRID_COLUMNS` per row, at most `GRID_ROWS` rows.
pub fn history_grid(history: &[Outcome]) -> String {
    history
        .chunks(GRID_COLUMNS)
        .take(GRID_ROWS)
        .map(|row| {
            row.iter()
                .map(|o| o.glyph())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn decision_line(eval: &Evaluation) -> String {
    let decision = &eval.decision;
    match decision.action {
        Action::Enter(outcome) => format!(
            "ENTER {} {} {}% ({})",
            outcome.glyph(),
            outcome.to_string().to_uppercase(),
            decision.confidence,
            decision.rationale
        ),
        Action::Wait => format!("WAIT ({})", decision.rationale),
        Action::Abstain => format!("ABSTAIN ({})", decision.rationale),
    }
}

fn cycle_line(labels: &[RegimeLabel]) -> String {
    if labels.is_empty() {
        return "-".to_string();
    }
    labels
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub fn evaluation_text(eval: &Evaluation) -> String {
    let mut out = String::new();
    let alt = &eval.alternation;
    let p = &eval.probabilities;
    let _ = writeln!(out, "outcomes       {}", eval.history_len);
    let _ = writeln!(out, "regime         {}", eval.regime);
    let _ = writeln!(
        out,
        "manipulation   {} ({})",
        eval.manipulation.level, eval.manipulation.label
    );
    let _ = writeln!(
        out,
        "alternation    {:.2}{}",
        alt.ratio,
        match (alt.sufficient, alt.is_alternating) {
            (false, _) => " (window not filled)",
            (true, true) => " (alternating)",
            (true, false) => "",
        }
    );
    let _ = writeln!(
        out,
        "probabilities  home {:.1}% | away {:.1}% | draw {:.1}% (favourite {})",
        p.home,
        p.away,
        p.draw,
        p.favourite()
    );
    let _ = writeln!(out, "draw pressure  {}", eval.draw_pressure);
    let _ = writeln!(out, "cycle memory   {}", cycle_line(&eval.cycle_memory));
    let continuity = &eval.continuity;
    match continuity.suggestion {
        Some(side) => {
            let _ = writeln!(
                out,
                "continuity     {} -> {} {}%",
                continuity.note(),
                side.glyph(),
                continuity.confidence
            );
        }
        None => {
            let _ = writeln!(out, "continuity     {}", continuity.note());
        }
    }
    let _ = write!(out, "decision       {}", decision_line(eval));
    out
}

/// Accepts letters, words or glyphs separated by whitespace, commas or
/// pipes; a bare run like `HHAD` is read one symbol per character.
pub fn parse_outcomes(raw: &str) -> Result<Vec<Outcome>, core_types::EngineError> {
    let mut outcomes = Vec::new();
    for token in raw
        .split(|c: char| c.is_whitespace() || c == ',' || c == '|')
        .filter(|t| !t.is_empty())
    {
        match token.parse::<Outcome>() {
            Ok(outcome) => outcomes.push(outcome),
            Err(_) => {
                for ch in token.chars() {
                    outcomes.push(Outcome::try_from(ch)?);
                }
            }
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Outcome::{Away as A, Draw as D, Home as H};
    use signal_engine::SignalEngine;

    #[test]
    fn grid_wraps_and_caps_rows() {
        let history = vec![H; 100];
        let grid = history_grid(&history);
        let rows: Vec<&str> = grid.lines().collect();
        assert_eq!(rows.len(), GRID_ROWS);
        assert!(rows.iter().all(|r| r.split(' ').count() == GRID_COLUMNS));
        assert_eq!(history_grid(&[A, D]), "🔵 🟡");
        assert_eq!(history_grid(&[]), "");
    }

    #[test]
    fn parses_runs_words_and_glyphs() {
        assert_eq!(parse_outcomes("HAD").expect("run"), vec![H, A, D]);
        assert_eq!(
            parse_outcomes("home, away | d 🔴🔵").expect("mixed"),
            vec![H, A, D, H, A]
        );
        assert!(parse_outcomes("HXA").is_err());
        assert!(parse_outcomes("  ").expect("empty").is_empty());
    }

    #[test]
    fn text_report_names_the_decision() {
        let mut engine = SignalEngine::default();
        for outcome in [A, H, A, H, A, H, A, H] {
            engine.record_outcome(outcome);
        }
        let text = evaluation_text(&engine.evaluate());
        assert!(text.contains("regime         choppy"));
        assert!(text.contains("(alternating)"));
        assert!(text.contains("(favourite away)"));
        assert!(text.ends_with("ENTER 🔵 AWAY 70% (real alternation)"));
    }

    #[test]
    fn empty_engine_report_waits() {
        let eval = SignalEngine::default().evaluate();
        assert_eq!(decision_line(&eval), "WAIT (insufficient data)");
        assert!(evaluation_text(&eval).contains("cycle memory   -"));
    }
}
