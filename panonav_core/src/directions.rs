// Free-text directions -> ordered instructions.
//
// Input is the line-oriented text of a route description, e.g.
//
//     1. Head north on Main St
//     - 120 m
//     2. Turn left onto 2nd Ave
//     - 0.3 km
//     3. Reach destination
//
// Blank lines and "reach/arrive ... destination" lines are skipped. A line
// with a `<number> km|m` magnitude becomes one instruction, in metres. Its
// action comes from the line itself ("left" / "right", case-insensitive)
// or, when the line names no turn, from the closest preceding line without
// a distance (a heading like "Turn left" whose distance sits on the next
// line). Anything else is straight. Lines without a distance never produce
// an instruction on their own.

use crate::types::{Action, Instruction};
use regex::Regex;
use std::sync::LazyLock;

static TERMINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\d+\s*[.)]\s*)?(?:reach|arrive)\w*\b.*\bdestination\b")
        .expect("terminal marker regex is valid")
});

static DISTANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(km|kilomet(?:er|re)s?|m|met(?:er|re)s?)\b")
        .expect("distance regex is valid")
});

/// Parse route text into instructions, preserving line order.
pub fn parse_directions(text: &str) -> Vec<Instruction> {
    let mut out = Vec::new();
    let mut pending: Option<Action> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || TERMINAL_RE.is_match(line) {
            continue;
        }
        let own = line_action(line);
        match parse_distance_m(line) {
            Some(distance) => {
                let action = own.or(pending.take()).unwrap_or(Action::Straight);
                out.push(Instruction { action, distance });
            }
            None => pending = Some(own.unwrap_or(Action::Straight)),
        }
    }
    out
}

/// "left" beats "right" when a line mentions both.
fn line_action(line: &str) -> Option<Action> {
    let lower = line.to_lowercase();
    if lower.contains("left") {
        Some(Action::Left)
    } else if lower.contains("right") {
        Some(Action::Right)
    } else {
        None
    }
}

fn parse_distance_m(line: &str) -> Option<f64> {
    let caps = DISTANCE_RE.captures(line)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    if unit.starts_with('k') {
        Some(value * 1000.0)
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(action: Action, distance: f64) -> Instruction {
        Instruction { action, distance }
    }

    #[test]
    fn turn_heading_with_distance_on_next_line() {
        let parsed = parse_directions("1. Turn left\n- 150 m\n2. Reach destination");
        assert_eq!(parsed, vec![ins(Action::Left, 150.0)]);
    }

    #[test]
    fn one_line_per_step() {
        let text = "Head north on Main St for 120 m\n\
                    Turn RIGHT onto 2nd Ave (0.3 km)\n\
                    Continue straight 45.5 m\n\
                    Turn left, 1.2 km\n\
                    Arrive at your destination";
        assert_eq!(
            parse_directions(text),
            vec![
                ins(Action::Straight, 120.0),
                ins(Action::Right, 300.0),
                ins(Action::Straight, 45.5),
                ins(Action::Left, 1200.0),
            ]
        );
    }

    #[test]
    fn spelled_out_units() {
        let parsed = parse_directions("Walk 200 meters\nthen 2 kilometres right");
        assert_eq!(
            parsed,
            vec![ins(Action::Straight, 200.0), ins(Action::Right, 2000.0)]
        );
    }

    #[test]
    fn lines_without_distance_are_dropped() {
        let text = "\n  \nStart here\nTurn right\nLook around\n3. reach destination\n";
        assert!(parse_directions(text).is_empty());
    }

    #[test]
    fn pending_action_is_consumed_once() {
        let text = "Turn right\n- 50 m\n- 20 m";
        assert_eq!(
            parse_directions(text),
            vec![ins(Action::Right, 50.0), ins(Action::Straight, 20.0)]
        );
    }

    #[test]
    fn later_heading_replaces_earlier() {
        let text = "Turn right\nTurn left\n- 10 m";
        assert_eq!(parse_directions(text), vec![ins(Action::Left, 10.0)]);
    }

    #[test]
    fn step_numbers_are_not_distances() {
        let text = "2. Make a left\n10. Turn right 5 m";
        assert_eq!(parse_directions(text), vec![ins(Action::Right, 5.0)]);
    }

    #[test]
    fn terminal_marker_variants() {
        for line in [
            "Reach destination",
            "4. Reach destination",
            "5) reached the destination 0 m",
            "Arrive at destination",
        ] {
            let text = format!("Go 10 m\n{line}");
            assert_eq!(parse_directions(&text).len(), 1, "{line}");
        }
    }
}
