//! Plain-text timetable rendering and post-solve clash checks.

use itertools::Itertools;

use crate::conflict::clashes;
use crate::data::{Minute, Plan, Session, Solution, WeekSet, Weekday};

pub fn format_minutes(minute: Minute) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

fn format_interval(session: &Session) -> String {
    format!(
        "{}-{}",
        format_minutes(session.start()),
        format_minutes(session.end())
    )
}

/// Every clashing pair in a resolved timetable, in session order.
pub fn clashing_pairs(sessions: &[Session]) -> impl Iterator<Item = (&Session, &Session)> {
    sessions
        .iter()
        .tuple_combinations()
        .filter(|(a, b)| clashes(a, b))
}

pub fn describe_clash(a: &Session, b: &Session) -> String {
    format!(
        "{} {} conflicts with {} {} on {} at {} vs {} (weeks: {})",
        a.course(),
        a.kind(),
        b.course(),
        b.kind(),
        a.day(),
        format_interval(a),
        format_interval(b),
        a.weeks().intersection(b.weeks())
    )
}

/// Describes every clashing pair in a resolved timetable.
pub fn find_clashes(sessions: &[Session]) -> Vec<String> {
    clashing_pairs(sessions)
        .map(|(a, b)| describe_clash(a, b))
        .collect()
}

/// Renders one solution as a per-weekday timetable followed by campus-day counts.
pub fn render_solution(solution: &Solution) -> String {
    let mut lines = Vec::new();
    for (course, index) in solution.assignment() {
        lines.push(format!("{course}: Index {index}"));
    }

    for day in Weekday::ALL {
        let mut sessions = solution.sessions().iter().filter(|s| s.day() == day).peekable();
        if sessions.peek().is_none() {
            continue;
        }
        lines.push(format!("{day}:"));
        for session in sessions {
            let weeks = if session.weeks().is_all() {
                String::new()
            } else {
                format!(" (Weeks: {})", session.weeks())
            };
            lines.push(format!(
                "  {} {} {}{weeks}",
                format_interval(session),
                session.course(),
                session.kind()
            ));
        }
    }

    lines.push(format!("All weeks: {} campus days", solution.campus_day_count()));
    lines.push(format!(
        "Odd weeks only: {} campus days",
        solution.campus_days_in(WeekSet::ODD)
    ));
    lines.push(format!(
        "Even weeks only: {} campus days",
        solution.campus_days_in(WeekSet::EVEN)
    ));
    lines.join("\n")
}

pub fn render_plan(plan: &Plan) -> String {
    plan.solutions()
        .iter()
        .enumerate()
        .map(|(i, solution)| {
            format!(
                "=== Option {} ({} campus days) ===\n{}",
                i + 1,
                solution.campus_day_count(),
                render_solution(solution)
            )
        })
        .join("\n\n")
}
