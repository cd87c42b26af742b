//! Pairwise clash detection between weekly sessions.
//!
//! Two labs that share a time slot may coexist when they alternate weeks.
//! Lectures and tutorials get no such leniency: they are treated as weekly
//! obligations, so any time overlap with them is a conflict.

use crate::data::{Session, SessionType};

/// Same weekday and overlapping half-open intervals. Touching endpoints do not overlap.
pub fn time_overlaps(a: &Session, b: &Session) -> bool {
    a.day() == b.day() && a.start() < b.end() && b.start() < a.end()
}

/// The type-specific conflict rule.
///
/// LAB vs LAB conflicts only when the two labs meet in a common week. Any pair
/// involving a lecture or tutorial conflicts on time overlap alone.
pub fn conflicts(a: &Session, b: &Session) -> bool {
    if !time_overlaps(a, b) {
        return false;
    }
    match (a.kind(), b.kind()) {
        (SessionType::Lab, SessionType::Lab) => a.weeks().intersects(b.weeks()),
        _ => true,
    }
}

/// The authoritative clash check used by the model builder and the diagnosis.
///
/// Requires the type rule and a shared active week, so a tutorial restricted
/// to odd weeks never clashes with one restricted to even weeks.
pub fn clashes(a: &Session, b: &Session) -> bool {
    conflicts(a, b) && a.weeks().intersects(b.weeks())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Minute, WeekSet, Weekday};

    fn session(
        kind: SessionType,
        day: Weekday,
        start: Minute,
        end: Minute,
        weeks: WeekSet,
    ) -> Session {
        Session::new("SC1001", kind, day, start, end, weeks).unwrap()
    }

    const KINDS: [SessionType; 3] = [SessionType::Lecture, SessionType::Tutorial, SessionType::Lab];

    #[test]
    fn different_weekdays_never_conflict() {
        for a in KINDS {
            for b in KINDS {
                let x = session(a, Weekday::Mon, 540, 600, WeekSet::ALL);
                let y = session(b, Weekday::Tue, 540, 600, WeekSet::ALL);
                assert!(!conflicts(&x, &y));
                assert!(!clashes(&x, &y));
            }
        }
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = session(SessionType::Tutorial, Weekday::Wed, 540, 600, WeekSet::ALL);
        let b = session(SessionType::Tutorial, Weekday::Wed, 600, 660, WeekSet::ALL);
        assert!(!time_overlaps(&a, &b));
        assert!(!conflicts(&a, &b));
    }

    #[test]
    fn partial_overlap_is_detected_both_ways() {
        let a = session(SessionType::Tutorial, Weekday::Wed, 540, 630, WeekSet::ALL);
        let b = session(SessionType::Lecture, Weekday::Wed, 600, 660, WeekSet::ALL);
        assert!(conflicts(&a, &b));
        assert!(conflicts(&b, &a));
    }

    #[test]
    fn non_lab_pairs_conflict_regardless_of_weeks() {
        let odd = session(SessionType::Tutorial, Weekday::Thu, 600, 660, WeekSet::ODD);
        let even = session(SessionType::Tutorial, Weekday::Thu, 600, 660, WeekSet::EVEN);
        assert!(conflicts(&odd, &even));
        // Disjoint weeks still rule out a genuine clash.
        assert!(!clashes(&odd, &even));
    }

    #[test]
    fn labs_clash_only_when_weeks_intersect() {
        let odd = session(SessionType::Lab, Weekday::Tue, 840, 960, WeekSet::ODD);
        let even = session(SessionType::Lab, Weekday::Tue, 840, 960, WeekSet::EVEN);
        let all = session(SessionType::Lab, Weekday::Tue, 900, 1020, WeekSet::ALL);
        assert!(!conflicts(&odd, &even));
        assert!(!clashes(&odd, &even));
        assert!(clashes(&odd, &all));
        assert!(clashes(&even, &all));
    }

    #[test]
    fn lab_leniency_does_not_extend_to_lectures_or_tutorials() {
        let lab = session(SessionType::Lab, Weekday::Fri, 540, 660, WeekSet::EVEN);
        let lecture = session(SessionType::Lecture, Weekday::Fri, 600, 660, WeekSet::ALL);
        let odd_tutorial = session(SessionType::Tutorial, Weekday::Fri, 540, 600, WeekSet::ODD);
        let even_tutorial = session(SessionType::Tutorial, Weekday::Fri, 540, 600, WeekSet::EVEN);

        assert!(clashes(&lab, &lecture));
        assert!(conflicts(&lab, &odd_tutorial));
        assert!(!clashes(&lab, &odd_tutorial));
        assert!(clashes(&lab, &even_tutorial));
    }
}
