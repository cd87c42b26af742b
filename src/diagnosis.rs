//! Explains an infeasible selection by pointing at one concrete clash.
//!
//! This is a fixed-order scan, not a minimal conflict set: it reports the
//! first clash it meets so the student has one actionable clue.

use itertools::Itertools;

use crate::conflict::clashes;
use crate::data::{CourseCatalog, CourseEntry, Session};
use crate::model::selected_courses;

pub const NO_FEASIBLE_SCHEDULE: &str = "No feasible schedule found due to timing conflicts";

type Selected<'a> = (&'a str, &'a CourseEntry);

/// Scans, in order:
/// 1. each course's lectures against the index sessions of the *other* selected courses,
/// 2. each course's lectures against its own index sessions,
/// 3. index sessions of every ordered pair of courses.
///
/// Courses are visited in selection order, index options in catalog order and
/// sessions in list order. The first clash found is described.
pub fn diagnose<S: AsRef<str>>(catalog: &CourseCatalog, selected: &[S]) -> String {
    let courses: Vec<Selected<'_>> = selected_courses(selected)
        .filter_map(|course| catalog.entry(course))
        .map(|(id, entry)| (id.as_str(), entry))
        .collect();

    lecture_vs_other_courses(&courses)
        .or_else(|| lecture_vs_own_course(&courses))
        .or_else(|| index_vs_index(&courses))
        .unwrap_or_else(|| NO_FEASIBLE_SCHEDULE.to_string())
}

fn lecture_vs_other_courses(courses: &[Selected<'_>]) -> Option<String> {
    for &(course, entry) in courses {
        for lecture in entry.lectures() {
            let others = courses.iter().filter(|(other, _)| *other != course);
            for &(_, other) in others {
                if let Some(found) = lecture_clash(course, lecture, other) {
                    return Some(found);
                }
            }
        }
    }
    None
}

fn lecture_vs_own_course(courses: &[Selected<'_>]) -> Option<String> {
    courses.iter().find_map(|&(course, entry)| {
        entry
            .lectures()
            .iter()
            .find_map(|lecture| lecture_clash(course, lecture, entry))
    })
}

fn lecture_clash(course: &str, lecture: &Session, other: &CourseEntry) -> Option<String> {
    for option in other.options() {
        for session in option.sessions() {
            if clashes(lecture, session) {
                return Some(format!(
                    "Conflict: {course} lecture clashes with {} {} (Index {})",
                    option.course(),
                    session.kind(),
                    option.index()
                ));
            }
        }
    }
    None
}

fn index_vs_index(courses: &[Selected<'_>]) -> Option<String> {
    for (&(first, first_entry), &(second, second_entry)) in courses.iter().tuple_combinations() {
        for a in first_entry.options() {
            for b in second_entry.options() {
                let clash = a
                    .sessions()
                    .iter()
                    .cartesian_product(b.sessions())
                    .any(|(x, y)| clashes(x, y));
                if clash {
                    return Some(format!(
                        "Conflict: {first} Index {} clashes with {second} Index {}",
                        a.index(),
                        b.index()
                    ));
                }
            }
        }
    }
    None
}
