//! Encodes the course-to-index selection as a 0-1 program, independent of any solver backend.
//!
//! Variables: one binary `x_i` per index option of a selected course, plus one
//! binary campus-day indicator per weekday. Constraints:
//! - exactly one `x_i` per course;
//! - `x_i == 0` when option `i` clashes with any selected lecture;
//! - `x_i + x_j <= 1` when options of different courses clash;
//! - `day_d == OR(x_i)` over options with a tutorial or lab on day `d`.
//!
//! The objective minimises the number of campus days.

use itertools::Itertools;
use log::{debug, info, trace};
use std::collections::BTreeSet;

use crate::conflict::clashes;
use crate::data::{
    Assignment, CourseCatalog, IndexOption, Session, SolveStatus, Solution, Weekday,
};
use crate::error::PlanError;

/// The distinct course codes of a selection, trimmed, in first-occurrence order.
pub fn selected_courses<S: AsRef<str>>(selected: &[S]) -> impl Iterator<Item = &str> {
    selected.iter().map(|s| s.as_ref().trim()).unique()
}

/// Position of an index option inside a [`TimetableModel`].
pub type OptionIdx = usize;

/// The options among which one course must pick exactly one.
#[derive(Debug, Clone)]
pub struct CourseChoice<'a> {
    pub course: &'a str,
    pub options: Vec<OptionIdx>,
}

#[derive(Debug)]
pub struct TimetableModel<'a> {
    courses: Vec<CourseChoice<'a>>,
    options: Vec<&'a IndexOption>,
    lectures: Vec<&'a Session>,
    forbidden: BTreeSet<OptionIdx>,
    exclusions: BTreeSet<(OptionIdx, OptionIdx)>,
    campus_days: [Vec<OptionIdx>; 5],
}

impl<'a> TimetableModel<'a> {
    /// Builds the model for `selected` courses, in selection order. Repeated courses are ignored.
    ///
    /// Fails before any solving if the selection is empty or if a selected
    /// course has no index option to choose from.
    pub fn build<S: AsRef<str>>(
        catalog: &'a CourseCatalog,
        selected: &[S],
    ) -> Result<Self, PlanError> {
        if selected.is_empty() {
            return Err(PlanError::NoCoursesSelected);
        }
        info!("Building timetable model for {} selected courses...", selected.len());

        let mut courses: Vec<CourseChoice<'a>> = Vec::new();
        let mut options: Vec<&'a IndexOption> = Vec::new();
        let mut lectures: Vec<&'a Session> = Vec::new();

        for course in selected_courses(selected) {
            let (id, entry) = catalog
                .entry(course)
                .filter(|(_, entry)| !entry.options().is_empty())
                .ok_or_else(|| PlanError::UnsatisfiableCourse {
                    course: course.to_string(),
                })?;

            lectures.extend(entry.lectures());
            let first = options.len();
            options.extend(entry.options());
            courses.push(CourseChoice {
                course: id,
                options: (first..options.len()).collect(),
            });
        }

        // index vs lecture, own course included
        let mut forbidden = BTreeSet::new();
        for (i, option) in options.iter().enumerate() {
            let lecture_clash = option
                .sessions()
                .iter()
                .cartesian_product(&lectures)
                .find(|(session, lecture)| clashes(session, lecture));
            if let Some((session, lecture)) = lecture_clash {
                trace!(
                    "{} index {} is ruled out: its {} on {} clashes with a {} lecture",
                    option.course(),
                    option.index(),
                    session.kind(),
                    session.day(),
                    lecture.course()
                );
                forbidden.insert(i);
            }
        }

        // index vs index across courses
        let mut exclusions = BTreeSet::new();
        for ((i, a), (j, b)) in options.iter().enumerate().tuple_combinations() {
            if a.course() == b.course() {
                continue;
            }
            if a
                .sessions()
                .iter()
                .cartesian_product(b.sessions())
                .any(|(x, y)| clashes(x, y))
            {
                exclusions.insert((i, j));
            }
        }

        let mut campus_days: [Vec<OptionIdx>; 5] = Default::default();
        for (i, option) in options.iter().enumerate() {
            let days = option
                .sessions()
                .iter()
                .filter(|s| s.kind().needs_attendance())
                .map(|s| s.day())
                .unique();
            for day in days {
                campus_days[day.index()].push(i);
            }
        }

        debug!(
            "Model has {} option variables, {} forbidden options and {} exclusion pairs.",
            options.len(),
            forbidden.len(),
            exclusions.len()
        );

        Ok(Self {
            courses,
            options,
            lectures,
            forbidden,
            exclusions,
            campus_days,
        })
    }

    pub fn courses(&self) -> &[CourseChoice<'a>] {
        &self.courses
    }

    pub fn options(&self) -> &[&'a IndexOption] {
        &self.options
    }

    pub fn lectures(&self) -> &[&'a Session] {
        &self.lectures
    }

    /// Options that may never be chosen.
    pub fn forbidden(&self) -> &BTreeSet<OptionIdx> {
        &self.forbidden
    }

    /// Pairs `(i, j)`, `i < j`, of options that cannot both be chosen.
    pub fn exclusions(&self) -> &BTreeSet<(OptionIdx, OptionIdx)> {
        &self.exclusions
    }

    /// Options whose tutorial or lab sessions put the student on campus on `day`.
    pub fn campus_day_options(&self, day: Weekday) -> &[OptionIdx] {
        &self.campus_days[day.index()]
    }

    pub fn option_index(&self, course: &str, index: &str) -> Option<OptionIdx> {
        self.options
            .iter()
            .position(|o| o.course() == course && o.index() == index)
    }

    /// Turns a set of chosen options back into a domain solution.
    pub fn resolve(&self, chosen: &[OptionIdx], status: SolveStatus) -> Solution {
        let assignment: Assignment = chosen
            .iter()
            .map(|&i| {
                let option = self.options[i];
                (option.course().to_string(), option.index().to_string())
            })
            .collect();
        let sessions = self
            .lectures
            .iter()
            .copied()
            .chain(chosen.iter().flat_map(|&i| self.options[i].sessions()))
            .cloned()
            .collect();
        Solution::new(assignment, sessions, status)
    }
}
