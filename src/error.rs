use thiserror::Error;

use crate::data::CourseId;

/// A malformed field in a source row, or a session that violates its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("cannot parse time `{0}`")]
    Time(String),

    #[error("unknown weekday `{0}`")]
    Weekday(String),

    #[error("weekday index {0} is outside Mon-Fri (0-4)")]
    WeekdayIndex(u8),

    #[error("unknown session type `{0}`")]
    SessionType(String),

    #[error("cannot parse week list `{0}`")]
    Weeks(String),

    #[error("week {0} is outside teaching weeks 1-13")]
    WeekOutOfRange(u32),

    #[error("session has no active weeks")]
    EmptyWeeks,

    #[error("minute {0} is outside the day (0-1439)")]
    MinuteOutOfRange(u16),

    #[error("session interval {start}-{end} is empty")]
    EmptyInterval { start: u16, end: u16 },

    #[error("index {index} of {course} contains a lecture session")]
    LectureInIndex { course: CourseId, index: String },
}

/// Why a build-and-solve call produced no plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no courses selected")]
    NoCoursesSelected,

    #[error("course {course} has no index options")]
    UnsatisfiableCourse { course: CourseId },

    /// The solver proved there is no clash-free assignment, or found none in time.
    #[error("{diagnosis}")]
    Infeasible { diagnosis: String },

    #[error("solver error: {0}")]
    Solver(String),
}

/// Failure to read the raw timetable document.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read timetable: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed timetable document: {0}")]
    Json(#[from] serde_json::Error),
}
