use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ParseError;

// Type aliases for clarity
pub type CourseId = String;
pub type IndexId = String;
pub type Minute = u16;

/// Chosen index per course.
pub type Assignment = BTreeMap<CourseId, IndexId>;

pub const LAST_MINUTE: Minute = 24 * 60 - 1;

/// A teaching weekday. Weekends are never scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    /// Position in the week, Monday = 0.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: u8) -> Result<Self, ParseError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(ParseError::WeekdayIndex(index))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The flat session taxonomy of the timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    #[serde(rename = "LEC")]
    Lecture,
    #[serde(rename = "TUT")]
    Tutorial,
    #[serde(rename = "LAB")]
    Lab,
}

impl SessionType {
    /// Whether attending a session of this type forces a trip to campus.
    pub fn needs_attendance(self) -> bool {
        matches!(self, SessionType::Tutorial | SessionType::Lab)
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionType::Lecture => "LEC",
            SessionType::Tutorial => "TUT",
            SessionType::Lab => "LAB",
        };
        f.write_str(label)
    }
}

/// A set of teaching weeks within the fixed 13-week term.
///
/// Bit `w` is set when the session meets in week `w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct WeekSet(u16);

impl WeekSet {
    pub const FIRST_WEEK: u32 = 1;
    pub const LAST_WEEK: u32 = 13;

    pub const EMPTY: WeekSet = WeekSet(0);
    /// Weeks 1-13, the pattern of every lecture and of any unannotated session.
    pub const ALL: WeekSet = WeekSet(0b11_1111_1111_1110);
    pub const ODD: WeekSet = WeekSet(0b10_1010_1010_1010);
    pub const EVEN: WeekSet = WeekSet(0b01_0101_0101_0100);

    pub fn from_weeks<I>(weeks: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = u32>,
    {
        weeks.into_iter().try_fold(Self::EMPTY, |set, week| {
            if (Self::FIRST_WEEK..=Self::LAST_WEEK).contains(&week) {
                Ok(WeekSet(set.0 | 1 << week))
            } else {
                Err(ParseError::WeekOutOfRange(week))
            }
        })
    }

    pub fn contains(self, week: u32) -> bool {
        (Self::FIRST_WEEK..=Self::LAST_WEEK).contains(&week) && self.0 & (1 << week) != 0
    }

    pub fn intersection(self, other: WeekSet) -> WeekSet {
        WeekSet(self.0 & other.0)
    }

    pub fn intersects(self, other: WeekSet) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_all(self) -> bool {
        self == Self::ALL
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = u32> {
        (Self::FIRST_WEEK..=Self::LAST_WEEK).filter(move |&week| self.contains(week))
    }
}

impl TryFrom<Vec<u32>> for WeekSet {
    type Error = ParseError;

    fn try_from(weeks: Vec<u32>) -> Result<Self, Self::Error> {
        Self::from_weeks(weeks)
    }
}

impl From<WeekSet> for Vec<u32> {
    fn from(weeks: WeekSet) -> Self {
        weeks.iter().collect()
    }
}

impl fmt::Display for WeekSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weeks: Vec<u32> = self.iter().collect();
        write!(f, "{weeks:?}")
    }
}

/// Which teaching weeks a student plans for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WeekPattern {
    #[default]
    All,
    Odd,
    Even,
}

impl WeekPattern {
    pub fn default_weeks(self) -> WeekSet {
        match self {
            WeekPattern::All => WeekSet::ALL,
            WeekPattern::Odd => WeekSet::ODD,
            WeekPattern::Even => WeekSet::EVEN,
        }
    }
}

/// One scheduled weekly occurrence of a course.
///
/// The time interval is half-open: `[start, end)` in minutes from midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    course: CourseId,
    #[serde(rename = "type")]
    kind: SessionType,
    day: Weekday,
    start: Minute,
    end: Minute,
    weeks: WeekSet,
}

impl Session {
    pub fn new(
        course: impl Into<CourseId>,
        kind: SessionType,
        day: Weekday,
        start: Minute,
        end: Minute,
        weeks: WeekSet,
    ) -> Result<Self, ParseError> {
        if start > LAST_MINUTE {
            return Err(ParseError::MinuteOutOfRange(start));
        }
        if end > LAST_MINUTE {
            return Err(ParseError::MinuteOutOfRange(end));
        }
        if start >= end {
            return Err(ParseError::EmptyInterval { start, end });
        }
        if weeks.is_empty() {
            return Err(ParseError::EmptyWeeks);
        }
        Ok(Self {
            course: course.into(),
            kind,
            day,
            start,
            end,
            weeks,
        })
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn kind(&self) -> SessionType {
        self.kind
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    pub fn start(&self) -> Minute {
        self.start
    }

    pub fn end(&self) -> Minute {
        self.end
    }

    pub fn weeks(&self) -> WeekSet {
        self.weeks
    }
}

/// A selectable bundle of tutorial and lab sessions for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOption {
    course: CourseId,
    index: IndexId,
    sessions: Vec<Session>,
}

impl IndexOption {
    pub fn new(
        course: impl Into<CourseId>,
        index: impl Into<IndexId>,
        sessions: Vec<Session>,
    ) -> Result<Self, ParseError> {
        let course = course.into();
        let index = index.into();
        if sessions.iter().any(|s| s.kind() == SessionType::Lecture) {
            return Err(ParseError::LectureInIndex { course, index });
        }
        Ok(Self {
            course,
            index,
            sessions,
        })
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }
}

/// Lectures and index options of one course, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct CourseEntry {
    lectures: Vec<Session>,
    options: Vec<IndexOption>,
}

impl CourseEntry {
    pub fn lectures(&self) -> &[Session] {
        &self.lectures
    }

    pub fn options(&self) -> &[IndexOption] {
        &self.options
    }
}

/// Every known course with its lectures and index options.
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    courses: BTreeMap<CourseId, CourseEntry>,
}

impl CourseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a course even if it ends up with no sessions at all.
    pub fn add_course(&mut self, course: impl Into<CourseId>) {
        self.courses.entry(course.into()).or_default();
    }

    pub fn add_lecture(&mut self, lecture: Session) {
        self.courses
            .entry(lecture.course.clone())
            .or_default()
            .lectures
            .push(lecture);
    }

    /// Adds an index option, merging its sessions into an existing option with the same id.
    pub fn add_option(&mut self, option: IndexOption) {
        let entry = self.courses.entry(option.course.clone()).or_default();
        match entry.options.iter_mut().find(|o| o.index == option.index) {
            Some(existing) => existing.sessions.extend(option.sessions),
            None => entry.options.push(option),
        }
    }

    /// Adds one session to the option `(session.course, index)`, creating it on first use.
    pub fn add_index_session(
        &mut self,
        index: impl Into<IndexId>,
        session: Session,
    ) -> Result<(), ParseError> {
        let option = IndexOption::new(session.course.clone(), index, vec![session])?;
        self.add_option(option);
        Ok(())
    }

    pub fn course(&self, course: &str) -> Option<&CourseEntry> {
        self.courses.get(course)
    }

    pub fn entry(&self, course: &str) -> Option<(&CourseId, &CourseEntry)> {
        self.courses.get_key_value(course)
    }

    pub fn courses(&self) -> impl Iterator<Item = (&CourseId, &CourseEntry)> {
        self.courses.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

/// Whether the solver proved the returned solution optimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SolveStatus {
    Optimal,
    /// The time budget ran out; this is the best solution found so far.
    BestEffort,
}

/// A feasible assignment together with the weekly timetable it produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    assignment: Assignment,
    campus_days: Vec<Weekday>,
    campus_day_count: usize,
    sessions: Vec<Session>,
    status: SolveStatus,
}

impl Solution {
    pub fn new(assignment: Assignment, mut sessions: Vec<Session>, status: SolveStatus) -> Self {
        sessions.sort_by(|a, b| {
            (a.day, a.start, a.end, &a.course).cmp(&(b.day, b.start, b.end, &b.course))
        });
        let campus_days = attendance_days(&sessions, WeekSet::ALL);
        Self {
            assignment,
            campus_day_count: campus_days.len(),
            campus_days,
            sessions,
            status,
        }
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn campus_days(&self) -> &[Weekday] {
        &self.campus_days
    }

    pub fn campus_day_count(&self) -> usize {
        self.campus_day_count
    }

    /// Lectures and chosen index sessions, ordered by weekday and start time.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Campus days needed by this same assignment when only `weeks` are considered.
    pub fn campus_days_in(&self, weeks: WeekSet) -> usize {
        attendance_days(&self.sessions, weeks).len()
    }
}

fn attendance_days(sessions: &[Session], weeks: WeekSet) -> Vec<Weekday> {
    let mut days: Vec<Weekday> = sessions
        .iter()
        .filter(|s| s.kind.needs_attendance() && s.weeks.intersects(weeks))
        .map(|s| s.day)
        .collect();
    days.sort();
    days.dedup();
    days
}

/// The result of a successful solve: the best assignment and the ranked alternatives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    assignment: Assignment,
    solutions: Vec<Solution>,
}

impl Plan {
    /// Returns `None` when no solution was found.
    pub fn from_ranked(solutions: Vec<Solution>) -> Option<Self> {
        let assignment = solutions.first()?.assignment.clone();
        Some(Self {
            assignment,
            solutions,
        })
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn best(&self) -> &Solution {
        &self.solutions[0]
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }
}
