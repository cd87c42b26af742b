//! Loads course data from the raw timetable document.
//!
//! The document mirrors the two source sheets: a lecture table and an index
//! table. Rows are kept as text so that every malformed cell can be reported
//! with the value that failed to parse.

use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::data::{
    CourseCatalog, CourseId, IndexId, IndexOption, Session, SessionType, WeekPattern, WeekSet,
};
use crate::error::{CatalogError, ParseError};
use crate::model::selected_courses;
use crate::parse::{parse_session_type, parse_time, parse_weekday, weeks_from_remark};

/// A row of the lecture table. Missing times mark a course without lectures.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureRow {
    pub course_code: String,
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// A row of the index table: one session of one index.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRow {
    pub course_code: String,
    #[serde(deserialize_with = "text_or_number")]
    pub index: IndexId,
    #[serde(rename = "type")]
    pub kind: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub remark: Option<String>,
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Text(String),
        Number(u64),
    }

    Ok(match Cell::deserialize(deserializer)? {
        Cell::Text(text) => text.trim().to_string(),
        Cell::Number(number) => number.to_string(),
    })
}

/// The complete raw timetable document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTimetable {
    #[serde(default)]
    pub lectures: Vec<LectureRow>,
    #[serde(default)]
    pub indexes: Vec<IndexRow>,
}

/// A row that could not be turned into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub course: CourseId,
    /// `None` for lecture rows.
    pub index: Option<IndexId>,
    pub error: ParseError,
}

impl fmt::Display for RejectedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.index {
            Some(index) => write!(f, "{} index {}: {}", self.course, index, self.error),
            None => write!(f, "{} lecture: {}", self.course, self.error),
        }
    }
}

/// The catalog for a selection plus every row that was skipped as malformed.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoad {
    pub catalog: CourseCatalog,
    pub rejected: Vec<RejectedRow>,
}

impl RawTimetable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Distinct course codes present in either table, sorted.
    pub fn list_available_courses(&self) -> Vec<CourseId> {
        let lecture_codes = self.lectures.iter().map(|row| row.course_code.trim());
        let index_codes = self.indexes.iter().map(|row| row.course_code.trim());
        lecture_codes
            .chain(index_codes)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Lecture sessions of the selected courses. Every lecture meets in all weeks.
    pub fn load_lectures<S: AsRef<str>>(&self, selected: &[S]) -> Vec<Session> {
        self.collect_lectures(&wanted(selected), &mut Vec::new())
    }

    /// Index options of the selected courses, in row order, with weeks derived under `pattern`.
    pub fn load_index_options<S: AsRef<str>>(
        &self,
        selected: &[S],
        pattern: WeekPattern,
    ) -> Vec<IndexOption> {
        self.collect_index_options(&wanted(selected), pattern, &mut Vec::new())
    }

    pub fn load_catalog<S: AsRef<str>>(&self, selected: &[S], pattern: WeekPattern) -> CatalogLoad {
        let wanted = wanted(selected);
        let mut load = CatalogLoad::default();

        for lecture in self.collect_lectures(&wanted, &mut load.rejected) {
            load.catalog.add_lecture(lecture);
        }
        for option in self.collect_index_options(&wanted, pattern, &mut load.rejected) {
            load.catalog.add_option(option);
        }

        info!(
            "Loaded {} of {} selected courses ({} rows rejected).",
            load.catalog.courses().count(),
            wanted.len(),
            load.rejected.len()
        );
        load
    }

    fn collect_lectures(
        &self,
        wanted: &HashSet<&str>,
        rejected: &mut Vec<RejectedRow>,
    ) -> Vec<Session> {
        let mut sessions = Vec::new();
        for row in &self.lectures {
            let course = row.course_code.trim();
            if !wanted.contains(course) {
                continue;
            }

            let (Some(day), Some(start), Some(end)) =
                (present(&row.day), present(&row.start_time), present(&row.end_time))
            else {
                info!("Skipping lecture for {course} - no time data (likely lab-only course)");
                continue;
            };

            match lecture_session(course, day, start, end) {
                Ok(session) => sessions.push(session),
                Err(error) => {
                    warn!("Error processing lecture row for {course}: {error}");
                    rejected.push(RejectedRow {
                        course: course.to_string(),
                        index: None,
                        error,
                    });
                }
            }
        }
        sessions
    }

    fn collect_index_options(
        &self,
        wanted: &HashSet<&str>,
        pattern: WeekPattern,
        rejected: &mut Vec<RejectedRow>,
    ) -> Vec<IndexOption> {
        let mut groups: Vec<(&str, &str, Vec<Session>)> = Vec::new();
        let mut positions: HashMap<(&str, &str), usize> = HashMap::new();
        let mut broken: HashSet<usize> = HashSet::new();

        for row in &self.indexes {
            let course = row.course_code.trim();
            if !wanted.contains(course) {
                continue;
            }
            let index = row.index.as_str();
            let position = *positions.entry((course, index)).or_insert_with(|| {
                groups.push((course, index, Vec::new()));
                groups.len() - 1
            });

            match index_session(course, index, row, pattern) {
                Ok(Some(session)) => groups[position].2.push(session),
                Ok(None) => {
                    debug!("{course} index {index} has a session outside {pattern:?} weeks")
                }
                Err(error) => {
                    warn!("Error processing index row for {course} index {index}: {error}");
                    broken.insert(position);
                    rejected.push(RejectedRow {
                        course: course.to_string(),
                        index: Some(index.to_string()),
                        error,
                    });
                }
            }
        }

        let mut options = Vec::with_capacity(groups.len());
        for (position, (course, index, sessions)) in groups.into_iter().enumerate() {
            if broken.contains(&position) {
                warn!("Dropping {course} index {index}: some of its sessions are unreadable");
                continue;
            }
            match IndexOption::new(course, index, sessions) {
                Ok(option) => options.push(option),
                Err(error) => warn!("Dropping {course} index {index}: {error}"),
            }
        }
        options
    }
}

fn wanted<S: AsRef<str>>(selected: &[S]) -> HashSet<&str> {
    selected_courses(selected).collect()
}

fn present(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|text| !text.is_empty())
}

fn lecture_session(course: &str, day: &str, start: &str, end: &str) -> Result<Session, ParseError> {
    Session::new(
        course,
        SessionType::Lecture,
        parse_weekday(day)?,
        parse_time(start)?,
        parse_time(end)?,
        WeekSet::ALL,
    )
}

/// `Ok(None)` when the session never meets under `pattern`.
fn index_session(
    course: &str,
    index: &str,
    row: &IndexRow,
    pattern: WeekPattern,
) -> Result<Option<Session>, ParseError> {
    let kind = parse_session_type(&row.kind)?;
    if kind == SessionType::Lecture {
        return Err(ParseError::LectureInIndex {
            course: course.to_string(),
            index: index.to_string(),
        });
    }
    let day = parse_weekday(&row.day)?;
    let start = parse_time(&row.start_time)?;
    let end = parse_time(&row.end_time)?;

    let weeks = weeks_from_remark(row.remark.as_deref(), pattern);
    if weeks.is_empty() {
        return Ok(None);
    }
    Session::new(course, kind, day, start, end, weeks).map(Some)
}
