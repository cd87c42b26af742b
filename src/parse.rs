//! Field parsers for raw timetable rows.
//!
//! Every parser names the offending text in its error so that the loader can
//! report exactly which cell was rejected.

use log::warn;

use crate::data::{Minute, SessionType, WeekPattern, WeekSet, Weekday};
use crate::error::ParseError;

const TEACHING_WEEK_PREFIX: &str = "Teaching Wk";

/// Parses `HH:MM`, or the compact `H`, `HH`, `HMM` and `HHMM` forms, into minutes from midnight.
pub fn parse_time(text: &str) -> Result<Minute, ParseError> {
    let invalid = || ParseError::Time(text.to_string());
    let t = text.trim();
    if !t.is_ascii() {
        return Err(invalid());
    }

    let (hours, minutes) = match t.split_once(':') {
        Some((h, m)) => (h.trim(), m.trim()),
        None => match t.len() {
            1 | 2 => (t, "0"),
            3 => t.split_at(1),
            4 => t.split_at(2),
            _ => return Err(invalid()),
        },
    };
    if hours.is_empty() || minutes.is_empty() {
        return Err(invalid());
    }
    let hours: Minute = hours.parse().map_err(|_| invalid())?;
    let minutes: Minute = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

pub fn parse_weekday(text: &str) -> Result<Weekday, ParseError> {
    let day = match text.trim().to_ascii_lowercase().as_str() {
        "mon" | "monday" => Weekday::Mon,
        "tue" | "tuesday" => Weekday::Tue,
        "wed" | "wednesday" => Weekday::Wed,
        "thu" | "thursday" => Weekday::Thu,
        "fri" | "friday" => Weekday::Fri,
        _ => return Err(ParseError::Weekday(text.to_string())),
    };
    Ok(day)
}

pub fn parse_session_type(text: &str) -> Result<SessionType, ParseError> {
    let kind = match text.trim().to_ascii_uppercase().as_str() {
        "LEC" | "LECTURE" | "LEC/STUDIO" => SessionType::Lecture,
        "TUT" | "TUTORIAL" => SessionType::Tutorial,
        "LAB" => SessionType::Lab,
        _ => return Err(ParseError::SessionType(text.to_string())),
    };
    Ok(kind)
}

/// Parses a week remark such as `Teaching Wk2,4,6` or `Teaching Wk1-7,9`.
pub fn parse_week_list(remark: &str) -> Result<WeekSet, ParseError> {
    let invalid = || ParseError::Weeks(remark.to_string());
    let body = remark.trim();
    let body = body.strip_prefix(TEACHING_WEEK_PREFIX).unwrap_or(body);

    let mut weeks = Vec::new();
    for part in body.split(',').map(str::trim) {
        match part.split_once('-') {
            Some((first, last)) => {
                let first: u32 = first.trim().parse().map_err(|_| invalid())?;
                let last: u32 = last.trim().parse().map_err(|_| invalid())?;
                if first > last || last > WeekSet::LAST_WEEK {
                    return Err(invalid());
                }
                weeks.extend(first..=last);
            }
            None => weeks.push(part.parse().map_err(|_| invalid())?),
        }
    }
    WeekSet::from_weeks(weeks).map_err(|_| invalid())
}

/// Derives the active weeks of an index session from its remark.
///
/// Blank or unparseable remarks fall back to the pattern's default weeks. The
/// result is always restricted to the pattern and may therefore be empty.
pub fn weeks_from_remark(remark: Option<&str>, pattern: WeekPattern) -> WeekSet {
    let default_weeks = pattern.default_weeks();
    let remark = match remark.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return default_weeks,
    };
    match parse_week_list(remark) {
        Ok(weeks) => weeks.intersection(default_weeks),
        Err(e) => {
            warn!("{e}; assuming {pattern:?} weeks");
            default_weeks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clock_and_compact_times() {
        assert_eq!(parse_time("09:30"), Ok(570));
        assert_eq!(parse_time(" 9:05 "), Ok(545));
        assert_eq!(parse_time("9"), Ok(540));
        assert_eq!(parse_time("14"), Ok(840));
        assert_eq!(parse_time("930"), Ok(570));
        assert_eq!(parse_time("1430"), Ok(870));
    }

    #[test]
    fn rejects_malformed_times_naming_the_text() {
        for bad in ["", "12345", "ab:cd", "25:00", "10:75", ":30"] {
            assert_eq!(parse_time(bad), Err(ParseError::Time(bad.to_string())), "{bad}");
        }
    }

    #[test]
    fn parses_weekdays_case_insensitively() {
        assert_eq!(parse_weekday("MON"), Ok(Weekday::Mon));
        assert_eq!(parse_weekday(" thursday"), Ok(Weekday::Thu));
        assert_eq!(parse_weekday("Sat"), Err(ParseError::Weekday("Sat".into())));
    }

    #[test]
    fn parses_session_types() {
        assert_eq!(parse_session_type("LEC/STUDIO"), Ok(SessionType::Lecture));
        assert_eq!(parse_session_type("tut"), Ok(SessionType::Tutorial));
        assert_eq!(parse_session_type("LAB"), Ok(SessionType::Lab));
        assert!(parse_session_type("SEM").is_err());
    }

    #[test]
    fn parses_week_lists_with_prefix_and_ranges() {
        let weeks = parse_week_list("Teaching Wk2,4,6").unwrap();
        assert_eq!(weeks.iter().collect::<Vec<_>>(), vec![2, 4, 6]);
        let weeks = parse_week_list("1-3, 13").unwrap();
        assert_eq!(weeks.iter().collect::<Vec<_>>(), vec![1, 2, 3, 13]);
        assert!(parse_week_list("Teaching Wk14").is_err());
        assert!(parse_week_list("Wk 1").is_err());
        assert!(parse_week_list("5-2").is_err());
    }

    #[test]
    fn remark_falls_back_to_pattern_defaults() {
        assert_eq!(weeks_from_remark(None, WeekPattern::All), WeekSet::ALL);
        assert_eq!(weeks_from_remark(Some("  "), WeekPattern::Odd), WeekSet::ODD);
        assert_eq!(weeks_from_remark(Some("Online"), WeekPattern::Even), WeekSet::EVEN);
    }

    #[test]
    fn remark_is_restricted_to_pattern() {
        let weeks = weeks_from_remark(Some("Teaching Wk1,2,3,4"), WeekPattern::Even);
        assert_eq!(weeks.iter().collect::<Vec<_>>(), vec![2, 4]);
        assert!(weeks_from_remark(Some("Teaching Wk2,4"), WeekPattern::Odd).is_empty());
    }
}
