use tasklens_core::types::DueDateRange;
use time::{Date, Duration, Month};

/// Outcome of resolving a recognized relative-time phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeResolution {
    /// Specific query: the phrase becomes a concrete due-date window.
    Filter(DueDateRange),
    /// Vague query: the phrase is exposed downstream as context only.
    Context(String),
}

/// Convert a canonical time-phrase key into a filter or a context label.
///
/// "this/next X" phrases anchor a `<=` filter at the end of that period
/// (undated and overdue tasks included); "last X" phrases produce a closed
/// `between` window. Unknown keys degrade to context labels.
pub fn resolve_time_phrase(key: &str, today: Date, vague: bool) -> TimeResolution {
    if vague {
        return TimeResolution::Context(key.to_string());
    }

    let range = match key {
        "today" => Some(DueDateRange::on_or_before(today)),
        "tomorrow" => Some(DueDateRange::on_or_before(today + Duration::days(1))),
        "this_week" => Some(DueDateRange::on_or_before(end_of_week(today))),
        "next_week" => Some(DueDateRange::on_or_before(
            end_of_week(today) + Duration::days(7),
        )),
        "this_month" => Some(DueDateRange::on_or_before(end_of_month(today))),
        "next_month" => {
            let next = first_of_next_month(today);
            Some(DueDateRange::on_or_before(end_of_month(next)))
        }
        "this_year" => Date::from_calendar_date(today.year(), Month::December, 31)
            .ok()
            .map(DueDateRange::on_or_before),
        "last_week" => {
            let start = start_of_week(today) - Duration::days(7);
            Some(DueDateRange::between(start, start + Duration::days(6)))
        }
        "last_month" => {
            let first_this_month = replace_day(today, 1);
            let last_prev = first_this_month - Duration::days(1);
            Some(DueDateRange::between(replace_day(last_prev, 1), last_prev))
        }
        _ => None,
    };

    match range {
        Some(range) => TimeResolution::Filter(range),
        None => TimeResolution::Context(key.to_string()),
    }
}

/// ISO week: Monday start, Sunday end.
fn start_of_week(date: Date) -> Date {
    date - Duration::days(i64::from(date.weekday().number_days_from_monday()))
}

fn end_of_week(date: Date) -> Date {
    start_of_week(date) + Duration::days(6)
}

fn end_of_month(date: Date) -> Date {
    replace_day(date, date.month().length(date.year()))
}

fn first_of_next_month(date: Date) -> Date {
    end_of_month(date) + Duration::days(1)
}

fn replace_day(date: Date, day: u8) -> Date {
    // Day 1..=month length is always representable for an existing date.
    date.replace_day(day).unwrap_or(date)
}
