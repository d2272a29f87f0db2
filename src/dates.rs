//! Business-day math used for the default changelog window

use chrono::{Datelike, NaiveDate, Utc, Weekday};

/// Date format used on the command line, in file names and in search queries
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, thiserror::Error)]
pub enum DateError {
    #[error("Invalid month {0}, expected 1-12")]
    InvalidMonth(u32),
    #[error("Date out of range for year {0}")]
    OutOfRange(i32),
    #[error("Invalid date '{input}', expected YYYY-MM-DD: {source}")]
    Parse {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Weekends are the only non-working days; public holidays are not modelled
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First and last business day of `month` in `year`
pub fn month_boundaries(month: u32, year: i32) -> Result<(NaiveDate, NaiveDate), DateError> {
    if !(1..=12).contains(&month) {
        return Err(DateError::InvalidMonth(month));
    }
    let first_of_month =
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(DateError::OutOfRange(year))?;
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(DateError::OutOfRange(year))?;
    let last_of_month = first_of_next
        .pred_opt()
        .ok_or(DateError::OutOfRange(year))?;

    let first = first_of_month
        .iter_days()
        .take_while(|day| day.month() == month)
        .find(|day| is_business_day(*day))
        .ok_or(DateError::OutOfRange(year))?;
    let last = std::iter::successors(Some(last_of_month), |day| day.pred_opt())
        .take_while(|day| day.month() == month)
        .find(|day| is_business_day(*day))
        .ok_or(DateError::OutOfRange(year))?;

    Ok((first, last))
}

/// Business-day boundaries of the month `today` falls in
pub fn current_month_boundaries(today: NaiveDate) -> Result<(NaiveDate, NaiveDate), DateError> {
    month_boundaries(today.month(), today.year())
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(input: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|source| DateError::Parse {
        input: input.to_string(),
        source,
    })
}

/// English name of a 1-based month number
pub fn month_name(month: u32) -> Result<&'static str, DateError> {
    month
        .checked_sub(1)
        .and_then(|index| MONTH_NAMES.get(usize::try_from(index).ok()?))
        .copied()
        .ok_or(DateError::InvalidMonth(month))
}

/// Human phrase for when `date` happens relative to `today`
pub fn describe_relative(date: NaiveDate, today: NaiveDate) -> String {
    let days = (date - today).num_days();
    match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        2..=6 => format!("in {days} days"),
        -6..=-2 => format!("{} days ago", -days),
        _ => format!(
            "on {}, {} {}",
            date.weekday(),
            month_name(date.month()).unwrap_or_default(),
            date.day()
        ),
    }
}
