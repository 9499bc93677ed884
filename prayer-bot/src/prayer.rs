//! Prayer names, daily/monthly timetables and the time arithmetic the commands and reminders share.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime};
use thiserror::Error;

/// The six daily times, in the order they occur during the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Sunrise => "Sunrise",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    /// Comma-separated list of all names, for error replies.
    pub fn names() -> String {
        Prayer::ALL
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown prayer: {0}")]
pub struct UnknownPrayer(pub String);

impl FromStr for Prayer {
    type Err = UnknownPrayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Prayer::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPrayer(s.to_string()))
    }
}

/// Local times of the six prayers on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTimes([NaiveTime; 6]);

impl DayTimes {
    pub fn new(times: [NaiveTime; 6]) -> Self {
        Self(times)
    }

    pub fn get(&self, prayer: Prayer) -> NaiveTime {
        self.0[prayer as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Prayer, NaiveTime)> + '_ {
        Prayer::ALL.into_iter().zip(self.0.iter().copied())
    }
}

/// Timetable of one calendar month; `days[0]` is the 1st.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthTimetable {
    pub year: i32,
    pub month: u32,
    pub days: Vec<DayTimes>,
}

impl MonthTimetable {
    pub fn new(year: i32, month: u32, days: Vec<DayTimes>) -> Self {
        Self { year, month, days }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Times for `date`, or `None` when the date lies outside this month or past the last parsed row.
    pub fn day(&self, date: NaiveDate) -> Option<&DayTimes> {
        if !self.covers(date) {
            return None;
        }
        self.days.get(date.day0() as usize)
    }
}

/// `date` + `time` read as wall-clock time in `offset`.
pub fn local_datetime(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = date.and_time(time) - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// Prayers of `now`'s day that are not yet in the past, in day order.
pub fn remaining_today(
    timetable: &MonthTimetable,
    now: DateTime<FixedOffset>,
) -> Vec<(Prayer, DateTime<FixedOffset>)> {
    let date = now.date_naive();
    let Some(day) = timetable.day(date) else {
        return Vec::new();
    };
    day.iter()
        .map(|(prayer, time)| (prayer, local_datetime(date, time, *now.offset())))
        .filter(|(_, at)| *at >= now)
        .collect()
}

/// Next prayer strictly after `now` (optionally only `requested`), looking at today and tomorrow.
///
/// Tomorrow is only searched when it falls inside the same timetable month.
pub fn next_prayer(
    timetable: &MonthTimetable,
    now: DateTime<FixedOffset>,
    requested: Option<Prayer>,
) -> Option<(Prayer, DateTime<FixedOffset>)> {
    let offset = *now.offset();
    let today = now.date_naive();
    let days = std::iter::successors(Some(today), |d| d.succ_opt()).take(2);

    days.filter_map(|date| timetable.day(date).map(|times| (date, *times)))
        .flat_map(|(date, times)| {
            Prayer::ALL
                .into_iter()
                .map(move |p| (p, local_datetime(date, times.get(p), offset)))
        })
        .filter(|(p, _)| requested.map_or(true, |r| r == *p))
        .find(|(_, at)| *at > now)
}

/// Escapes Telegram MarkdownV2 reserved characters.
pub fn escape_markdown(text: &str) -> String {
    const RESERVED: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
        '\\',
    ];
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// MarkdownV2 listing: the title line followed by one bold name and `HH:MM` per prayer.
pub fn format_day(title: &str, day: &DayTimes) -> String {
    let lines: Vec<String> = day
        .iter()
        .map(|(prayer, time)| format!("*{}*: {}", prayer, time.format("%H:%M")))
        .collect();
    format!("{}:\n{}", escape_markdown(title), lines.join("\n"))
}

/// Human-readable duration such as "2 hours, 3 minutes and 4 seconds". Negative durations read as zero.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let units = [
        (total / 86_400, "day"),
        (total % 86_400 / 3_600, "hour"),
        (total % 3_600 / 60, "minute"),
        (total % 60, "second"),
    ];
    let parts: Vec<String> = units
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| {
            if *n == 1 {
                format!("1 {}", unit)
            } else {
                format!("{} {}s", n, unit)
            }
        })
        .collect();

    match parts.split_last() {
        None => "0 seconds".to_string(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}
