//! `/today`, `/tomorrow` and `/next [prayer]`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use pbot_core::Result;

use super::{timetable_error, Command, CommandContext, Reply};
use crate::prayer::{escape_markdown, format_day, format_duration, next_prayer, Prayer};
use crate::timetable::TimetableCache;

pub const LAST_DAY_TEXT: &str = "Sorry, this feature doesn't work on the last day of the month yet :(";
pub const UNAVAILABLE_TEXT: &str = "Sorry, prayer times are not available right now. Please try again later.";

pub struct TodayCommand {
    timetable: Arc<TimetableCache>,
}

impl TodayCommand {
    pub fn new(timetable: Arc<TimetableCache>) -> Self {
        Self { timetable }
    }
}

#[async_trait]
impl Command for TodayCommand {
    fn name(&self) -> &'static str {
        "today"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let today = ctx.now.date_naive();
        let timetable = self.timetable.get(today).await.map_err(timetable_error)?;
        Ok(match timetable.day(today) {
            Some(day) => Reply::Markdown(format_day("Today's prayer times", day)),
            None => Reply::Text(UNAVAILABLE_TEXT.to_string()),
        })
    }
}

pub struct TomorrowCommand {
    timetable: Arc<TimetableCache>,
}

impl TomorrowCommand {
    pub fn new(timetable: Arc<TimetableCache>) -> Self {
        Self { timetable }
    }
}

#[async_trait]
impl Command for TomorrowCommand {
    fn name(&self) -> &'static str {
        "tomorrow"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let today = ctx.now.date_naive();
        let timetable = self.timetable.get(today).await.map_err(timetable_error)?;

        let tomorrow = today + Duration::days(1);
        if !timetable.covers(today) {
            return Ok(Reply::Text(UNAVAILABLE_TEXT.to_string()));
        }
        if !timetable.covers(tomorrow) {
            return Ok(Reply::Text(LAST_DAY_TEXT.to_string()));
        }
        Ok(match timetable.day(tomorrow) {
            Some(day) => Reply::Markdown(format_day("Tomorrow's prayer times", day)),
            None => Reply::Text(UNAVAILABLE_TEXT.to_string()),
        })
    }
}

pub struct NextCommand {
    timetable: Arc<TimetableCache>,
}

impl NextCommand {
    pub fn new(timetable: Arc<TimetableCache>) -> Self {
        Self { timetable }
    }
}

#[async_trait]
impl Command for NextCommand {
    fn name(&self) -> &'static str {
        "next"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let requested = if ctx.args.is_empty() {
            None
        } else {
            match ctx.args.parse::<Prayer>() {
                Ok(prayer) => Some(prayer),
                Err(_) => {
                    return Ok(Reply::Text(format!(
                        "Unknown value for prayer time\nAvailable values are: {}",
                        Prayer::names()
                    )))
                }
            }
        };

        let timetable = self
            .timetable
            .get(ctx.now.date_naive())
            .await
            .map_err(timetable_error)?;

        match next_prayer(&timetable, ctx.now, requested) {
            Some((prayer, at)) => Ok(Reply::Markdown(format!(
                "The next {} is in {} \\(at {}\\)",
                prayer,
                escape_markdown(&format_duration(at - ctx.now)),
                at.format("%H:%M")
            ))),
            None => {
                let what = requested.map_or_else(|| "prayer".to_string(), |p| p.to_string());
                Ok(Reply::Text(format!(
                    "Sorry, cannot find the next {} time\nCannot cross the month boundary (yet)",
                    what
                )))
            }
        }
    }
}
