//! Monthly prayer timetable: where it comes from ([`source`]) and how it is cached ([`cache`]).

mod cache;
mod source;

pub use cache::TimetableCache;
pub use source::{parse_timetable_html, HttpTimetableSource, TimetableSource};

use thiserror::Error;

use crate::oauth::OAuthError;

#[derive(Error, Debug)]
pub enum TimetableError {
    #[error("timetable request failed: {0}")]
    Request(String),

    #[error("timetable server returned HTTP {0}")]
    Status(u16),

    #[error("no prayer time table found on the page")]
    NoTable,

    #[error("no valid prayer time rows found")]
    NoRows,

    #[error("row {row} has an unparsable time {value:?}")]
    BadRow { row: usize, value: String },

    #[error(transparent)]
    Auth(#[from] OAuthError),
}
