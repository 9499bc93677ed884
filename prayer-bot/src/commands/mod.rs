//! Bot commands. [`CommandRouter`] is the chain handler; each command lives in its own module.

mod broadcast;
mod router;
mod start;
mod stop;
mod times;

pub use broadcast::BroadcastCommand;
pub use router::{Command, CommandContext, CommandRouter, Reply};
pub use start::{StartCommand, ALREADY_ACTIVE_TEXT, INTRO_TEXT};
pub use stop::{StopCommand, STOPPED_TEXT};
pub use times::{NextCommand, TodayCommand, TomorrowCommand, LAST_DAY_TEXT, UNAVAILABLE_TEXT};

use pbot_core::BotError;

pub(crate) fn storage_error(e: storage::StorageError) -> BotError {
    BotError::Database(e.to_string())
}

pub(crate) fn timetable_error(e: crate::timetable::TimetableError) -> BotError {
    BotError::Upstream(e.to_string())
}
