//! Daily reminder timers, one tokio task per chat.
//!
//! Each task loads the day's times, sleeps until every prayer that is still ahead, and then sleeps
//! until the next local midnight to do the same for the following day.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use pbot_core::{Bot, Chat};
use storage::{Repository, UserRepository};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::prayer::{local_datetime, remaining_today, Prayer};
use crate::timetable::TimetableCache;

pub fn reminder_text(prayer: Prayer) -> String {
    format!("It's time for {}!", prayer)
}

pub struct ReminderScheduler {
    bot: Arc<dyn Bot>,
    repo: Arc<UserRepository>,
    timetable: Arc<TimetableCache>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    jobs: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl ReminderScheduler {
    pub fn new(
        bot: Arc<dyn Bot>,
        repo: Arc<UserRepository>,
        timetable: Arc<TimetableCache>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            bot,
            repo,
            timetable,
            clock,
            offset,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.offset)
    }

    /// Starts the daily timer for `chat_id`, replacing any timer it already has.
    pub async fn schedule_daily(self: &Arc<Self>, chat_id: i64) {
        let mut jobs = self.jobs.lock().await;
        if let Some(old) = jobs.remove(&chat_id) {
            old.abort();
            debug!(chat_id, "Replaced existing reminder task");
        }

        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move { scheduler.daily_loop(chat_id).await });
        jobs.insert(chat_id, handle);
        info!(chat_id, "Scheduled daily reminders");
    }

    /// Stops the timer of `chat_id`. Returns false when it had none.
    pub async fn cancel(&self, chat_id: i64) -> bool {
        match self.jobs.lock().await.remove(&chat_id) {
            Some(handle) => {
                handle.abort();
                info!(chat_id, "Cancelled reminders");
                true
            }
            None => false,
        }
    }

    /// Aborts every timer.
    pub async fn shutdown(&self) {
        let mut jobs = self.jobs.lock().await;
        let count = jobs.len();
        for (_, handle) in jobs.drain() {
            handle.abort();
        }
        info!(count, "Reminder scheduler stopped");
    }

    /// Schedules every active chat in the repository. Returns how many were scheduled.
    pub async fn restore(self: &Arc<Self>) -> Result<usize, storage::StorageError> {
        let users = self.repo.list_active().await?;
        for user in &users {
            self.schedule_daily(user.id).await;
        }
        info!(count = users.len(), "Restored reminders for active chats");
        Ok(users.len())
    }

    /// Chat ids that currently have a timer, sorted.
    pub async fn scheduled(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.jobs.lock().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Sends the reminder for `prayer` if the chat is still active. Returns whether it was sent.
    pub async fn remind(&self, chat_id: i64, prayer: Prayer) -> bool {
        match self.repo.get(chat_id).await {
            Ok(Some(user)) if user.active => {}
            Ok(_) => {
                debug!(chat_id, prayer = %prayer, "Chat inactive, skipping reminder");
                return false;
            }
            Err(e) => {
                error!(chat_id, error = %e, "Failed to load chat for reminder");
                return false;
            }
        }

        match self
            .bot
            .send_message(&Chat::private(chat_id), &reminder_text(prayer))
            .await
        {
            Ok(()) => {
                info!(chat_id, prayer = %prayer, "Sent prayer reminder");
                true
            }
            Err(e) => {
                warn!(chat_id, prayer = %prayer, error = %e, "Failed to send prayer reminder");
                false
            }
        }
    }

    async fn sleep_until(&self, at: DateTime<FixedOffset>) {
        self.clock.sleep_until(at.with_timezone(&Utc)).await;
    }

    async fn daily_loop(self: Arc<Self>, chat_id: i64) {
        loop {
            let now = self.local_now();
            self.register_day(chat_id, now).await;

            let tomorrow = now.date_naive() + Duration::days(1);
            let midnight = local_datetime(tomorrow, NaiveTime::MIN, self.offset);
            self.sleep_until(midnight).await;
        }
    }

    async fn register_day(&self, chat_id: i64, now: DateTime<FixedOffset>) {
        match self.repo.get(chat_id).await {
            Ok(Some(user)) if user.active => {}
            Ok(_) => return,
            Err(e) => {
                error!(chat_id, error = %e, "Failed to load chat, skipping today's reminders");
                return;
            }
        }

        let timetable = match self.timetable.get(now.date_naive()).await {
            Ok(timetable) => timetable,
            Err(e) => {
                error!(chat_id, error = %e, "No prayer times, skipping today's reminders");
                return;
            }
        };

        let pending = remaining_today(&timetable, now);
        info!(chat_id, count = pending.len(), "Registering today's prayers");
        for (prayer, at) in pending {
            self.sleep_until(at).await;
            self.remind(chat_id, prayer).await;
        }
    }
}
