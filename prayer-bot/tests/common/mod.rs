//! Shared fixtures: a recording bot, a scripted timetable source, and fixed or manual clocks.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use pbot_core::{Bot, BotError, Chat, Message, MessageDirection, User};
use prayer_bot::clock::{Clock, FixedClock};
use prayer_bot::prayer::DayTimes;
use prayer_bot::timetable::{TimetableCache, TimetableError, TimetableSource};
use prayer_bot::BotComponents;
use storage::UserRepository;
use tempfile::TempDir;

pub const ADMIN_CHAT: i64 = 1000;
pub const BOT_USERNAME: &str = "prayer_bot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub chat_id: i64,
    pub text: String,
    pub markdown: bool,
}

/// Records every outgoing message; sends to `failing_chat` return a transport error.
#[derive(Default)]
pub struct MockBot {
    pub sent: Mutex<Vec<Sent>>,
    pub failing_chat: Option<i64>,
}

impl MockBot {
    pub fn failing_for(chat_id: i64) -> Self {
        Self {
            failing_chat: Some(chat_id),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, chat: &Chat, text: &str, markdown: bool) -> pbot_core::Result<()> {
        if self.failing_chat == Some(chat.id) {
            return Err(BotError::Transport("chat not found".to_string()));
        }
        self.sent.lock().unwrap().push(Sent {
            chat_id: chat.id,
            text: text.to_string(),
            markdown,
        });
        Ok(())
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn send_message(&self, chat: &Chat, text: &str) -> pbot_core::Result<()> {
        self.record(chat, text, false)
    }

    async fn send_markdown(&self, chat: &Chat, text: &str) -> pbot_core::Result<()> {
        self.record(chat, text, true)
    }
}

/// Returns `days` (or fails when `None`) and counts fetches.
pub struct StaticSource {
    pub days: Mutex<Option<Vec<DayTimes>>>,
    pub fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(days: Option<Vec<DayTimes>>) -> Self {
        Self {
            days: Mutex::new(days),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, days: Option<Vec<DayTimes>>) {
        *self.days.lock().unwrap() = days;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimetableSource for StaticSource {
    async fn fetch_month(&self) -> Result<Vec<DayTimes>, TimetableError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.days
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TimetableError::Request("connection refused".to_string()))
    }
}

/// Clock whose `sleep_until` jumps straight to the target instant and records it.
/// Waits past `horizon` never return, which ends a reminder loop deterministically.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    horizon: DateTime<Utc>,
    wakes: Mutex<Vec<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, horizon: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            horizon,
            wakes: Mutex::new(Vec::new()),
        }
    }

    /// Instants the clock was advanced to, in order.
    pub fn wakes(&self) -> Vec<DateTime<Utc>> {
        self.wakes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep_until(&self, at: DateTime<Utc>) {
        if at > self.horizon {
            std::future::pending::<()>().await;
        }
        {
            let mut now = self.now.lock().unwrap();
            if at > *now {
                *now = at;
            }
            self.wakes.lock().unwrap().push(at);
        }
        tokio::task::yield_now().await;
    }
}

pub fn t(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

/// `n` days; Fajr of day `d` is 05:00 + d minutes, the other times are fixed.
pub fn sample_month(n: u32) -> Vec<DayTimes> {
    (1..=n)
        .map(|d| {
            DayTimes::new([
                t("05:00") + Duration::minutes(i64::from(d)),
                t("06:50"),
                t("12:30"),
                t("15:40"),
                t("18:20"),
                t("19:50"),
            ])
        })
        .collect()
}

pub fn moscow() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap()
}

/// UTC instant of a Moscow wall-clock time in March 2024.
pub fn moscow_time(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    moscow()
        .with_ymd_and_hms(2024, 3, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn message(chat_id: i64, text: &str) -> Message {
    Message {
        id: "1".to_string(),
        user: User {
            id: chat_id,
            username: Some("tester".to_string()),
            first_name: None,
            last_name: None,
        },
        chat: Chat::private(chat_id),
        content: text.to_string(),
        message_type: "text".to_string(),
        direction: MessageDirection::Incoming,
        created_at: Utc::now(),
    }
}

pub struct Fixture {
    pub components: BotComponents,
    pub bot: Arc<MockBot>,
    pub source: Arc<StaticSource>,
    _dir: TempDir,
}

pub async fn fixture_at(now: DateTime<Utc>, bot: MockBot) -> Fixture {
    fixture_with_clock(Arc::new(FixedClock(now)), bot).await
}

pub async fn fixture_with_clock(clock: Arc<dyn Clock>, bot: MockBot) -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("bot.db");
    let repo = Arc::new(UserRepository::connect(db.to_str().unwrap()).await.unwrap());
    let bot = Arc::new(bot);
    let source = Arc::new(StaticSource::new(Some(sample_month(31))));
    let timetable = Arc::new(TimetableCache::new(source.clone()));

    let components = BotComponents::new(
        repo,
        bot.clone(),
        timetable,
        clock,
        moscow(),
    )
    .with_bot_username(BOT_USERNAME);
    Fixture {
        components,
        bot,
        source,
        _dir: dir,
    }
}

/// 15 March 2024, 10:00 Moscow time.
pub async fn fixture() -> Fixture {
    fixture_at(moscow_time(15, 10, 0), MockBot::default()).await
}

/// Polls `check` every 10ms for up to 5 seconds.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..500 {
        if check() {
            return true;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    false
}
