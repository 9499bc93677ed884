//! Reminder scheduler tests. The clock is pinned, so a timer only fires when a prayer starts exactly "now",
//! except where a `ManualClock` jumps through the day.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use prayer_bot::prayer::Prayer;
use prayer_bot::scheduler::reminder_text;
use storage::{Repository, UserRecord};

#[test]
fn test_reminder_text() {
    assert_eq!(reminder_text(Prayer::Maghrib), "It's time for Maghrib!");
}

/// **Test: remind only reaches active chats.**
///
/// **Setup:** One active and one inactive record.
/// **Action:** `remind` for both and for an unknown chat.
/// **Expected:** Only the active chat receives a plain-text reminder.
#[tokio::test]
async fn test_remind_checks_active_flag() {
    let f = fixture().await;
    let repo = &f.components.repo;
    repo.put(&UserRecord::new(1)).await.unwrap();
    repo.put(&UserRecord::new(2).with_active(false)).await.unwrap();
    let scheduler = &f.components.scheduler;

    assert!(scheduler.remind(1, Prayer::Asr).await);
    assert!(!scheduler.remind(2, Prayer::Asr).await);
    assert!(!scheduler.remind(3, Prayer::Asr).await);

    let sent = f.bot.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, 1);
    assert_eq!(sent[0].text, "It's time for Asr!");
    assert!(!sent[0].markdown);
}

#[tokio::test]
async fn test_remind_delivery_failure_is_not_fatal() {
    let f = fixture_at(moscow_time(15, 10, 0), MockBot::failing_for(1)).await;
    f.components.repo.put(&UserRecord::new(1)).await.unwrap();

    assert!(!f.components.scheduler.remind(1, Prayer::Fajr).await);
}

/// **Test: scheduling twice keeps one task; cancel and shutdown remove tasks.**
#[tokio::test]
async fn test_schedule_cancel_and_shutdown() {
    let f = fixture().await;
    let scheduler = &f.components.scheduler;

    scheduler.schedule_daily(1).await;
    scheduler.schedule_daily(1).await;
    scheduler.schedule_daily(2).await;
    assert_eq!(scheduler.scheduled().await, vec![1, 2]);

    assert!(scheduler.cancel(1).await);
    assert!(!scheduler.cancel(1).await);
    assert_eq!(scheduler.scheduled().await, vec![2]);

    scheduler.shutdown().await;
    assert!(scheduler.scheduled().await.is_empty());
}

/// **Test: restore schedules only active chats.**
#[tokio::test]
async fn test_restore_schedules_active_chats() {
    let f = fixture().await;
    let repo = &f.components.repo;
    repo.put(&UserRecord::new(10)).await.unwrap();
    repo.put(&UserRecord::new(11).with_active(false)).await.unwrap();
    repo.put(&UserRecord::new(12)).await.unwrap();

    let count = f.components.scheduler.restore().await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(f.components.scheduler.scheduled().await, vec![10, 12]);
    f.components.scheduler.shutdown().await;
}

/// **Test: the daily timer sends the reminder of a prayer that starts now.**
///
/// **Setup:** Clock pinned to 15 March 12:30 local (Dhuhr), active chat.
/// **Action:** `schedule_daily`.
/// **Expected:** "It's time for Dhuhr!" arrives; earlier prayers of the day are not sent.
#[tokio::test]
async fn test_daily_timer_fires_due_prayer() {
    let f = fixture_at(moscow_time(15, 12, 30), MockBot::default()).await;
    f.components.repo.put(&UserRecord::new(1)).await.unwrap();

    f.components.scheduler.schedule_daily(1).await;

    assert!(eventually(|| !f.bot.sent().is_empty()).await);
    let sent = f.bot.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "It's time for Dhuhr!");
    f.components.scheduler.shutdown().await;
}

/// **Test: inactive chats get no reminders even when a timer is running.**
#[tokio::test]
async fn test_daily_timer_skips_inactive_chat() {
    let f = fixture_at(moscow_time(15, 12, 30), MockBot::default()).await;
    f.components
        .repo
        .put(&UserRecord::new(1).with_active(false))
        .await
        .unwrap();

    f.components.scheduler.schedule_daily(1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(f.bot.sent().is_empty());
    f.components.scheduler.shutdown().await;
}

/// **Test: a timer started late in the evening rolls over to the next day.**
///
/// **Setup:** Manual clock at 15 March 23:00 local that stops at 16 March 12:00; active chat.
/// **Action:** `schedule_daily`.
/// **Expected:** Nothing more is sent for the 15th. After midnight the 16th's Fajr (05:16) and
/// Sunrise arrive, in that order, and each is sent once.
#[tokio::test]
async fn test_daily_timer_rolls_over_midnight() {
    let clock = Arc::new(ManualClock::new(
        moscow_time(15, 23, 0),
        moscow_time(16, 12, 0),
    ));
    let f = fixture_with_clock(clock.clone(), MockBot::default()).await;
    f.components.repo.put(&UserRecord::new(1)).await.unwrap();

    f.components.scheduler.schedule_daily(1).await;

    assert!(eventually(|| f.bot.sent().len() >= 2).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let texts: Vec<String> = f.bot.sent().into_iter().map(|s| s.text).collect();
    assert_eq!(texts, vec!["It's time for Fajr!", "It's time for Sunrise!"]);
    assert_eq!(
        clock.wakes(),
        vec![
            moscow_time(16, 0, 0),
            moscow_time(16, 5, 16),
            moscow_time(16, 6, 50),
        ]
    );
    assert_eq!(f.source.fetches(), 1);
    f.components.scheduler.shutdown().await;
}
