//! Holds one month of times; refetches when the month changes and falls back to the stale month on failure.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{TimetableError, TimetableSource};
use crate::prayer::MonthTimetable;

pub struct TimetableCache {
    source: Arc<dyn TimetableSource>,
    cached: Mutex<Option<Arc<MonthTimetable>>>,
}

impl TimetableCache {
    pub fn new(source: Arc<dyn TimetableSource>) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    /// Timetable for the month containing `today`.
    ///
    /// When the refetch fails, the previous month is returned if one is cached; callers then find no
    /// entry for `today` and report the times as unavailable.
    pub async fn get(&self, today: NaiveDate) -> Result<Arc<MonthTimetable>, TimetableError> {
        let mut cached = self.cached.lock().await;
        if let Some(timetable) = cached.as_ref() {
            if timetable.covers(today) {
                return Ok(timetable.clone());
            }
        }

        info!(year = today.year(), month = today.month(), "Fetching fresh prayer times");
        match self.source.fetch_month().await {
            Ok(days) => {
                let timetable = Arc::new(MonthTimetable::new(today.year(), today.month(), days));
                info!(
                    days = timetable.days.len(),
                    year = timetable.year,
                    month = timetable.month,
                    "Cached prayer times"
                );
                *cached = Some(timetable.clone());
                Ok(timetable)
            }
            Err(e) => match cached.as_ref() {
                Some(stale) => {
                    warn!(
                        error = %e,
                        year = stale.year,
                        month = stale.month,
                        "Failed to fetch prayer times, using cached month as fallback"
                    );
                    Ok(stale.clone())
                }
                None => {
                    error!(error = %e, "Failed to fetch prayer times and no cache available");
                    Err(e)
                }
            },
        }
    }
}
