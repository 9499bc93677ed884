//! Timetable sources. [`HttpTimetableSource`] scrapes the first HTML table of the configured page.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client as HttpClient, Url};
use tracing::{info, instrument, warn};

use super::TimetableError;
use crate::oauth::OAuthClient;
use crate::prayer::{DayTimes, Prayer};

static TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table\b.*?</table>").expect("static regex compile"));
static ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("static regex compile"));
static CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("static regex compile"));
static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("static regex compile"));

/// Columns 2..8 of each row hold the six times.
const FIRST_TIME_COLUMN: usize = 2;
const MIN_CELLS: usize = FIRST_TIME_COLUMN + 6;

/// Fetches the current month's rows, one [`DayTimes`] per day starting with the 1st.
#[async_trait]
pub trait TimetableSource: Send + Sync {
    async fn fetch_month(&self) -> Result<Vec<DayTimes>, TimetableError>;
}

pub struct HttpTimetableSource {
    http: HttpClient,
    url: Url,
    oauth: Option<Arc<OAuthClient>>,
}

impl HttpTimetableSource {
    pub fn new(http: HttpClient, url: Url) -> Self {
        Self {
            http,
            url,
            oauth: None,
        }
    }

    /// Sends a bearer token from `oauth` with every request.
    pub fn with_oauth(mut self, oauth: Arc<OAuthClient>) -> Self {
        self.oauth = Some(oauth);
        self
    }
}

#[async_trait]
impl TimetableSource for HttpTimetableSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_month(&self) -> Result<Vec<DayTimes>, TimetableError> {
        let mut request = self.http.get(self.url.clone());
        if let Some(oauth) = &self.oauth {
            request = request.bearer_auth(oauth.access_token().await?);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TimetableError::Request(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                if let Some(oauth) = &self.oauth {
                    oauth.invalidate().await;
                }
            }
            return Err(TimetableError::Status(status.as_u16()));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| TimetableError::Request(e.to_string()))?;
        let days = parse_timetable_html(&html)?;
        info!(days = days.len(), "Fetched prayer timetable");
        Ok(days)
    }
}

fn cell_text(raw: &str) -> String {
    TAG.replace_all(raw, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

/// Parses the first `<table>`: the header row is skipped, rows with fewer than 8 cells are skipped,
/// Fajr is moved 2 minutes earlier and Maghrib 2 minutes later.
///
/// Row order is day order, so a day row with an unparsable time rejects the whole page.
pub fn parse_timetable_html(html: &str) -> Result<Vec<DayTimes>, TimetableError> {
    let table = TABLE.find(html).ok_or(TimetableError::NoTable)?.as_str();

    let mut days = Vec::new();
    for (index, row) in ROW.captures_iter(table).skip(1).enumerate() {
        let cells: Vec<String> = CELL
            .captures_iter(&row[1])
            .map(|c| cell_text(&c[1]))
            .collect();
        if cells.len() < MIN_CELLS {
            continue;
        }

        let mut times = Vec::with_capacity(6);
        for cell in &cells[FIRST_TIME_COLUMN..MIN_CELLS] {
            match parse_time(cell) {
                Some(time) => times.push(time),
                None => {
                    warn!(row = index + 1, value = %cell, "Unparsable time in timetable row");
                    return Err(TimetableError::BadRow {
                        row: index + 1,
                        value: cell.clone(),
                    });
                }
            }
        }

        times[Prayer::Fajr as usize] -= Duration::minutes(2);
        times[Prayer::Maghrib as usize] += Duration::minutes(2);

        let mut array = [NaiveTime::MIN; 6];
        array.copy_from_slice(&times);
        days.push(DayTimes::new(array));
    }

    if days.is_empty() {
        return Err(TimetableError::NoRows);
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, times: [&str; 6]) -> String {
        let cells: String = times.iter().map(|t| format!("<td>{}</td>", t)).collect();
        format!("<tr><td>{}</td><td>Fri</td>{}</tr>", day, cells)
    }

    fn page(rows: &[String]) -> String {
        format!(
            "<html><body><h1>Moscow</h1><table class=\"times\">\
             <tr><th>Day</th><th>Weekday</th><th>Fajr</th><th>Sunrise</th><th>Dhuhr</th>\
             <th>Asr</th><th>Maghrib</th><th>Isha</th></tr>{}</table>\
             <table><tr><td>other</td></tr></table></body></html>",
            rows.concat()
        )
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    #[test]
    fn test_parse_applies_fajr_and_maghrib_shift() {
        let html = page(&[row(1, ["05:12", "06:50", "12:30", "15:40", "18:18", "19:50"])]);

        let days = parse_timetable_html(&html).unwrap();

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].get(Prayer::Fajr), t("05:10"));
        assert_eq!(days[0].get(Prayer::Sunrise), t("06:50"));
        assert_eq!(days[0].get(Prayer::Maghrib), t("18:20"));
        assert_eq!(days[0].get(Prayer::Isha), t("19:50"));
    }

    #[test]
    fn test_parse_skips_short_rows_and_strips_markup() {
        let html = page(&[
            row(1, ["05:12", "06:50", "12:30", "15:40", "18:18", "19:50"]),
            "<tr><td colspan=\"8\">Ramadan starts</td></tr>".to_string(),
            row(2, ["<b>05:15</b>", "06:54", "12:29", "15:36", "18:14", "&nbsp;19:46"]),
        ]);

        let days = parse_timetable_html(&html).unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[1].get(Prayer::Fajr), t("05:13"));
        assert_eq!(days[1].get(Prayer::Isha), t("19:46"));
    }

    #[test]
    fn test_parse_rejects_unparsable_day_row() {
        let html = page(&[
            row(1, ["05:12", "06:50", "12:30", "15:40", "18:18", "19:50"]),
            row(2, ["--", "06:52", "12:30", "15:38", "18:16", "19:48"]),
        ]);

        match parse_timetable_html(&html) {
            Err(TimetableError::BadRow { row, value }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "--");
            }
            other => panic!("expected BadRow, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_without_table() {
        assert!(matches!(
            parse_timetable_html("<html><p>maintenance</p></html>"),
            Err(TimetableError::NoTable)
        ));
    }

    #[test]
    fn test_parse_without_rows() {
        assert!(matches!(
            parse_timetable_html(&page(&[])),
            Err(TimetableError::NoRows)
        ));
    }
}
