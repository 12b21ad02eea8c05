//! Google Calendar API client.
//!
//! Low-level access to the two endpoints the agenda needs: the event list of
//! a calendar and the colour palette.

use std::collections::BTreeMap;

use agenda_core::{AgendaEvent, ColorTable};
use chrono::{DateTime, Local};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

use super::authorized::AuthorizedClient;

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    authorized: AuthorizedClient,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Creates a client for the public API.
    pub fn new(authorized: AuthorizedClient) -> Self {
        Self {
            authorized,
            base_url: CALENDAR_API_BASE.to_string(),
        }
    }

    /// Points the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lists single (expanded) events of a calendar starting within
    /// `[time_min, time_max)`, ordered by start time, across all pages.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Local>,
        time_max: DateTime<Local>,
    ) -> ProviderResult<Vec<ApiEvent>> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("showDeleted", "false".to_string()),
                ("orderBy", "startTime".to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: EventListResponse = self.get_json(&url, &query).await?;
            events.extend(
                page.items
                    .into_iter()
                    .filter(|e| e.status.as_deref() != Some("cancelled")),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("fetched {} events from calendar {}", events.len(), calendar_id);
        Ok(events)
    }

    /// Fetches the event colour palette: identifier to background hex.
    pub async fn event_colors(&self) -> ProviderResult<BTreeMap<String, String>> {
        let url = format!("{}/colors", self.base_url);
        let colors: ColorsResponse = self.get_json(&url, &[]).await?;

        Ok(colors
            .event
            .into_iter()
            .map(|(id, definition)| (id, definition.background))
            .collect())
    }

    async fn get_json<T>(&self, url: &str, query: &[(&str, String)]) -> ProviderResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let access_token = self.authorized.access_token().await?;

        let response = self
            .authorized
            .http_client()
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    format!("request failed: {}", e)
                };
                ProviderError::network(message).with_source(e)
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            )));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::denied("access denied to calendar"));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::server(format!(
                "API error ({}): {}",
                status, body
            )));
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).with_source(e)
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .with_source(e)
        })
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    /// Event identifier.
    pub id: Option<String>,
    /// Title.
    pub summary: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Free-text location.
    pub location: Option<String>,
    /// Palette identifier.
    pub color_id: Option<String>,
    /// Start time or date.
    #[serde(default)]
    pub start: ApiEventTime,
    /// End time or date.
    #[serde(default)]
    pub end: ApiEventTime,
    /// `confirmed`, `tentative` or `cancelled`.
    pub status: Option<String>,
}

/// Event time from the API: `dateTime` for timed events, `date` for all-day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    /// Calendar date (`YYYY-MM-DD`) of an all-day event.
    pub date: Option<String>,
    /// RFC 3339 timestamp of a timed event.
    pub date_time: Option<String>,
}

impl ApiEvent {
    /// Shapes the API event for display, resolving its colour via `colors`.
    pub fn to_agenda_event(&self, colors: &ColorTable) -> AgendaEvent {
        let title = self.summary.clone().unwrap_or_default();

        let start = self.start.date_time.as_deref().and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| warn!("failed to parse start time {:?}: {}", raw, e))
                .ok()
        });

        let mut event = match start {
            Some(start) => {
                let end = self.end.date_time.as_deref().and_then(|raw| {
                    DateTime::parse_from_rfc3339(raw)
                        .map_err(|e| warn!("failed to parse end time {:?}: {}", raw, e))
                        .ok()
                });
                AgendaEvent::timed(title, start, end)
            }
            None => AgendaEvent::all_day(title),
        };

        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            event = event.with_location(location);
        }
        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            event = event.with_description(description);
        }
        event.with_color(colors.resolve(self.color_id.as_deref()))
    }
}

/// Response from the colors endpoint.
#[derive(Debug, Deserialize)]
struct ColorsResponse {
    #[serde(default)]
    event: BTreeMap<String, ColorDefinition>,
}

#[derive(Debug, Deserialize)]
struct ColorDefinition {
    #[serde(default)]
    background: String,
}
