//! Agenda query service.
//!
//! Fetches one local day of events from the primary calendar and shapes
//! them into [`AgendaEvent`]s with resolved colour labels.

use std::future::Future;
use std::pin::Pin;

use agenda_core::{AgendaEvent, ColorTable, day_bounds};
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::ProviderResult;

use super::client::GoogleCalendarClient;

/// Calendar the agenda is read from.
pub const PRIMARY_CALENDAR: &str = "primary";

/// A boxed future for async trait methods.
///
/// Boxing keeps [`AgendaSource`] object-safe so handlers can hold a
/// `dyn AgendaSource`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Anything that can produce the events of a day.
pub trait AgendaSource: Send + Sync {
    /// Events starting on `date` (local time), ordered by start; all-day
    /// events first, in provider order.
    fn events_for_day(&self, date: NaiveDate) -> BoxFuture<'_, ProviderResult<Vec<AgendaEvent>>>;
}

/// Reads the agenda from Google Calendar.
#[derive(Debug, Clone)]
pub struct AgendaService {
    client: GoogleCalendarClient,
    colors: ColorTable,
}

impl AgendaService {
    /// Creates the service, loading the provider's colour palette once.
    ///
    /// A palette failure is logged and the built-in categories are used
    /// alone.
    pub async fn connect(client: GoogleCalendarClient) -> Self {
        let colors = match client.event_colors().await {
            Ok(definitions) => {
                debug!("loaded {} event colour definitions", definitions.len());
                ColorTable::with_definitions(definitions)
            }
            Err(e) => {
                warn!("unable to retrieve calendar colors: {}", e);
                ColorTable::default()
            }
        };
        Self::new(client, colors)
    }

    /// Creates the service with a prepared colour table.
    pub fn new(client: GoogleCalendarClient, colors: ColorTable) -> Self {
        Self { client, colors }
    }

    /// The colour table in use.
    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    async fn fetch_day(&self, date: NaiveDate) -> ProviderResult<Vec<AgendaEvent>> {
        let (start, end) = day_bounds(date);
        let raw = self.client.list_events(PRIMARY_CALENDAR, start, end).await?;

        let mut events: Vec<AgendaEvent> = raw
            .iter()
            .map(|event| event.to_agenda_event(&self.colors))
            .collect();
        // Stable: all-day events (no start) keep provider order ahead of timed ones.
        events.sort_by_key(|event| event.start);

        debug!("{} events on {}", events.len(), date);
        Ok(events)
    }
}

impl AgendaSource for AgendaService {
    fn events_for_day(&self, date: NaiveDate) -> BoxFuture<'_, ProviderResult<Vec<AgendaEvent>>> {
        Box::pin(self.fetch_day(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::authorized::AuthorizedClient;
    use crate::google::config::OAuthClientConfig;
    use crate::google::oauth::OAuthClient;
    use crate::google::tokens::OAuthToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleCalendarClient {
        let oauth = OAuthClient::new(OAuthClientConfig::new("id", "secret")).unwrap();
        let authorized = AuthorizedClient::new(oauth, OAuthToken::new("ya29.test"), None);
        GoogleCalendarClient::new(authorized).with_base_url(server.uri())
    }

    async fn respond(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_raw(body, "application/json"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn connect_uses_palette_and_orders_events() {
        let server = MockServer::start().await;
        respond(
            &server,
            "/colors",
            200,
            r##"{"event": {"12": {"background": "#fbd75b"}}}"##,
        )
        .await;
        respond(
            &server,
            "/calendars/primary/events",
            200,
            r#"{"items": [
                {"summary": "Late", "colorId": "12", "start": {"dateTime": "2024-12-25T15:00:00Z"}, "end": {"dateTime": "2024-12-25T16:00:00Z"}},
                {"summary": "Holiday", "start": {"date": "2024-12-25"}, "end": {"date": "2024-12-26"}},
                {"summary": "Early", "colorId": "99", "start": {"dateTime": "2024-12-25T08:00:00Z"}, "end": {"dateTime": "2024-12-25T09:00:00Z"}},
                {"summary": "Office closed", "start": {"date": "2024-12-25"}, "end": {"date": "2024-12-26"}}
            ]}"#,
        )
        .await;

        let service = AgendaService::connect(client(&server)).await;
        assert_eq!(service.colors().definition_count(), 1);

        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        let events = service.events_for_day(date).await.unwrap();

        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Holiday", "Office closed", "Early", "Late"]);
        assert_eq!(events[2].color.label, "Color 99");
        assert_eq!(events[3].color.label, "Category 12");
        assert_eq!(events[3].color.indicator, "🟡");
    }

    #[tokio::test]
    async fn palette_failure_is_not_fatal() {
        let server = MockServer::start().await;
        respond(&server, "/colors", 500, "{}").await;
        respond(&server, "/calendars/primary/events", 200, r#"{"items": []}"#).await;

        let service = AgendaService::connect(client(&server)).await;
        assert_eq!(service.colors().definition_count(), 0);

        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        assert!(service.events_for_day(date).await.unwrap().is_empty());
    }
}
