//! Text mode: prints the agenda of a day to stdout.

use chrono::{Local, NaiveDate};

use agenda_core::{AgendaHeading, parse_agenda_date, render_agenda};
use agenda_providers::AgendaSource;
use agenda_providers::google::{AgendaService, GoogleCalendarClient};

use crate::cli::AuthArgs;
use crate::commands::auth;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Authorizes, then prints the agenda for `date` (default: today).
///
/// A malformed date is rejected before authorization starts.
pub async fn run(date: Option<&str>, args: &AuthArgs, config: &ClientConfig) -> ClientResult<()> {
    let date = date.map(parse_agenda_date).transpose()?;

    println!("🔐 Running authentication flow...");
    let client = auth::authorize(args, config)
        .await
        .map_err(ClientError::Auth)?;
    println!("✅ Authentication successful! Token saved.");

    let service = AgendaService::connect(GoogleCalendarClient::new(client)).await;
    match date {
        None => println!("📅 Fetching today's agenda..."),
        Some(date) => println!("📅 Fetching agenda for {}...", date),
    }

    let text = agenda_text(&service, date).await?;
    print!("{}", text);
    Ok(())
}

/// Reads and renders one day. `None` means the current local day.
pub async fn agenda_text(source: &dyn AgendaSource, date: Option<NaiveDate>) -> ClientResult<String> {
    let (heading, what) = match date {
        None => (
            AgendaHeading::Today(Local::now().date_naive()),
            "today's events".to_string(),
        ),
        Some(date) => (AgendaHeading::Date(date), format!("events for {}", date)),
    };

    let events = source
        .events_for_day(heading.date())
        .await
        .map_err(|source| ClientError::Query { what, source })?;
    Ok(render_agenda(heading, &events))
}

#[cfg(test)]
mod tests {
    use super::*;

    use agenda_core::AgendaEvent;
    use agenda_providers::{BoxFuture, ProviderError, ProviderResult};

    struct FixedSource {
        events: Vec<AgendaEvent>,
        fail: bool,
    }

    impl AgendaSource for FixedSource {
        fn events_for_day(&self, _: NaiveDate) -> BoxFuture<'_, ProviderResult<Vec<AgendaEvent>>> {
            let result = if self.fail {
                Err(ProviderError::server("backend unavailable"))
            } else {
                Ok(self.events.clone())
            };
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn renders_requested_day() {
        let source = FixedSource {
            events: vec![AgendaEvent::all_day("Holiday").with_location("Home")],
            fail: false,
        };
        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();

        let text = agenda_text(&source, Some(date)).await.unwrap();
        assert!(text.starts_with("📅 Daily Agenda for Wednesday, December 25, 2024"));
        assert!(text.contains("Holiday (All day)"));
        assert!(text.contains("📍 Home"));
    }

    #[tokio::test]
    async fn empty_today() {
        let source = FixedSource {
            events: Vec::new(),
            fail: false,
        };
        let text = agenda_text(&source, None).await.unwrap();
        assert!(text.contains("No events scheduled for today!"));
    }

    #[tokio::test]
    async fn query_failure_names_the_day() {
        let source = FixedSource {
            events: Vec::new(),
            fail: true,
        };
        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();

        let err = agenda_text(&source, Some(date)).await.unwrap_err();
        assert!(
            err.to_string()
                .starts_with("Failed to get events for 2024-12-25: ")
        );
    }

    #[tokio::test]
    async fn malformed_date_rejected_before_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let args = AuthArgs {
            credentials: Some(dir.path().join("missing.json")),
            ..AuthArgs::default()
        };

        let err = run(Some("12-25-2024"), &args, &ClientConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidDate(_)));
    }
}
