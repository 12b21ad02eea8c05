//! The agenda tools.
//!
//! `ToolHandler` is an rmcp `ServerHandler`: rmcp answers the handshake and
//! `tools/list` from the `#[tool]` methods below and routes `tools/call` to
//! them. Failures of a single call come back as `isError` results and never
//! end the session.

use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::service::RoleServer;
use rmcp::transport::IntoTransport;
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt, schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use tracing::{Span, debug, info, warn};

use agenda_core::{AgendaHeading, parse_agenda_date, render_agenda};
use agenda_providers::{AgendaSource, ProviderError};

use crate::error::{ServerError, ServerResult};

/// Name announced in the `initialize` handshake.
pub const SERVER_NAME: &str = "google-calendar-agenda";

/// Tool returning the current day's agenda.
pub const TODAY_TOOL: &str = "get_todays_agenda";

/// Tool returning the agenda of a given date.
pub const DATE_TOOL: &str = "get_agenda_for_date";

/// Arguments of `get_agenda_for_date`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DateRequest {
    /// Date in YYYY-MM-DD format (e.g., 2024-12-25)
    #[schemars(regex(pattern = r"^\d{4}-\d{2}-\d{2}$"))]
    pub date: String,
}

/// Serves the agenda tools against an agenda source.
#[derive(Clone)]
pub struct ToolHandler {
    source: Arc<dyn AgendaSource>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandler").finish_non_exhaustive()
    }
}

#[tool_router]
impl ToolHandler {
    /// Creates a handler reading from `source`.
    pub fn new(source: Arc<dyn AgendaSource>) -> Self {
        Self {
            source,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Get today's agenda from Google Calendar for the user")]
    async fn get_todays_agenda(&self) -> Result<CallToolResult, McpError> {
        let today = Local::now().date_naive();
        Ok(match self.agenda(AgendaHeading::Today(today)).await {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => CallToolResult::error(vec![Content::text(format!(
                "Error getting calendar events: {e}"
            ))]),
        })
    }

    #[tool(description = "Get agenda from Google Calendar for a specific date")]
    async fn get_agenda_for_date(
        &self,
        Parameters(DateRequest { date: raw }): Parameters<DateRequest>,
    ) -> Result<CallToolResult, McpError> {
        // The source is only reached with a date that passed the format check.
        let date = match parse_agenda_date(&raw) {
            Ok(date) => date,
            Err(e) => {
                debug!(date = %raw, "rejected agenda date");
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Error getting calendar events for {raw}: {e}"
                ))]));
            }
        };

        Ok(match self.agenda(AgendaHeading::Date(date)).await {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => CallToolResult::error(vec![Content::text(format!(
                "Error getting calendar events for {raw}: {e}"
            ))]),
        })
    }
}

impl ToolHandler {
    /// Serves on stdin/stdout until the client disconnects.
    pub async fn serve_stdio(self) -> ServerResult<()> {
        self.serve_on(rmcp::transport::stdio()).await
    }

    /// Serves on any rmcp transport until the peer goes away.
    pub async fn serve_on<T, E, A>(self, transport: T) -> ServerResult<()>
    where
        T: IntoTransport<RoleServer, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let session = self
            .serve(transport)
            .await
            .map_err(|e| ServerError::init(e.to_string()))?;
        info!("MCP session started");

        let reason = session.waiting().await?;
        info!(?reason, "MCP session ended");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(date = %heading.date(), duration_ms))]
    async fn agenda(&self, heading: AgendaHeading) -> Result<String, ProviderError> {
        let start = Instant::now();
        let result = self.source.events_for_day(heading.date()).await;

        let duration = start.elapsed();
        Span::current().record("duration_ms", duration.as_millis());
        match result {
            Ok(events) => {
                debug!(count = events.len(), "agenda fetched");
                Ok(render_agenda(heading, &events))
            }
            Err(e) => {
                warn!(error = %e, "failed to read agenda");
                Err(e)
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for ToolHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Reads the user's primary Google Calendar. Dates are YYYY-MM-DD in local time."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use agenda_core::AgendaEvent;
    use agenda_providers::{BoxFuture, ProviderResult};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rmcp::model::CallToolRequestParam;
    use serde_json::json;

    #[derive(Default)]
    struct FakeSource {
        events: Vec<AgendaEvent>,
        fail: bool,
        calls: Mutex<Vec<NaiveDate>>,
    }

    impl AgendaSource for FakeSource {
        fn events_for_day(
            &self,
            date: NaiveDate,
        ) -> BoxFuture<'_, ProviderResult<Vec<AgendaEvent>>> {
            self.calls.lock().unwrap().push(date);
            let result = if self.fail {
                Err(ProviderError::network("connection reset"))
            } else {
                Ok(self.events.clone())
            };
            Box::pin(async move { result })
        }
    }

    fn handler(source: FakeSource) -> (ToolHandler, Arc<FakeSource>) {
        let source = Arc::new(source);
        (ToolHandler::new(source.clone()), source)
    }

    fn for_date(date: &str) -> Parameters<DateRequest> {
        Parameters(DateRequest {
            date: date.to_string(),
        })
    }

    fn text(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|content| content.as_text())
            .map(|content| content.text.clone())
            .collect()
    }

    #[test]
    fn server_info_announces_tools() {
        let (handler, _) = handler(FakeSource::default());
        let info = handler.get_info();

        assert_eq!(info.server_info.name, SERVER_NAME);
        assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn router_lists_both_tools() {
        let (handler, _) = handler(FakeSource::default());
        let tools = handler.tool_router.list_all();
        let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_ref()).collect();

        assert!(names.contains(&TODAY_TOOL));
        assert!(names.contains(&DATE_TOOL));

        let date_tool = tools.iter().find(|tool| tool.name == DATE_TOOL).unwrap();
        assert_eq!(date_tool.input_schema.get("required"), Some(&json!(["date"])));
        assert!(date_tool.input_schema["properties"]["date"].is_object());
    }

    #[tokio::test]
    async fn agenda_for_date_renders_events() {
        let start = Utc.with_ymd_and_hms(2024, 12, 25, 9, 0, 0).unwrap().fixed_offset();
        let (handler, source) = handler(FakeSource {
            events: vec![AgendaEvent::timed("Standup", start, None)],
            ..FakeSource::default()
        });

        let result = handler
            .get_agenda_for_date(for_date("2024-12-25"))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(false));
        let text = text(&result);
        assert!(text.contains("Wednesday, December 25, 2024"));
        assert!(text.contains("Standup"));
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec![NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()]
        );
    }

    #[tokio::test]
    async fn empty_day_is_not_an_error() {
        let (handler, _) = handler(FakeSource::default());
        let result = handler
            .get_agenda_for_date(for_date("2024-12-25"))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(false));
        assert!(text(&result).contains("No events scheduled for this day!"));
    }

    #[tokio::test]
    async fn malformed_date_never_reaches_source() {
        let (handler, source) = handler(FakeSource::default());

        for date in ["12-25-2024", "2024-02-30", "2024-1-05"] {
            let result = handler.get_agenda_for_date(for_date(date)).await.unwrap();
            assert_eq!(result.is_error, Some(true));
            assert!(text(&result).starts_with(&format!("Error getting calendar events for {date}")));
        }
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remote_failure_becomes_tool_error() {
        let (handler, _) = handler(FakeSource {
            fail: true,
            ..FakeSource::default()
        });

        let result = handler.get_todays_agenda().await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).starts_with("Error getting calendar events: "));

        let result = handler
            .get_agenda_for_date(for_date("2024-12-25"))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).starts_with("Error getting calendar events for 2024-12-25: "));
    }

    #[tokio::test]
    async fn today_tool_queries_current_day() {
        let (handler, source) = handler(FakeSource::default());
        let result = handler.get_todays_agenda().await.unwrap();

        assert!(text(&result).contains("No events scheduled for today!"));
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec![Local::now().date_naive()]
        );
    }

    #[tokio::test]
    async fn session_over_a_pipe() {
        let (handler, source) = handler(FakeSource::default());
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(handler.serve_on(server_io));

        let client = ().serve(client_io).await.unwrap();
        let info = client.peer_info().unwrap();
        assert_eq!(info.server_info.name, SERVER_NAME);

        let tools = client.list_all_tools().await.unwrap();
        assert_eq!(tools.len(), 2);

        let result = client
            .call_tool(CallToolRequestParam {
                name: DATE_TOOL.into(),
                arguments: json!({ "date": "12-25-2024" }).as_object().cloned(),
            })
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));

        // A call without the required argument is rejected by rmcp itself.
        let missing = client
            .call_tool(CallToolRequestParam {
                name: DATE_TOOL.into(),
                arguments: json!({}).as_object().cloned(),
            })
            .await;
        assert!(missing.is_err());
        assert!(source.calls.lock().unwrap().is_empty());

        client.cancel().await.unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn peer_gone_before_handshake() {
        let (handler, _) = handler(FakeSource::default());
        let (server_io, client_io) = tokio::io::duplex(1024);
        drop(client_io);

        let err = handler.serve_on(server_io).await.unwrap_err();
        assert!(matches!(err, ServerError::Init { .. }));
    }
}
