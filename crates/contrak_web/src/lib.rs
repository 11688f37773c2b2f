//! Server-rendered list of connected contracts.

pub mod views;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use contrak_core::{ApiError, ContrakClient, ContrakConfig};
use serde::Deserialize;
use tracing::{error, info};

use crate::views::{Selection, Templates, cards_for, history_cards};

/// Shared, read-only state for all requests.
#[derive(Clone)]
pub struct AppState {
    client: ContrakClient,
    templates: Arc<Templates>,
}

impl AppState {
    pub fn new(client: ContrakClient) -> Result<Self> {
        let templates = Templates::new().context("failed to compile page templates")?;
        Ok(Self {
            client,
            templates: Arc::new(templates),
        })
    }
}

/// Errors a page handler can surface to the browser.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("backend request failed: {0}")]
    Backend(#[from] ApiError),

    #[error("template rendering failed: {0}")]
    Render(#[from] minijinja::Error),
}

/// A page error paired with the templates needed to render it.
struct ErrorPage {
    error: PageError,
    templates: Arc<Templates>,
}

impl IntoResponse for ErrorPage {
    fn into_response(self) -> Response {
        let status = match self.error {
            PageError::Backend(_) => StatusCode::BAD_GATEWAY,
            PageError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("{}", self.error);
        let body = self
            .templates
            .error()
            .unwrap_or_else(|_| "Something went wrong".to_string());
        (status, Html(body)).into_response()
    }
}

impl AppState {
    fn fail(&self, error: impl Into<PageError>) -> ErrorPage {
        ErrorPage {
            error: error.into(),
            templates: self.templates.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct HistoryQuery {
    /// Kept as text so a malformed id only loses the highlight.
    #[serde(rename = "contractId")]
    contract_id: Option<String>,
    #[serde(rename = "contractAddress")]
    contract_address: Option<String>,
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, ErrorPage> {
    let records = state
        .client
        .get_all_contracts()
        .await
        .map_err(|e| state.fail(e))?;
    let html = state
        .templates
        .index(&cards_for(&records))
        .map_err(|e| state.fail(e))?;
    Ok(Html(html))
}

async fn history(
    State(state): State<AppState>,
    Path(history_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ErrorPage> {
    let records = state
        .client
        .get_all_contracts()
        .await
        .map_err(|e| state.fail(e))?;
    let selection = Selection {
        contract_id: query
            .contract_id
            .as_deref()
            .and_then(|id| id.trim().parse().ok()),
        contract_address: query.contract_address,
    };
    let cards = history_cards(&records, &history_id, &selection);
    let html = state
        .templates
        .history(&history_id, &cards)
        .map_err(|e| state.fail(e))?;

    let status = if cards.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    Ok((status, Html(html)).into_response())
}

async fn healthz() -> &'static str {
    "ok"
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/contracts/history/{history_id}", get(history))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Bind `config.web_addr` and serve until Ctrl-C.
pub async fn serve(config: &ContrakConfig) -> Result<()> {
    let api_url = config.require_api_url()?;
    let client = ContrakClient::new(api_url)?;
    let app = router(AppState::new(client)?);

    let listener = tokio::net::TcpListener::bind(config.web_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.web_addr))?;
    info!(addr = %config.web_addr, api = %api_url, "contrak web listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("web server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fake_backend() -> Router {
        Router::new().route(
            "/contracts",
            get(|| async {
                Json(serde_json::json!([
                    {
                        "id": 1,
                        "name": "Counter",
                        "contractHistoryId": "counter",
                        "chainId": "11155111",
                        "contractAddress": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
                        "gitUsername": "alice",
                        "createdAt": "2024-03-05T14:07:00Z"
                    },
                    {
                        "id": 2,
                        "name": "Counter",
                        "contractHistoryId": "counter",
                        "chainId": "11155111",
                        "contractAddress": "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512",
                        "createdAt": "2024-03-06T09:00:00Z"
                    },
                    {
                        "id": 3,
                        "name": "Token",
                        "contractHistoryId": "token",
                        "chainId": "1",
                        "contractAddress": "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0",
                        "createdAt": "2024-03-04T08:00:00Z"
                    }
                ]))
            }),
        )
    }

    async fn frontend(backend: Router) -> String {
        let api = spawn(backend).await;
        let state = AppState::new(ContrakClient::new(api).unwrap()).unwrap();
        spawn(router(state)).await
    }

    #[tokio::test]
    async fn index_lists_all_contracts() {
        let web = frontend(fake_backend()).await;
        let response = reqwest::get(format!("{web}/")).await.unwrap();
        assert_eq!(response.status(), 200);

        let html = response.text().await.unwrap();
        assert!(html.contains("Counter"));
        assert!(html.contains("Token"));
        assert!(html.contains("Sepolia - 0x5FbDB2315678afecb367f032d93F642f64180aa3"));
        assert!(html.contains("by alice"));
        // Newest deployment first.
        let newer = html.find("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512").unwrap();
        let older = html.find("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0").unwrap();
        assert!(newer < older);
    }

    #[tokio::test]
    async fn backend_failure_renders_error_page() {
        let backend = Router::new().route(
            "/contracts",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "db down") }),
        );
        let web = frontend(backend).await;
        let response = reqwest::get(format!("{web}/")).await.unwrap();
        assert_eq!(response.status(), 502);
        assert!(response.text().await.unwrap().contains("Something went wrong"));
    }

    #[tokio::test]
    async fn history_shows_only_matching_deployments() {
        let web = frontend(fake_backend()).await;
        let response = reqwest::get(format!("{web}/contracts/history/counter?contractId=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let html = response.text().await.unwrap();
        assert!(!html.contains("Token"));
        assert_eq!(html.matches("<article class=\"card").count(), 2);
        assert_eq!(html.matches("card selected").count(), 1);
        assert!(html.contains("id=\"contract-1\""));
    }

    #[tokio::test]
    async fn history_selects_by_contract_address() {
        let web = frontend(fake_backend()).await;
        let url = format!(
            "{web}/contracts/history/counter?contractAddress=0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"
        );
        let html = reqwest::get(url).await.unwrap().text().await.unwrap();
        let selected = html.find("card selected").unwrap();
        let second = html.find("id=\"contract-2\"").unwrap();
        assert!(selected < second);
    }

    #[tokio::test]
    async fn malformed_contract_id_selects_nothing() {
        let web = frontend(fake_backend()).await;
        for query in ["contractId=", "contractId=abc"] {
            let response = reqwest::get(format!("{web}/contracts/history/counter?{query}"))
                .await
                .unwrap();
            assert_eq!(response.status(), 200, "{query}");

            let html = response.text().await.unwrap();
            assert_eq!(html.matches("<article class=\"card").count(), 2);
            assert!(!html.contains("card selected"), "{query}");
        }
    }

    #[tokio::test]
    async fn unknown_history_is_not_found() {
        let web = frontend(fake_backend()).await;
        let response = reqwest::get(format!("{web}/contracts/history/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        assert!(
            response
                .text()
                .await
                .unwrap()
                .contains("No deployments recorded for this contract.")
        );
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let web = frontend(fake_backend()).await;
        let body = reqwest::get(format!("{web}/healthz"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }
}
