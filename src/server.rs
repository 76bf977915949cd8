//! HTTP surface serving the current exchange rate.
//!
//! Each request fetches a fresh rate, stores it, and returns it as JSON. The
//! response is only built once the fetch outcome is known, so a failed fetch
//! answers 500 rather than a committed 200.

use crate::core::{Error, RateProvider, RateRepository};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub const EXCHANGE_RATE_ENDPOINT: &str = "/exchange-rate";
pub const ERR_NOT_FOUND: &str = "error: endpoint not found";
pub const ERR_FETCHING_API: &str = "error fetching exchange rate from external API";

/// Handles shared by every request, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn RateProvider>,
    pub repository: Arc<dyn RateRepository>,
    pub fetch_timeout: Duration,
    pub persist_timeout: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(EXCHANGE_RATE_ENDPOINT, any(exchange_rate))
        .fallback(not_found)
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(address = %addr, "Exchange rate server started");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Exchange rate server stopped");
    Ok(())
}

async fn exchange_rate(State(state): State<AppState>) -> Response {
    let reading = match state.provider.fetch_rate(state.fetch_timeout).await {
        Ok(reading) => reading,
        Err(e) => {
            error!(error = %e, category = e.category(), "{ERR_FETCHING_API}");
            return (StatusCode::INTERNAL_SERVER_ERROR, ERR_FETCHING_API).into_response();
        }
    };

    match state
        .repository
        .persist(&reading, state.persist_timeout)
        .await
    {
        Ok(persisted) => debug!(id = persisted.id, "Stored exchange rate"),
        Err(e) => log_store_error(&e),
    }

    (StatusCode::OK, Json(reading)).into_response()
}

fn log_store_error(e: &Error) {
    error!(
        error = %e,
        category = e.category(),
        timeout = e.is_timeout(),
        "Failed to store exchange rate"
    );
}

async fn not_found() -> impl IntoResponse {
    warn!("{ERR_NOT_FOUND}");
    (StatusCode::NOT_FOUND, ERR_NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PersistedRate, RateReading};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProvider {
        calls: AtomicUsize,
        bid: Option<&'static str>,
    }

    impl FakeProvider {
        fn new(bid: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                bid,
            })
        }
    }

    #[async_trait]
    impl RateProvider for FakeProvider {
        async fn fetch_rate(&self, _timeout: Duration) -> Result<RateReading, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.bid {
                Some(bid) => Ok(RateReading::new(bid)),
                None => Err(Error::Status(reqwest::StatusCode::BAD_GATEWAY)),
            }
        }
    }

    struct FakeRepository {
        rows: Mutex<Vec<PersistedRate>>,
        fail: bool,
    }

    impl FakeRepository {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(Vec::new()),
                fail,
            })
        }

        fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RateRepository for FakeRepository {
        async fn persist(
            &self,
            reading: &RateReading,
            timeout: Duration,
        ) -> Result<PersistedRate, Error> {
            if self.fail {
                return Err(Error::StoreTimeout(timeout));
            }
            let mut rows = self.rows.lock().unwrap();
            let row = PersistedRate {
                id: rows.len() as i64 + 1,
                bid: reading.bid().to_string(),
                created_at: chrono::Utc::now(),
            };
            rows.push(row.clone());
            Ok(row)
        }

        async fn recent(&self, limit: u32) -> Result<Vec<PersistedRate>, Error> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().rev().take(limit as usize).cloned().collect())
        }
    }

    async fn spawn(provider: Arc<FakeProvider>, repository: Arc<FakeRepository>) -> String {
        let state = AppState {
            provider,
            repository,
            fetch_timeout: Duration::from_millis(200),
            persist_timeout: Duration::from_millis(10),
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state, std::future::pending()));
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_other_path_is_not_found_without_fetching() {
        let provider = FakeProvider::new(Some("5.25"));
        let repository = FakeRepository::new(false);
        let base = spawn(provider.clone(), repository.clone()).await;

        let response = reqwest::get(format!("{base}/other-path")).await.unwrap();

        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(response.text().await.unwrap(), ERR_NOT_FOUND);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(repository.len(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_internal_error_without_persisting() {
        let provider = FakeProvider::new(None);
        let repository = FakeRepository::new(false);
        let base = spawn(provider.clone(), repository.clone()).await;

        let response = reqwest::get(format!("{base}{EXCHANGE_RATE_ENDPOINT}"))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 500);
        assert_eq!(response.text().await.unwrap(), ERR_FETCHING_API);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(repository.len(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_invisible_to_caller() {
        let provider = FakeProvider::new(Some("5.25"));
        let repository = FakeRepository::new(true);
        let base = spawn(provider, repository).await;

        let response = reqwest::get(format!("{base}{EXCHANGE_RATE_ENDPOINT}"))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "application/json"
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!({"bid": "5.25"}));
    }

    #[tokio::test]
    async fn test_endpoint_answers_any_method() {
        let provider = FakeProvider::new(Some("5.25"));
        let repository = FakeRepository::new(false);
        let base = spawn(provider.clone(), repository.clone()).await;

        let response = reqwest::Client::new()
            .post(format!("{base}{EXCHANGE_RATE_ENDPOINT}"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.text().await.unwrap(), r#"{"bid":"5.25"}"#);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(repository.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_requests_add_rows_with_identical_bodies() {
        let provider = FakeProvider::new(Some("5.30"));
        let repository = FakeRepository::new(false);
        let base = spawn(provider, repository.clone()).await;

        let url = format!("{base}{EXCHANGE_RATE_ENDPOINT}");
        let first = reqwest::get(&url).await.unwrap().text().await.unwrap();
        let second = reqwest::get(&url).await.unwrap().text().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, r#"{"bid":"5.30"}"#);
        assert_eq!(repository.len(), 2);
    }
}
