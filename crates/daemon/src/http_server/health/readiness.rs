use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::*;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Ready once the vault is unsealed and its store answers
#[tracing::instrument(skip(data_src))]
pub async fn handler(data_src: StateDataSource) -> Response {
    let (status, message) = match timeout(HEALTH_CHECK_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => {
            return (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
        }
        Ok(Err(e @ DataSourceError::Sealed)) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        Ok(Err(e @ DataSourceError::StoreUnavailable)) => {
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "health check timed out".to_string(),
        ),
    };

    let msg = serde_json::json!({"status": "failure", "message": message});
    (status, Json(msg)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    use crate::http_server::health::data_source::tests::*;

    #[tokio::test]
    async fn test_handler_direct() {
        let response = handler(StateDataSource::new(Arc::new(MockReadiness::Ready))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handler(StateDataSource::new(Arc::new(MockReadiness::Sealed))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = handler(StateDataSource::new(Arc::new(
            MockReadiness::StoreUnavailable,
        )))
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
