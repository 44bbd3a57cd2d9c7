use axum::Json;
use serde_json::{json, Value};

/// `GET /version` -> `{"version": "<crate version>"}`.
pub async fn version_handler() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_crate_version() {
        let Json(body) = version_handler().await;
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
