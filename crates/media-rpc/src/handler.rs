//! JSON-RPC request handlers.

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use catalog_media::{
    ConsistencyEngine, EntityDescriptor, EntityKey, MediaError, Result, UploadRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }

    fn from_media_error(id: Option<Value>, err: &MediaError) -> Self {
        let mut response = Self::error(id, err.to_rpc_error_code(), err.to_string());
        if let Some(error) = response.error.as_mut() {
            error.data = Some(json!({ "retryable": err.is_retryable() }));
        }
        response
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

fn get_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a Value> {
    params.get(snake).or_else(|| params.get(camel))
}

/// Extract an optional string parameter, supporting both snake_case and camelCase.
fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    get_param(params, snake, camel).and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
fn require_str_param(params: &Value, snake: &str, camel: &str) -> Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| MediaError::validation(snake, "missing required parameter"))
}

fn get_bool_param(params: &Value, snake: &str, camel: &str) -> Option<bool> {
    get_param(params, snake, camel).and_then(|v| v.as_bool())
}

fn require_i64_param(params: &Value, snake: &str, camel: &str) -> Result<i64> {
    get_param(params, snake, camel)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| MediaError::validation(snake, "missing required integer parameter"))
}

/// Entity ids arrive as strings or numbers.
fn require_entity(params: &Value) -> Result<EntityKey> {
    let entity_type = require_str_param(params, "entity_type", "entityType")?;
    let entity_id = match get_param(params, "entity_id", "entityId") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(MediaError::validation("entity_id", "missing required parameter")),
    };
    Ok(EntityKey::new(entity_type, entity_id))
}

// ============================================================================
// Engine execution
// ============================================================================

/// Run an engine call on the blocking pool, bounded by the operation timeout.
///
/// With `entity`, the call holds that entity's lock (and the shared side of
/// the sweep gate) until it finishes, even if the caller has already timed
/// out.
async fn run_engine<T, F>(state: &AppState, entity: Option<EntityKey>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&ConsistencyEngine) -> Result<T> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    let locks = state.locks.clone();
    let gate = Arc::clone(&state.sweep_gate);

    let work = async move {
        let guards = match entity {
            Some(entity) => {
                let shared = gate.read_owned().await;
                Some((shared, locks.lock(&entity).await))
            }
            None => None,
        };
        tokio::task::spawn_blocking(move || {
            let _guards = guards;
            op(&engine)
        })
        .await
    };

    match tokio::time::timeout(state.timeout, work).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(MediaError::Other(format!("Media task failed: {}", e))),
        Err(_) => Err(MediaError::Timeout(state.timeout)),
    }
}

/// Entity that owns an asset.
async fn entity_of(state: &AppState, asset_id: i64) -> Result<EntityKey> {
    run_engine(state, None, move |engine| Ok(engine.get(asset_id)?.entity())).await
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            (
                StatusCode::OK,
                Json(JsonRpcResponse::from_media_error(id, &e)),
            )
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

async fn dispatch_method(state: &AppState, method: &str, params: &Value) -> Result<Value> {
    match method {
        "list_media" => list_media(state, params).await,
        "get_media" => get_media(state, params).await,
        "upload_media" => upload_media(state, params).await,
        "delete_media" => delete_media(state, params).await,
        "reorder_media" => reorder_media(state, params).await,
        "set_preview" => set_preview(state, params).await,
        "set_media_alt" => set_media_alt(state, params).await,
        "rename_media" => rename_media(state, params).await,
        "reconcile_media" => reconcile_media(state, params).await,
        _ => {
            warn!("Method not found: {}", method);
            Err(MediaError::Other(format!("Method not found: {}", method)))
        }
    }
}

async fn list_media(state: &AppState, params: &Value) -> Result<Value> {
    let entity = require_entity(params)?;
    let key = entity.clone();
    let media = run_engine(state, Some(entity), move |engine| engine.list(&key)).await?;
    Ok(json!({
        "success": true,
        "media": serde_json::to_value(media)?
    }))
}

async fn get_media(state: &AppState, params: &Value) -> Result<Value> {
    let asset_id = require_i64_param(params, "asset_id", "assetId")?;
    let asset = run_engine(state, None, move |engine| engine.get(asset_id)).await?;
    Ok(json!({
        "success": true,
        "media": serde_json::to_value(asset)?
    }))
}

async fn upload_media(state: &AppState, params: &Value) -> Result<Value> {
    let entity = require_entity(params)?;
    let temp_path = staged_path(state, &require_str_param(params, "temp_path", "tempPath")?)?;
    // Falls back to the extension of the original name, then the temp file.
    let extension = get_str_param(params, "extension", "extension")
        .map(String::from)
        .or_else(|| {
            get_str_param(params, "original_name", "originalName").and_then(extension_of_path)
        })
        .or_else(|| temp_path.to_str().and_then(extension_of_path))
        .unwrap_or_default();
    let descriptor = match get_param(params, "descriptor", "descriptor") {
        Some(Value::Null) | None => None,
        Some(value) => Some(serde_json::from_value::<EntityDescriptor>(value.clone())?),
    };

    let request = UploadRequest {
        entity: entity.clone(),
        temp_path,
        extension,
        alt: get_str_param(params, "alt", "alt").map(String::from),
        descriptor,
    };
    let asset = run_engine(state, Some(entity), move |engine| engine.upload(&request)).await?;
    Ok(json!({
        "success": true,
        "media": serde_json::to_value(asset)?
    }))
}

/// Resolve an upload's temp path; it must name a file inside the staging directory.
fn staged_path(state: &AppState, raw: &str) -> Result<PathBuf> {
    let resolved = std::fs::canonicalize(raw)
        .map_err(|e| MediaError::validation("temp_path", format!("{}: {}", raw, e)))?;
    if resolved.starts_with(&state.staging_dir) && resolved != state.staging_dir {
        Ok(resolved)
    } else {
        Err(MediaError::validation(
            "temp_path",
            format!("{} is outside the upload staging directory", raw),
        ))
    }
}

fn extension_of_path(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
}

async fn delete_media(state: &AppState, params: &Value) -> Result<Value> {
    let asset_id = require_i64_param(params, "asset_id", "assetId")?;
    let entity = entity_of(state, asset_id).await?;
    let report = run_engine(state, Some(entity), move |engine| engine.delete(asset_id)).await?;
    Ok(json!({
        "success": true,
        "report": serde_json::to_value(report)?
    }))
}

async fn reorder_media(state: &AppState, params: &Value) -> Result<Value> {
    let entity = require_entity(params)?;
    let ordered_ids: Vec<i64> = match get_param(params, "ordered_ids", "orderedIds") {
        Some(value) => serde_json::from_value(value.clone())?,
        None => return Err(MediaError::validation("ordered_ids", "missing required parameter")),
    };
    let key = entity.clone();
    let report = run_engine(state, Some(entity), move |engine| {
        engine.reorder(&key, &ordered_ids)
    })
    .await?;
    Ok(json!({
        "success": true,
        "report": serde_json::to_value(report)?
    }))
}

async fn set_preview(state: &AppState, params: &Value) -> Result<Value> {
    let asset_id = require_i64_param(params, "asset_id", "assetId")?;
    let entity = entity_of(state, asset_id).await?;
    let report = run_engine(state, Some(entity), move |engine| engine.set_preview(asset_id)).await?;
    Ok(json!({
        "success": true,
        "report": serde_json::to_value(report)?
    }))
}

async fn set_media_alt(state: &AppState, params: &Value) -> Result<Value> {
    let asset_id = require_i64_param(params, "asset_id", "assetId")?;
    let alt = get_str_param(params, "alt", "alt").map(String::from);
    let entity = entity_of(state, asset_id).await?;
    let asset = run_engine(state, Some(entity), move |engine| {
        engine.set_alt(asset_id, alt.as_deref())
    })
    .await?;
    Ok(json!({
        "success": true,
        "media": serde_json::to_value(asset)?
    }))
}

/// Re-run the rename of an entity, e.g. after a partial failure.
async fn rename_media(state: &AppState, params: &Value) -> Result<Value> {
    let entity = require_entity(params)?;
    let key = entity.clone();
    let report = run_engine(state, Some(entity), move |engine| {
        let descriptor = engine.descriptor_for(&key)?;
        engine.rename_all(&key, &descriptor)
    })
    .await?;
    Ok(json!({
        "success": report.is_complete(),
        "report": serde_json::to_value(report)?
    }))
}

async fn reconcile_media(state: &AppState, params: &Value) -> Result<Value> {
    let entity_type = require_str_param(params, "entity_type", "entityType")?;
    let purge = get_bool_param(params, "purge_quarantine", "purgeQuarantine").unwrap_or(false);

    let engine = Arc::clone(&state.engine);
    let gate = Arc::clone(&state.sweep_gate);
    let work = async move {
        let exclusive = gate.write_owned().await;
        tokio::task::spawn_blocking(move || {
            let _exclusive = exclusive;
            let report = engine.reconcile(&entity_type, purge)?;
            let repair = engine.entities_needing_repair(&report)?;
            Ok::<_, MediaError>((report, repair))
        })
        .await
    };
    let (report, repair) = match tokio::time::timeout(state.timeout, work).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => return Err(MediaError::Other(format!("Media task failed: {}", e))),
        Err(_) => return Err(MediaError::Timeout(state.timeout)),
    };

    Ok(json!({
        "success": true,
        "clean": report.is_clean(),
        "report": serde_json::to_value(report)?,
        "needsRepair": serde_json::to_value(repair)?
    }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use axum::body::Body;
    use axum::http::Request;
    use catalog_media::{LocalFileOps, MediaLayout, MemoryDescriptors, SqliteMediaStore};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_state(temp_dir: &TempDir) -> Arc<AppState> {
        let descriptors = MemoryDescriptors::new();
        descriptors.insert(
            EntityKey::new("modules", "7"),
            EntityDescriptor::with_identifier("Шкаф-1"),
        );
        let engine = ConsistencyEngine::new(
            MediaLayout::new(temp_dir.path().join("storage"), "uploads"),
            Arc::new(SqliteMediaStore::in_memory().unwrap()),
            Arc::new(LocalFileOps),
            Arc::new(descriptors),
        );
        let staging_dir = temp_dir.path().join("staging");
        std::fs::create_dir_all(&staging_dir).unwrap();
        Arc::new(AppState::new(engine, staging_dir, Duration::from_secs(10)))
    }

    async fn call(state: &Arc<AppState>, method: &str, params: Value) -> Value {
        let body = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1});
        let request = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router(Arc::clone(state)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upload(state: &Arc<AppState>, temp_dir: &TempDir, name: &str) -> i64 {
        let temp_path = temp_dir.path().join("staging").join(name);
        std::fs::write(&temp_path, name).unwrap();
        let response = call(
            state,
            "upload_media",
            json!({
                "entityType": "modules",
                "entityId": 7,
                "tempPath": temp_path.to_string_lossy(),
                "originalName": "photo.JPG"
            }),
        )
        .await;
        response["result"]["media"]["id"].as_i64().unwrap()
    }

    #[test]
    fn test_json_rpc_response_success() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({"data": "test"}));
        assert!(response.error.is_none());
        assert!(response.result.is_some());
    }

    #[test]
    fn test_json_rpc_response_carries_retryable_flag() {
        let err = MediaError::PartialRename {
            entity: "modules/7".into(),
            failed: 1,
        };
        let response = JsonRpcResponse::from_media_error(Some(json!(1)), &err);
        let error = response.error.unwrap();
        assert_eq!(error.code, -32003);
        assert_eq!(error.data, Some(json!({"retryable": true})));
    }

    #[test]
    fn test_param_helpers_accept_both_cases() {
        let params = json!({"entityType": "kits", "entity_id": "k1"});
        let entity = require_entity(&params).unwrap();
        assert_eq!(entity, EntityKey::new("kits", "k1"));
        assert!(require_i64_param(&params, "asset_id", "assetId").is_err());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_list_and_preview() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        let first = upload(&state, &temp_dir, "a").await;
        let second = upload(&state, &temp_dir, "b").await;

        let listed = call(&state, "list_media", json!({"entity_type": "modules", "entity_id": "7"})).await;
        let media = listed["result"]["media"].as_array().unwrap();
        assert_eq!(media.len(), 2);
        assert_eq!(media[0]["url"], "/uploads/modules/shkaf-1/shkaf-1_1.jpg");

        let preview = call(&state, "set_preview", json!({"assetId": second})).await;
        assert_eq!(preview["result"]["success"], true);

        let listed = call(&state, "list_media", json!({"entityType": "modules", "entityId": "7"})).await;
        let ids: Vec<i64> = listed["result"]["media"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_reorder_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        let a = upload(&state, &temp_dir, "a").await;
        let b = upload(&state, &temp_dir, "b").await;
        let c = upload(&state, &temp_dir, "c").await;

        let reordered = call(
            &state,
            "reorder_media",
            json!({"entityType": "modules", "entityId": "7", "orderedIds": [c, b, a]}),
        )
        .await;
        assert_eq!(reordered["result"]["success"], true);

        let deleted = call(&state, "delete_media", json!({"asset_id": b})).await;
        assert_eq!(deleted["result"]["success"], true);

        let got = call(&state, "get_media", json!({"assetId": a})).await;
        assert_eq!(got["result"]["media"]["position"], 1);
        assert_eq!(
            got["result"]["media"]["url"],
            "/uploads/modules/shkaf-1/shkaf-1_2.jpg"
        );

        let sweep = call(&state, "reconcile_media", json!({"entityType": "modules"})).await;
        assert_eq!(sweep["result"]["clean"], true);
    }

    #[tokio::test]
    async fn test_upload_outside_staging_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        let outside = temp_dir.path().join("secret.jpg");
        std::fs::write(&outside, "secret").unwrap();
        let sneaky = temp_dir.path().join("staging").join("..").join("secret.jpg");

        for path in [&outside, &sneaky] {
            let response = call(
                &state,
                "upload_media",
                json!({
                    "entityType": "modules",
                    "entityId": "7",
                    "tempPath": path.to_string_lossy(),
                    "extension": "jpg"
                }),
            )
            .await;
            assert_eq!(response["error"]["code"], -32005);
        }
        assert!(outside.exists());

        let listed = call(&state, "list_media", json!({"entityType": "modules", "entityId": "7"})).await;
        assert!(listed["result"]["media"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_media_alt() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        let id = upload(&state, &temp_dir, "a").await;

        let updated = call(&state, "set_media_alt", json!({"assetId": id, "alt": "Front"})).await;
        assert_eq!(updated["result"]["media"]["alt"], "Front");
    }

    #[tokio::test]
    async fn test_error_codes() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);

        let missing = call(&state, "get_media", json!({"assetId": 404})).await;
        assert_eq!(missing["error"]["code"], -32002);

        let invalid = call(&state, "get_media", json!({})).await;
        assert_eq!(invalid["error"]["code"], -32005);

        let bad_order = call(
            &state,
            "reorder_media",
            json!({"entityType": "modules", "entityId": "7", "orderedIds": []}),
        )
        .await;
        assert_eq!(bad_order["error"]["code"], -32005);
        assert_eq!(bad_order["error"]["data"]["retryable"], false);

        let unknown = call(&state, "no_such_method", json!({})).await;
        assert!(unknown["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Method not found"));

        let health = call(&state, "health_check", Value::Null).await;
        assert_eq!(health["result"]["status"], "ok");
    }
}
