//! In-process fake API for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Semaphore;

use authwire_core::{AccessToken, ApiResponse, Method, RequestSpec, Result, TokenPair, Transport};

/// Fake server with rotating refresh tokens.
///
/// Accepts exactly one access token at a time. `/auth/refresh` rotates both
/// tokens (`aN`/`rN`) and rejects any refresh token but the current one.
/// Paths starting with `/always-401` are rejected whatever the token.
pub struct FakeApi {
    state: Mutex<FakeState>,
    refresh_fails: AtomicBool,
    refresh_gate: Option<Semaphore>,
    refresh_calls: AtomicUsize,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

struct FakeState {
    access: String,
    refresh: String,
    rotation: u32,
}

impl FakeApi {
    /// A server whose current pair is `a0`/`r0`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                access: "a0".to_string(),
                refresh: "r0".to_string(),
                rotation: 0,
            }),
            refresh_fails: AtomicBool::new(false),
            refresh_gate: None,
            refresh_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Hold every refresh response until [`FakeApi::release_refresh`].
    pub fn gated() -> Self {
        Self {
            refresh_gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn release_refresh(&self) {
        if let Some(gate) = &self.refresh_gate {
            gate.add_permits(1);
        }
    }

    /// Reject every refresh token from now on.
    pub fn revoke(&self) {
        self.refresh_fails.store(true, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// `(path, bearer)` of every request received, in order.
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair::new(access, refresh)
    }

    async fn refresh(&self, request: &RequestSpec) -> ApiResponse {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.refresh_gate {
            gate.acquire().await.unwrap().forget();
        }

        let presented = request
            .body()
            .and_then(|b| b["refreshToken"].as_str())
            .unwrap_or_default()
            .to_string();

        let mut state = self.state.lock().unwrap();
        if self.refresh_fails.load(Ordering::SeqCst) || presented != state.refresh {
            return ApiResponse::json_body(
                401,
                &json!({"error": "InvalidGrant", "message": "refresh token revoked"}),
            );
        }

        state.rotation += 1;
        state.access = format!("a{}", state.rotation);
        state.refresh = format!("r{}", state.rotation);
        ApiResponse::json_body(
            200,
            &json!({"accessToken": state.access, "refreshToken": state.refresh}),
        )
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn send(
        &self,
        request: &RequestSpec,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse> {
        let bearer = bearer.map(|t| t.as_str().to_string());
        self.calls
            .lock()
            .unwrap()
            .push((request.path().to_string(), bearer.clone()));

        // Let other tasks interleave like a real network call would.
        tokio::time::sleep(Duration::from_millis(1)).await;

        match (request.method(), request.path()) {
            (Method::Post, "/auth/refresh") => Ok(self.refresh(request).await),
            (Method::Post, "/auth/logout") => Ok(ApiResponse::json_body(200, &json!({}))),
            (_, path) if path.starts_with("/always-401") => Ok(ApiResponse::json_body(
                401,
                &json!({"error": "TokenExpired", "message": "token expired"}),
            )),
            (_, "/missing") => Ok(ApiResponse::json_body(
                404,
                &json!({"error": "NotFound", "message": "no such thing"}),
            )),
            (_, path) => {
                let current = self.state.lock().unwrap().access.clone();
                if bearer.as_deref() == Some(current.as_str()) {
                    Ok(ApiResponse::json_body(200, &json!({"path": path})))
                } else {
                    Ok(ApiResponse::json_body(
                        401,
                        &json!({"error": "TokenExpired", "message": "token expired"}),
                    ))
                }
            }
        }
    }
}

/// Yield until `condition` holds, failing the test after a second.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
