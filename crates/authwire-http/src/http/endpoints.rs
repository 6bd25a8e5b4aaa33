//! Request/response bodies of the authentication endpoints.

use serde::{Deserialize, Serialize};

use authwire_core::{TokenPair, UserSummary};

/// Request body for sign-in.
#[derive(Debug, Serialize)]
pub(crate) struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Request body for sign-up.
#[derive(Debug, Serialize)]
pub(crate) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

/// Response from sign-in and sign-up.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthResponse {
    pub user: UserSummary,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    pub fn into_parts(self) -> (UserSummary, TokenPair) {
        (
            self.user,
            TokenPair::new(self.access_token, self.refresh_token),
        )
    }
}

/// Request body for the renewal exchange.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from the renewal exchange.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<RefreshResponse> for TokenPair {
    fn from(response: RefreshResponse) -> Self {
        TokenPair::new(response.access_token, response.refresh_token)
    }
}

/// Request body for sign-out.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignOutRequest<'a> {
    pub refresh_token: &'a str,
}
