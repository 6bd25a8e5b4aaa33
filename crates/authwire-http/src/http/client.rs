//! reqwest-backed [`Transport`].

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use tracing::{debug, instrument, trace};

use authwire_core::error::{InvalidInputError, TransportError};
use authwire_core::{AccessToken, ApiResponse, ApiUrl, Method, RequestSpec, Result, Transport};

use crate::config::ClientConfig;

/// HTTP transport for API requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api: ApiUrl,
}

impl HttpTransport {
    /// Create a transport for the configured API.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .timeout(config.timeout())
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            api: config.api().clone(),
        })
    }

    /// Returns the API base URL this transport is configured for.
    pub fn api(&self) -> &ApiUrl {
        &self.api
    }

    fn build(
        &self,
        request: &RequestSpec,
        bearer: Option<&AccessToken>,
    ) -> Result<reqwest::RequestBuilder> {
        let url = self.api.endpoint(request.path());
        let mut builder = self.client.request(reqwest_method(request.method()), &url);

        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }

        for (name, value) in request.headers() {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidInputError::Header {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            if header_name == AUTHORIZATION {
                continue;
            }
            let header_value = HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            builder = builder.header(header_name, header_value);
        }

        if let Some(token) = bearer {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.as_str())).map_err(
                |_| InvalidInputError::Header {
                    name: AUTHORIZATION.to_string(),
                    reason: "access token contains invalid characters".to_string(),
                },
            )?;
            builder = builder.header(AUTHORIZATION, value);
        }

        // Bodies may carry passwords or refresh tokens; never log them.
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        Ok(builder)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(
        skip(self, request, bearer),
        fields(api = %self.api, method = %request.method(), path = request.path())
    )]
    async fn send(
        &self,
        request: &RequestSpec,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse> {
        debug!(authenticated = bearer.is_some(), "Sending request");

        let response = self
            .build(request, bearer)?
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        trace!(status, len = body.len(), "Response received");
        Ok(ApiResponse::new(status, headers, body.to_vec()))
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else if err.is_body() || err.is_decode() {
        TransportError::Body {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    }
}
