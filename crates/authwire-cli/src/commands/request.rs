//! Request command implementation.

use anyhow::{Context, Result, anyhow};
use clap::Args;

use authwire_core::{Method, RequestSpec};

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// Path relative to the API base URL, e.g. /files
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub data: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", short = 'q')]
    pub query: Vec<String>,

    /// Extra header as "Name: value" (repeatable)
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,
}

pub async fn run(args: RequestArgs, connection: &ConnectionArgs) -> Result<()> {
    let request = build_request(&args)?;
    let client = session::require_session(connection)?;

    let response = client
        .execute(request)
        .await
        .with_context(|| format!("{} {} failed", args.method.to_uppercase(), args.path))?;

    match serde_json::from_slice::<serde_json::Value>(response.bytes()) {
        Ok(body) => output::json_pretty(&body)?,
        Err(_) => {
            let text = response.text();
            if !text.is_empty() {
                println!("{}", text);
            }
        }
    }

    Ok(())
}

fn build_request(args: &RequestArgs) -> Result<RequestSpec> {
    let method: Method = args.method.parse().context("Invalid method")?;
    let mut request = RequestSpec::new(method, args.path.as_str()).context("Invalid path")?;

    for pair in &args.query {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Query parameter must be key=value: {}", pair))?;
        request = request.with_query(key, value);
    }

    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("Header must be \"Name: value\": {}", header))?;
        request = request.with_header(name.trim(), value.trim());
    }

    if let Some(data) = &args.data {
        let body: serde_json::Value = serde_json::from_str(data).context("Invalid JSON body")?;
        request = request.with_json(body);
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(method: &str, path: &str) -> RequestArgs {
        RequestArgs {
            method: method.to_string(),
            path: path.to_string(),
            data: None,
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    #[test]
    fn builds_full_request() {
        let mut a = args("post", "/files");
        a.data = Some(r#"{"name":"notes.txt"}"#.to_string());
        a.query = vec!["dry_run=true".to_string()];
        a.headers = vec!["X-Trace: abc".to_string()];

        let request = build_request(&a).unwrap();

        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.path(), "/files");
        assert_eq!(
            request.query(),
            &[("dry_run".to_string(), "true".to_string())]
        );
        assert_eq!(
            request.headers(),
            &[("X-Trace".to_string(), "abc".to_string())]
        );
        assert_eq!(request.body().unwrap()["name"], "notes.txt");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(build_request(&args("FETCH", "/files")).is_err());
        assert!(build_request(&args("GET", "files")).is_err());

        let mut a = args("GET", "/files");
        a.query = vec!["novalue".to_string()];
        assert!(build_request(&a).is_err());

        let mut a = args("POST", "/files");
        a.data = Some("{not json".to_string());
        assert!(build_request(&a).is_err());
    }
}
