//! Request command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use tokenflight::{ApiRequest, Method};

use crate::cli::ConnectionArgs;
use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    pub method: String,

    /// Path relative to the API base URL, e.g. /policies
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub body: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", short = 'q')]
    pub query: Vec<String>,

    /// Extra header as name:value (repeatable)
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,
}

pub async fn run(args: RequestArgs, connection: &ConnectionArgs) -> Result<()> {
    let request = build_request(&args)?;
    let session = CliSession::open(connection).await?;

    let response = session
        .client
        .execute(request)
        .await
        .context("Request failed")?;

    let status = response.status();
    match response.json::<Value>() {
        Ok(value) => output::json_pretty(&value)?,
        Err(_) => println!("{}", response.text()),
    }

    if !status.is_success() {
        bail!("Server responded with {}", status);
    }

    Ok(())
}

fn build_request(args: &RequestArgs) -> Result<ApiRequest> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", args.method))?;
    let mut request = ApiRequest::new(method, &args.path);

    for pair in &args.query {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Query must be key=value: {}", pair))?;
        request = request.query(key, value);
    }

    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Header must be name:value: {}", header))?;
        request = request.header(name.trim(), value.trim())?;
    }

    if let Some(body) = &args.body {
        let body: Value = serde_json::from_str(body).context("Body is not valid JSON")?;
        request = request.json(&body)?;
    }

    Ok(request)
}
