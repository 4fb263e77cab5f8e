use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("meteo/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(FetchError::Client)
}

/// GET `url` with `query` and parse the body as JSON.
///
/// When `cancel` fires before the response is complete the request is
/// dropped and [`FetchError::Cancelled`] is returned.
pub async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    query: &[(&str, String)],
    cancel: Option<&CancellationToken>,
) -> Result<T, FetchError> {
    let request = async {
        tracing::debug!(url, ?query, "GET");

        let res = http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| transport(url, source))?;

        let status = res.status();
        let body = res.text().await.map_err(|source| transport(url, source))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    };

    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(FetchError::Cancelled),
            res = request => res,
        },
        None => request.await,
    }
}

/// Raw body of a GET to a fully built URL, with the response content type.
pub async fn get_bytes(http: &Client, url: &str) -> Result<(Option<String>, Vec<u8>), FetchError> {
    tracing::debug!(url, "GET");

    let res = http
        .get(url)
        .send()
        .await
        .map_err(|source| transport(url, source))?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    let content_type = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = res.bytes().await.map_err(|source| transport(url, source))?;

    Ok((content_type, bytes.to_vec()))
}

fn transport(url: &str, source: reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        source,
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
