mod basic_ext;
mod json_ext;

use crate::prelude::*;
use async_trait::async_trait;
use reqwest_middleware::RequestBuilder;
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use std::time::Duration;
use thiserror::Error;

pub(crate) mod prelude {
    pub(crate) use super::basic_ext::RequestBuilderBasicExt as _;
    pub(crate) use super::json_ext::RequestBuilderJsonExt as _;
}

pub(crate) type Client = reqwest_middleware::ClientWithMiddleware;

#[derive(Debug, Error)]
pub(crate) enum HttpClientError {
    #[error("Failed to send an HTTP request")]
    Request { source: reqwest_middleware::Error },

    #[error("Bad response status code: {status}, body:\n{body}")]
    BadResponseStatusCode {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Unexpected shape of the response JSON")]
    UnexpectedResponseJsonShape { source: serde_json::Error },
}

pub(crate) fn create_client() -> Client {
    // Retry with exponentially increasing intervals between attempts.
    let retry_policy = ExponentialBackoff::builder()
        .backoff_exponent(2)
        .retry_bounds(Duration::from_millis(100), Duration::from_secs(2))
        .build_with_total_retry_duration(Duration::from_secs(10));

    reqwest_middleware::ClientBuilder::new(teloxide::net::client_from_env())
        .with(OutermostObservingMiddleware)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(InnermostObservingMiddleware)
        .with_init(|request_builder: RequestBuilder| {
            request_builder.header(
                "User-Agent",
                concat!("RecastTelegramBot/", env!("CARGO_PKG_VERSION")),
            )
        })
        .build()
}

struct OutermostObservingMiddleware;

#[async_trait]
impl reqwest_middleware::Middleware for OutermostObservingMiddleware {
    async fn handle(
        &self,
        request: reqwest::Request,
        extensions: &mut task_local_extensions::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let span = info_span!(
            "request",
            version = ?request.version(),
            method = %request.method(),
            url = %request.url(),
        );

        async move {
            let (result, duration) = next.run(request, extensions).with_duration().await;

            // Covers the time it took to do all retries of the request
            metrics::histogram!(
                "http_request_effective_duration_seconds",
                duration.as_secs_f64(),
            );

            result
        }
        .instrument(span)
        .await
    }
}

struct InnermostObservingMiddleware;

#[async_trait]
impl reqwest_middleware::Middleware for InnermostObservingMiddleware {
    async fn handle(
        &self,
        request: reqwest::Request,
        extensions: &mut task_local_extensions::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let (result, duration) = next.run(request, extensions).with_duration().await;

        // Duration of a single real request. If there were retries, then these
        // appear as separate observations.
        metrics::histogram!("http_request_duration_seconds", duration.as_secs_f64());

        let duration = tracing_duration(duration);

        let response = match &result {
            Ok(response) => response,
            Err(err) => {
                error!(duration, err = tracing_err(err), "Network request failed");
                return result;
            }
        };

        let status = response.status();

        if let Err(err) = response.error_for_status_ref() {
            warn!(
                duration,
                %status,
                err = tracing_err(&err),
                "Network request returned an error status code"
            );
        } else {
            debug!(duration, %status, "Network request succeeded");
        }

        result
    }
}
