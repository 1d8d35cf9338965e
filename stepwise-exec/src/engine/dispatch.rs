use std::time::Duration;

use tracing::{debug, enabled, Level};

use crate::config::LoggingConfig;
use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse};

/// Sends one request, logging both sides with sensitive headers redacted.
pub(crate) async fn send(
    http: &dyn HttpClient,
    request: &HttpRequest,
    timeout: Duration,
    logging: &LoggingConfig,
) -> Result<HttpResponse, HttpError> {
    if logging.log_requests && enabled!(Level::DEBUG) {
        let headers = logging.sanitize_headers(&request.headers);
        if logging.log_bodies {
            let body = logging.truncate_body(&request.body);
            debug!(method = %request.method, url = %request.url, ?headers, %body, "sending request");
        } else {
            debug!(method = %request.method, url = %request.url, ?headers, "sending request");
        }
    }

    let started = tokio::time::Instant::now();
    let result = http.send(request.clone(), timeout).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &result {
        Ok(response) if logging.log_responses && enabled!(Level::DEBUG) => {
            let headers = logging.sanitize_headers(&response.headers);
            if logging.log_bodies {
                let body = logging.truncate_body(&response.body);
                debug!(status = response.status, elapsed_ms, ?headers, %body, "received response");
            } else {
                debug!(status = response.status, elapsed_ms, ?headers, "received response");
            }
        }
        Ok(_) => {}
        Err(err) => debug!(url = %request.url, elapsed_ms, error = %err, "request failed"),
    }
    result
}
