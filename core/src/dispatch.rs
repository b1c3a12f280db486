//! The single request path every façade method funnels through.
//!
//! # Design
//! Split in the host-does-IO manner: `build_request` turns (url, verb,
//! params) into an `HttpRequest` and `parse_response` turns an
//! `HttpResponse` into a `Payload` or an error, both without I/O.
//! `dispatch` joins the two around exactly one `Transport::execute` call.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{fallback_message, TrestleError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, FORM_CONTENT_TYPE};
use crate::types::{Credentials, Params, Payload, ReturnFormat};

/// Issues authenticated requests and normalizes their outcome.
pub struct Dispatcher {
    credentials: Credentials,
    transport: Box<dyn Transport>,
}

impl Dispatcher {
    pub fn new(credentials: Credentials, transport: Box<dyn Transport>) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// One round trip: build, execute, parse.
    pub fn dispatch(
        &self,
        url: &str,
        method: HttpMethod,
        params: &Params,
        format: ReturnFormat,
    ) -> Result<Payload, TrestleError> {
        let request = self.build_request(url, method, params);
        debug!(method = %request.method, url = %request.url, "sending request");

        let response = self.transport.execute(&request).map_err(|e| {
            warn!(method = %request.method, url = %request.url, error = %e, "transport failure");
            e
        })?;
        debug!(status = response.status, "received response");
        if response.is_redirect() {
            warn!(
                status = response.status,
                location = response.header("location").unwrap_or_default(),
                "redirect not followed"
            );
        }

        parse_response(response, format).map_err(|e| {
            warn!(method = %request.method, url = %request.url, error = %e, "request failed");
            e
        })
    }

    /// Build the request for `url`, placing `params` in the query string for
    /// GET and in a form body for every other verb.
    pub fn build_request(&self, url: &str, method: HttpMethod, params: &Params) -> HttpRequest {
        let mut headers = vec![
            ("authorization".to_string(), basic_auth(&self.credentials)),
            ("accept".to_string(), "application/json".to_string()),
        ];

        if !method.has_body() {
            let url = if params.is_empty() {
                url.to_string()
            } else {
                let sep = if url.contains('?') { '&' } else { '?' };
                format!("{url}{sep}{}", params.encode())
            };
            return HttpRequest {
                method,
                url,
                headers,
                body: None,
            };
        }

        headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
        HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body: Some(params.encode()),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// `Basic base64(key:secret)`.
pub fn basic_auth(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.key(), credentials.secret());
    format!("Basic {}", STANDARD.encode(raw))
}

/// Map a response to a decoded payload or the failure it describes.
pub fn parse_response(response: HttpResponse, format: ReturnFormat) -> Result<Payload, TrestleError> {
    if !(200..=299).contains(&response.status) {
        return Err(TrestleError::Remote {
            status: response.status,
            message: remote_message(&response),
        });
    }

    match format {
        ReturnFormat::Text => Ok(Payload::Text(response.body)),
        ReturnFormat::Structure => decode(&response.body).map(Payload::Structure),
        ReturnFormat::Object => match decode(&response.body)? {
            Value::Object(map) => Ok(Payload::Object(map)),
            other => Ok(Payload::Structure(other)),
        },
    }
}

fn decode(body: &str) -> Result<Value, TrestleError> {
    serde_json::from_str(body)
        .map_err(|e| TrestleError::Decode(format!("invalid JSON in response body: {e}")))
}

/// The `error` string of a failure body, or the generic fallback.
fn remote_message(response: &HttpResponse) -> String {
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| fallback_message(response.status))
}
