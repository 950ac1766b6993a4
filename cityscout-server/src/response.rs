//! HTTP responses and their wire encoding.

use cityscout_core::Suggestion;
use serde::Serialize;

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";

/// A complete response, ready to be written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    content_type: &'static str,
    headers: Vec<(&'static str, String)>,
    body: String,
}

#[derive(Serialize)]
struct SuggestionsBody<'a> {
    suggestions: &'a [Suggestion],
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl HttpResponse {
    /// HTML response with the given status.
    #[must_use]
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: HTML,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `200` response carrying `{"suggestions": [...]}`.
    #[must_use]
    pub fn suggestions(suggestions: &[Suggestion]) -> Self {
        Self::json(200, &SuggestionsBody { suggestions })
    }

    /// JSON error response carrying `{"error": message}`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &ErrorBody { error: message })
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        serde_json::to_string(value).map_or_else(
            |err| Self {
                status: 500,
                content_type: JSON,
                headers: Vec::new(),
                body: format!(r#"{{"error":"failed to encode response: {err}"}}"#),
            },
            |body| Self {
                status,
                content_type: JSON,
                headers: Vec::new(),
                body,
            },
        )
    }

    /// Add an extra header.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// `Content-Type` header value.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Value of an extra header, if set.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Encode as an HTTP/1.1 message. Connections are never reused.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        );
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

const fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cityscout_core::Score;
    use rstest::rstest;

    #[rstest]
    fn suggestions_serialise_score_as_string() {
        let suggestion = Suggestion {
            name: "Montreal".to_owned(),
            latitude: 45.50884,
            longitude: -73.58781,
            score: Score::from_raw(0.375),
        };
        let response = HttpResponse::suggestions(&[suggestion]);
        assert_eq!(response.status(), 200);
        assert_eq!(response.content_type(), "application/json");
        assert_eq!(
            response.body(),
            r#"{"suggestions":[{"name":"Montreal","latitude":45.50884,"longitude":-73.58781,"score":"0.3750"}]}"#
        );
    }

    #[rstest]
    fn empty_suggestions_serialise_as_empty_list() {
        let response = HttpResponse::suggestions(&[]);
        assert_eq!(response.body(), r#"{"suggestions":[]}"#);
    }

    #[rstest]
    fn error_body_escapes_message() {
        let response = HttpResponse::error(400, r#"bad "q""#);
        assert_eq!(response.body(), r#"{"error":"bad \"q\""}"#);
    }

    #[rstest]
    fn encodes_status_line_headers_and_body() {
        let response = HttpResponse::html(405, "nope").with_header("Allow", "GET");
        let encoded = String::from_utf8(response.to_bytes()).expect("utf-8");
        assert!(encoded.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(encoded.contains("Content-Length: 4\r\n"));
        assert!(encoded.contains("Allow: GET\r\n"));
        assert!(encoded.ends_with("\r\n\r\nnope"));
    }
}
