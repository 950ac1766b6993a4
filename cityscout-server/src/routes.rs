//! Request routing.
//!
//! [`Router::handle`] is synchronous: it calls straight into the engine and
//! its blocking catalog. The connection task runs it on a blocking thread.

use cityscout_core::{
    CatalogError, CatalogReader, DistanceMetric, GeodesicDistance, SuggestError, SuggestionEngine,
};
use log::warn;
use thiserror::Error;
use url::Url;

use crate::{
    query::{QueryError, parse_query},
    response::HttpResponse,
};

const GREETING: &str = "<h2>Hello There!</h2>";
const USAGE: &str = concat!(
    "<h3>Input format:</h3>",
    "<h4>/suggestions?q={\"name\":\"city_name\"}</h4>",
    "<h4>or</h4>",
    "<h4>/suggestions?q={\"name\":\"city_name\",\"lat\":\"latitude\",\"long\":\"longitude\"}</h4>",
);

/// The parts of a request line the router needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Request method, e.g. `GET`.
    pub method: String,
    /// Request target, e.g. `/suggestions?q=...`.
    pub target: String,
}

/// Errors raised while parsing a request line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestLineError {
    /// The line did not have the `METHOD TARGET HTTP/x.y` shape.
    #[error("malformed request line: {line:?}")]
    Malformed {
        /// The offending line, trimmed.
        line: String,
    },
}

impl RequestHead {
    /// Parse `METHOD TARGET VERSION`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestLineError::Malformed`] when a part is missing, extra
    /// parts follow the version, or the version is not `HTTP/`.
    pub fn parse(line: &str) -> Result<Self, RequestLineError> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let malformed = || RequestLineError::Malformed {
            line: trimmed.to_owned(),
        };
        let mut parts = trimmed.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if method.is_empty() || !target.starts_with('/') || !version.starts_with("HTTP/") {
            return Err(malformed());
        }
        Ok(Self {
            method: method.to_owned(),
            target: target.to_owned(),
        })
    }

    /// Target path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }
}

/// Maps requests onto the suggestion engine.
#[derive(Debug)]
pub struct Router<C, D = GeodesicDistance> {
    engine: SuggestionEngine<C, D>,
}

impl<C, D> Router<C, D>
where
    C: CatalogReader,
    D: DistanceMetric,
{
    /// Route requests to `engine`.
    #[must_use]
    pub const fn new(engine: SuggestionEngine<C, D>) -> Self {
        Self { engine }
    }

    /// The engine behind `/suggestions`.
    #[must_use]
    pub const fn engine(&self) -> &SuggestionEngine<C, D> {
        &self.engine
    }

    /// Produce the response for one request.
    #[must_use]
    pub fn handle(&self, head: &RequestHead) -> HttpResponse {
        if head.method != "GET" {
            return HttpResponse::error(405, &format!("method {} is not allowed", head.method))
                .with_header("Allow", "GET");
        }
        match head.path() {
            "/" => HttpResponse::html(200, GREETING),
            "/suggestions" => self.suggestions(&head.target),
            other => HttpResponse::error(404, &format!("no route for {other}")),
        }
    }

    fn suggestions(&self, target: &str) -> HttpResponse {
        let raw = match query_parameter(target, "q") {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return HttpResponse::html(200, USAGE),
            Err(err) => return HttpResponse::error(400, &format!("invalid request target: {err}")),
        };
        let request = match parse_query(&raw) {
            Ok(request) => request,
            Err(err) => return query_error_response(&err),
        };
        self.engine.suggest(&request).map_or_else(
            |err| suggest_error_response(&err),
            |suggestions| HttpResponse::suggestions(&suggestions),
        )
    }
}

/// Percent-decoded value of the first `name` parameter in `target`.
fn query_parameter(target: &str, name: &str) -> Result<Option<String>, url::ParseError> {
    let base = Url::parse("http://localhost/")?;
    let url = base.join(target)?;
    Ok(url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned()))
}

fn query_error_response(err: &QueryError) -> HttpResponse {
    HttpResponse::error(400, &err.to_string())
}

fn suggest_error_response(err: &SuggestError) -> HttpResponse {
    let status = match err {
        SuggestError::EmptyQuery => 400,
        SuggestError::Catalog(CatalogError::Unavailable { .. }) => 503,
        SuggestError::Catalog(_) => 500,
    };
    warn!("suggestion request failed with {status}: {err}");
    HttpResponse::error(status, &err.to_string())
}
