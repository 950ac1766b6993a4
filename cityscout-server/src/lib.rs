//! HTTP front end for the city suggestion engine.
//!
//! Serves `GET /suggestions?q=<json>` over a small HTTP/1.1 listener built on
//! `tokio`. Each connection is handled on its own task and the blocking
//! catalog lookup runs on the blocking thread pool.

#![forbid(unsafe_code)]

mod error;
mod query;
mod response;
mod routes;
mod server;

pub use error::ServerError;
pub use query::{QueryError, parse_query};
pub use response::HttpResponse;
pub use routes::{RequestHead, RequestLineError, Router};
pub use server::{DEFAULT_READ_TIMEOUT, HttpServer, HttpServerConfig};
