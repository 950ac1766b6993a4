//! Server start-up errors.

use std::{io, net::SocketAddr};

use thiserror::Error;

/// Errors raised while starting or running [`crate::HttpServer`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Source error from the socket layer.
        #[source]
        source: io::Error,
    },
    /// The bound address could not be read back.
    #[error("failed to read the listener address: {source}")]
    LocalAddr {
        /// Source error from the socket layer.
        #[source]
        source: io::Error,
    },
}
