//! Accept loop and per-connection handling.

use std::{
    future::Future,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use cityscout_core::{CatalogReader, DistanceMetric, GeodesicDistance};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpListener,
};

use crate::{
    error::ServerError,
    response::HttpResponse,
    routes::{RequestHead, Router},
};

/// Upper bound on the request line plus headers.
const MAX_HEAD_BYTES: u64 = 16 * 1024;

/// Default time a client has to send its request head.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Listener settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpServerConfig {
    /// Address to listen on. Port `0` picks a free port.
    pub bind_addr: SocketAddr,
    /// Time allowed for reading the request head before the client gets a
    /// `408`.
    pub read_timeout: Duration,
}

impl HttpServerConfig {
    /// Listen on `bind_addr` with [`DEFAULT_READ_TIMEOUT`].
    #[must_use]
    pub const fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the request head read timeout.
    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// A bound HTTP server.
///
/// # Examples
///
/// ```no_run
/// use cityscout_core::{SuggestionEngine, test_support::MemoryCatalog};
/// use cityscout_server::{HttpServer, HttpServerConfig, Router};
///
/// # async fn demo() -> Result<(), cityscout_server::ServerError> {
/// let router = Router::new(SuggestionEngine::new(MemoryCatalog::default()));
/// let config = HttpServerConfig::new("127.0.0.1:5000".parse().expect("address"));
/// let server = HttpServer::bind(config, router).await?;
/// server.run().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpServer<C, D = GeodesicDistance> {
    listener: TcpListener,
    local_addr: SocketAddr,
    read_timeout: Duration,
    router: Arc<Router<C, D>>,
}

impl<C, D> HttpServer<C, D>
where
    C: CatalogReader + 'static,
    D: DistanceMetric + 'static,
{
    /// Bind the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the address is unavailable.
    pub async fn bind(config: HttpServerConfig, router: Router<C, D>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr,
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::LocalAddr { source })?;
        Ok(Self {
            listener,
            local_addr,
            read_timeout: config.read_timeout,
            router: Arc::new(router),
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process exits.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await;
    }

    /// Serve until `shutdown` resolves. In-flight connections are left to
    /// finish on their own tasks.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("listening on http://{}", self.local_addr);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutting down listener on {}", self.local_addr);
                    return;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let router = Arc::clone(&self.router);
                        let read_timeout = self.read_timeout;
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            serve_connection(reader, writer, router, peer, read_timeout).await;
                        });
                    }
                    Err(err) => warn!("failed to accept connection: {err}"),
                },
            }
        }
    }
}

enum RequestRead {
    Head(RequestHead),
    Closed,
    Rejected(HttpResponse),
}

/// Read the request line and skip the headers. The body is ignored.
async fn read_request<R>(stream: R) -> std::io::Result<RequestRead>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream).take(MAX_HEAD_BYTES);
    let mut raw = Vec::new();
    if reader.read_until(b'\n', &mut raw).await? == 0 {
        return Ok(RequestRead::Closed);
    }
    if !raw.ends_with(b"\n") {
        return Ok(RequestRead::Rejected(too_large()));
    }
    let parsed = String::from_utf8(raw)
        .map_err(|err| format!("request line is not valid UTF-8: {err}"))
        .and_then(|line| RequestHead::parse(&line).map_err(|err| err.to_string()));
    let head = match parsed {
        Ok(head) => head,
        Err(message) => return Ok(RequestRead::Rejected(HttpResponse::error(400, &message))),
    };
    let mut header = Vec::new();
    loop {
        header.clear();
        let read = reader.read_until(b'\n', &mut header).await?;
        if read == 0 || header == b"\r\n" || header == b"\n" {
            break;
        }
        if !header.ends_with(b"\n") {
            return Ok(RequestRead::Rejected(too_large()));
        }
    }
    Ok(RequestRead::Head(head))
}

fn too_large() -> HttpResponse {
    HttpResponse::error(431, "request head is too large")
}

async fn serve_connection<R, W, C, D>(
    reader: R,
    mut writer: W,
    router: Arc<Router<C, D>>,
    peer: SocketAddr,
    read_timeout: Duration,
)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    C: CatalogReader + 'static,
    D: DistanceMetric + 'static,
{
    let started = Instant::now();
    let read = tokio::time::timeout(read_timeout, read_request(reader))
        .await
        .unwrap_or_else(|_| {
            debug!("{peer} sent no request head within {read_timeout:?}");
            Ok(RequestRead::Rejected(HttpResponse::error(
                408,
                "timed out waiting for the request",
            )))
        });
    let (method, path, response) = match read {
        Ok(RequestRead::Head(head)) => {
            let method = head.method.clone();
            let path = head.path().to_owned();
            let response = tokio::task::spawn_blocking(move || router.handle(&head))
                .await
                .unwrap_or_else(|err| {
                    warn!("request handler failed: {err}");
                    HttpResponse::error(500, "request handler failed")
                });
            (method, path, response)
        }
        Ok(RequestRead::Rejected(response)) => ("-".to_owned(), "-".to_owned(), response),
        Ok(RequestRead::Closed) => {
            debug!("{peer} closed the connection without a request");
            return;
        }
        Err(err) => {
            debug!("failed to read request from {peer}: {err}");
            return;
        }
    };

    if let Err(err) = write_response(&mut writer, &response).await {
        debug!("failed to write response to {peer}: {err}");
    }
    info!(
        "{method} {path} {} {}ms",
        response.status(),
        started.elapsed().as_millis()
    );
}

async fn write_response<W>(writer: &mut W, response: &HttpResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.to_bytes()).await?;
    writer.flush().await?;
    writer.shutdown().await
}
