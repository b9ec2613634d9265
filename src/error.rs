use std::net::SocketAddr;

/// Fatal server failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("server terminated: {0}")]
    Serve(#[source] std::io::Error),
}
