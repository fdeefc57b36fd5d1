// Server loop module
// Accepts connections until the process is terminated

use std::sync::Arc;

use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::handler::Router;
use crate::logger;

/// Accept connections forever, one task per connection
///
/// Accept failures (e.g. running out of file descriptors) are logged and the
/// loop keeps going.
pub async fn serve(listener: TcpListener, router: Arc<Router>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &router),
            Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
        }
    }
}
