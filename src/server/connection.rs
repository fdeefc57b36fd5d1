// Connection handling module
// Serves one accepted TCP connection on its own task

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::handler::Router;
use crate::logger;

/// Serve HTTP/1.1 on `stream` in a spawned task.
///
/// Keep-alive is on, so one connection may carry many requests. Connection
/// level failures are logged and never reach the accept loop.
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, router: &Arc<Router>) {
    let router = Arc::clone(router);

    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let conn = http1::Builder::new().keep_alive(true).serve_connection(
            io,
            service_fn(move |req| {
                let router = Arc::clone(&router);
                async move { router.handle(req, Some(peer_addr)).await }
            }),
        );

        if let Err(err) = conn.await {
            logger::log_connection_error(&err);
        }
    });
}
