//! # busline-server
//!
//! An in-memory stand-in for the remote Routes and Stops resources, with the
//! status codes of the production backend. It can simulate an outage and
//! records every request it serves.

mod routes;
pub mod state;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info};

pub use routes::create_router;
pub use state::{RecordedRequest, ServerState};

pub struct StubServer {
    addr: SocketAddr,
    state: ServerState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl StubServer {
    /// Serve `state` on an ephemeral localhost port
    pub async fn start(state: ServerState) -> Result<Self, std::io::Error> {
        Self::bind(state, SocketAddr::from(([127, 0, 0, 1], 0))).await
    }

    pub async fn bind(state: ServerState, addr: SocketAddr) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let app = create_router(state.clone());
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                error!("stub server stopped: {e}");
            }
        });
        info!(%addr, "stub server listening");

        Ok(Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    pub fn routes_url(&self) -> String {
        format!("http://{}/routes", self.addr)
    }

    pub fn stops_url(&self) -> String {
        format!("http://{}/stops", self.addr)
    }

    /// Stop accepting connections and finish in-flight requests
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
