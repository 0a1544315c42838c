//! TCP servers exposed by the daemon

use std::net::SocketAddr;

use futures::Future;
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

mod common;

pub mod control;

/// Listening server, stopped when dropped
#[derive(Debug)]
pub struct ServerHandle {
    name: &'static str,
    local_addr: SocketAddr,
    join_handle: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        debug!(server = %self.name, "stopping server");
        self.join_handle.abort();
    }
}

/// Accept connections on `address`, running `handle_client` on its own task for each of them
pub async fn bind<F, E>(
    name: &'static str,
    address: SocketAddr,
    handle_client: impl Fn((TcpStream, SocketAddr)) -> F + Send + 'static,
) -> Result<ServerHandle, std::io::Error>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let listener = TcpListener::bind(address).await?;
    let local_addr = listener.local_addr()?;

    info!(server = %name, address = %local_addr, "server listening");

    let join_handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok(accepted) => {
                    let peer_addr = accepted.1;
                    let client = handle_client(accepted);

                    tokio::spawn(async move {
                        if let Err(error) = client.await {
                            warn!(server = %name, peer = %peer_addr, error = %error, "client error");
                        }
                    });
                }
                Err(error) => {
                    warn!(server = %name, error = %error, "failed to accept connection");
                }
            }
        }
    });

    Ok(ServerHandle {
        name,
        local_addr,
        join_handle,
    })
}
