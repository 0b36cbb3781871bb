//! TCP Server
//!
//! Accepts connections and hands each one to its own thread. Commands from
//! every connection end up on the engine's single worker queue.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{KvsError, Result};

use super::Connection;

/// TCP server for SegmentKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

/// Stops a running [`Server`] from another thread
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // Wake the blocking accept so the loop sees the flag
        let _ = TcpStream::connect(self.addr);
    }
}

impl Server {
    /// Bind the listen address from the config
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(KvsError::Network)?;
        let local_addr = listener.local_addr().map_err(KvsError::Network)?;

        Ok(Self {
            config,
            engine,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            addr: self.local_addr,
        }
    }

    /// Accept connections until shut down (blocking)
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let engine = Arc::clone(&self.engine);
            let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

            let spawned = thread::Builder::new()
                .name("segmentkv-conn".to_string())
                .spawn(move || {
                    let result = Connection::new(stream, engine).and_then(|mut conn| {
                        conn.set_timeouts(read_ms, write_ms)?;
                        conn.handle()
                    });
                    if let Err(e) = result {
                        tracing::warn!("Connection closed with error: {}", e);
                    }
                });

            if let Err(e) = spawned {
                tracing::error!("Failed to spawn connection thread: {}", e);
            }
        }

        tracing::info!("Server on {} stopped", self.local_addr);
        Ok(())
    }
}
