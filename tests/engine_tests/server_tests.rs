//! Server Tests
//!
//! End-to-end over TCP: a server on an ephemeral port and blocking clients.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use segmentkv::network::{Client, Server, ShutdownHandle};
use segmentkv::protocol::{read_response, Status};
use segmentkv::{Config, Engine, Result};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<Result<()>>>,
    _temp: TempDir,
}

impl TestServer {
    fn start() -> Self {
        let temp = TempDir::new().unwrap();
        let config = Config::builder()
            .working_path(temp.path())
            .listen_addr("127.0.0.1:0")
            .segment_size_limit(128)
            .build();

        let engine = Arc::new(Engine::open(&config).unwrap());
        let server = Server::bind(config, engine).unwrap();
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();
        let thread = thread::spawn(move || server.run());

        Self {
            addr,
            shutdown,
            thread: Some(thread),
            _temp: temp,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_client_round_trip() {
    let server = TestServer::start();
    let mut client = Client::connect(server.addr).unwrap();

    let response = client.create_database("db1").unwrap();
    assert_eq!(response.status, Status::Ok);
    assert_eq!(
        response.payload_text().as_deref(),
        Some("Database db1 created successfully")
    );

    client.create_table("db1", "t1").unwrap();

    let response = client.set("db1", "t1", b"a", b"1").unwrap();
    assert_eq!(response.status, Status::Null);

    let response = client.set("db1", "t1", b"a", b"2").unwrap();
    assert_eq!(response.payload, Some(b"1".to_vec()));

    let response = client.get("db1", "t1", b"a").unwrap();
    assert_eq!(response.payload, Some(b"2".to_vec()));

    let response = client.delete("db1", "t1", b"a").unwrap();
    assert_eq!(response.payload, Some(b"2".to_vec()));

    let response = client.get("db1", "t1", b"a").unwrap();
    assert_eq!(response.status, Status::Null);
}

#[test]
fn test_errors_become_error_responses() {
    let server = TestServer::start();
    let mut client = Client::connect(server.addr).unwrap();

    client.create_database("db1").unwrap();
    client.create_table("db1", "t1").unwrap();

    let response = client.create_table("db1", "t1").unwrap();
    assert!(response.is_error());
    assert_eq!(
        response.payload_text().as_deref(),
        Some("Table t1 already exists")
    );

    let response = client.get("db1", "t2", b"a").unwrap();
    assert_eq!(response.payload_text().as_deref(), Some("Table t2 not found"));

    // The connection stays usable after an error
    let response = client.set("db1", "t1", b"k", b"v").unwrap();
    assert!(!response.is_error());
}

#[test]
fn test_clients_share_state() {
    let server = TestServer::start();

    let mut setup = Client::connect(server.addr).unwrap();
    setup.create_database("db1").unwrap();
    setup.create_table("db1", "t1").unwrap();

    let addr = server.addr;
    let handles: Vec<_> = (0..4)
        .map(|t| {
            thread::spawn(move || {
                let mut client = Client::connect(addr).unwrap();
                for i in 0..25 {
                    let key = format!("c{}-{}", t, i);
                    let response = client.set("db1", "t1", key.as_bytes(), b"x").unwrap();
                    assert!(!response.is_error());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4 {
        for i in 0..25 {
            let key = format!("c{}-{}", t, i);
            let response = setup.get("db1", "t1", key.as_bytes()).unwrap();
            assert_eq!(response.payload, Some(b"x".to_vec()));
        }
    }
}

#[test]
fn test_malformed_frame_gets_error_response() {
    let server = TestServer::start();
    let mut stream = TcpStream::connect(server.addr).unwrap();

    // Unknown command byte with an empty payload
    stream.write_all(&[0x7f, 0, 0, 0, 0]).unwrap();

    let response = read_response(&mut stream).unwrap();
    assert!(response.is_error());
    assert!(response.payload_text().unwrap().contains("Unknown command type"));
}
