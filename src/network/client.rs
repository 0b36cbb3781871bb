//! Blocking client
//!
//! One request in flight per connection: write a command, wait for its
//! response.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{KvsError, Result};
use crate::protocol::{read_response, write_command, Command, Response};

pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a running server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(KvsError::Network)?;
        stream.set_nodelay(true).map_err(KvsError::Network)?;

        let read_stream = stream.try_clone().map_err(KvsError::Network)?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and wait for the server's response
    pub fn execute(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    pub fn create_database(&mut self, database: &str) -> Result<Response> {
        self.execute(&Command::CreateDatabase {
            database: database.to_string(),
        })
    }

    pub fn create_table(&mut self, database: &str, table: &str) -> Result<Response> {
        self.execute(&Command::CreateTable {
            database: database.to_string(),
            table: table.to_string(),
        })
    }

    pub fn set(&mut self, database: &str, table: &str, key: &[u8], value: &[u8]) -> Result<Response> {
        self.execute(&Command::Set {
            database: database.to_string(),
            table: table.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    pub fn get(&mut self, database: &str, table: &str, key: &[u8]) -> Result<Response> {
        self.execute(&Command::Get {
            database: database.to_string(),
            table: table.to_string(),
            key: key.to_vec(),
        })
    }

    pub fn delete(&mut self, database: &str, table: &str, key: &[u8]) -> Result<Response> {
        self.execute(&Command::Delete {
            database: database.to_string(),
            table: table.to_string(),
            key: key.to_vec(),
        })
    }
}
