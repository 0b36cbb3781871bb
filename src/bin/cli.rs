//! SegmentKV CLI Client
//!
//! Command-line interface for interacting with a SegmentKV server.

use clap::{Parser, Subcommand};
use segmentkv::network::Client;
use segmentkv::protocol::{Command, Status};

/// SegmentKV CLI
#[derive(Parser, Debug)]
#[command(name = "segmentkv-cli")]
#[command(about = "CLI for the SegmentKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a database
    CreateDb { database: String },

    /// Create a table in a database
    CreateTable { database: String, table: String },

    /// Set a key-value pair, printing the previous value
    Set {
        database: String,
        table: String,
        key: String,
        value: String,
    },

    /// Get a value by key
    Get {
        database: String,
        table: String,
        key: String,
    },

    /// Delete a key, printing the deleted value
    Del {
        database: String,
        table: String,
        key: String,
    },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::CreateDb { database } => Command::CreateDatabase { database },
            Commands::CreateTable { database, table } => Command::CreateTable { database, table },
            Commands::Set {
                database,
                table,
                key,
                value,
            } => Command::Set {
                database,
                table,
                key: key.into_bytes(),
                value: value.into_bytes(),
            },
            Commands::Get { database, table, key } => Command::Get {
                database,
                table,
                key: key.into_bytes(),
            },
            Commands::Del { database, table, key } => Command::Delete {
                database,
                table,
                key: key.into_bytes(),
            },
        }
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let response = match client.execute(&args.command.into()) {
        Ok(response) => response,
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    };

    match response.status {
        Status::Ok => println!("{}", response.payload_text().unwrap_or_default()),
        Status::Null => println!("(nil)"),
        Status::Error => {
            eprintln!("(error) {}", response.payload_text().unwrap_or_default());
            std::process::exit(1);
        }
    }
}
