//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    CreateDatabase = 0x01,
    CreateTable = 0x02,
    Set = 0x03,
    Get = 0x04,
    Delete = 0x05,
}

impl CommandType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(CommandType::CreateDatabase),
            0x02 => Some(CommandType::CreateTable),
            0x03 => Some(CommandType::Set),
            0x04 => Some(CommandType::Get),
            0x05 => Some(CommandType::Delete),
            _ => None,
        }
    }

    /// Number of length-prefixed fields in the payload
    pub fn field_count(self) -> usize {
        match self {
            CommandType::CreateDatabase => 1,
            CommandType::CreateTable => 2,
            CommandType::Set => 4,
            CommandType::Get | CommandType::Delete => 3,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a database
    CreateDatabase { database: String },

    /// Create a table in an existing database
    CreateTable { database: String, table: String },

    /// Set a key; replies with the previous value
    Set {
        database: String,
        table: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Get the value of a key
    Get {
        database: String,
        table: String,
        key: Vec<u8>,
    },

    /// Delete a key; replies with the value it had
    Delete {
        database: String,
        table: String,
        key: Vec<u8>,
    },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::CreateDatabase { .. } => CommandType::CreateDatabase,
            Command::CreateTable { .. } => CommandType::CreateTable,
            Command::Set { .. } => CommandType::Set,
            Command::Get { .. } => CommandType::Get,
            Command::Delete { .. } => CommandType::Delete,
        }
    }

    /// Whether the command changes stored state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Command::Get { .. })
    }
}
