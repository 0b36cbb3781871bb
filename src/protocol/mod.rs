//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │  Fields (len (4) + bytes)*  │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: CREATE_DATABASE - database
//! - 0x02: CREATE_TABLE    - database, table
//! - 0x03: SET             - database, table, key, value
//! - 0x04: GET             - database, table, key
//! - 0x05: DELETE          - database, table, key
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NULL
//! - 0x02: ERROR

mod codec;
mod command;
mod response;

pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType};
pub use response::{Response, Status};
