//! Response definitions
//!
//! Represents responses to clients.

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Success with a payload
    Ok = 0x00,
    /// Success without a value (missing key, no previous value)
    Null = 0x01,
    /// Failure, payload is the message
    Error = 0x02,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (value for GET/SET/DELETE, message for ERROR)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create a response for a successful command
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        match payload {
            Some(payload) => Self {
                status: Status::Ok,
                payload: Some(payload),
            },
            None => Self::null(),
        }
    }

    /// Create a NULL response
    pub fn null() -> Self {
        Self {
            status: Status::Null,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    /// Payload as lossy UTF-8, for display
    pub fn payload_text(&self) -> Option<String> {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
    }
}
