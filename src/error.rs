/// Error types for the ipdb library
use crate::ipdb::IpVersion;
use std::fmt;

/// Result type alias for IPDB operations
pub type Result<T> = std::result::Result<T, IpdbError>;

/// Main error type for IPDB operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpdbError {
    /// File is shorter (or longer) than its header and metadata declare
    FileSize {
        /// Actual file size in bytes
        size: u64,
        /// Size required by the header
        required: u64,
    },

    /// Metadata block could not be decoded or is inconsistent
    CorruptMetadata(String),

    /// Record bounds violated or record does not match the schema
    CorruptDatabase(String),

    /// Address resolves to no record, or the locator is not a leaf
    NotFound,

    /// Tree materialization reached an index that is not an internal node
    NotInternalNode(u32),

    /// Address family does not match the database
    VersionMismatch {
        /// Family the database accepts
        expected: IpVersion,
    },

    /// Language is not present in the database
    UnknownLanguage(String),

    /// Field is not present in the database
    UnknownField(String),

    /// Text could not be parsed as an IP address
    InvalidIpAddress(String),

    /// I/O errors while opening a database file
    Io(String),
}

impl fmt::Display for IpdbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpdbError::FileSize { size, required } => write!(
                f,
                "Database file size mismatch: {} bytes (header requires {})",
                size, required
            ),
            IpdbError::CorruptMetadata(msg) => write!(f, "Corrupt metadata: {}", msg),
            IpdbError::CorruptDatabase(msg) => {
                write!(f, "Database file may be corrupted: {}", msg)
            }
            IpdbError::NotFound => write!(f, "No data"),
            IpdbError::NotInternalNode(offset) => {
                write!(f, "Not a node at offset {}", offset)
            }
            IpdbError::VersionMismatch { expected } => match expected {
                IpVersion::V4 => write!(f, "Only IPv4 accepted"),
                IpVersion::V6 => write!(f, "Only IPv6 accepted"),
            },
            IpdbError::UnknownLanguage(lang) => write!(f, "Language {} not supported", lang),
            IpdbError::UnknownField(field) => write!(f, "Field {} not found", field),
            IpdbError::InvalidIpAddress(msg) => write!(f, "Invalid IP address: {}", msg),
            IpdbError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for IpdbError {}

impl From<std::io::Error> for IpdbError {
    fn from(err: std::io::Error) -> Self {
        IpdbError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IpdbError {
    fn from(err: serde_json::Error) -> Self {
        IpdbError::CorruptMetadata(err.to_string())
    }
}
