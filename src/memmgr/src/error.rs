//! Error types shared by every memory manager.

use std::io;
use std::path::PathBuf;

/// Errors from layout synchronization and memory operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The manager cannot perform this operation in its configuration
    #[error("{operation} is not supported by this memory manager")]
    Unsupported { operation: &'static str },

    /// A fixed-address allocation hit an existing mapping
    #[error("Address {address:#x} is already mapped")]
    AddressInUse { address: usize },

    #[error("{operation} failed at {address:#x}: {source}")]
    Os {
        operation: &'static str,
        address: usize,
        #[source]
        source: io::Error,
    },

    /// The maps or memory interface of the target could not be opened
    #[error("Cannot access {}: {source}", path.display())]
    TargetUnreachable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed maps line {line}: {reason}")]
    MalformedMaps { line: usize, reason: String },

    /// A region was empty or overlapped one already in the layout
    #[error("Invalid region {base:#x} (+{length:#x})")]
    InvalidRegion { base: usize, length: usize },

    #[error("Memory interface is closed")]
    InterfaceClosed,
}

impl Error {
    pub(crate) fn os(operation: &'static str, address: usize, source: io::Error) -> Self {
        Error::Os {
            operation,
            address,
            source,
        }
    }

    /// The operation was rejected because of the manager's configuration,
    /// not by the operating system.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. } | Error::InterfaceClosed)
    }

    /// The operating system rejected the call.
    pub fn is_os(&self) -> bool {
        matches!(self, Error::Os { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
