use std::{fmt, io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid hardware address {0:?}")]
    InvalidHardwareAddr(String),

    #[error("invalid IPv4 address {0:?}")]
    InvalidProtocolAddr(String),

    #[error("store {path}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("insufficient privilege to open raw socket on {interface} (try 'setcap CAP_NET_RAW=p {binary}'): {source}")]
    Capability {
        interface: String,
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("no such network interface: {0}")]
    Interface(String),

    #[error("capture on {interface} failed: {reason}")]
    Capture { interface: String, reason: String },
}

impl Error {
    /// Malformed address text; the offending event is dropped, nothing else is affected.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidHardwareAddr(_) | Error::InvalidProtocolAddr(_))
    }

    pub(crate) fn store_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::StoreIo { path: path.into(), source }
    }
}

/// Every interface that could not be opened, reported once.
#[derive(Debug)]
pub struct OpenError {
    pub failures: Vec<Error>,
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to use interface(s): ")?;
        for (i, err) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for OpenError {}
