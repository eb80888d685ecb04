use crate::{cleanup, configuration, registry_client, storage};
use std::{fmt, io};

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    Configuration(configuration::Error),
    Registry(registry_client::Error),
    Storage(storage::Error),
    Cleanup(cleanup::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(err) => write!(f, "IO error: {err}"),
            Error::Configuration(err) => {
                write!(f, "Configuration error: ")?;
                write!(f, "{err}")
            }
            Error::Registry(err) => {
                write!(f, "Could not contact registry: ")?;
                write!(f, "{err}")
            }
            Error::Storage(err) => {
                write!(f, "Storage error: ")?;
                write!(f, "{err}")
            }
            Error::Cleanup(err) => {
                write!(f, "Cleanup aborted: ")?;
                write!(f, "{err}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IO(err)
    }
}

impl From<configuration::Error> for Error {
    fn from(err: configuration::Error) -> Self {
        Error::Configuration(err)
    }
}

impl From<registry_client::Error> for Error {
    fn from(err: registry_client::Error) -> Self {
        Error::Registry(err)
    }
}

impl From<storage::Error> for Error {
    fn from(err: storage::Error) -> Self {
        Error::Storage(err)
    }
}

impl From<cleanup::Error> for Error {
    fn from(err: cleanup::Error) -> Self {
        Error::Cleanup(err)
    }
}
