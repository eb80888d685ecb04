use std::fmt;

use crate::{oci, registry_client, storage};

#[derive(Debug)]
pub enum Error {
    Storage(storage::Error),
    Manifest(oci::Error),
    Registry(registry_client::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Storage(err) => write!(f, "Storage error: {err}"),
            Error::Manifest(err) => write!(f, "Manifest error: {err}"),
            Error::Registry(err) => write!(f, "Registry error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<storage::Error> for Error {
    fn from(err: storage::Error) -> Self {
        Error::Storage(err)
    }
}

impl From<oci::Error> for Error {
    fn from(err: oci::Error) -> Self {
        Error::Manifest(err)
    }
}

impl From<registry_client::Error> for Error {
    fn from(err: registry_client::Error) -> Self {
        Error::Registry(err)
    }
}
