use hyper::StatusCode;
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum Error {
    Configuration(String),
    Connection(String),
    Unauthorized(String),
    UnexpectedStatus(StatusCode),
    InvalidResponse(String),
}

impl Error {
    /// Everything except a failed request is fatal for a cleanup run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Connection(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Configuration(msg) => write!(f, "Invalid registry client configuration: {msg}"),
            Error::Connection(msg) => write!(f, "Registry request failed: {msg}"),
            Error::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Error::UnexpectedStatus(status) => write!(f, "Unexpected registry response: {status}"),
            Error::InvalidResponse(msg) => write!(f, "Invalid registry response: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<hyper::http::Error> for Error {
    fn from(err: hyper::http::Error) -> Self {
        Error::Configuration(format!("Invalid request: {err}"))
    }
}

impl From<rustls::Error> for Error {
    fn from(err: rustls::Error) -> Self {
        Error::Configuration(format!("TLS error: {err}"))
    }
}

impl From<rustls_pki_types::pem::Error> for Error {
    fn from(err: rustls_pki_types::pem::Error) -> Self {
        Error::Configuration(format!("Unable to load PEM file: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidResponse(err.to_string())
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        Error::InvalidResponse(format!("Unable to read response body: {err}"))
    }
}
