use std::fmt::Display;

#[derive(Debug, PartialEq)]
pub enum Error {
    InvalidFormat(String),
    InvalidDigest(String),
    UnsupportedAlgorithm(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidFormat(s) => write!(f, "Invalid format: {s}"),
            Error::InvalidDigest(s) => write!(f, "Invalid digest: {s}"),
            Error::UnsupportedAlgorithm(s) => write!(f, "Unsupported digest algorithm: {s}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidFormat(format!("{e}"))
    }
}
