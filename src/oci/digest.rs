use regex::Regex;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use crate::oci::Error;

static DIGEST_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<algorithm>[a-z0-9]+):(?P<hash>[a-f0-9]{64})$").unwrap());

static HASH_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-f0-9]{64}$").unwrap());

#[derive(Debug, Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Digest {
    Sha256(String),
}

impl Digest {
    /// Builds a sha256 digest from the bare hex hash found in storage paths.
    pub fn from_sha256_hash(hash: &str) -> Result<Self, Error> {
        if HASH_REGEX.is_match(hash) {
            Ok(Digest::Sha256(hash.to_string()))
        } else {
            Err(Error::InvalidDigest(hash.to_string()))
        }
    }

    pub fn algorithm(&self) -> &str {
        match self {
            Digest::Sha256(_) => "sha256",
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            Digest::Sha256(s) => s,
        }
    }

    pub fn hash_prefix(&self) -> &str {
        match self {
            Digest::Sha256(s) => &s[0..2],
        }
    }

    pub fn short_hash(&self) -> &str {
        match self {
            Digest::Sha256(s) => &s[0..12],
        }
    }
}

impl TryFrom<&str> for Digest {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let captures = DIGEST_REGEX
            .captures(s.trim())
            .ok_or_else(|| Error::InvalidDigest(s.to_string()))?;

        match &captures["algorithm"] {
            "sha256" => Ok(Digest::Sha256(captures["hash"].to_string())),
            algorithm => Err(Error::UnsupportedAlgorithm(algorithm.to_string())),
        }
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm(), self.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "99c9d5e2bdc7ef0223f56c845a695ea0f8f11f5b55ea6f74e1f7df0d4f90026c";

    #[test]
    fn test_try_from_link_content() {
        let digest = Digest::try_from(format!("sha256:{HASH}\n").as_str()).unwrap();

        assert_eq!(digest, Digest::Sha256(HASH.to_string()));
        assert_eq!(digest.algorithm(), "sha256");
        assert_eq!(digest.hash_prefix(), "99");
        assert_eq!(digest.short_hash(), "99c9d5e2bdc7");
        assert_eq!(digest.to_string(), format!("sha256:{HASH}"));
    }

    #[test]
    fn test_try_from_invalid() {
        assert!(matches!(
            Digest::try_from("sha256:1234"),
            Err(Error::InvalidDigest(_))
        ));
        assert!(matches!(
            Digest::try_from(HASH),
            Err(Error::InvalidDigest(_))
        ));
        assert_eq!(
            Digest::try_from(format!("sha512:{HASH}").as_str()),
            Err(Error::UnsupportedAlgorithm("sha512".to_string()))
        );
    }

    #[test]
    fn test_from_sha256_hash() {
        assert_eq!(
            Digest::from_sha256_hash(HASH).unwrap(),
            Digest::Sha256(HASH.to_string())
        );
        assert!(Digest::from_sha256_hash("not-a-hash").is_err());
    }
}
