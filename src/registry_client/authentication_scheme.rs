use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::registry_client::Error;

static WWW_AUTHENTICATE_HEADER_PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).unwrap());

#[derive(Debug, PartialEq)]
pub enum AuthenticationScheme {
    Bearer(String, HashMap<String, String>),
    Basic,
}

impl AuthenticationScheme {
    pub fn from_www_authenticate_header(header: &str) -> Result<Self, Error> {
        let header = header.trim();
        let (scheme, parameters) = header.split_once(' ').unwrap_or((header, ""));

        if scheme.eq_ignore_ascii_case("bearer") {
            let mut parameters = WWW_AUTHENTICATE_HEADER_PARAMETER
                .captures_iter(parameters)
                .map(|c| c.extract())
                .map(|(_, [key, value])| (key.to_lowercase(), value.to_string()))
                .collect::<HashMap<_, _>>();

            let realm = parameters.remove("realm").ok_or_else(|| {
                Error::Unauthorized("Missing realm parameter in WWW-Authenticate header".to_string())
            })?;

            Ok(Self::Bearer(realm, parameters))
        } else if scheme.eq_ignore_ascii_case("basic") {
            Ok(Self::Basic)
        } else {
            Err(Error::Unauthorized(format!(
                "Unsupported authentication scheme in WWW-Authenticate header: {scheme}"
            )))
        }
    }
}
