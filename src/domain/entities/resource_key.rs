//! Identity of a fetchable image.

use std::str::FromStr;

use reqwest::Url;

use crate::domain::errors::LoadError;

/// Absolute `http`/`https` URL of an image.
/// Used both as the cache key and as the identity for request deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey(Url);

impl ResourceKey {
    /// Parses and validates a URL string.
    ///
    /// # Errors
    /// Returns `LoadError::InvalidUrl` if the string is not an absolute URL
    /// or uses a scheme other than `http`/`https`.
    pub fn parse(input: &str) -> Result<Self, LoadError> {
        let url = Url::parse(input).map_err(|e| LoadError::invalid_url(input, e.to_string()))?;
        Self::try_from(url)
    }

    /// Returns the underlying URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.0
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<Url> for ResourceKey {
    type Error = LoadError;

    fn try_from(url: Url) -> Result<Self, Self::Error> {
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(LoadError::invalid_url(
                url.as_str(),
                format!("unsupported scheme `{other}`"),
            )),
        }
    }
}

impl FromStr for ResourceKey {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
