//! Normalized request identity.
//!
//! A [`RequestSignature`] is the canonical form of an outbound GET: scheme and
//! host lowercased, default port and fragment dropped, and every query
//! parameter (from the URL itself or supplied separately) sorted by key and
//! value. Two requests that differ only in parameter order therefore share one
//! signature, and one cache entry.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid request address '{input}': {source}")]
pub struct SignatureError {
    pub input: String,
    #[source]
    pub source: url::ParseError,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestSignature {
    canonical: String,
}

impl RequestSignature {
    /// Normalize an absolute address with no extra parameters.
    pub fn parse(address: &str) -> Result<Self, SignatureError> {
        Self::with_params(address, std::iter::empty::<(&str, &str)>())
    }

    /// Normalize `base` plus `params`. Parameters already present in `base`'s
    /// query string are merged with `params` before sorting.
    pub fn with_params<I, K, V>(base: &str, params: I) -> Result<Self, SignatureError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = Url::parse(base).map_err(|source| SignatureError {
            input: base.to_string(),
            source,
        })?;
        Ok(Self::from_url(url, params))
    }

    /// Resolve a site-relative link (e.g. `/en/comps/9/history/...`) against
    /// the configured base address.
    pub fn resolve(base: &Url, link: &str) -> Result<Self, SignatureError> {
        let url = base.join(link).map_err(|source| SignatureError {
            input: link.to_string(),
            source,
        })?;
        Ok(Self::from_url(url, std::iter::empty::<(&str, &str)>()))
    }

    fn from_url<I, K, V>(mut url: Url, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        url.set_fragment(None);

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.extend(
            params
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );
        pairs.sort();

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs.iter());
        }

        Self {
            canonical: url.to_string(),
        }
    }

    /// The canonical address, used verbatim for the outbound request.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Stable SHA-256 digest of the canonical address.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}
