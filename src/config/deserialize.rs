// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles the API base URL and storage domain IDs.

use hyper::Uri;
use serde::Deserialize;

use crate::types::StorageDomainId;

/// Accept an absolute `http` URL and strip any trailing slash.
pub fn deserialize_api_url<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let uri: Uri = s.parse().map_err(serde::de::Error::custom)?;

    match uri.scheme_str() {
        Some("http") => {}
        Some("https") => {
            return Err(serde::de::Error::custom(
                "https is not supported by the built-in client, use an http URL or a TLS-terminating proxy",
            ));
        }
        _ => return Err(serde::de::Error::custom("api url must start with http://")),
    }
    if uri.host().is_none() {
        return Err(serde::de::Error::custom("api url has no host"));
    }

    Ok(s.trim_end_matches('/').to_string())
}

pub fn deserialize_storage_domain<'de, D>(
    deserializer: D,
) -> Result<Option<StorageDomainId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => {
            Err(serde::de::Error::custom("storage_domain cannot be empty"))
        }
        Some(s) => Ok(Some(StorageDomainId::new(s.trim()))),
    }
}
