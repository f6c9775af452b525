// ABOUTME: Connection settings for the management API.
// ABOUTME: Resolves the password through env interpolation before building a client.

use serde::Deserialize;

use super::EnvValue;
use super::deserialize::deserialize_api_url;
use crate::api::{Credentials, RestClient};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the REST API, e.g. `http://engine.example.com/ovirt-engine/api`.
    #[serde(deserialize_with = "deserialize_api_url")]
    pub url: String,
    pub username: String,
    pub password: EnvValue,
}

impl ApiConfig {
    /// Resolve the password and pair it with the username.
    pub fn credentials(&self) -> Result<Credentials> {
        let password = self.password.resolve()?;
        Ok(Credentials::new(self.username.clone(), password))
    }

    /// Build a plain HTTP client for this API.
    pub fn client(&self) -> Result<RestClient> {
        Ok(RestClient::new(&self.url, &self.credentials()?))
    }
}
