// ABOUTME: Defaults applied to every upload started from the command line.
// ABOUTME: Storage domain, provisioning hint, poll interval and overall deadline.

use serde::Deserialize;
use std::time::Duration;

use super::deserialize::deserialize_storage_domain;
use crate::types::StorageDomainId;
use crate::upload::{DEFAULT_POLL_INTERVAL, UploadOptions};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    #[serde(default, deserialize_with = "deserialize_storage_domain")]
    pub storage_domain: Option<StorageDomainId>,

    #[serde(default = "default_sparse")]
    pub sparse: bool,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_sparse() -> bool {
    true
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            storage_domain: None,
            sparse: default_sparse(),
            poll_interval: default_poll_interval(),
            timeout: None,
        }
    }
}

impl UploadConfig {
    pub fn options(&self) -> UploadOptions {
        UploadOptions {
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        }
    }
}
