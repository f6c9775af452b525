// ABOUTME: Config scaffolding for new setups.
// ABOUTME: Creates diskpush.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const TEMPLATE: &str = r#"api:
  url: http://engine.example.com/ovirt-engine/api
  username: admin@internal
  # Read from the environment so the secret stays out of this file
  password:
    env: DISKPUSH_PASSWORD

upload:
  # Storage domain for new disks (can be overridden with --storage-domain)
  # storage_domain: 00000000-0000-0000-0000-000000000000
  sparse: true
  poll_interval: 5s
  # Overall deadline for one upload
  # timeout: 2h
"#;

/// Write the template config into `dir`.
pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    Ok(())
}
