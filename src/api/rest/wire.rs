// ABOUTME: JSON shapes of the management API disk and image transfer resources.
// ABOUTME: Custom deserializers accept numbers and booleans that arrive as strings.

use serde::{Deserialize, Deserializer, Serialize};

use crate::api::traits::{Disk, DiskStatus, TransferPhase};
use crate::image::ImageFormat;
use crate::types::{DiskId, StorageDomainId, TransferId};

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Native(T),
    Text(String),
}

pub fn deserialize_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Loose<u64>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Native(n)) => Ok(Some(n)),
        Some(Loose::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn deserialize_opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Loose<bool>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Native(b)) => Ok(Some(b)),
        Some(Loose::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct StorageDomainList {
    #[serde(default)]
    pub storage_domain: Vec<IdRef>,
}

#[derive(Debug, Serialize)]
pub struct DiskCreateBody<'a> {
    pub alias: &'a str,
    pub format: ImageFormat,
    pub provisioned_size: u64,
    pub initial_size: u64,
    pub sparse: bool,
    pub storage_domains: StorageDomainList,
}

#[derive(Debug, Deserialize)]
pub struct DiskBody {
    pub id: DiskId,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_u64")]
    pub provisioned_size: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_opt_u64")]
    pub initial_size: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_opt_bool")]
    pub sparse: Option<bool>,
    #[serde(default)]
    pub storage_domains: Option<StorageDomainList>,
    #[serde(default)]
    pub status: Option<String>,
}

impl DiskBody {
    /// Collapse the remote status into ready / not ready.
    pub fn into_status(self) -> Result<DiskStatus, String> {
        match self.status.as_deref() {
            Some("ok") => {}
            Some(other) => {
                return Ok(DiskStatus::not_ready(format!("disk {} is {}", self.id, other)));
            }
            None => {
                return Ok(DiskStatus::not_ready(format!(
                    "disk {} has no status yet",
                    self.id
                )));
            }
        }

        let format = match self.format.as_deref() {
            Some("cow") => ImageFormat::Cow,
            Some("raw") | None => ImageFormat::Raw,
            Some(other) => return Err(format!("disk {} has unknown format {}", self.id, other)),
        };

        let storage_domain = self
            .storage_domains
            .and_then(|list| list.storage_domain.into_iter().next())
            .map(|sd| StorageDomainId::new(sd.id));

        Ok(DiskStatus::Ready(Disk {
            id: self.id,
            alias: self.alias,
            format,
            provisioned_size: self.provisioned_size.unwrap_or_default(),
            initial_size: self.initial_size,
            sparse: self.sparse.unwrap_or(false),
            storage_domain,
            status: "ok".to_string(),
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct TransferCreateBody {
    pub disk: IdRef,
    pub direction: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub id: TransferId,
    #[serde(default)]
    pub phase: Option<TransferPhase>,
    #[serde(default)]
    pub transfer_url: Option<String>,
    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl TransferBody {
    /// Candidate URLs in preference order, skipping absent or blank ones.
    pub fn candidate_urls(&self) -> Vec<&str> {
        [self.transfer_url.as_deref(), self.proxy_url.as_deref()]
            .into_iter()
            .flatten()
            .filter(|url| !url.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct Fault {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FaultBody {
    Wrapped { fault: Fault },
    Bare(Fault),
}

/// Best-effort human readable message from an error response body.
pub fn error_message(body: &[u8]) -> String {
    let fault = match serde_json::from_slice::<FaultBody>(body) {
        Ok(FaultBody::Wrapped { fault }) | Ok(FaultBody::Bare(fault)) => fault,
        Err(_) => return String::from_utf8_lossy(body).trim().to_string(),
    };

    match (fault.reason, fault.detail) {
        (Some(reason), Some(detail)) => format!("{reason}: {detail}"),
        (Some(msg), None) | (None, Some(msg)) => msg,
        (None, None) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_with_string_numbers_is_ready() {
        let body: DiskBody = serde_json::from_str(
            r#"{
                "id": "d1",
                "alias": "root",
                "format": "cow",
                "provisioned_size": "4294967296",
                "initial_size": "1024",
                "sparse": "true",
                "status": "ok",
                "storage_domains": {"storage_domain": [{"id": "sd1"}]}
            }"#,
        )
        .unwrap();

        let DiskStatus::Ready(disk) = body.into_status().unwrap() else {
            panic!("disk should be ready");
        };
        assert_eq!(disk.provisioned_size, 4294967296);
        assert_eq!(disk.initial_size, Some(1024));
        assert!(disk.sparse);
        assert_eq!(disk.format, ImageFormat::Cow);
        assert_eq!(disk.storage_domain, Some(StorageDomainId::new("sd1")));
    }

    #[test]
    fn locked_disk_is_not_ready() {
        let body: DiskBody =
            serde_json::from_str(r#"{"id": "d1", "status": "locked"}"#).unwrap();
        assert_eq!(
            body.into_status().unwrap(),
            DiskStatus::not_ready("disk d1 is locked")
        );
    }

    #[test]
    fn ok_disk_with_unknown_format_is_an_error() {
        let body: DiskBody =
            serde_json::from_str(r#"{"id": "d1", "status": "ok", "format": "vmdk"}"#).unwrap();
        let err = body.into_status().unwrap_err();
        assert!(err.contains("unknown format vmdk"));
    }

    #[test]
    fn transfer_candidates_keep_order_and_skip_blank() {
        let body: TransferBody = serde_json::from_str(
            r#"{"id": "t1", "phase": "initializing", "transfer_url": "", "proxy_url": "https://proxy/images/t"}"#,
        )
        .unwrap();
        assert_eq!(body.candidate_urls(), vec!["https://proxy/images/t"]);
        assert_eq!(body.phase, Some(TransferPhase::Initializing));
    }

    #[test]
    fn fault_message_joins_reason_and_detail() {
        let msg = error_message(br#"{"fault": {"reason": "Operation Failed", "detail": "disk locked"}}"#);
        assert_eq!(msg, "Operation Failed: disk locked");
        assert_eq!(error_message(b"plain text"), "plain text");
    }
}
