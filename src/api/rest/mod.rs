// ABOUTME: DiskOps and TransferOps over the management API's REST/JSON surface.
// ABOUTME: One pooled hyper-util client serves API calls, endpoint probes and the image upload.

mod wire;

use std::io;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures::TryStreamExt;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Request, Response, Uri};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::{Connect, HttpConnector};
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt;
use tokio_util::io::ReaderStream;

use super::error::{
    ApiError, BuildRequestSnafu, DecodeSnafu, EncodeSnafu, InvalidUriSnafu, ReadBodySnafu,
    RequestSnafu,
};
use super::traits::{
    DiskError, DiskOps, DiskSpec, DiskStatus, ImageStream, TransferDescriptor, TransferError,
    TransferOps, TransferPhase,
};
use crate::types::{CorrelationId, DiskId, TransferId};

/// Body type shared by API calls and the streamed image upload.
pub type RequestBody = UnsyncBoxBody<Bytes, io::Error>;

/// Content type for opaque image bytes.
const OCTET_STREAM: &str = "application/octet-stream";

/// Username and password for HTTP Basic authorization.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Management API client.
///
/// Cheap to clone; clones share the connection pool, so one client can back
/// any number of concurrent uploads.
#[derive(Clone)]
pub struct RestClient<C = HttpConnector> {
    client: Client<C, RequestBody>,
    base_url: String,
    authorization: String,
}

impl RestClient<HttpConnector> {
    /// Client over plain HTTP.
    pub fn new(base_url: &str, credentials: &Credentials) -> Self {
        Self::with_connector(HttpConnector::new(), base_url, credentials)
    }
}

impl<C> RestClient<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    /// Client over a caller-supplied connector (e.g. one that speaks TLS).
    pub fn with_connector(connector: C, base_url: &str, credentials: &Credentials) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(connector),
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: credentials.authorization(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_uri(&self, path: &str, correlation: Option<&CorrelationId>) -> Result<Uri, ApiError> {
        let mut uri = format!("{}/{}", self.base_url, path);
        if let Some(correlation) = correlation {
            uri.push_str("?correlation_id=");
            uri.push_str(&urlencoding::encode(correlation.as_str()));
        }
        uri.parse::<Uri>().context(InvalidUriSnafu { uri })
    }

    fn api_request(
        &self,
        method: Method,
        uri: &Uri,
        body: Option<RequestBody>,
    ) -> Result<Request<RequestBody>, ApiError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri.clone())
            .header(AUTHORIZATION, &self.authorization)
            .header(ACCEPT, "application/json");

        let body = match body {
            Some(body) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                body
            }
            None => empty(),
        };

        builder.body(body).context(BuildRequestSnafu {
            uri: uri.to_string(),
        })
    }

    /// Send a request and turn non-2xx responses into `ApiError::Status`.
    async fn send(&self, request: Request<RequestBody>) -> Result<Response<Incoming>, ApiError> {
        let uri = request.uri().to_string();
        tracing::debug!(method = %request.method(), %uri, "management API request");

        let response = self
            .client
            .request(request)
            .await
            .context(RequestSnafu { uri: uri.clone() })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = read_body(response, &uri).await?;
        Err(ApiError::Status {
            uri,
            status,
            message: wire::error_message(&body),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        uri: Uri,
        body: Option<RequestBody>,
    ) -> Result<T, ApiError> {
        let request = self.api_request(method, &uri, body)?;
        let response = self.send(request).await?;
        let uri = uri.to_string();
        let bytes = read_body(response, &uri).await?;
        serde_json::from_slice(&bytes).context(DecodeSnafu { uri })
    }

    async fn call_discarding(
        &self,
        method: Method,
        uri: Uri,
        body: Option<RequestBody>,
    ) -> Result<(), ApiError> {
        let request = self.api_request(method, &uri, body)?;
        let response = self.send(request).await?;
        read_body(response, &uri.to_string()).await?;
        Ok(())
    }
}

async fn read_body(response: Response<Incoming>, uri: &str) -> Result<Bytes, ApiError> {
    let collected = response
        .into_body()
        .collect()
        .await
        .context(ReadBodySnafu { uri })?;
    Ok(collected.to_bytes())
}

fn json_body<T: Serialize>(value: &T) -> Result<RequestBody, ApiError> {
    let bytes = serde_json::to_vec(value).context(EncodeSnafu)?;
    Ok(Full::new(Bytes::from(bytes))
        .map_err(|never| match never {})
        .boxed_unsync())
}

fn empty() -> RequestBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

#[async_trait]
impl<C> DiskOps for RestClient<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn create_disk(
        &self,
        spec: &DiskSpec,
        correlation: &CorrelationId,
    ) -> Result<DiskId, DiskError> {
        let body = wire::DiskCreateBody {
            alias: spec.alias.as_str(),
            format: spec.format,
            provisioned_size: spec.sizes.provisioned,
            initial_size: spec.sizes.initial,
            sparse: spec.sparse,
            storage_domains: wire::StorageDomainList {
                storage_domain: vec![wire::IdRef {
                    id: spec.storage_domain.to_string(),
                }],
            },
        };

        let uri = self.api_uri("disks", Some(correlation))?;
        let disk: wire::DiskBody = self
            .call(Method::POST, uri, Some(json_body(&body)?))
            .await?;
        Ok(disk.id)
    }

    async fn poll_disk_status(&self, id: &DiskId) -> Result<DiskStatus, DiskError> {
        let uri = self.api_uri(&format!("disks/{id}"), None)?;
        let disk: wire::DiskBody = self.call(Method::GET, uri, None).await?;
        disk.into_status().map_err(DiskError::Unsupported)
    }

    async fn remove_disk(&self, id: &DiskId) -> Result<(), DiskError> {
        let uri = self.api_uri(&format!("disks/{id}"), None)?;
        self.call_discarding(Method::DELETE, uri, None).await?;
        Ok(())
    }
}

#[async_trait]
impl<C> TransferOps for RestClient<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn open_transfer(
        &self,
        disk: &DiskId,
        correlation: &CorrelationId,
    ) -> Result<TransferDescriptor, TransferError> {
        let body = wire::TransferCreateBody {
            disk: wire::IdRef {
                id: disk.to_string(),
            },
            direction: "upload",
        };

        let uri = self.api_uri("imagetransfers", Some(correlation))?;
        let transfer: wire::TransferBody = self
            .call(Method::POST, uri, Some(json_body(&body)?))
            .await?;

        let candidate_endpoints = transfer
            .candidate_urls()
            .into_iter()
            .map(|url| {
                url.parse::<Uri>().context(InvalidUriSnafu {
                    uri: url.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TransferDescriptor {
            id: transfer.id,
            candidate_endpoints,
            phase: transfer.phase.unwrap_or(TransferPhase::Unknown),
        })
    }

    async fn poll_transfer_phase(&self, id: &TransferId) -> Result<TransferPhase, TransferError> {
        let uri = self.api_uri(&format!("imagetransfers/{id}"), None)?;
        let transfer: wire::TransferBody = self.call(Method::GET, uri, None).await?;
        Ok(transfer.phase.unwrap_or(TransferPhase::Unknown))
    }

    async fn probe_endpoint(&self, endpoint: &Uri) -> Result<(), TransferError> {
        // Transfer endpoints authorize by ticket, not by API credentials.
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(endpoint.clone())
            .body(empty())
            .context(BuildRequestSnafu {
                uri: endpoint.to_string(),
            })?;
        let response = self.send(request).await?;
        read_body(response, &endpoint.to_string()).await?;
        Ok(())
    }

    async fn send_image(
        &self,
        endpoint: &Uri,
        image: ImageStream,
        length: u64,
    ) -> Result<(), TransferError> {
        let stream = ReaderStream::new(image).map_ok(Frame::data);
        let request = Request::builder()
            .method(Method::PUT)
            .uri(endpoint.clone())
            .header(CONTENT_LENGTH, length)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(StreamBody::new(stream).boxed_unsync())
            .context(BuildRequestSnafu {
                uri: endpoint.to_string(),
            })?;

        let response = self.send(request).await?;
        read_body(response, &endpoint.to_string()).await?;
        Ok(())
    }

    async fn finalize_transfer(
        &self,
        id: &TransferId,
        correlation: &CorrelationId,
    ) -> Result<(), TransferError> {
        let uri = self.api_uri(&format!("imagetransfers/{id}/finalize"), Some(correlation))?;
        let body = json_body(&serde_json::json!({}))?;
        self.call_discarding(Method::POST, uri, Some(body)).await?;
        Ok(())
    }
}

impl<C> std::fmt::Debug for RestClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
