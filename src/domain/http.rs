//! HTTP transport and request option records.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// TLS protocol versions a cluster's transport may negotiate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SslProtocol {
    Tls12,
    Tls13,
}

/// An opaque client certificate handle, compared structurally so that
/// certificate rotation re-keys the transport cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCertificate {
    /// Stable identifier, used in log and error messages.
    pub id: String,

    /// PEM bundle containing the certificate chain and private key.
    pub pem: Vec<u8>,
}

/// Transport knobs for a cluster's upstream HTTP client.
///
/// Structural equality of `(cluster_id, HttpClientOptions)` defines the
/// transport-cache key; two reloads carrying equal options reuse the same
/// client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpClientOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_protocols: Option<BTreeSet<SslProtocol>>,

    /// Upper bound on connections per upstream server. Must be positive
    /// when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections_per_server: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<ClientCertificate>,

    /// Disables server certificate verification. Test environments only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dangerous_accept_any_server_certificate: Option<bool>,

    /// Named encoding applied to outgoing request headers by the
    /// forwarding engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_header_encoding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_multiple_http2_connections: Option<bool>,
}

/// Options applied to each proxied request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestOptions {
    /// Outgoing HTTP version. Only 1.0, 1.1 and 2.0 are supported; the
    /// representation is open so that validation can report anything else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<HttpVersion>,

    /// How long a proxied request may stay idle before it is aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_policy: Option<HttpVersionPolicy>,
}

/// An HTTP protocol version as `major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpVersion {
    pub major: u32,
    pub minor: u32,
}

impl HttpVersion {
    pub const HTTP_1_0: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_1_1: HttpVersion = HttpVersion { major: 1, minor: 1 };
    pub const HTTP_2: HttpVersion = HttpVersion { major: 2, minor: 0 };

    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn is_supported(&self) -> bool {
        matches!(*self, Self::HTTP_1_0 | Self::HTTP_1_1 | Self::HTTP_2)
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// How strictly the configured request version is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpVersionPolicy {
    RequestVersionOrLower,
    RequestVersionOrHigher,
    RequestVersionExact,
}
