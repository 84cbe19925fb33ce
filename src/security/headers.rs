//! Client identity resolution and security response headers.
//!
//! # Responsibilities
//! - Resolve the client identity used as the rate limiting key
//! - Add security response headers (HSTS only in production)
//!
//! # Design Decisions
//! - The identity is the peer IP, without the ephemeral port
//! - X-Forwarded-For / X-Real-IP are only honored when the peer is a
//!   configured trusted proxy

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use tower::Layer;
use tower_http::set_header::{SetResponseHeader, SetResponseHeaderLayer};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

const HSTS: &str = "max-age=31536000; includeSubDomains";

/// Identity used when neither the peer address nor a trusted header is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolves the identity a request is rate limited under.
#[derive(Debug, Clone, Default)]
pub struct ClientIdentityResolver {
    trusted_proxies: HashSet<IpAddr>,
}

impl ClientIdentityResolver {
    /// Build from the configured proxy list. Entries that are not IP
    /// addresses are skipped; config validation rejects them earlier.
    pub fn new<S: AsRef<str>>(trusted_proxies: &[S]) -> Self {
        let trusted_proxies = trusted_proxies
            .iter()
            .filter_map(|p| p.as_ref().trim().parse().ok())
            .collect();
        Self { trusted_proxies }
    }

    pub fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        let Some(peer) = peer else {
            return UNKNOWN_CLIENT.to_string();
        };

        if self.trusted_proxies.contains(&peer.ip()) {
            if let Some(forwarded) = header_str(headers, &X_FORWARDED_FOR) {
                return forwarded.to_string();
            }
            if let Some(real_ip) = header_str(headers, &X_REAL_IP) {
                return real_ip.to_string();
            }
        }

        peer.ip().to_string()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Layer adding `X-Content-Type-Options`, `X-Frame-Options` and, in
/// production, `Strict-Transport-Security` to every response.
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    content_type_options: SetResponseHeaderLayer<HeaderValue>,
    frame_options: SetResponseHeaderLayer<HeaderValue>,
    transport_security: SetResponseHeaderLayer<Option<HeaderValue>>,
}

impl SecurityHeadersLayer {
    pub fn new(production: bool) -> Self {
        Self {
            content_type_options: SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
            frame_options: SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ),
            transport_security: SetResponseHeaderLayer::overriding(
                header::STRICT_TRANSPORT_SECURITY,
                production.then(|| HeaderValue::from_static(HSTS)),
            ),
        }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SetResponseHeader<
        SetResponseHeader<SetResponseHeader<S, Option<HeaderValue>>, HeaderValue>,
        HeaderValue,
    >;

    fn layer(&self, inner: S) -> Self::Service {
        let inner = self.transport_security.layer(inner);
        let inner = self.frame_options.layer(inner);
        self.content_type_options.layer(inner)
    }
}
