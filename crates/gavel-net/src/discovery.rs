//! Master-server discovery via DNS SRV records.
//!
//! Resolution is behind the [`SrvResolver`] trait so the directory client can
//! run against the system resolver ([`HickoryResolver`]) or a fixed list of
//! endpoints ([`StaticResolver`]).

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;

/// One candidate endpoint produced by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvEndpoint {
    /// Target host name (no trailing dot).
    pub target: String,
    /// Target port.
    pub port: u16,
    /// SRV priority, lower is preferred.
    pub priority: u16,
    /// SRV weight among equal priorities.
    pub weight: u16,
}

impl SrvEndpoint {
    /// Endpoint with neutral priority and weight.
    pub fn new(target: impl Into<String>, port: u16) -> Self {
        Self {
            target: target.into(),
            port,
            priority: 0,
            weight: 0,
        }
    }

    /// Parse a `host:port` string. IPv6 literals must be bracketed.
    pub fn parse(text: &str) -> Option<Self> {
        let (host, port) = text.trim().rsplit_once(':')?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return None;
        }
        Some(Self::new(host, port.parse().ok()?))
    }
}

/// Errors produced by discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The resolver could not be constructed.
    #[error("resolver setup failed: {0}")]
    Setup(String),

    /// The lookup itself failed.
    #[error("SRV lookup of {name} failed: {reason}")]
    Lookup {
        /// Queried name.
        name: String,
        /// Resolver error text.
        reason: String,
    },
}

/// Resolves a service name to an ordered list of endpoints.
///
/// The returned order is authoritative: callers try candidates as given.
#[async_trait]
pub trait SrvResolver: Send + Sync {
    /// Look up `name` and return its endpoints.
    async fn resolve(&self, name: &str) -> Result<Vec<SrvEndpoint>, DiscoveryError>;
}

/// Resolver backed by the system DNS configuration.
pub struct HickoryResolver {
    inner: TokioAsyncResolver,
}

impl HickoryResolver {
    /// Build a resolver from `/etc/resolv.conf` (or the platform equivalent).
    pub fn from_system_conf() -> Result<Self, DiscoveryError> {
        let inner = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| DiscoveryError::Setup(e.to_string()))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl SrvResolver for HickoryResolver {
    async fn resolve(&self, name: &str) -> Result<Vec<SrvEndpoint>, DiscoveryError> {
        let lookup = self
            .inner
            .srv_lookup(name)
            .await
            .map_err(|e| DiscoveryError::Lookup {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(lookup
            .iter()
            .map(|srv| SrvEndpoint {
                target: srv.target().to_utf8().trim_end_matches('.').to_string(),
                port: srv.port(),
                priority: srv.priority(),
                weight: srv.weight(),
            })
            .collect())
    }
}

/// Resolver that always answers with the same endpoints, ignoring the name.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    endpoints: Vec<SrvEndpoint>,
}

impl StaticResolver {
    /// Answer every lookup with `endpoints`, in this order.
    pub fn new(endpoints: Vec<SrvEndpoint>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl SrvResolver for StaticResolver {
    async fn resolve(&self, name: &str) -> Result<Vec<SrvEndpoint>, DiscoveryError> {
        if self.endpoints.is_empty() {
            return Err(DiscoveryError::Lookup {
                name: name.to_string(),
                reason: "no static endpoints configured".to_string(),
            });
        }
        Ok(self.endpoints.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_port() {
        let endpoint = SrvEndpoint::parse("master.example.com:27016").unwrap();
        assert_eq!(endpoint.target, "master.example.com");
        assert_eq!(endpoint.port, 27016);
    }

    #[test]
    fn test_parse_bracketed_ipv6() {
        let endpoint = SrvEndpoint::parse("[::1]:27016").unwrap();
        assert_eq!(endpoint.target, "::1");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SrvEndpoint::parse("no-port").is_none());
        assert!(SrvEndpoint::parse(":27016").is_none());
        assert!(SrvEndpoint::parse("host:99999").is_none());
    }

    #[tokio::test]
    async fn test_static_resolver_preserves_order() {
        let endpoints = vec![
            SrvEndpoint::new("b.example", 2),
            SrvEndpoint::new("a.example", 1),
        ];
        let resolver = StaticResolver::new(endpoints.clone());
        assert_eq!(resolver.resolve("_svc._tcp.x").await.unwrap(), endpoints);
    }

    #[tokio::test]
    async fn test_empty_static_resolver_fails() {
        let resolver = StaticResolver::default();
        assert!(matches!(
            resolver.resolve("_svc._tcp.x").await,
            Err(DiscoveryError::Lookup { .. })
        ));
    }
}
