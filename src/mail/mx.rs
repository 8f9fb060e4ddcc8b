//! Mail exchanger lookups for direct delivery

use std::net::IpAddr;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    /// Exchange host name without the trailing dot
    pub exchange: String,
}

#[async_trait]
pub trait MxResolver: Send + Sync {
    async fn mx_records(&self, domain: &str) -> Result<Vec<MxRecord>, String>;

    async fn resolve_ip(&self, host: &str) -> Result<IpAddr, String>;
}

/// Lowest preference wins; ties keep lookup order
pub fn preferred_exchange(records: &[MxRecord]) -> Option<&MxRecord> {
    records.iter().min_by_key(|r| r.preference)
}

/// DNS resolver backed by hickory
pub struct DnsResolver {
    inner: TokioAsyncResolver,
}

impl DnsResolver {
    /// Use the host's resolver configuration, falling back to public defaults
    pub fn from_system_conf() -> Self {
        let inner = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            crate::logger::log_warning(&format!(
                "System resolver configuration unavailable ({e}), using defaults"
            ));
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { inner }
    }
}

#[async_trait]
impl MxResolver for DnsResolver {
    async fn mx_records(&self, domain: &str) -> Result<Vec<MxRecord>, String> {
        let lookup = self
            .inner
            .mx_lookup(domain)
            .await
            .map_err(|e| format!("MX lookup for {domain} failed: {e}"))?;
        Ok(lookup
            .iter()
            .map(|mx| MxRecord {
                preference: mx.preference(),
                exchange: mx.exchange().to_utf8().trim_end_matches('.').to_string(),
            })
            .collect())
    }

    async fn resolve_ip(&self, host: &str) -> Result<IpAddr, String> {
        let lookup = self
            .inner
            .lookup_ip(host)
            .await
            .map_err(|e| format!("address lookup for {host} failed: {e}"))?;
        lookup
            .iter()
            .next()
            .ok_or_else(|| format!("no address records for {host}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_exchange() {
        let records = vec![
            MxRecord {
                preference: 20,
                exchange: "backup.example.com".to_string(),
            },
            MxRecord {
                preference: 10,
                exchange: "mx1.example.com".to_string(),
            },
            MxRecord {
                preference: 10,
                exchange: "mx2.example.com".to_string(),
            },
        ];
        assert_eq!(
            preferred_exchange(&records).unwrap().exchange,
            "mx1.example.com"
        );
        assert!(preferred_exchange(&[]).is_none());
    }
}
