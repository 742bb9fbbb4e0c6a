use super::Target;
use crate::error::{AppResult, ErrorReason};
use hickory_resolver::TokioAsyncResolver;
use rustls_pki_types::ServerName;
use std::{
    fmt::{Display, Formatter},
    net::{IpAddr, SocketAddr},
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub sockaddr: SocketAddr,
    pub server_name: ServerName<'static>,
}

impl Endpoint {
    /// Resolves every address of the target.
    ///
    /// IP literals skip the resolver entirely, so no system resolver
    /// configuration is needed to probe them.
    pub async fn resolve(target: &Target) -> AppResult<Vec<Self>> {
        let server_name = ServerName::try_from(target.host.as_str())
            .map_err(|_| ErrorReason::InvalidEndpoint)?
            .to_owned();

        if let Ok(ip) = target.host.parse::<IpAddr>() {
            return Ok(vec![Self {
                sockaddr: SocketAddr::new(ip, target.port),
                server_name,
            }]);
        }

        let resolver = TokioAsyncResolver::tokio_from_system_conf()?;
        let endpoints: Vec<Self> = resolver
            .lookup_ip(target.host.as_str())
            .await?
            .into_iter()
            .map(|ip| Self {
                sockaddr: SocketAddr::new(ip, target.port),
                server_name: server_name.clone(),
            })
            .collect();
        debug!("{} resolved to {} address(es)", target, endpoints.len());

        Ok(endpoints)
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let ServerName::DnsName(dns) = &self.server_name {
            write!(f, "{}({})", self.sockaddr, dns.as_ref())
        } else {
            write!(f, "{}", self.sockaddr)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn ip_literal_skips_resolver() {
        let target = Target::new("127.0.0.1", 8443);
        let endpoints = Endpoint::resolve(&target).await.unwrap();

        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].sockaddr, "127.0.0.1:8443".parse().unwrap());
        assert!(matches!(endpoints[0].server_name, ServerName::IpAddress(_)));
        assert_eq!(endpoints[0].to_string(), "127.0.0.1:8443");
    }

    #[tokio::test]
    async fn invalid_host_is_rejected() {
        let target = Target::new("not a host name", 443);
        let err = Endpoint::resolve(&target).await.unwrap_err();
        assert!(matches!(err.reason(), ErrorReason::InvalidEndpoint));
    }
}
