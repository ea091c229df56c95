//! Remote-address predicate: CIDR allow / deny lists.

use crate::container::{bind_params, BuildError};
use ipnet::IpNet;
use portico_kernel::gateway::{PluginParams, Predicate, RequestContext};
use serde::Deserialize;
use std::net::IpAddr;

#[derive(Deserialize)]
struct RemoteAddrConfig {
    /// Caller must be inside one of these networks.
    #[serde(default)]
    allow: Vec<String>,
    /// Caller must be outside all of these networks.
    #[serde(default)]
    deny: Vec<String>,
}

/// Matches callers by IP network.  Exactly one of the two lists must be
/// configured.  A request whose caller address could not be resolved
/// matches unconditionally.
pub struct RemoteAddrPredicate {
    allow: Vec<IpNet>,
    deny: Vec<IpNet>,
}

impl RemoteAddrPredicate {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: RemoteAddrConfig = bind_params(params)?;
        match (config.allow.is_empty(), config.deny.is_empty()) {
            (true, true) => {
                return Err(BuildError::invalid(
                    "one of 'allow' or 'deny' must be configured",
                ));
            }
            (false, false) => {
                return Err(BuildError::invalid(
                    "'allow' and 'deny' must not both be configured",
                ));
            }
            _ => {}
        }
        Ok(Self {
            allow: parse_networks(&config.allow)?,
            deny: parse_networks(&config.deny)?,
        })
    }

    fn matches_addr(&self, addr: IpAddr) -> bool {
        if !self.allow.is_empty() {
            return self.allow.iter().any(|net| net.contains(&addr));
        }
        !self.deny.iter().any(|net| net.contains(&addr))
    }
}

/// Parse entries such as `10.0.0.5` or `192.168.1.0/24`.
fn parse_networks(entries: &[String]) -> Result<Vec<IpNet>, BuildError> {
    entries
        .iter()
        .map(|entry| {
            let entry = entry.trim();
            if entry.contains('/') {
                entry
                    .parse::<IpNet>()
                    .map_err(|_| BuildError::invalid(format!("'{entry}' is not a valid network")))
            } else {
                entry
                    .parse::<IpAddr>()
                    .map(IpNet::from)
                    .map_err(|_| BuildError::invalid(format!("'{entry}' is not a valid address")))
            }
        })
        .collect()
}

impl Predicate for RemoteAddrPredicate {
    fn matches(&self, ctx: &RequestContext) -> bool {
        match ctx.remote_addr {
            Some(addr) => self.matches_addr(addr),
            None => true,
        }
    }
}
