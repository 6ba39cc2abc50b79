//! Values read from the target account while synthesizing: the certificate
//! ARN stored in SSM and the id of an existing hosted zone.
//!
//! Resolved values are kept in a [`LookupContext`] that can be saved next to
//! the site config, so later synth runs don't need to call AWS again.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use aws_sdk_route53::types::HostedZone;
use cfn_stack::{ResolveContext, StrVal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{aws_error, Error, Result};
use crate::graph::ResourceGraph;

pub const DEFAULT_CONTEXT_FILE: &str = "site.context.json";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lookup {
    SsmParameter { path: String },
    HostedZone { domain: String },
}

impl Lookup {
    pub fn key(&self) -> String {
        match self {
            Lookup::SsmParameter { path } => format!("ssm:{path}"),
            Lookup::HostedZone { domain } => format!("hosted-zone:{domain}"),
        }
    }

    pub fn token(&self) -> StrVal {
        StrVal::Context(self.key())
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::SsmParameter { path } => write!(f, "SSM parameter {path}"),
            Lookup::HostedZone { domain } => write!(f, "hosted zone {domain}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupContext {
    values: BTreeMap<String, String>,
}

impl LookupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A missing file is an empty context.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn insert<S: Into<String>>(&mut self, lookup: &Lookup, value: S) {
        self.values.insert(lookup.key(), value.into());
    }

    pub fn get(&self, lookup: &Lookup) -> Option<&str> {
        self.values.get(&lookup.key()).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// lookups the graph declares that have no value yet.
    pub fn missing<'a>(&self, graph: &'a ResourceGraph) -> Vec<&'a Lookup> {
        graph.lookups().iter().filter(|l| self.get(l).is_none()).collect()
    }

    pub fn ensure_resolved(&self, graph: &ResourceGraph) -> Result<()> {
        let missing = self.missing(graph);
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::UnresolvedLookups {
            keys: missing.iter().map(|l| l.key()).collect(),
        })
    }
}

impl ResolveContext for LookupContext {
    fn resolve(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }
}

/// `/hostedzone/Z123` -> `Z123`
pub fn hosted_zone_id(raw: &str) -> &str {
    raw.trim_start_matches("/hostedzone/")
}

/// zone names compare without the trailing dot and case-insensitively.
pub fn same_zone_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.').eq_ignore_ascii_case(b.trim_end_matches('.'))
}

fn find_zone<'a>(zones: &'a [HostedZone], domain: &str) -> Option<&'a HostedZone> {
    zones.iter().find(|zone| {
        let name: Option<&str> = Option::from(zone.name());
        name.is_some_and(|name| same_zone_name(name, domain))
    })
}

/// Resolves lookups against the account the SDK config points at.
pub struct AwsLookupResolver {
    ssm: aws_sdk_ssm::Client,
    route53: aws_sdk_route53::Client,
}

impl AwsLookupResolver {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            ssm: aws_sdk_ssm::Client::new(config),
            route53: aws_sdk_route53::Client::new(config),
        }
    }

    pub async fn resolve(&self, lookup: &Lookup) -> Result<String> {
        match lookup {
            Lookup::SsmParameter { path } => self.lookup_parameter(lookup, path).await,
            Lookup::HostedZone { domain } => self.lookup_hosted_zone(lookup, domain).await,
        }
    }

    async fn lookup_parameter(&self, lookup: &Lookup, path: &str) -> Result<String> {
        let out = match self.ssm.get_parameter().name(path).send().await {
            Ok(out) => out,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_parameter_not_found()) {
                    return Err(Error::LookupNotFound { key: lookup.key() });
                }
                return Err(aws_error("GetParameter")(e));
            }
        };
        let value: Option<&str> = out.parameter().and_then(|p| Option::from(p.value()));
        match value {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(Error::LookupNotFound { key: lookup.key() }),
        }
    }

    async fn lookup_hosted_zone(&self, lookup: &Lookup, domain: &str) -> Result<String> {
        let out = self
            .route53
            .list_hosted_zones_by_name()
            .dns_name(domain)
            .send()
            .await
            .map_err(aws_error("ListHostedZonesByName"))?;
        let zone = find_zone(out.hosted_zones(), domain).ok_or_else(|| Error::LookupNotFound { key: lookup.key() })?;
        let id: Option<&str> = Option::from(zone.id());
        match id {
            Some(id) => Ok(hosted_zone_id(id).to_string()),
            None => Err(Error::LookupNotFound { key: lookup.key() }),
        }
    }

    /// Resolves everything the graph declares that `ctx` does not have yet.
    /// Returns how many values were added.
    pub async fn resolve_missing(&self, graph: &ResourceGraph, ctx: &mut LookupContext) -> Result<usize> {
        let missing: Vec<Lookup> = ctx.missing(graph).into_iter().cloned().collect();
        for lookup in &missing {
            let value = self.resolve(lookup).await?;
            debug!(lookup = %lookup, value = %value, "resolved lookup");
            ctx.insert(lookup, value);
        }
        if !missing.is_empty() {
            info!(count = missing.len(), "resolved lookups from AWS");
        }
        Ok(missing.len())
    }
}
