//! Configuration surface of a static site stack.
//!
//! Read from a TOML file whose keys match the stack options
//! (`domainName`, `subdomains`, `certificateARN`, ...), then optionally
//! overridden from `STATIC_SITE_*` environment variables.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_SUBDOMAINS: [&str; 2] = ["www", ""];
pub const DEFAULT_CERTIFICATE_PREFIX: &str = "/certificates/";
pub const DEFAULT_SITE_DIRECTORY: &str = "./dist";
pub const DEFAULT_CONFIG_FILE: &str = "site.toml";
pub const CONFIG_PATH_ENV: &str = "STATIC_SITE_CONFIG";

const ENV_DOMAIN_NAME: &str = "STATIC_SITE_DOMAIN_NAME";
const ENV_CERTIFICATE_ARN: &str = "STATIC_SITE_CERTIFICATE_ARN";
const ENV_SITE_DIRECTORY: &str = "STATIC_SITE_SITE_DIRECTORY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StaticSiteConfig {
    /// the stack's own identifier. Used as the bucket name when no
    /// domain is configured, and as the stack name unless `stack_name` is set.
    pub stack_id: String,

    #[serde(default)]
    pub stack_name: Option<String>,

    /// region to deploy to. When unset the AWS environment decides.
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// If a domain is not provided, no CloudFront aliases will be setup. Only the default
    /// cloudfront domain will be available.
    #[serde(default)]
    pub domain_name: Option<String>,

    /// Defaults to `["www", ""]`. An empty entry is the apex of the domain.
    #[serde(default)]
    pub subdomains: Option<Vec<String>>,

    /// If provided, the certificate ARN will be used and the SSM lookup will be bypassed.
    #[serde(default, rename = "certificateARN")]
    pub certificate_arn: Option<String>,

    /// Prefix of the SSM parameter holding the certificate ARN.
    /// Defaults to `/certificates/`.
    #[serde(default)]
    pub ssm_certificate_prefix: Option<String>,

    /// Directory whose contents are uploaded to the bucket. Defaults to `./dist`.
    #[serde(default)]
    pub site_directory: Option<String>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl StaticSiteConfig {
    pub fn new<S: AsRef<str>>(stack_id: S) -> Self {
        Self {
            stack_id: stack_id.as_ref().into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        if config.stack_id.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "stackId must not be empty".to_string(),
            });
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Environment values win over the file. Empty values are ignored.
    pub fn apply_env_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                ENV_DOMAIN_NAME => self.domain_name = Some(value),
                ENV_CERTIFICATE_ARN => self.certificate_arn = Some(value),
                ENV_SITE_DIRECTORY => self.site_directory = Some(value),
                _ => {}
            }
        }
    }

    /// `None` for a missing or blank domain.
    pub fn domain(&self) -> Option<&str> {
        self.domain_name
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    pub fn subdomains(&self) -> Vec<String> {
        match &self.subdomains {
            Some(subdomains) => subdomains.clone(),
            None => DEFAULT_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn certificate_prefix(&self) -> &str {
        self.ssm_certificate_prefix
            .as_deref()
            .unwrap_or(DEFAULT_CERTIFICATE_PREFIX)
    }

    pub fn site_directory(&self) -> &str {
        self.site_directory.as_deref().unwrap_or(DEFAULT_SITE_DIRECTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_options_are_missing() {
        let config = StaticSiteConfig::from_toml_str(r#"stackId = "my-site""#).unwrap();
        assert_eq!(config.stack_id, "my-site");
        assert_eq!(config.domain(), None);
        assert_eq!(config.subdomains(), vec!["www".to_string(), "".to_string()]);
        assert_eq!(config.certificate_prefix(), "/certificates/");
        assert_eq!(config.site_directory(), "./dist");
    }

    #[test]
    fn reads_every_option() {
        let config = StaticSiteConfig::from_toml_str(
            r#"
            stackId = "site"
            stackName = "site-prod"
            region = "us-east-1"
            domainName = "site.io"
            subdomains = ["www", "api"]
            certificateARN = "arn:aws:acm:us-east-1:123:certificate/abc"
            ssmCertificatePrefix = "/certs/"
            siteDirectory = "./public"

            [tags]
            team = "web"
            "#,
        )
        .unwrap();
        assert_eq!(config.stack_name.as_deref(), Some("site-prod"));
        assert_eq!(config.domain(), Some("site.io"));
        assert_eq!(config.subdomains(), vec!["www".to_string(), "api".to_string()]);
        assert_eq!(config.certificate_arn.as_deref(), Some("arn:aws:acm:us-east-1:123:certificate/abc"));
        assert_eq!(config.certificate_prefix(), "/certs/");
        assert_eq!(config.site_directory(), "./public");
        assert_eq!(config.tags.get("team").map(|s| s.as_str()), Some("web"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(StaticSiteConfig::from_toml_str("stackId = \"a\"\ndomain = \"x\"").is_err());
        assert!(StaticSiteConfig::from_toml_str("domainName = \"x\"").is_err());
        assert!(matches!(
            StaticSiteConfig::from_toml_str("stackId = \"  \""),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn blank_domain_counts_as_absent() {
        let mut config = StaticSiteConfig::new("site");
        config.domain_name = Some("  ".into());
        assert_eq!(config.domain(), None);
    }

    #[test]
    fn env_overrides_win() {
        let mut config = StaticSiteConfig::new("site");
        config.domain_name = Some("old.io".into());
        config.apply_env_overrides(vec![
            ("STATIC_SITE_DOMAIN_NAME".to_string(), "new.io".to_string()),
            ("STATIC_SITE_CERTIFICATE_ARN".to_string(), "".to_string()),
            ("STATIC_SITE_SITE_DIRECTORY".to_string(), "build".to_string()),
            ("PATH".to_string(), "/bin".to_string()),
        ]);
        assert_eq!(config.domain(), Some("new.io"));
        assert_eq!(config.certificate_arn, None);
        assert_eq!(config.site_directory(), "build");
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = StaticSiteConfig::load(&dir.path().join("site.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));

        let path = dir.path().join("present.toml");
        std::fs::write(&path, "stackId = \"from-file\"").unwrap();
        assert_eq!(StaticSiteConfig::load(&path).unwrap().stack_id, "from-file");
    }
}
