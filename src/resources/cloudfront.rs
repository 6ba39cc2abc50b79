use cfn_stack::{CfnResource, ResolveContext, StrVal};
use serde_json::{json, Map, Value};

// caching optimized:
// https://docs.aws.amazon.com/AmazonCloudFront/latest/DeveloperGuide/using-managed-cache-policies.html#managed-cache-caching-optimized
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

/// An S3 bucket used as a distribution origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Origin {
    pub id: String,
    /// the bucket's regional domain name.
    pub domain_name: StrVal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasConfiguration {
    pub acm_cert_ref: StrVal,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudfrontDistribution {
    pub comment: Option<String>,
    /// the first origin receives the default behavior for every path.
    pub origins: Vec<S3Origin>,
    pub alias_configuration: Option<AliasConfiguration>,
    pub default_root_object: String,
    pub price_class: String,
}

impl CloudfrontDistribution {
    pub fn for_bucket(bucket_logical_id: &str) -> Self {
        Self {
            comment: None,
            origins: vec![S3Origin {
                id: "origin1".into(),
                domain_name: StrVal::GetAtt(bucket_logical_id.into(), "RegionalDomainName".into()),
            }],
            alias_configuration: None,
            default_root_object: "index.html".into(),
            price_class: "PriceClass_100".into(),
        }
    }

    fn viewer_certificate(&self, ctx: &dyn ResolveContext) -> cfn_stack::Result<Value> {
        match &self.alias_configuration {
            Some(alias) => Ok(json!({
                "AcmCertificateArn": alias.acm_cert_ref.to_value(ctx)?,
                "MinimumProtocolVersion": "TLSv1.2_2021",
                "SslSupportMethod": "sni-only",
            })),
            None => Ok(json!({ "CloudFrontDefaultCertificate": true })),
        }
    }
}

impl CfnResource for CloudfrontDistribution {
    fn type_string(&self) -> &'static str {
        "AWS::CloudFront::Distribution"
    }

    fn properties(&self, ctx: &dyn ResolveContext) -> cfn_stack::Result<Value> {
        let mut config = Map::new();
        config.insert("Enabled".into(), Value::Bool(true));
        if let Some(comment) = &self.comment {
            config.insert("Comment".into(), Value::String(comment.clone()));
        }
        config.insert("DefaultRootObject".into(), Value::String(self.default_root_object.clone()));
        config.insert("PriceClass".into(), Value::String(self.price_class.clone()));
        config.insert("HttpVersion".into(), Value::String("http2".into()));
        config.insert("IPV6Enabled".into(), Value::Bool(true));
        if let Some(alias) = &self.alias_configuration {
            if !alias.names.is_empty() {
                config.insert("Aliases".into(), json!(alias.names));
            }
        }
        config.insert("ViewerCertificate".into(), self.viewer_certificate(ctx)?);

        let mut origins = vec![];
        for origin in &self.origins {
            origins.push(json!({
                "Id": origin.id,
                "DomainName": origin.domain_name.to_value(ctx)?,
                "S3OriginConfig": {},
            }));
        }
        config.insert("Origins".into(), Value::Array(origins));
        if let Some(default_origin) = self.origins.first() {
            config.insert(
                "DefaultCacheBehavior".into(),
                json!({
                    "TargetOriginId": default_origin.id,
                    "ViewerProtocolPolicy": "redirect-to-https",
                    "AllowedMethods": ["GET", "HEAD"],
                    "CachedMethods": ["GET", "HEAD"],
                    "CachePolicyId": CACHING_OPTIMIZED_POLICY_ID,
                    "Compress": true,
                }),
            );
        }
        Ok(json!({ "DistributionConfig": Value::Object(config) }))
    }

    fn validate(&self) -> Result<(), String> {
        if self.origins.is_empty() {
            return Err("Must provide at least one origin to cloudfront distribution".into());
        }
        for origin in &self.origins {
            if origin.id.is_empty() {
                return Err("cloudfront distribution origin id is required".into());
            }
            if origin.domain_name.is_empty_literal() {
                return Err(format!("cloudfront distribution origin {} domain_name is required", origin.id));
            }
        }
        if let Some(alias) = &self.alias_configuration {
            if alias.acm_cert_ref.is_empty_literal() {
                return Err("aliases require an ACM certificate ARN".into());
            }
            for (i, name) in alias.names.iter().enumerate() {
                if alias.names[..i].contains(name) {
                    return Err(format!("duplicate alias {name}"));
                }
            }
        }
        Ok(())
    }
}
