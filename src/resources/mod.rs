use cfn_stack::{CfnResource, ResolveContext};
use serde_json::Value;

mod s3_bucket;
pub use s3_bucket::*;
mod cloudfront;
pub use cloudfront::*;
mod route53;
pub use route53::*;

// higher level resources:
pub mod static_website;

/// Every resource type a static site stack declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteResource {
    Bucket(S3Bucket),
    BucketPolicy(BucketPolicy),
    Distribution(CloudfrontDistribution),
    RecordSet(Route53RecordSet),
}

impl SiteResource {
    fn inner(&self) -> &dyn CfnResource {
        match self {
            SiteResource::Bucket(r) => r,
            SiteResource::BucketPolicy(r) => r,
            SiteResource::Distribution(r) => r,
            SiteResource::RecordSet(r) => r,
        }
    }
}

impl CfnResource for SiteResource {
    fn type_string(&self) -> &'static str {
        self.inner().type_string()
    }

    fn properties(&self, ctx: &dyn ResolveContext) -> cfn_stack::Result<Value> {
        self.inner().properties(ctx)
    }

    fn validate(&self) -> Result<(), String> {
        self.inner().validate()
    }
}

impl From<S3Bucket> for SiteResource {
    fn from(value: S3Bucket) -> Self {
        SiteResource::Bucket(value)
    }
}

impl From<BucketPolicy> for SiteResource {
    fn from(value: BucketPolicy) -> Self {
        SiteResource::BucketPolicy(value)
    }
}

impl From<CloudfrontDistribution> for SiteResource {
    fn from(value: CloudfrontDistribution) -> Self {
        SiteResource::Distribution(value)
    }
}

impl From<Route53RecordSet> for SiteResource {
    fn from(value: Route53RecordSet) -> Self {
        SiteResource::RecordSet(value)
    }
}
