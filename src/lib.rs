//! Static website stacks on AWS: an S3 bucket holding the site, a CloudFront
//! distribution serving it, optional Route 53 alias records, and a deployment
//! that uploads the files and invalidates the cache.
//!
//! [`build`] turns a [`StaticSiteConfig`] into a [`ResourceGraph`]. The graph
//! renders to a CloudFormation template once its lookups are resolved.

pub mod config;
pub mod deployment;
pub mod error;
pub mod graph;
pub mod lookups;
pub mod naming;
pub mod resources;

pub use config::StaticSiteConfig;
pub use error::{Error, Result};
pub use graph::ResourceGraph;
pub use lookups::{AwsLookupResolver, Lookup, LookupContext};
pub use resources::static_website::build;

pub mod aws {
    use aws_config::meta::region::RegionProviderChain;
    use aws_config::{BehaviorVersion, Region, SdkConfig};

    /// SDK config for `region`, falling back to the environment/profile
    /// region and then `us-east-1`.
    pub async fn load_sdk_config(region: Option<String>) -> SdkConfig {
        let region_provider = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else("us-east-1");
        aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await
    }
}
