//! The whole site stack: a public bucket, a distribution in front of it,
//! optional alias records and the deployment that fills the bucket.

use cfn_stack::{validate_stack_name, StrVal};

use super::*;
use crate::config::StaticSiteConfig;
use crate::deployment::DeploymentDirective;
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::lookups::Lookup;
use crate::naming;

pub const BUCKET_ID: &str = "SiteBucket";
pub const BUCKET_POLICY_ID: &str = "SiteBucketPolicy";
pub const DISTRIBUTION_ID: &str = "SiteDistribution";

pub const OUTPUT_DOMAIN_NAME: &str = "DomainName";
pub const OUTPUT_DISTRIBUTION_ID: &str = "DistributionId";
pub const OUTPUT_WEBSITE_BUCKET: &str = "WebsiteBucket";

pub const INVALIDATE_ALL: &str = "/*";

/// The certificate to attach: the configured ARN, or a lookup of
/// `<prefix><domain>` in SSM.
fn certificate(config: &StaticSiteConfig, domain: &str, graph: &mut ResourceGraph) -> StrVal {
    let explicit = StrVal::from(config.certificate_arn.as_deref().unwrap_or_default().trim());
    if !explicit.is_empty_literal() {
        return explicit;
    }
    let path = naming::certificate_parameter_path(config.certificate_prefix(), domain);
    graph.add_lookup(Lookup::SsmParameter { path })
}

/// Builds the resource graph for `config`. Nothing here talks to AWS: the
/// certificate and hosted zone are declared as lookups, resolved before the
/// template is rendered.
pub fn build(config: &StaticSiteConfig) -> Result<ResourceGraph> {
    let stack_name = validate_stack_name(&config.stack_id, config.stack_name.as_deref())?;
    let mut graph = ResourceGraph::new(stack_name);
    graph.description = config.description.clone();
    graph.region = config.region.clone();
    graph.tags = config.tags.clone();

    let domain = config.domain();
    let subdomains = config.subdomains();

    let bucket_name = naming::bucket_identifier(&config.stack_id, domain, &subdomains);
    naming::validate_bucket_name(&bucket_name).map_err(|reason| Error::InvalidBucketName {
        name: bucket_name.clone(),
        reason,
    })?;
    graph.add_resource(BUCKET_ID, S3Bucket::public_website(&bucket_name, PublicWebsite::single_page()), vec![])?;
    graph.add_resource(BUCKET_POLICY_ID, BucketPolicy::public_read(BUCKET_ID), vec![])?;

    let mut distribution = CloudfrontDistribution::for_bucket(BUCKET_ID);
    distribution.comment = Some(format!("{} static site", graph.stack_name));

    let mut hosted_zone = None;
    if let Some(domain) = domain {
        let acm_cert_ref = certificate(config, domain, &mut graph);
        hosted_zone = Some(graph.add_lookup(Lookup::HostedZone { domain: domain.to_string() }));
        distribution.alias_configuration = Some(AliasConfiguration {
            acm_cert_ref,
            names: naming::aliases(Some(domain), &subdomains),
        });
    }
    graph.add_resource(DISTRIBUTION_ID, distribution, vec![])?;

    if let (Some(domain), Some(zone_id)) = (domain, hosted_zone) {
        let ids = naming::record_logical_ids(&subdomains);
        for (subdomain, logical_id) in subdomains.iter().zip(&ids) {
            let record = Route53RecordSet::cloudfront_alias(
                naming::fully_qualified_record_name(subdomain, domain),
                zone_id.clone(),
                DISTRIBUTION_ID,
            );
            graph.add_resource(logical_id, record, vec![])?;
        }
    }

    graph.set_deployment(DeploymentDirective::upload_then_invalidate(
        config.site_directory(),
        OUTPUT_WEBSITE_BUCKET,
        OUTPUT_DISTRIBUTION_ID,
        &[INVALIDATE_ALL],
    ));

    graph.add_output(
        OUTPUT_DOMAIN_NAME,
        "Domain Name:",
        StrVal::GetAtt(DISTRIBUTION_ID.into(), "DomainName".into()),
    );
    graph.add_output(OUTPUT_DISTRIBUTION_ID, "Cloud Front Distribution ID:", StrVal::Ref(DISTRIBUTION_ID.into()));
    graph.add_output(OUTPUT_WEBSITE_BUCKET, "Website Bucket", StrVal::Ref(BUCKET_ID.into()));
    Ok(graph)
}
