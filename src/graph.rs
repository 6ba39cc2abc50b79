//! The declarative resource graph produced for one stack.

use std::collections::BTreeMap;

use cfn_stack::{ResolveContext, StrVal, Template};

use crate::deployment::DeploymentDirective;
use crate::error::{Error, Result};
use crate::lookups::Lookup;
use crate::resources::SiteResource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredResource {
    pub logical_id: String,
    pub resource: SiteResource,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredOutput {
    pub logical_id: String,
    pub description: String,
    pub value: StrVal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGraph {
    pub stack_name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub tags: BTreeMap<String, String>,
    resources: Vec<DeclaredResource>,
    lookups: Vec<Lookup>,
    outputs: Vec<DeclaredOutput>,
    deployment: Option<DeploymentDirective>,
}

impl ResourceGraph {
    pub fn new(stack_name: String) -> Self {
        Self {
            stack_name,
            description: None,
            region: None,
            tags: BTreeMap::new(),
            resources: vec![],
            lookups: vec![],
            outputs: vec![],
            deployment: None,
        }
    }

    pub fn add_resource<R: Into<SiteResource>>(
        &mut self,
        logical_id: &str,
        resource: R,
        depends_on: Vec<String>,
    ) -> Result<()> {
        if self.resource(logical_id).is_some() {
            return Err(Error::DuplicateLogicalId(logical_id.to_string()));
        }
        self.resources.push(DeclaredResource {
            logical_id: logical_id.to_string(),
            resource: resource.into(),
            depends_on,
        });
        Ok(())
    }

    /// Declares a lookup (once) and returns the token standing in for its value.
    pub fn add_lookup(&mut self, lookup: Lookup) -> StrVal {
        let token = lookup.token();
        if !self.lookups.contains(&lookup) {
            self.lookups.push(lookup);
        }
        token
    }

    pub fn add_output(&mut self, logical_id: &str, description: &str, value: StrVal) {
        self.outputs.push(DeclaredOutput {
            logical_id: logical_id.to_string(),
            description: description.to_string(),
            value,
        });
    }

    pub fn set_deployment(&mut self, deployment: DeploymentDirective) {
        self.deployment = Some(deployment);
    }

    pub fn resources(&self) -> &[DeclaredResource] {
        &self.resources
    }

    pub fn resource(&self, logical_id: &str) -> Option<&SiteResource> {
        self.resources
            .iter()
            .find(|r| r.logical_id == logical_id)
            .map(|r| &r.resource)
    }

    pub fn lookups(&self) -> &[Lookup] {
        &self.lookups
    }

    pub fn outputs(&self) -> &[DeclaredOutput] {
        &self.outputs
    }

    pub fn deployment(&self) -> Option<&DeploymentDirective> {
        self.deployment.as_ref()
    }

    /// Renders the CloudFormation template. Every lookup token must be
    /// resolvable from `ctx`.
    pub fn to_template(&self, ctx: &dyn ResolveContext) -> Result<Template> {
        let mut template = Template::new(self.description.clone());
        for declared in &self.resources {
            template.add_resource(&declared.logical_id, &declared.resource, &declared.depends_on, ctx)?;
        }
        for output in &self.outputs {
            template.add_output(&output.logical_id, &output.description, &output.value, ctx)?;
        }
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{BucketPolicy, PublicWebsite, S3Bucket};
    use cfn_stack::NoContext;

    #[test]
    fn duplicate_logical_ids_are_rejected() {
        let mut graph = ResourceGraph::new("site".into());
        graph
            .add_resource("SiteBucket", S3Bucket::public_website("my-site", PublicWebsite::single_page()), vec![])
            .unwrap();
        let err = graph.add_resource("SiteBucket", BucketPolicy::public_read("SiteBucket"), vec![]);
        assert!(matches!(err, Err(Error::DuplicateLogicalId(id)) if id == "SiteBucket"));
    }

    #[test]
    fn lookups_are_declared_once() {
        let mut graph = ResourceGraph::new("site".into());
        let a = graph.add_lookup(Lookup::HostedZone { domain: "site.io".into() });
        let b = graph.add_lookup(Lookup::HostedZone { domain: "site.io".into() });
        assert_eq!(a, b);
        assert_eq!(graph.lookups().len(), 1);
    }

    #[test]
    fn template_keeps_dependencies_and_outputs() {
        let mut graph = ResourceGraph::new("site".into());
        graph.description = Some("my site".into());
        graph
            .add_resource("SiteBucket", S3Bucket::public_website("my-site", PublicWebsite::single_page()), vec![])
            .unwrap();
        graph
            .add_resource("SiteBucketPolicy", BucketPolicy::public_read("SiteBucket"), vec!["SiteBucket".into()])
            .unwrap();
        graph.add_output("WebsiteBucket", "Website Bucket", StrVal::Ref("SiteBucket".into()));
        let template = graph.to_template(&NoContext).unwrap();
        assert_eq!(template.description.as_deref(), Some("my site"));
        assert_eq!(template.resources["SiteBucketPolicy"].depends_on, vec!["SiteBucket".to_string()]);
        assert_eq!(template.outputs["WebsiteBucket"].description, "Website Bucket");
    }
}
