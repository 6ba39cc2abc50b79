use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::value::{ResolveContext, StrVal};

pub trait CfnResource {
    fn type_string(&self) -> &'static str;
    fn properties(&self, ctx: &dyn ResolveContext) -> Result<Value>;
    /// checks that can be made without talking to AWS.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub ty: String,
    #[serde(rename = "Properties")]
    pub properties: Value,
    #[serde(rename = "DependsOn", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOutput {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Value")]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub version: String,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, TemplateResource>,
    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            version: "2010-09-09".to_string(),
            description: None,
            resources: Default::default(),
            outputs: Default::default(),
        }
    }
}

impl Template {
    pub fn new(description: Option<String>) -> Self {
        Self {
            description,
            ..Default::default()
        }
    }

    /// validates the resource and renders its properties into the template.
    pub fn add_resource(
        &mut self,
        name: &str,
        resource: &dyn CfnResource,
        depends_on: &[String],
        ctx: &dyn ResolveContext,
    ) -> Result<()> {
        verify_resource_name(name)?;
        if self.resources.contains_key(name) {
            return Err(Error::Validation {
                resource: name.to_string(),
                message: "a resource with this logical id already exists".to_string(),
            });
        }
        if let Err(message) = resource.validate() {
            return Err(Error::Validation { resource: name.to_string(), message });
        }
        for dep in depends_on {
            if !self.resources.contains_key(dep) {
                return Err(Error::Validation {
                    resource: name.to_string(),
                    message: format!("depends on '{dep}' which is not declared before it"),
                });
            }
        }
        let saved = TemplateResource {
            ty: resource.type_string().to_string(),
            properties: resource.properties(ctx)?,
            depends_on: depends_on.to_vec(),
        };
        self.resources.insert(name.to_string(), saved);
        Ok(())
    }

    pub fn add_output(
        &mut self,
        name: &str,
        description: &str,
        value: &StrVal,
        ctx: &dyn ResolveContext,
    ) -> Result<()> {
        verify_resource_name(name)?;
        let output = TemplateOutput {
            description: description.to_string(),
            value: value.to_value(ctx)?,
        };
        self.outputs.insert(name.to_string(), output);
        Ok(())
    }

    /// pretty so that the stack looks readable in the CloudFormation console.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// logical ids: 1 to 255 characters of `[A-Za-z0-9]`.
pub fn verify_resource_name(resource_name: &str) -> Result<()> {
    let reason = if resource_name.len() > 255 {
        "must be less than 255 characters"
    } else if resource_name.is_empty() {
        "Must contain at least 1 character"
    } else if !resource_name.chars().all(|c| c.is_ascii_alphanumeric()) {
        "Must contain only alphanumeric characters [A-Za-z0-9]"
    } else {
        return Ok(());
    };
    Err(Error::InvalidResourceName {
        name: resource_name.to_string(),
        reason: reason.to_string(),
    })
}

/// Picks the CloudFormation stack name: the explicit name when given,
/// otherwise the stack id.
pub fn validate_stack_name(stack_id: &str, stack_name: Option<&str>) -> Result<String> {
    let stack_name = match stack_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => stack_id.replace('_', "-"),
    };
    // A stack name can contain only alphanumeric characters (case sensitive) and hyphens.
    // It must start with an alphabetical character and can't be longer than 128 characters.
    let restriction = "Must only consist of alphanumeric characters and hyphens, Must start with an alphabetical character, and cannot be longer than 128 characters.";
    let invalid = || Error::InvalidStackName {
        name: stack_name.clone(),
        reason: restriction.to_string(),
    };
    match stack_name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(invalid()),
    }
    if stack_name.chars().any(|c| !c.is_ascii_alphanumeric() && c != '-') {
        return Err(invalid());
    }
    if stack_name.len() > 128 {
        return Err(invalid());
    }
    Ok(stack_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NoContext;
    use serde_json::json;

    struct Topic {
        name: String,
    }

    impl CfnResource for Topic {
        fn type_string(&self) -> &'static str {
            "AWS::SNS::Topic"
        }
        fn properties(&self, _ctx: &dyn ResolveContext) -> Result<Value> {
            Ok(json!({ "TopicName": self.name }))
        }
        fn validate(&self) -> std::result::Result<(), String> {
            if self.name.is_empty() {
                return Err("topic name is required".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn stack_name_defaults_to_id() {
        assert_eq!(validate_stack_name("my_site", None).unwrap(), "my-site");
        assert_eq!(validate_stack_name("my_site", Some("")).unwrap(), "my-site");
        assert_eq!(validate_stack_name("my_site", Some("Other")).unwrap(), "Other");
    }

    #[test]
    fn stack_name_rules() {
        assert!(validate_stack_name("1site", None).is_err());
        assert!(validate_stack_name("site.io", None).is_err());
        assert!(validate_stack_name("", None).is_err());
        assert!(validate_stack_name(&"a".repeat(129), None).is_err());
        assert!(validate_stack_name(&"a".repeat(128), None).is_ok());
    }

    #[test]
    fn resource_names_must_be_alphanumeric() {
        assert!(verify_resource_name("ARecordWww").is_ok());
        assert!(verify_resource_name("ARecord-www").is_err());
        assert!(verify_resource_name("").is_err());
    }

    #[test]
    fn template_renders_resources_and_outputs() {
        let mut template = Template::new(Some("test".into()));
        template.add_resource("Topic", &Topic { name: "t".into() }, &[], &NoContext).unwrap();
        template
            .add_resource("Other", &Topic { name: "o".into() }, &["Topic".to_string()], &NoContext)
            .unwrap();
        template
            .add_output("TopicArn", "the topic", &StrVal::Ref("Topic".into()), &NoContext)
            .unwrap();
        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(value["AWSTemplateFormatVersion"], json!("2010-09-09"));
        assert_eq!(value["Description"], json!("test"));
        assert_eq!(value["Resources"]["Topic"]["Type"], json!("AWS::SNS::Topic"));
        assert_eq!(value["Resources"]["Topic"].get("DependsOn"), None);
        assert_eq!(value["Resources"]["Other"]["DependsOn"], json!(["Topic"]));
        assert_eq!(value["Outputs"]["TopicArn"]["Value"], json!({"Ref": "Topic"}));
    }

    #[test]
    fn template_rejects_invalid_resources() {
        let mut template = Template::default();
        let err = template.add_resource("Topic", &Topic { name: "".into() }, &[], &NoContext);
        assert!(matches!(err, Err(Error::Validation { .. })));

        template.add_resource("Topic", &Topic { name: "a".into() }, &[], &NoContext).unwrap();
        let err = template.add_resource("Topic", &Topic { name: "b".into() }, &[], &NoContext);
        assert!(matches!(err, Err(Error::Validation { .. })));

        let err = template.add_resource("Late", &Topic { name: "c".into() }, &["Missing".to_string()], &NoContext);
        assert!(matches!(err, Err(Error::Validation { .. })));
    }
}
