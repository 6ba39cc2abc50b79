use cfn_stack::{create_policy_doc, get_ref, sub, CfnResource, PolicyStatement, ResolveContext};
use serde_json::{json, Map, Value};

use crate::naming::validate_bucket_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicWebsite {
    pub index_document: String,
    pub error_document: String,
}

impl PublicWebsite {
    /// serves `index.html` for every path so client side routing works.
    pub fn single_page() -> Self {
        Self {
            index_document: "index.html".into(),
            error_document: "index.html".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Bucket {
    pub name: String,
    pub public_website: Option<PublicWebsite>,
    pub versioned: bool,
    pub access_control: String,
}

impl S3Bucket {
    /// a versioned, publicly readable bucket with website hosting turned on.
    pub fn public_website(name: &str, website: PublicWebsite) -> Self {
        Self {
            name: name.into(),
            public_website: Some(website),
            versioned: true,
            access_control: "PublicRead".into(),
        }
    }

    fn is_public(&self) -> bool {
        self.access_control == "PublicRead"
    }
}

impl CfnResource for S3Bucket {
    fn type_string(&self) -> &'static str {
        "AWS::S3::Bucket"
    }

    fn properties(&self, _ctx: &dyn ResolveContext) -> cfn_stack::Result<Value> {
        let mut map = Map::new();
        map.insert("BucketName".into(), Value::String(self.name.clone()));
        map.insert("AccessControl".into(), Value::String(self.access_control.clone()));
        if self.versioned {
            map.insert("VersioningConfiguration".into(), json!({ "Status": "Enabled" }));
        }
        if let Some(website) = &self.public_website {
            map.insert(
                "WebsiteConfiguration".into(),
                json!({
                    "IndexDocument": website.index_document,
                    "ErrorDocument": website.error_document,
                }),
            );
        }
        if self.is_public() {
            // new buckets block public policies and ACLs unless told otherwise
            map.insert(
                "PublicAccessBlockConfiguration".into(),
                json!({
                    "BlockPublicAcls": false,
                    "BlockPublicPolicy": false,
                    "IgnorePublicAcls": false,
                    "RestrictPublicBuckets": false,
                }),
            );
            map.insert(
                "OwnershipControls".into(),
                json!({ "Rules": [{ "ObjectOwnership": "ObjectWriter" }] }),
            );
        }
        Ok(Value::Object(map))
    }

    fn validate(&self) -> Result<(), String> {
        validate_bucket_name(&self.name)
    }
}

/// Grants `s3:GetObject` on every object of a bucket to everyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPolicy {
    pub bucket_logical_id: String,
}

impl BucketPolicy {
    pub fn public_read(bucket_logical_id: &str) -> Self {
        Self {
            bucket_logical_id: bucket_logical_id.into(),
        }
    }
}

impl CfnResource for BucketPolicy {
    fn type_string(&self) -> &'static str {
        "AWS::S3::BucketPolicy"
    }

    fn properties(&self, _ctx: &dyn ResolveContext) -> cfn_stack::Result<Value> {
        let statement = PolicyStatement {
            effect: "Allow".into(),
            action: "s3:GetObject".into(),
            resource: sub(&format!("arn:aws:s3:::${{{}}}/*", self.bucket_logical_id)),
            principal: Some(Value::String("*".into())),
        };
        Ok(json!({
            "Bucket": get_ref(&self.bucket_logical_id),
            "PolicyDocument": create_policy_doc(&[statement]),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfn_stack::NoContext;

    #[test]
    fn website_bucket_is_versioned_and_public() {
        let bucket = S3Bucket::public_website("www.example.com", PublicWebsite::single_page());
        let props = bucket.properties(&NoContext).unwrap();
        assert_eq!(props["BucketName"], json!("www.example.com"));
        assert_eq!(props["AccessControl"], json!("PublicRead"));
        assert_eq!(props["VersioningConfiguration"]["Status"], json!("Enabled"));
        assert_eq!(props["WebsiteConfiguration"]["IndexDocument"], json!("index.html"));
        assert_eq!(props["WebsiteConfiguration"]["ErrorDocument"], json!("index.html"));
        assert_eq!(props["PublicAccessBlockConfiguration"]["BlockPublicPolicy"], json!(false));
    }

    #[test]
    fn bucket_name_is_validated() {
        let bucket = S3Bucket::public_website("a..b", PublicWebsite::single_page());
        assert!(bucket.validate().is_err());
    }

    #[test]
    fn policy_allows_public_get() {
        let props = BucketPolicy::public_read("SiteBucket").properties(&NoContext).unwrap();
        assert_eq!(props["Bucket"], json!({ "Ref": "SiteBucket" }));
        let statement = &props["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Action"], json!("s3:GetObject"));
        assert_eq!(statement["Principal"], json!("*"));
        assert_eq!(statement["Resource"], json!({ "Fn::Sub": "arn:aws:s3:::${SiteBucket}/*" }));
    }
}
