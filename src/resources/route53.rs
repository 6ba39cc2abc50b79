use cfn_stack::{CfnResource, ResolveContext, StrVal};
use serde_json::{Map, Value};

/// this is static for all of AWS for aliases to CloudFront. See
/// https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-properties-route53-aliastarget.html#cfn-route53-aliastarget-hostedzoneid
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route53RecordSet {
    pub record_type: String,
    /// fully qualified, ending in a dot.
    pub name: String,
    pub hosted_zone_id: StrVal,
    pub alias_target_dns_name: StrVal,
    pub alias_target_hosted_zone_id: String,
}

impl Route53RecordSet {
    /// an `A` record aliasing `name` to a CloudFront distribution in this stack.
    pub fn cloudfront_alias(name: String, hosted_zone_id: StrVal, distribution_logical_id: &str) -> Self {
        Self {
            record_type: "A".into(),
            name,
            hosted_zone_id,
            alias_target_dns_name: StrVal::GetAtt(distribution_logical_id.into(), "DomainName".into()),
            alias_target_hosted_zone_id: CLOUDFRONT_HOSTED_ZONE_ID.into(),
        }
    }
}

impl CfnResource for Route53RecordSet {
    fn type_string(&self) -> &'static str {
        "AWS::Route53::RecordSet"
    }

    fn properties(&self, ctx: &dyn ResolveContext) -> cfn_stack::Result<Value> {
        let mut alias_target = Map::new();
        alias_target.insert("DNSName".into(), self.alias_target_dns_name.to_value(ctx)?);
        alias_target.insert("HostedZoneId".into(), Value::String(self.alias_target_hosted_zone_id.clone()));

        let mut map = Map::new();
        map.insert("Name".into(), Value::String(self.name.clone()));
        map.insert("Type".into(), Value::String(self.record_type.clone()));
        map.insert("HostedZoneId".into(), self.hosted_zone_id.to_value(ctx)?);
        map.insert("AliasTarget".into(), Value::Object(alias_target));
        Ok(Value::Object(map))
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Route53 record must have a name. Example mysubdomain.mywebsite.com.".into());
        }
        if !self.name.ends_with('.') {
            return Err(format!("Route53 record name {} must be fully qualified (end in '.')", self.name));
        }
        if self.record_type.is_empty() {
            return Err("Route53 record must have a type".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfn_stack::NoContext;
    use serde_json::json;

    #[test]
    fn alias_record_points_at_distribution() {
        let record = Route53RecordSet::cloudfront_alias("www.example.com.".into(), "Z123".into(), "SiteDistribution");
        assert!(record.validate().is_ok());
        let props = record.properties(&NoContext).unwrap();
        assert_eq!(props["Type"], json!("A"));
        assert_eq!(props["HostedZoneId"], json!("Z123"));
        assert_eq!(props["AliasTarget"]["DNSName"], json!({ "Fn::GetAtt": ["SiteDistribution", "DomainName"] }));
        assert_eq!(props["AliasTarget"]["HostedZoneId"], json!(CLOUDFRONT_HOSTED_ZONE_ID));
    }

    #[test]
    fn names_must_be_fully_qualified() {
        let record = Route53RecordSet::cloudfront_alias("www.example.com".into(), "Z123".into(), "D");
        assert!(record.validate().is_err());
        let record = Route53RecordSet::cloudfront_alias("".into(), "Z123".into(), "D");
        assert!(record.validate().is_err());
    }

    #[test]
    fn zone_id_comes_from_context() {
        let record = Route53RecordSet::cloudfront_alias(
            "example.com.".into(),
            StrVal::Context("hosted-zone:example.com".into()),
            "D",
        );
        assert!(matches!(
            record.properties(&NoContext),
            Err(cfn_stack::Error::MissingContext { .. })
        ));
    }
}
