//! Name derivations for the static site stack. Everything here is pure so it
//! can be checked without rendering a template.

use std::net::Ipv4Addr;

/// `<first>.<domain>` when the first subdomain is non-empty, `<domain>` when
/// it is empty or missing, the stack id when there is no domain.
pub fn bucket_identifier(stack_id: &str, domain: Option<&str>, subdomains: &[String]) -> String {
    match domain {
        None => stack_id.to_string(),
        Some(domain) => match subdomains.first() {
            Some(first) if !first.is_empty() => format!("{first}.{domain}"),
            _ => domain.to_string(),
        },
    }
}

pub fn alias_for(subdomain: &str, domain: &str) -> String {
    if subdomain.is_empty() {
        domain.to_string()
    } else {
        format!("{subdomain}.{domain}")
    }
}

/// one alias per subdomain, in order. Empty without a domain.
pub fn aliases(domain: Option<&str>, subdomains: &[String]) -> Vec<String> {
    match domain {
        None => vec![],
        Some(domain) => subdomains.iter().map(|s| alias_for(s, domain)).collect(),
    }
}

/// SSM parameter holding the certificate ARN for `domain`.
pub fn certificate_parameter_path(prefix: &str, domain: &str) -> String {
    format!("{prefix}{domain}")
}

/// Record names relative to the zone get the zone appended; an empty name is
/// the zone apex. The result always ends in a dot.
pub fn fully_qualified_record_name(record_name: &str, zone_name: &str) -> String {
    let zone = zone_name.trim_end_matches('.');
    if record_name.is_empty() {
        return format!("{zone}.");
    }
    if record_name.ends_with('.') {
        return record_name.to_string();
    }
    if record_name == zone || record_name.ends_with(&format!(".{zone}")) {
        return format!("{record_name}.");
    }
    format!("{record_name}.{zone}.")
}

/// `ARecord` for the apex, `ARecordWww` for `www`, `ARecordMyApp` for `my-app`.
pub fn record_logical_id(subdomain: &str) -> String {
    let mut out = "ARecord".to_string();
    let subdomain = subdomain.replace('*', "wildcard");
    for part in subdomain.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    out
}

/// Logical ids for every subdomain, in order. Distinct subdomains that
/// sanitize to the same id get their position appended (`a-b`, `a.b` ->
/// `ARecordAB`, `ARecordAB1`). A repeated subdomain keeps its first id.
pub fn record_logical_ids(subdomains: &[String]) -> Vec<String> {
    let mut taken: Vec<(&str, String)> = vec![];
    let mut out = vec![];
    for (i, subdomain) in subdomains.iter().enumerate() {
        if let Some((_, id)) = taken.iter().find(|(s, _)| *s == subdomain.as_str()) {
            out.push(id.clone());
            continue;
        }
        let base = record_logical_id(subdomain);
        let mut id = base.clone();
        let mut suffix = i;
        while taken.iter().any(|(_, t)| *t == id) {
            id = format!("{base}{suffix}");
            suffix += 1;
        }
        taken.push((subdomain.as_str(), id.clone()));
        out.push(id);
    }
    out
}

/// S3 bucket naming rules for general purpose buckets.
pub fn validate_bucket_name(name: &str) -> Result<(), String> {
    if name.len() < 3 || name.len() > 63 {
        return Err("Must be between 3 and 63 characters".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err("May only contain lowercase letters, numbers, dots, and hyphens".to_string());
    }
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let ends_ok = name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return Err("Must begin and end with a letter or number".to_string());
    }
    if name.contains("..") {
        return Err("May not contain two consecutive dots".to_string());
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return Err("May not be formatted as an IP address".to_string());
    }
    if name.starts_with("xn--") {
        return Err("May not start with the prefix 'xn--'".to_string());
    }
    if name.ends_with("-s3alias") {
        return Err("May not end with the suffix '-s3alias'".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bucket_is_stack_id_without_domain() {
        assert_eq!(bucket_identifier("my-site", None, &subs(&["www", ""])), "my-site");
    }

    #[test]
    fn bucket_uses_first_subdomain() {
        assert_eq!(bucket_identifier("s", Some("example.com"), &subs(&["www", ""])), "www.example.com");
        assert_eq!(bucket_identifier("s", Some("example.com"), &subs(&["", "www"])), "example.com");
        assert_eq!(bucket_identifier("s", Some("example.com"), &[]), "example.com");
    }

    #[test]
    fn aliases_follow_subdomain_order() {
        assert_eq!(
            aliases(Some("example.com"), &subs(&["www", ""])),
            vec!["www.example.com".to_string(), "example.com".to_string()]
        );
        assert_eq!(aliases(Some("example.com"), &subs(&[""])), vec!["example.com".to_string()]);
        assert!(aliases(None, &subs(&["www", ""])).is_empty());
    }

    #[test]
    fn parameter_path_is_prefix_plus_domain() {
        assert_eq!(certificate_parameter_path("/certificates/", "site.io"), "/certificates/site.io");
        assert_eq!(certificate_parameter_path("/certs-", "site.io"), "/certs-site.io");
    }

    #[test]
    fn record_names_are_fully_qualified() {
        assert_eq!(fully_qualified_record_name("", "example.com"), "example.com.");
        assert_eq!(fully_qualified_record_name("www", "example.com"), "www.example.com.");
        assert_eq!(fully_qualified_record_name("www", "example.com."), "www.example.com.");
        assert_eq!(fully_qualified_record_name("www.example.com", "example.com"), "www.example.com.");
        assert_eq!(fully_qualified_record_name("other.net.", "example.com"), "other.net.");
    }

    #[test]
    fn record_logical_id_sanitizes() {
        assert_eq!(record_logical_id(""), "ARecord");
        assert_eq!(record_logical_id("www"), "ARecordWww");
        assert_eq!(record_logical_id("my-app"), "ARecordMyApp");
        assert_eq!(record_logical_id("*"), "ARecordWildcard");
        assert_eq!(record_logical_id("a.b"), "ARecordAB");
    }

    #[test]
    fn distinct_subdomains_get_distinct_record_ids() {
        assert_eq!(
            record_logical_ids(&subs(&["a-b", "a.b", "www", "a_b"])),
            vec!["ARecordAB", "ARecordAB1", "ARecordWww", "ARecordAB3"]
        );
    }

    #[test]
    fn repeated_subdomain_reuses_its_id() {
        assert_eq!(record_logical_ids(&subs(&["www", "", "www"])), vec!["ARecordWww", "ARecord", "ARecordWww"]);
    }

    #[test]
    fn bucket_name_rules() {
        assert!(validate_bucket_name("www.example.com").is_ok());
        assert!(validate_bucket_name("my-site").is_ok());
        assert!(validate_bucket_name("ab").unwrap_err().contains("Must be between 3 and 63 characters"));
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
        assert!(validate_bucket_name("something..exact").unwrap_err().contains("May not contain two consecutive dots"));
        assert!(validate_bucket_name("MySite").is_err());
        assert!(validate_bucket_name("-site").is_err());
        assert!(validate_bucket_name("192.168.5.4").is_err());
        assert!(validate_bucket_name("xn--site").is_err());
    }
}
