//! Stable identifier synthesis.
//!
//! Everything here is a pure function of its inputs: relationship linking recomputes
//! identifiers independently on both ends of an edge, so the same (region, account,
//! name) tuple must always produce the same key.

use uuid::Uuid;

pub const AWS_PARTITION: &str = "aws";

pub fn uuid_v5_u128(ns: Uuid, name: &str) -> u128 {
    Uuid::new_v5(&ns, name.as_bytes()).as_u128()
}

/// Provider-native ARN, e.g. `arn:aws:glue:us-east-1:123456789012:job/etl`.
pub fn arn(service: &str, region: &str, account_id: &str, resource: &str) -> String {
    format!("arn:{AWS_PARTITION}:{service}:{region}:{account_id}:{resource}")
}

/// IAM role ARN. IAM is global, so the region segment stays empty.
pub fn role_arn(account_id: &str, role: &str) -> String {
    if role.starts_with("arn:") {
        role.to_string()
    } else {
        arn("iam", "", account_id, &format!("role/{role}"))
    }
}

/// Deterministic key for resources whose provider defines no identifier format.
pub fn composite_key(
    family: &str,
    region: &str,
    account_id: &str,
    name_parts: &[&str],
) -> String {
    // name 形如 "glue|us-east-1|123456789012|db|table"
    let mut name = format!("{family}|{region}|{account_id}");
    for part in name_parts {
        name.push('|');
        name.push_str(part);
    }
    Uuid::from_u128(uuid_v5_u128(Uuid::NAMESPACE_OID, &name)).to_string()
}

pub fn stable_edge_id(relation: &str, from: &str, to: &str) -> String {
    let name = format!("{}|{}|{}", relation, from, to);
    Uuid::from_u128(uuid_v5_u128(Uuid::NAMESPACE_OID, &name)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arn_matches_provider_format() {
        assert_eq!(
            arn("glue", "us-east-1", "123456789012", "table/db1/tbl1"),
            "arn:aws:glue:us-east-1:123456789012:table/db1/tbl1"
        );
    }

    #[test]
    fn role_arn_keeps_existing_arns() {
        let existing = "arn:aws:iam::672373165745:role/default-glue-user";
        assert_eq!(role_arn("000000000000", existing), existing);
        assert_eq!(
            role_arn("000000000000", "sales-glue-user"),
            "arn:aws:iam::000000000000:role/sales-glue-user"
        );
    }

    #[test]
    fn composite_key_is_deterministic() {
        let first = composite_key("glue", "us-east-1", "000000000000", &["db", "t"]);
        let second = composite_key("glue", "us-east-1", "000000000000", &["db", "t"]);
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn composite_key_separates_region_and_account() {
        let base = composite_key("glacier", "us-east-1", "000000000000", &["vault-1"]);
        assert_ne!(
            base,
            composite_key("glacier", "eu-west-1", "000000000000", &["vault-1"])
        );
        assert_ne!(
            base,
            composite_key("glacier", "us-east-1", "111111111111", &["vault-1"])
        );
    }

    #[test]
    fn edge_ids_depend_on_direction() {
        assert_ne!(
            stable_edge_id("RESOURCE", "a", "b"),
            stable_edge_id("RESOURCE", "b", "a")
        );
    }
}
