//! Junction-table discovery through relationship metadata.

use serde_json::Value;
use tracing::{info, warn};

use schemerge_core::Result;

use crate::adapter::{Catalog, RelationField};

/// A many-to-many field and the association table behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunctionLink {
    pub owner_table: String,
    pub field_name: String,
    pub linked_table: String,
}

/// Extract the association table name from an options payload.
///
/// Payloads stored as a JSON string holding JSON are unwrapped once. A
/// payload without the attribute is `Ok(None)`.
pub fn parse_association(
    options: &str,
    key: &str,
) -> std::result::Result<Option<String>, serde_json::Error> {
    let value = match serde_json::from_str::<Value>(options)? {
        Value::String(inner) => serde_json::from_str::<Value>(&inner)?,
        other => other,
    };

    Ok(value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string))
}

/// Turn raw field definitions into links, skipping malformed payloads.
pub fn collect_links(fields: Vec<RelationField>, association_key: &str) -> Vec<JunctionLink> {
    let mut links = Vec::new();
    for field in fields {
        match parse_association(&field.options, association_key) {
            Ok(Some(linked_table)) => links.push(JunctionLink {
                owner_table: field.owner_table,
                field_name: field.field_name,
                linked_table,
            }),
            Ok(None) => {}
            Err(err) => warn!(
                event = "relation_options_malformed",
                table = %field.owner_table,
                field = %field.field_name,
                error = %err
            ),
        }
    }
    links
}

/// Find association tables for many-to-many fields owned by `tables`.
///
/// Names are returned as stored in the metadata, deduplicated in discovery
/// order. A catalog without relationship metadata yields nothing.
pub async fn discover_junctions(
    catalog: &dyn Catalog,
    tables: &[String],
    association_key: &str,
) -> Result<Vec<JunctionLink>> {
    if tables.is_empty() {
        return Ok(Vec::new());
    }

    let Some(fields) = catalog.relation_fields(tables).await? else {
        info!(event = "relation_metadata_missing", schema = %catalog.schema());
        return Ok(Vec::new());
    };

    let links = collect_links(fields, association_key);
    for link in &links {
        info!(
            event = "junction_discovered",
            owner = %link.owner_table,
            field = %link.field_name,
            junction = %link.linked_table
        );
    }
    Ok(links)
}

/// Linked table names, deduplicated in first-seen order.
pub fn linked_tables(links: &[JunctionLink]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for link in links {
        if !names.contains(&link.linked_table) {
            names.push(link.linked_table.clone());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(owner: &str, name: &str, options: &str) -> RelationField {
        RelationField {
            owner_table: owner.to_string(),
            field_name: name.to_string(),
            options: options.to_string(),
        }
    }

    #[test]
    fn reads_through_attribute() {
        let payload = r#"{"through":"userRoles","foreignKey":"userId"}"#;
        let parsed = parse_association(payload, "through").unwrap();
        assert_eq!(parsed.as_deref(), Some("userRoles"));
    }

    #[test]
    fn unwraps_double_encoded_payloads() {
        let parsed = parse_association(r#""{\"through\":\"postTags\"}""#, "through").unwrap();
        assert_eq!(parsed.as_deref(), Some("postTags"));
    }

    #[test]
    fn missing_or_non_string_attribute_is_none() {
        assert_eq!(parse_association("{}", "through").unwrap(), None);
        assert_eq!(parse_association(r#"{"through":7}"#, "through").unwrap(), None);
        assert_eq!(parse_association(r#"{"through":"  "}"#, "through").unwrap(), None);
        assert_eq!(parse_association("[1,2]", "through").unwrap(), None);
    }

    #[test]
    fn malformed_payload_skips_only_that_field() {
        let links = collect_links(
            vec![
                field("users", "roles", r#"{"through":"userRoles"}"#),
                field("users", "broken", "{not json"),
                field("posts", "tags", r#"{"through":"postTags"}"#),
            ],
            "through",
        );
        let names: Vec<_> = links.iter().map(|link| link.linked_table.as_str()).collect();
        assert_eq!(names, vec!["userRoles", "postTags"]);
    }

    #[test]
    fn linked_tables_are_deduplicated() {
        let links = collect_links(
            vec![
                field("users", "roles", r#"{"through":"userRoles"}"#),
                field("roles", "users", r#"{"through":"userRoles"}"#),
            ],
            "through",
        );
        assert_eq!(linked_tables(&links), vec!["userRoles".to_string()]);
    }
}
