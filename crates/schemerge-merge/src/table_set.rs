//! Catalog-backed steps of exclusion-set construction.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use schemerge_core::{Presence, TableSet, TableSetDraft};
use schemerge_introspect::{Catalog, discover_junctions, linked_tables};

/// Discover association tables reachable from `initial`, up to `depth`
/// rounds.
///
/// Round one looks at the requested tables; each further round looks only at
/// the junction tables found in the round before. Names are returned as the
/// metadata stores them. Lookup errors end discovery with what was found so
/// far.
pub async fn discover_junction_tables(
    catalog: &dyn Catalog,
    initial: &[String],
    association_key: &str,
    depth: usize,
) -> Vec<String> {
    let mut visited: BTreeSet<String> = initial.iter().cloned().collect();
    let mut found = Vec::new();
    let mut frontier = initial.to_vec();

    for level in 1..=depth {
        if frontier.is_empty() {
            break;
        }

        let links = match discover_junctions(catalog, &frontier, association_key).await {
            Ok(links) => links,
            Err(err) => {
                warn!(event = "junction_discovery_failed", level = level, error = %err);
                break;
            }
        };

        let mut next = Vec::new();
        for name in linked_tables(&links) {
            if visited.insert(name.clone()) {
                found.push(name.clone());
                next.push(name);
            }
        }
        info!(event = "junction_level_finished", level = level, found = next.len());
        frontier = next;
    }

    found
}

/// Check one table in both catalogs. Lookup errors become
/// [`Presence::Unknown`].
pub async fn table_presence(source: &dyn Catalog, target: &dyn Catalog, table: &str) -> Presence {
    let in_source = source.table_exists(table).await;
    let in_target = target.table_exists(table).await;
    match (in_source, in_target) {
        (Ok(in_source), Ok(in_target)) => Presence::from_flags(in_source, in_target),
        (Err(err), _) | (_, Err(err)) => Presence::Unknown(err.to_string()),
    }
}

/// Keep only tables that exist on both sides, reporting the rest.
pub async fn validate_exclusions(
    draft: TableSetDraft,
    source: &dyn Catalog,
    target: &dyn Catalog,
) -> TableSet {
    let mut presence = BTreeMap::new();
    for table in draft.candidates() {
        presence.insert(table.clone(), table_presence(source, target, table).await);
    }

    let set = draft.validate(|table| {
        presence
            .remove(table)
            .unwrap_or_else(|| Presence::Unknown("table was not checked".to_string()))
    });

    for table in &set.missing_from_source {
        warn!(event = "table_missing", table = %table, side = "source");
    }
    for table in &set.missing_from_target {
        warn!(event = "table_missing", table = %table, side = "target");
    }
    for failure in &set.lookup_failed {
        warn!(event = "table_lookup_failed", table = %failure.table, error = %failure.message);
    }
    info!(
        event = "exclusions_validated",
        validated = set.validated.len(),
        dropped = set.requested.len() - set.validated.len()
    );

    set
}
