//! Referral forest reconstruction and display ordering.
//!
//! Input is a flat, unordered batch of referred customers for one
//! referring root. Output is the same records in pre-order depth-first
//! display order: each parent immediately followed by its whole subtree
//! before the next sibling.
//!
//! Parent lookup scans the full input per non-root record, so the build
//! is O(n²) in the record count. Referral trees per partner are tens to
//! low hundreds of nodes; this is a known scaling limit, not an
//! oversight.

use pawtrait_core::ReferralCode;

use super::types::AttributionCustomer;

/// Order a flat record batch into a depth-first display list.
///
/// Rules:
/// - A record with one code or fewer in its path is a root; so is any
///   record whose claimed parent code matches no other record in the
///   batch (dangling and self-referential paths degrade to roots, they
///   never error).
/// - When several records share a terminal code, the first one in input
///   order wins the parent claim.
/// - Roots and each child list sort by creation time ascending (stable;
///   missing timestamps sort earliest), then the forest is emitted
///   pre-order.
/// - Records stranded on a path cycle are demoted to roots after the
///   main walk so the output always contains every input record exactly
///   once.
#[must_use]
pub fn flatten_tree(records: Vec<AttributionCustomer>) -> Vec<AttributionCustomer> {
    let mut roots: Vec<usize> = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];

    for (idx, record) in records.iter().enumerate() {
        let Some(parent_code) = record.path.parent_code() else {
            roots.push(idx);
            continue;
        };

        match find_parent(&records, idx, parent_code) {
            Some(parent_idx) => {
                if let Some(list) = children.get_mut(parent_idx) {
                    list.push(idx);
                }
            }
            None => {
                tracing::warn!(
                    customer_id = %record.customer_id,
                    parent_code = %parent_code,
                    "referral parent not found in batch, treating record as root"
                );
                roots.push(idx);
            }
        }
    }

    sort_by_creation(&mut roots, &records);
    for list in &mut children {
        sort_by_creation(list, &records);
    }

    let mut visited = vec![false; records.len()];
    let mut order: Vec<usize> = Vec::with_capacity(records.len());
    for &root in &roots {
        emit(root, &children, &mut visited, &mut order);
    }

    // Anything not reached from a root sits on a cycle of inconsistent
    // paths. Demote those records to roots so the walk still covers the
    // whole batch.
    let mut stranded: Vec<usize> = (0..records.len())
        .filter(|&idx| !visited.get(idx).copied().unwrap_or(true))
        .collect();
    if !stranded.is_empty() {
        tracing::warn!(
            count = stranded.len(),
            "cyclic referral paths demoted to roots"
        );
        sort_by_creation(&mut stranded, &records);
        for idx in stranded {
            emit(idx, &children, &mut visited, &mut order);
        }
    }

    let mut slots: Vec<Option<AttributionCustomer>> =
        records.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|idx| slots.get_mut(idx).and_then(Option::take))
        .collect()
}

/// First record in input order (other than the child itself) whose path
/// ends in the claimed parent code.
fn find_parent(
    records: &[AttributionCustomer],
    child_idx: usize,
    parent_code: &ReferralCode,
) -> Option<usize> {
    records
        .iter()
        .enumerate()
        .find(|&(idx, candidate)| {
            idx != child_idx && candidate.path.terminal() == Some(parent_code)
        })
        .map(|(idx, _)| idx)
}

/// Stable ascending sort by creation time; missing timestamps sort as
/// the epoch.
fn sort_by_creation(indices: &mut [usize], records: &[AttributionCustomer]) {
    indices.sort_by_key(|&idx| {
        records
            .get(idx)
            .and_then(|record| record.created_at)
            .map_or(0, |created_at| created_at.timestamp_millis())
    });
}

/// Pre-order emit: the node, then each child subtree in order.
fn emit(idx: usize, children: &[Vec<usize>], visited: &mut [bool], order: &mut Vec<usize>) {
    if visited.get(idx).copied().unwrap_or(true) {
        return;
    }
    if let Some(flag) = visited.get_mut(idx) {
        *flag = true;
    }
    order.push(idx);
    if let Some(kids) = children.get(idx) {
        for &child in kids {
            emit(child, children, visited, order);
        }
    }
}
