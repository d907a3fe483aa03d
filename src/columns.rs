//! Column order model.
//!
//! Positions within one definition are always contiguous `0..n-1`. Every
//! operation here is a pure transformation returning a fresh, renormalized
//! list; the interactive drag gesture is reduced to [`DragSession`], which
//! only computes indices and delegates to [`move_entry`].

use crate::error::ValidationError;
use crate::types::{ColumnOrderEntry, Record, ReportDefinition};
use std::collections::HashSet;

/// Assign positions in selection order.
pub fn from_field_selection<S: AsRef<str>>(field_ids: &[S]) -> Vec<ColumnOrderEntry> {
    field_ids
        .iter()
        .enumerate()
        .map(|(position, id)| ColumnOrderEntry { field_id: id.as_ref().to_string(), position })
        .collect()
}

/// Sort by position and reassign `0..n-1`, keeping relative order.
pub fn normalize(entries: &[ColumnOrderEntry]) -> Vec<ColumnOrderEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.position);
    renumber(sorted)
}

fn renumber(entries: Vec<ColumnOrderEntry>) -> Vec<ColumnOrderEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(position, e)| ColumnOrderEntry { field_id: e.field_id, position })
        .collect()
}

/// Move the entry at `from` so it ends up at `to`.
///
/// Out-of-range indices leave the order unchanged.
pub fn move_entry(entries: &[ColumnOrderEntry], from: usize, to: usize) -> Vec<ColumnOrderEntry> {
    let mut ordered = normalize(entries);
    if from >= ordered.len() || to >= ordered.len() || from == to {
        return ordered;
    }
    let moved = ordered.remove(from);
    ordered.insert(to, moved);
    renumber(ordered)
}

/// Move a field (by id) to `to`. Repeating the same call is a no-op.
pub fn move_field(entries: &[ColumnOrderEntry], field_id: &str, to: usize) -> Vec<ColumnOrderEntry> {
    let ordered = normalize(entries);
    match ordered.iter().position(|e| e.field_id == field_id) {
        Some(from) => move_entry(&ordered, from, to),
        None => ordered,
    }
}

/// Delete a field's entry and close the gap.
///
/// The caller removes the field from the selection in the same edit.
pub fn remove(entries: &[ColumnOrderEntry], field_id: &str) -> Vec<ColumnOrderEntry> {
    let kept: Vec<ColumnOrderEntry> = normalize(entries).into_iter().filter(|e| e.field_id != field_id).collect();
    renumber(kept)
}

/// Append a newly selected field at the end.
pub fn append(entries: &[ColumnOrderEntry], field_id: &str) -> Vec<ColumnOrderEntry> {
    let mut ordered = normalize(entries);
    if !ordered.iter().any(|e| e.field_id == field_id) {
        ordered.push(ColumnOrderEntry { field_id: field_id.to_string(), position: ordered.len() });
    }
    ordered
}

/// Positions are `0..n-1`, unique, and every entry names a selected field.
pub fn validate(entries: &[ColumnOrderEntry], fields: &[String]) -> Result<(), ValidationError> {
    let mut positions: Vec<usize> = entries.iter().map(|e| e.position).collect();
    positions.sort_unstable();
    if positions.iter().enumerate().any(|(i, p)| i != *p) {
        return Err(ValidationError::InvalidColumnOrder(format!("positions {:?} are not contiguous", positions)));
    }

    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.field_id.as_str()) {
            return Err(ValidationError::InvalidColumnOrder(format!("'{}' appears twice", entry.field_id)));
        }
        if !fields.iter().any(|f| f == &entry.field_id) {
            return Err(ValidationError::InvalidColumnOrder(format!("'{}' is not a selected field", entry.field_id)));
        }
    }
    Ok(())
}

/// Effective display order for a definition.
///
/// Tries, in order: the explicit column order (when it covers every selected
/// field), the field-selection order, then the key order of the first row.
/// Order entries for fields that are not selected are ignored.
pub fn resolve(definition: &ReportDefinition, first_row: Option<&Record>) -> Vec<String> {
    let selected = |id: &String| definition.fields.is_empty() || definition.fields.contains(id);
    let ordered: Vec<String> =
        normalize(&definition.column_order).into_iter().map(|e| e.field_id).filter(selected).collect();
    let covers_selection = !ordered.is_empty() && definition.fields.iter().all(|f| ordered.contains(f));
    if covers_selection {
        return ordered;
    }

    if !definition.fields.is_empty() {
        return definition.fields.clone();
    }

    first_row.map(|row| row.keys().cloned().collect()).unwrap_or_default()
}

/// Thin adapter for an interactive drag gesture.
///
/// Tracks the dragged field so repeated hover events over the same target
/// settle instead of cycling the order further.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    field_id: String,
}

impl DragSession {
    /// Start dragging the column currently at `index`.
    pub fn start(entries: &[ColumnOrderEntry], index: usize) -> Option<Self> {
        normalize(entries).get(index).map(|e| Self { field_id: e.field_id.clone() })
    }

    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    /// Hovering over `target` moves the dragged column there.
    pub fn hover(&self, entries: &[ColumnOrderEntry], target: usize) -> Vec<ColumnOrderEntry> {
        move_field(entries, &self.field_id, target)
    }
}
