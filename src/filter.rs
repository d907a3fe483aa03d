/// Filter model
///
/// This module handles:
/// - Adding or replacing typed filter clauses on a definition
/// - Inferring the operator from the field's semantic type
/// - Rejecting values that do not type-check against their field
/// - Translating clauses into backend query parameters
use crate::catalog;
use crate::error::ValidationError;
use crate::types::{FieldDescriptor, FilterClause, FilterOperator, FilterValue, SemanticType};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Placeholder value meaning "no constraint"
pub const ALL_SENTINEL: &str = "all";

/// Which end of a date range a clause constrains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Start,
    End,
}

impl RangeBound {
    fn suffix(&self) -> &'static str {
        match self {
            RangeBound::Start => "_start",
            RangeBound::End => "_end",
        }
    }
}

/// True when a value carries no constraint: null, blank, the "all" sentinel,
/// or a list made only of those.
pub fn is_placeholder(value: &FilterValue) -> bool {
    match value {
        FilterValue::Null => true,
        FilterValue::Text(s) => {
            let s = s.trim();
            s.is_empty() || s == ALL_SENTINEL
        }
        FilterValue::List(items) => items.iter().all(is_placeholder),
        FilterValue::Bool(_) | FilterValue::Number(_) => false,
    }
}

/// Resolve `data_entrada_start` style ids to their base date field.
fn resolve_target(field_id: &str) -> Result<(&'static FieldDescriptor, Option<RangeBound>), ValidationError> {
    if let Some(field) = catalog::get_field(field_id) {
        return Ok((field, None));
    }

    for bound in [RangeBound::Start, RangeBound::End] {
        if let Some(base) = field_id.strip_suffix(bound.suffix())
            && let Some(field) = catalog::get_field(base)
            && field.semantic_type == SemanticType::Date
        {
            return Ok((field, Some(bound)));
        }
    }

    Err(ValidationError::UnknownField(field_id.to_string()))
}

fn infer_operator(semantic_type: SemanticType, bound: Option<RangeBound>, value: &FilterValue) -> FilterOperator {
    match bound {
        Some(RangeBound::Start) => return FilterOperator::GreaterOrEqual,
        Some(RangeBound::End) => return FilterOperator::LessOrEqual,
        None => {}
    }

    if matches!(value, FilterValue::List(_)) {
        return FilterOperator::In;
    }

    match semantic_type {
        SemanticType::Text => FilterOperator::Contains,
        SemanticType::Enumerated | SemanticType::Boolean | SemanticType::Number | SemanticType::Date => {
            FilterOperator::Equals
        }
    }
}

fn scalar_matches(semantic_type: SemanticType, value: &FilterValue) -> bool {
    match (semantic_type, value) {
        (SemanticType::Text, FilterValue::Text(_)) => true,
        (SemanticType::Enumerated, FilterValue::Text(_) | FilterValue::Number(_)) => true,
        (SemanticType::Number, FilterValue::Number(n)) => n.is_finite(),
        (SemanticType::Boolean, FilterValue::Bool(_)) => true,
        (SemanticType::Date, FilterValue::Text(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok(),
        _ => false,
    }
}

/// Check a value against a field's declared type. Placeholders always pass.
pub fn validate_value(field: &FieldDescriptor, value: &FilterValue) -> Result<(), ValidationError> {
    if is_placeholder(value) {
        return Ok(());
    }

    let ok = match value {
        FilterValue::List(items) => items
            .iter()
            .filter(|item| !is_placeholder(item))
            .all(|item| !matches!(item, FilterValue::List(_)) && scalar_matches(field.semantic_type, item)),
        scalar => scalar_matches(field.semantic_type, scalar),
    };

    if ok {
        Ok(())
    } else {
        debug!("rejected filter value {:?} for field {}", value, field.id);
        Err(ValidationError::FilterTypeMismatch {
            field: field.id.to_string(),
            expected: field.semantic_type.as_str(),
        })
    }
}

/// Query parameter a clause maps to. Range endpoints get `_start`/`_end`.
pub fn parameter_name(clause: &FilterClause) -> String {
    match clause.operator {
        FilterOperator::GreaterOrEqual => format!("{}{}", clause.field_id, RangeBound::Start.suffix()),
        FilterOperator::LessOrEqual => format!("{}{}", clause.field_id, RangeBound::End.suffix()),
        _ => clause.field_id.clone(),
    }
}

/// Add a clause for `field_id`, or replace the value of the existing one.
///
/// `field_id` may name a date field's range endpoint (`data_entrada_start`,
/// `data_entrada_end`); each endpoint is its own clause.
pub fn add_or_replace(
    clauses: &[FilterClause],
    field_id: &str,
    value: FilterValue,
) -> Result<Vec<FilterClause>, ValidationError> {
    let (field, bound) = resolve_target(field_id)?;
    validate_value(field, &value)?;

    let operator = infer_operator(field.semantic_type, bound, &value);
    let candidate =
        FilterClause { field_id: field.id.to_string(), operator, value, value_type: field.semantic_type };
    let key = parameter_name(&candidate);

    let mut out = clauses.to_vec();
    match out.iter_mut().find(|c| parameter_name(c) == key) {
        Some(existing) => {
            existing.operator = candidate.operator;
            existing.value = candidate.value;
        }
        None => out.push(candidate),
    }
    Ok(out)
}

/// Drop every clause on `field_id`, including both range endpoints.
pub fn remove_field(clauses: &[FilterClause], field_id: &str) -> Vec<FilterClause> {
    clauses.iter().filter(|c| c.field_id != field_id).cloned().collect()
}

/// Re-check stored clauses, e.g. a definition loaded from the store.
pub fn validate_clauses(clauses: &[FilterClause]) -> Result<(), ValidationError> {
    for clause in clauses {
        let field = catalog::get_field(&clause.field_id)
            .ok_or_else(|| ValidationError::UnknownField(clause.field_id.clone()))?;
        validate_value(field, &clause.value)?;
    }
    Ok(())
}

/// Effective query parameters: placeholder clauses are stripped, list members
/// that are placeholders are dropped.
pub fn to_query_parameters(clauses: &[FilterClause]) -> BTreeMap<String, serde_json::Value> {
    let mut params = BTreeMap::new();

    for clause in clauses {
        if is_placeholder(&clause.value) {
            continue;
        }

        let value = match &clause.value {
            FilterValue::List(items) => {
                FilterValue::List(items.iter().filter(|item| !is_placeholder(item)).cloned().collect())
            }
            other => other.clone(),
        };
        params.insert(parameter_name(clause), value.to_json());
    }

    params
}

/// Interpret raw user input for a field: comma-separated input becomes a
/// list, booleans and numbers are read according to the field type.
pub fn value_from_input(field_id: &str, raw: &str) -> Result<FilterValue, ValidationError> {
    let (field, _) = resolve_target(field_id)?;
    let raw = raw.trim();

    if raw.contains(',') {
        let items = raw.split(',').map(|part| scalar_from_input(field, part.trim())).collect::<Result<_, _>>()?;
        return Ok(FilterValue::List(items));
    }
    scalar_from_input(field, raw)
}

fn scalar_from_input(field: &FieldDescriptor, raw: &str) -> Result<FilterValue, ValidationError> {
    if raw.is_empty() || raw == ALL_SENTINEL {
        return Ok(FilterValue::Text(raw.to_string()));
    }

    let mismatch =
        || ValidationError::FilterTypeMismatch { field: field.id.to_string(), expected: field.semantic_type.as_str() };

    match field.semantic_type {
        SemanticType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "sim" => Ok(FilterValue::Bool(true)),
            "false" | "nao" | "não" => Ok(FilterValue::Bool(false)),
            _ => Err(mismatch()),
        },
        SemanticType::Number => raw.parse::<f64>().map(FilterValue::Number).map_err(|_| mismatch()),
        SemanticType::Text | SemanticType::Enumerated | SemanticType::Date => Ok(FilterValue::Text(raw.to_string())),
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
