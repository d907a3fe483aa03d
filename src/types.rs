/// Core data structures for report definitions and generated reports
///
/// This module defines the shapes shared by the catalog, filter model,
/// column order model, fetcher, store, renderer and builder.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One data row as returned by a report endpoint.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Semantic type of a reportable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Text,
    Number,
    Date,
    Boolean,
    Enumerated,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Text => "text",
            SemanticType::Number => "number",
            SemanticType::Date => "date",
            SemanticType::Boolean => "boolean",
            SemanticType::Enumerated => "enumerated",
        }
    }
}

/// Static description of one reportable field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub semantic_type: SemanticType,
    pub category: &'static str,
    pub description: &'static str,
}

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    In,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
}

/// Value attached to a filter clause: a scalar or a list of scalars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    pub fn text(s: impl Into<String>) -> Self {
        FilterValue::Text(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterValue::List(items.into_iter().map(|s| FilterValue::Text(s.into())).collect())
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FilterValue::Null => serde_json::Value::Null,
            FilterValue::Bool(b) => serde_json::Value::Bool(*b),
            FilterValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FilterValue::Text(s) => serde_json::Value::String(s.clone()),
            FilterValue::List(items) => serde_json::Value::Array(items.iter().map(|v| v.to_json()).collect()),
        }
    }
}

/// One filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterClause {
    pub field_id: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
    pub value_type: SemanticType,
}

/// One field's display position within a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOrderEntry {
    pub field_id: String,
    pub position: usize,
}

/// Built-in report templates, each backed by a dedicated endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    PorModalidade,
    PorSituacao,
    PorUnidade,
    PorResponsavel,
    Economicidade,
    Prazos,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 6] = [
        TemplateKind::PorModalidade,
        TemplateKind::PorSituacao,
        TemplateKind::PorUnidade,
        TemplateKind::PorResponsavel,
        TemplateKind::Economicidade,
        TemplateKind::Prazos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::PorModalidade => "por_modalidade",
            TemplateKind::PorSituacao => "por_situacao",
            TemplateKind::PorUnidade => "por_unidade",
            TemplateKind::PorResponsavel => "por_responsavel",
            TemplateKind::Economicidade => "economicidade",
            TemplateKind::Prazos => "prazos",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// Discriminates built-in templates from user-authored reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "template", rename_all = "snake_case")]
pub enum ReportKind {
    Template(TemplateKind),
    #[default]
    Custom,
}

/// The saved/editable specification of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub kind: ReportKind,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default)]
    pub column_order: Vec<ColumnOrderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_color() -> String {
    "#3b82f6".to_string()
}

impl ReportDefinition {
    /// Empty custom draft, as the builder creates on "new report"
    pub fn blank() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            category: "Personalizado".to_string(),
            color: default_color(),
            kind: ReportKind::Custom,
            fields: Vec::new(),
            filters: Vec::new(),
            column_order: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }
}

/// Identity hint returned by the generic processes endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub restricted_to_own: bool,
}

/// Ephemeral result of executing a definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedReport {
    pub definition: ReportDefinition,
    pub rows: Vec<Record>,
    pub statistics: BTreeMap<String, f64>,
    pub user_info: Option<UserInfo>,
    pub fetched_at: DateTime<Utc>,
}

impl GeneratedReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Role of the viewer, supplied by the authentication collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Gestor,
    Responsavel,
}

impl UserRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "gestor" => Some(UserRole::Gestor),
            "responsavel" => Some(UserRole::Responsavel),
            _ => None,
        }
    }
}

/// Session context injected into the renderer and builder
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub user_name: String,
    pub role: UserRole,
}

impl SessionContext {
    pub fn new(user_name: impl Into<String>, role: UserRole) -> Self {
        Self { user_name: user_name.into(), role }
    }

    /// Responsible parties only ever see their own processes
    pub fn restricted_to_own_records(&self) -> bool {
        self.role == UserRole::Responsavel
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self { user_name: String::new(), role: UserRole::Admin }
    }
}

/// `{id, label}` pair from a filter option source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: serde_json::Value,
    #[serde(alias = "nome", alias = "name")]
    pub label: String,
}
