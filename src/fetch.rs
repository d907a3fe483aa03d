//! Data fetcher.
//!
//! Turns a report definition into a backend request and the answer into a
//! [`GeneratedReport`]. Built-in templates each hit a dedicated endpoint
//! with bespoke statistics; custom definitions all go through the generic
//! processes endpoint, parameterized by field list and filters.
//!
//! An empty `rows` list is a valid result, not an error.

use crate::api::{self, ApiClient};
use crate::error::FetchError;
use crate::filter;
use crate::format;
use crate::templates;
use crate::types::{FilterOption, GeneratedReport, Record, ReportDefinition, ReportKind, TemplateKind, UserInfo};
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Path of the generic endpoint serving custom definitions
pub const PROCESSES_ENDPOINT: &str = "relatorios/processos";

/// Body of every report endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    #[serde(default)]
    pub rows: Vec<Record>,
    #[serde(default)]
    pub statistics: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}

/// Request body for the generic processes endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessQuery {
    pub fields: Vec<String>,
    pub filters: BTreeMap<String, serde_json::Value>,
}

/// Read-only lookup lists used to populate enumerated filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    Modalidades,
    Situacoes,
    Unidades,
    Responsaveis,
}

impl OptionSource {
    pub const ALL: [OptionSource; 4] =
        [OptionSource::Modalidades, OptionSource::Situacoes, OptionSource::Unidades, OptionSource::Responsaveis];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionSource::Modalidades => "modalidades",
            OptionSource::Situacoes => "situacoes",
            OptionSource::Unidades => "unidades",
            OptionSource::Responsaveis => "responsaveis",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == s)
    }

    /// Catalog field whose filter this source populates
    pub fn field_id(&self) -> &'static str {
        match self {
            OptionSource::Modalidades => "modalidade_sigla",
            OptionSource::Situacoes => "situacao_nome",
            OptionSource::Unidades => "unidade_nome",
            OptionSource::Responsaveis => "responsavel_nome",
        }
    }
}

/// Backend report endpoints, as seen by the engine
pub trait ReportBackend {
    /// Query a built-in template's dedicated endpoint
    fn fetch_template(
        &self,
        kind: TemplateKind,
        params: &BTreeMap<String, serde_json::Value>,
    ) -> Result<ReportPayload, FetchError>;

    /// Query the generic processes endpoint
    fn fetch_processes(&self, query: &ProcessQuery) -> Result<ReportPayload, FetchError>;

    /// List `{id, label}` options for an enumerated filter
    fn filter_options(&self, source: OptionSource) -> Result<Vec<FilterOption>, FetchError>;
}

/// [`ReportBackend`] over the REST API
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl ReportBackend for HttpBackend {
    fn fetch_template(
        &self,
        kind: TemplateKind,
        params: &BTreeMap<String, serde_json::Value>,
    ) -> Result<ReportPayload, FetchError> {
        self.client.get_json(templates::endpoint(kind), &api::query_pairs(params))
    }

    fn fetch_processes(&self, query: &ProcessQuery) -> Result<ReportPayload, FetchError> {
        self.client.send_json("POST", PROCESSES_ENDPOINT, query)
    }

    fn filter_options(&self, source: OptionSource) -> Result<Vec<FilterOption>, FetchError> {
        self.client.get_json(source.as_str(), &[])
    }
}

/// Execute a definition against the backend.
pub fn fetch(definition: &ReportDefinition, backend: &dyn ReportBackend) -> Result<GeneratedReport, FetchError> {
    let params = filter::to_query_parameters(&definition.filters);

    let payload = match definition.kind {
        ReportKind::Template(kind) => {
            debug!("fetching template {} with {} filter parameters", kind.as_str(), params.len());
            backend.fetch_template(kind, &params)?
        }
        ReportKind::Custom => {
            debug!(
                "fetching custom report '{}' ({} fields, {} filter parameters)",
                definition.name,
                definition.fields.len(),
                params.len()
            );
            let query = ProcessQuery { fields: definition.fields.clone(), filters: params };
            backend.fetch_processes(&query)?
        }
    };

    if payload.rows.is_empty() {
        info!("report '{}' returned no rows", definition.name);
    }

    Ok(GeneratedReport {
        definition: definition.clone(),
        rows: payload.rows,
        statistics: numeric_statistics(payload.statistics),
        user_info: payload.user_info,
        fetched_at: Utc::now(),
    })
}

/// Keep statistics that carry a number; numeric strings are accepted.
fn numeric_statistics(raw: BTreeMap<String, serde_json::Value>) -> BTreeMap<String, f64> {
    raw.into_iter()
        .filter_map(|(key, value)| match format::as_number(&value) {
            Some(n) => Some((key, n)),
            None => {
                debug!("dropping non-numeric statistic {} = {}", key, value);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FilterValue;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingBackend {
        calls: RefCell<Vec<String>>,
        payload: ReportPayload,
        fail: Option<FetchError>,
    }

    impl ReportBackend for RecordingBackend {
        fn fetch_template(
            &self,
            kind: TemplateKind,
            params: &BTreeMap<String, serde_json::Value>,
        ) -> Result<ReportPayload, FetchError> {
            self.calls.borrow_mut().push(format!("template:{}:{}", kind.as_str(), params.len()));
            match &self.fail {
                Some(e) => Err(e.clone()),
                None => Ok(self.payload.clone()),
            }
        }

        fn fetch_processes(&self, query: &ProcessQuery) -> Result<ReportPayload, FetchError> {
            self.calls.borrow_mut().push(format!("processes:{}:{}", query.fields.join(","), query.filters.len()));
            match &self.fail {
                Some(e) => Err(e.clone()),
                None => Ok(self.payload.clone()),
            }
        }

        fn filter_options(&self, _source: OptionSource) -> Result<Vec<FilterOption>, FetchError> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_custom_goes_to_generic_endpoint_without_placeholders() {
        let backend = RecordingBackend::default();
        let mut def = ReportDefinition::blank();
        def.fields = vec!["nup".into(), "valor_estimado".into()];
        def.filters = filter::add_or_replace(&[], "modalidade_sigla", FilterValue::text("all")).unwrap();
        def.filters = filter::add_or_replace(&def.filters, "ano", FilterValue::Number(2024.0)).unwrap();

        fetch(&def, &backend).unwrap();
        assert_eq!(backend.calls.borrow().as_slice(), ["processes:nup,valor_estimado:1"]);
    }

    #[test]
    fn test_template_goes_to_dedicated_endpoint() {
        let backend = RecordingBackend::default();
        let def = templates::get_template(TemplateKind::Prazos).unwrap();
        fetch(def, &backend).unwrap();
        assert_eq!(backend.calls.borrow().as_slice(), ["template:prazos:0"]);
    }

    #[test]
    fn test_empty_rows_are_ok() {
        let backend = RecordingBackend::default();
        let def = templates::get_template(TemplateKind::PorUnidade).unwrap();
        let report = fetch(def, &backend).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_transport_failure_propagates() {
        let backend =
            RecordingBackend { fail: Some(FetchError::Transport("connection refused".into())), ..Default::default() };
        let def = templates::get_template(TemplateKind::PorUnidade).unwrap();
        assert_eq!(fetch(def, &backend).unwrap_err(), FetchError::Transport("connection refused".into()));
    }

    #[test]
    fn test_payload_decoding_and_statistics() {
        let payload: ReportPayload = serde_json::from_value(json!({
            "rows": [{"nup": "001"}],
            "statistics": {"total_processos": 3, "valor_total": "1500.5", "ultima_atualizacao": "ontem"},
            "userInfo": {"name": "Maria", "restrictedToOwn": true}
        }))
        .unwrap();
        let backend = RecordingBackend { payload, ..Default::default() };
        let report = fetch(templates::get_template(TemplateKind::PorSituacao).unwrap(), &backend).unwrap();

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.statistics.get("total_processos"), Some(&3.0));
        assert_eq!(report.statistics.get("valor_total"), Some(&1500.5));
        assert!(!report.statistics.contains_key("ultima_atualizacao"));
        assert_eq!(report.user_info.unwrap().name.as_deref(), Some("Maria"));
    }

    #[test]
    fn test_option_source_names() {
        for source in OptionSource::ALL {
            assert_eq!(OptionSource::parse(source.as_str()), Some(source));
            assert!(crate::catalog::get_field(source.field_id()).is_some());
        }
    }
}
