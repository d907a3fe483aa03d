/// Tests for the report builder state machine
///
/// Uses an in-memory backend and store so every transition can be driven
/// without a server.

#[cfg(test)]
mod tests {
    use crate::builder::*;
    use crate::error::{BuilderError, FetchError, PersistenceError, ValidationError};
    use crate::fetch::{OptionSource, ProcessQuery, ReportBackend, ReportPayload};
    use crate::render::{ExportFormat, PreviewView};
    use crate::store::DefinitionStore;
    use crate::types::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeBackend {
        rows: RefCell<Vec<Record>>,
        fail: Cell<bool>,
        calls: Cell<usize>,
    }

    impl FakeBackend {
        fn with_rows(rows: Vec<Record>) -> Self {
            Self { rows: RefCell::new(rows), ..Default::default() }
        }

        fn answer(&self) -> Result<ReportPayload, FetchError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail.get() {
                return Err(FetchError::Status { endpoint: "relatorios/processos".into(), status: 500 });
            }
            Ok(ReportPayload { rows: self.rows.borrow().clone(), ..Default::default() })
        }
    }

    impl ReportBackend for FakeBackend {
        fn fetch_template(
            &self,
            _kind: TemplateKind,
            _params: &BTreeMap<String, serde_json::Value>,
        ) -> Result<ReportPayload, FetchError> {
            self.answer()
        }

        fn fetch_processes(&self, _query: &ProcessQuery) -> Result<ReportPayload, FetchError> {
            self.answer()
        }

        fn filter_options(&self, _source: OptionSource) -> Result<Vec<FilterOption>, FetchError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        reports: RefCell<Vec<ReportDefinition>>,
        next_id: Cell<u64>,
        fail: Cell<bool>,
        /// Hand back stored copies without their field selection
        drop_fields: Cell<bool>,
    }

    impl MemoryStore {
        fn check(&self) -> Result<(), PersistenceError> {
            if self.fail.get() {
                Err(FetchError::Transport("store offline".into()).into())
            } else {
                Ok(())
            }
        }
    }

    impl DefinitionStore for MemoryStore {
        fn list(&self) -> Result<Vec<ReportDefinition>, PersistenceError> {
            self.check()?;
            Ok(self.reports.borrow().clone())
        }

        fn create(&self, definition: &ReportDefinition) -> Result<ReportDefinition, PersistenceError> {
            self.check()?;
            self.next_id.set(self.next_id.get() + 1);
            let mut saved = definition.clone();
            saved.id = Some(self.next_id.get());
            saved.created_at = Some(Utc::now());
            if self.drop_fields.get() {
                saved.fields.clear();
                saved.column_order.clear();
            }
            self.reports.borrow_mut().push(saved.clone());
            Ok(saved)
        }

        fn update(&self, id: u64, definition: &ReportDefinition) -> Result<ReportDefinition, PersistenceError> {
            self.check()?;
            let mut reports = self.reports.borrow_mut();
            let slot = reports.iter_mut().find(|r| r.id == Some(id)).ok_or(PersistenceError::NotFound(id))?;
            *slot = definition.clone();
            Ok(slot.clone())
        }

        fn delete(&self, id: u64) -> Result<(), PersistenceError> {
            self.check()?;
            self.reports.borrow_mut().retain(|r| r.id != Some(id));
            Ok(())
        }
    }

    fn sample_rows() -> Vec<Record> {
        let mut row = Record::new();
        row.insert("nup".into(), json!("23000.000001/2024"));
        row.insert("valor_estimado".into(), json!(15000.5));
        row.insert("responsavel_nome".into(), json!("Ana"));
        vec![row]
    }

    fn editing_with_fields<'a>(builder: &mut ReportBuilder<'a>, fields: &[&str]) {
        builder.start_blank().unwrap();
        for field in fields {
            assert!(builder.toggle_field(field).unwrap());
        }
    }

    fn shown_table(builder: &ReportBuilder) -> crate::render::ReportTable {
        match builder.preview() {
            Some(PreviewView::Data(table)) => table.clone(),
            other => panic!("expected data preview, got {:?}", other),
        }
    }

    #[test]
    fn test_generate_previews_selected_fields_in_order() {
        let backend = FakeBackend::with_rows(sample_rows());
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());

        editing_with_fields(&mut builder, &["nup", "valor_estimado"]);
        builder.generate().unwrap();

        assert_eq!(builder.state(), BuilderState::Previewing);
        let table = shown_table(&builder);
        let titles: Vec<&str> = table.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["NUP", "Valor Estimado"]);
        assert_eq!(table.rows[0][1], "R$ 15.000,50");
    }

    #[test]
    fn test_generate_requires_fields() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        builder.start_blank().unwrap();
        builder.set_name("Sem campos").unwrap();

        let err = builder.generate().unwrap_err();
        assert!(matches!(err, BuilderError::Validation(ValidationError::EmptyFieldSelection)));
        assert_eq!(builder.state(), BuilderState::Editing);
        assert_eq!(builder.draft().unwrap().name, "Sem campos");
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_fetch_failure_stays_in_editing() {
        let backend = FakeBackend::default();
        backend.fail.set(true);
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);

        assert!(matches!(builder.generate(), Err(BuilderError::Fetch(_))));
        assert_eq!(builder.state(), BuilderState::Editing);
        assert!(builder.preview().is_none());
        assert!(!builder.is_loading());
        assert!(builder.take_notification().unwrap().contains("500"));
        assert!(builder.notification().is_none());
    }

    #[test]
    fn test_zero_rows_is_no_data() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);

        let view = builder.generate().unwrap();
        assert!(matches!(view, PreviewView::NoData(_)));
    }

    #[test]
    fn test_second_request_while_loading_is_refused() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);

        let ticket = builder.request_generation().unwrap();
        assert!(builder.is_loading());
        assert_eq!(builder.preview(), Some(&PreviewView::Loading));
        assert!(matches!(builder.request_generation(), Err(BuilderError::FetchInProgress)));

        let result = crate::fetch::fetch(ticket.definition(), &backend);
        assert!(builder.complete_generation(ticket, result).unwrap());
        assert!(!builder.is_loading());
    }

    #[test]
    fn test_result_after_close_is_discarded() {
        let backend = FakeBackend::with_rows(sample_rows());
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);

        let stale = builder.request_generation().unwrap();
        builder.close_preview().unwrap();
        assert_eq!(builder.state(), BuilderState::Editing);

        let result = crate::fetch::fetch(stale.definition(), &backend);
        assert!(!builder.complete_generation(stale, result).unwrap());
        assert!(builder.preview().is_none());
        assert_eq!(builder.state(), BuilderState::Editing);
    }

    #[test]
    fn test_save_requires_name() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);
        builder.set_name("   ").unwrap();

        assert!(matches!(builder.save(), Err(BuilderError::Validation(ValidationError::MissingName))));
        assert_eq!(builder.state(), BuilderState::Editing);
        assert!(store.reports.borrow().is_empty());
    }

    #[test]
    fn test_save_appends_and_previews_then_returns_to_browsing() {
        let backend = FakeBackend::with_rows(sample_rows());
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup", "valor_estimado"]);
        builder.set_name("Meu relatório").unwrap();

        let saved = builder.save().unwrap();
        assert_eq!(saved.id, Some(1));
        assert_eq!(builder.saved().len(), 1);
        assert_eq!(builder.state(), BuilderState::Previewing);
        assert_eq!(shown_table(&builder).title, "Meu relatório");
        assert_eq!(backend.calls.get(), 1);

        builder.close_preview().unwrap();
        assert_eq!(builder.state(), BuilderState::Browsing);
        assert!(builder.draft().is_none());
    }

    #[test]
    fn test_save_failure_keeps_draft() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        store.fail.set(true);
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);
        builder.set_name("Rascunho").unwrap();

        assert!(matches!(builder.save(), Err(BuilderError::Persistence(_))));
        assert_eq!(builder.state(), BuilderState::Editing);
        let draft = builder.draft().unwrap();
        assert_eq!(draft.name, "Rascunho");
        assert!(draft.id.is_none());
        assert!(builder.notification().is_some());
    }

    #[test]
    fn test_save_stands_when_its_preview_fails() {
        let backend = FakeBackend::with_rows(sample_rows());
        backend.fail.set(true);
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);
        builder.set_name("Salvo sem dados").unwrap();

        let saved = builder.save().unwrap();
        assert_eq!(saved.id, Some(1));
        assert_eq!(builder.state(), BuilderState::Editing);
        assert_eq!(builder.draft().unwrap().id, Some(1));
        assert!(builder.preview().is_none());
        assert!(builder.report().is_none());
        assert!(builder.notification().is_some());
        assert_eq!(store.reports.borrow().len(), 1);

        // the editor is usable again once the backend recovers
        backend.fail.set(false);
        builder.generate().unwrap();
        assert_eq!(builder.state(), BuilderState::Previewing);
    }

    #[test]
    fn test_save_stands_when_stored_copy_cannot_generate() {
        let backend = FakeBackend::with_rows(sample_rows());
        let store = MemoryStore::default();
        store.drop_fields.set(true);
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);
        builder.set_name("Sem campos").unwrap();

        let saved = builder.save().unwrap();
        assert_eq!(saved.id, Some(1));
        assert_eq!(builder.state(), BuilderState::Editing);
        assert_eq!(builder.saved().len(), 1);
        assert!(builder.notification().unwrap().contains("salvo"));
        assert_eq!(backend.calls.get(), 0);

        builder.cancel().unwrap();
        assert_eq!(builder.state(), BuilderState::Browsing);
    }

    #[test]
    fn test_failed_refresh_keeps_last_preview() {
        let backend = FakeBackend::with_rows(sample_rows());
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup", "valor_estimado"]);
        builder.set_name("Atualizado").unwrap();
        builder.generate().unwrap();
        let before = shown_table(&builder);

        backend.fail.set(true);
        assert!(matches!(builder.generate(), Err(BuilderError::Fetch(_))));
        assert_eq!(builder.state(), BuilderState::Previewing);
        assert!(!builder.is_loading());
        assert_eq!(shown_table(&builder), before);
        assert!(builder.report().is_some());
        assert!(builder.take_notification().unwrap().contains("500"));

        // what is exported is what is shown
        let dir = TempDir::new().unwrap();
        let paths = builder.export(&[ExportFormat::Csv], dir.path()).unwrap();
        let csv = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(csv.contains(&before.rows[0][0]));
        assert_eq!(backend.calls.get(), 2);
    }

    #[test]
    fn test_edit_saved_keeps_id_and_replaces_entry() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);
        builder.set_name("Original").unwrap();
        let saved = builder.save().unwrap();
        builder.close_preview().unwrap();

        builder.edit_saved(saved.id.unwrap()).unwrap();
        assert_eq!(builder.draft().unwrap().id, saved.id);
        builder.set_name("Renomeado").unwrap();
        builder.save().unwrap();

        assert_eq!(builder.saved().len(), 1);
        assert_eq!(builder.saved()[0].name, "Renomeado");
        assert_eq!(store.reports.borrow()[0].name, "Renomeado");
    }

    #[test]
    fn test_customize_copies_template() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());

        builder.customize_template(TemplateKind::Economicidade).unwrap();
        builder.toggle_field("valor_estimado").unwrap();

        let draft = builder.draft().unwrap();
        assert_eq!(draft.kind, ReportKind::Custom);
        assert!(draft.id.is_none());
        assert!(!draft.fields.contains(&"valor_estimado".to_string()));

        let template = crate::templates::get_template(TemplateKind::Economicidade).unwrap();
        assert!(template.fields.contains(&"valor_estimado".to_string()));
    }

    #[test]
    fn test_toggle_keeps_column_order_in_sync() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup", "objeto", "ano"]);

        assert!(!builder.toggle_field("objeto").unwrap());
        let order = &builder.draft().unwrap().column_order;
        let pairs: Vec<(&str, usize)> = order.iter().map(|e| (e.field_id.as_str(), e.position)).collect();
        assert_eq!(pairs, vec![("nup", 0), ("ano", 1)]);

        assert!(matches!(builder.toggle_field("inexistente"), Err(BuilderError::Validation(_))));
    }

    #[test]
    fn test_repeated_drag_hover_settles() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup", "objeto", "ano"]);

        builder.start_drag(2).unwrap();
        builder.drag_over(0).unwrap();
        builder.drag_over(0).unwrap();
        builder.end_drag();

        let ids: Vec<&str> = builder.draft().unwrap().column_order.iter().map(|e| e.field_id.as_str()).collect();
        assert_eq!(ids, vec!["ano", "nup", "objeto"]);
    }

    #[test]
    fn test_filter_edits_require_editing() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());

        let err = builder.apply_filter("ano", FilterValue::Number(2024.0)).unwrap_err();
        assert!(matches!(err, BuilderError::InvalidTransition { state: "browsing", .. }));

        builder.start_blank().unwrap();
        builder.apply_filter("ano", FilterValue::Number(2024.0)).unwrap();
        assert!(builder.apply_filter("ano", FilterValue::text("dois mil")).is_err());
        assert_eq!(builder.draft().unwrap().filters.len(), 1);
    }

    #[test]
    fn test_export_does_not_refetch() {
        let backend = FakeBackend::with_rows(sample_rows());
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup", "valor_estimado"]);
        builder.set_name("Exportado").unwrap();
        builder.generate().unwrap();

        let dir = TempDir::new().unwrap();
        let paths = builder.export(&[ExportFormat::Csv, ExportFormat::Html], dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.exists()));
        assert_eq!(builder.state(), BuilderState::Previewing);
        assert_eq!(backend.calls.get(), 1);

        assert!(builder.print_document().unwrap().contains("window.print()"));
    }

    #[test]
    fn test_export_outside_preview_is_rejected() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            builder.export(&[ExportFormat::Json], dir.path()),
            Err(BuilderError::InvalidTransition { action: "export", .. })
        ));
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        editing_with_fields(&mut builder, &["nup"]);
        builder.set_name("Apagar").unwrap();
        let id = builder.save().unwrap().id.unwrap();
        builder.close_preview().unwrap();

        assert!(matches!(builder.confirm_delete(), Err(BuilderError::NothingToConfirm)));

        builder.request_delete(id).unwrap();
        assert_eq!(store.reports.borrow().len(), 1);
        builder.cancel_delete();
        assert!(matches!(builder.confirm_delete(), Err(BuilderError::NothingToConfirm)));

        builder.request_delete(id).unwrap();
        assert_eq!(builder.confirm_delete().unwrap(), id);
        assert!(store.reports.borrow().is_empty());
        assert!(builder.saved().is_empty());
        assert!(matches!(builder.request_delete(id), Err(BuilderError::UnknownReport(_))));
    }

    #[test]
    fn test_delete_only_from_browsing() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        builder.start_blank().unwrap();
        assert!(matches!(builder.request_delete(1), Err(BuilderError::InvalidTransition { .. })));
    }

    #[test]
    fn test_load_saved_lists_store() {
        let backend = FakeBackend::default();
        let store = MemoryStore::default();
        let mut def = ReportDefinition::blank();
        def.name = "Existente".into();
        def.fields = vec!["nup".into()];
        store.create(&def).unwrap();

        let mut builder = ReportBuilder::new(&backend, &store, SessionContext::default());
        assert_eq!(builder.load_saved().unwrap().len(), 1);
        builder.run_saved(1).unwrap();
        assert_eq!(builder.state(), BuilderState::Previewing);
        builder.close_preview().unwrap();
        assert_eq!(builder.state(), BuilderState::Browsing);
    }

    #[test]
    fn test_restricted_session_hides_responsible_column() {
        let backend = FakeBackend::with_rows(sample_rows());
        let store = MemoryStore::default();
        let session = SessionContext::new("Ana", UserRole::Responsavel);
        let mut builder = ReportBuilder::new(&backend, &store, session);

        builder.run_template(TemplateKind::PorResponsavel, vec![]).unwrap();
        let table = shown_table(&builder);
        assert!(table.columns.iter().all(|c| c.field_id != "responsavel_nome"));
        assert_eq!(table.responsible_banner.as_deref(), Some("Ana"));
    }
}
