//! Report builder state machine.
//!
//! ```text
//! Browsing ──start/edit/customize──▶ Editing ──generate──▶ Previewing ──export──▶ Exporting
//!    ▲                                  │  ▲                    │  ▲                  │
//!    │                                  │  └──close preview─────┘  └──────────────────┘
//!    │                                save
//!    │                                  ▼
//!    └──────close preview─── Previewing ◀── Saving
//! ```
//!
//! Generation is split into [`ReportBuilder::request_generation`] and
//! [`ReportBuilder::complete_generation`] so a caller can run the fetch
//! elsewhere; every request bumps a generation counter and a completion whose
//! ticket is no longer current is dropped. [`ReportBuilder::generate`] runs
//! both halves inline.

use crate::catalog;
use crate::columns::{self, DragSession};
use crate::error::{BuilderError, FetchError, ValidationError};
use crate::fetch::{self, ReportBackend};
use crate::filter;
use crate::render::{self, ExportFormat, PreviewView};
use crate::store::{self, DefinitionStore};
use crate::templates;
use crate::types::{FilterClause, FilterValue, GeneratedReport, ReportDefinition, SessionContext, TemplateKind};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Browsing,
    Editing,
    Previewing,
    Saving,
    Exporting,
}

impl BuilderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuilderState::Browsing => "browsing",
            BuilderState::Editing => "editing",
            BuilderState::Previewing => "previewing",
            BuilderState::Saving => "saving",
            BuilderState::Exporting => "exporting",
        }
    }
}

/// Handle for one in-flight generation
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    generation: u64,
    definition: ReportDefinition,
    /// State to fall back to if the fetch fails
    origin: BuilderState,
}

impl GenerationTicket {
    pub fn definition(&self) -> &ReportDefinition {
        &self.definition
    }
}

pub struct ReportBuilder<'a> {
    backend: &'a dyn ReportBackend,
    store: &'a dyn DefinitionStore,
    session: SessionContext,

    state: BuilderState,
    saved: Vec<ReportDefinition>,
    draft: Option<ReportDefinition>,
    report: Option<GeneratedReport>,
    preview: Option<PreviewView>,
    /// View shown before the pending fetch started
    previous_preview: Option<PreviewView>,
    drag: Option<DragSession>,

    loading: bool,
    generation: u64,
    /// Where closing the preview leads
    return_to: BuilderState,
    pending_delete: Option<u64>,
    notification: Option<String>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(backend: &'a dyn ReportBackend, store: &'a dyn DefinitionStore, session: SessionContext) -> Self {
        Self {
            backend,
            store,
            session,
            state: BuilderState::Browsing,
            saved: Vec::new(),
            draft: None,
            report: None,
            preview: None,
            previous_preview: None,
            drag: None,
            loading: false,
            generation: 0,
            return_to: BuilderState::Browsing,
            pending_delete: None,
            notification: None,
        }
    }

    // Accessors

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn saved(&self) -> &[ReportDefinition] {
        &self.saved
    }

    pub fn draft(&self) -> Option<&ReportDefinition> {
        self.draft.as_ref()
    }

    pub fn report(&self) -> Option<&GeneratedReport> {
        self.report.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewView> {
        self.preview.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn pending_delete(&self) -> Option<u64> {
        self.pending_delete
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    /// Dismiss the current notification
    pub fn take_notification(&mut self) -> Option<String> {
        self.notification.take()
    }

    fn require(&self, action: &'static str, allowed: &[BuilderState]) -> Result<(), BuilderError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(BuilderError::InvalidTransition { action, state: self.state.as_str() })
        }
    }

    fn notify(&mut self, message: String) {
        warn!("{}", message);
        self.notification = Some(message);
    }

    fn draft_mut(&mut self, action: &'static str) -> Result<&mut ReportDefinition, BuilderError> {
        self.require(action, &[BuilderState::Editing])?;
        let state = self.state.as_str();
        self.draft.as_mut().ok_or(BuilderError::InvalidTransition { action, state })
    }

    // Browsing

    /// Refresh the saved list from the store
    pub fn load_saved(&mut self) -> Result<&[ReportDefinition], BuilderError> {
        self.require("load saved reports", &[BuilderState::Browsing])?;
        match self.store.list() {
            Ok(list) => {
                debug!("loaded {} saved reports", list.len());
                self.saved = list;
                Ok(&self.saved)
            }
            Err(e) => {
                self.notify(format!("Erro ao carregar relatórios salvos: {}", e));
                Err(e.into())
            }
        }
    }

    fn enter_editing(&mut self, mut draft: ReportDefinition) {
        if draft.column_order.is_empty() {
            draft.column_order = columns::from_field_selection(&draft.fields);
        }
        self.draft = Some(draft);
        self.report = None;
        self.preview = None;
        self.drag = None;
        self.state = BuilderState::Editing;
    }

    /// Start a new empty custom report
    pub fn start_blank(&mut self) -> Result<(), BuilderError> {
        self.require("create a report", &[BuilderState::Browsing])?;
        self.enter_editing(ReportDefinition::blank());
        Ok(())
    }

    /// Edit a saved definition, keeping its id
    pub fn edit_saved(&mut self, id: u64) -> Result<(), BuilderError> {
        self.require("edit a report", &[BuilderState::Browsing])?;
        let definition = self.saved_definition(id)?.clone();
        self.enter_editing(definition);
        Ok(())
    }

    /// Copy a template into a new editable draft
    pub fn customize_template(&mut self, kind: TemplateKind) -> Result<(), BuilderError> {
        self.require("customize a template", &[BuilderState::Browsing])?;
        let draft = templates::customize(kind).ok_or(ValidationError::UnknownField(kind.as_str().to_string()))?;
        self.enter_editing(draft);
        Ok(())
    }

    /// Generate a template straight from the catalogue, optionally narrowed
    /// by filters. The registered template itself is never modified.
    pub fn open_template(
        &mut self,
        kind: TemplateKind,
        filters: Vec<FilterClause>,
    ) -> Result<GenerationTicket, BuilderError> {
        self.require("open a template", &[BuilderState::Browsing])?;
        let mut definition =
            templates::get_template(kind).ok_or(ValidationError::UnknownField(kind.as_str().to_string()))?.clone();
        definition.filters = filters;
        self.return_to = BuilderState::Browsing;
        self.begin_generation(definition, BuilderState::Browsing)
    }

    /// Generate a saved definition without editing it
    pub fn open_saved(&mut self, id: u64) -> Result<GenerationTicket, BuilderError> {
        self.require("open a report", &[BuilderState::Browsing])?;
        let definition = self.saved_definition(id)?.clone();
        self.return_to = BuilderState::Browsing;
        self.begin_generation(definition, BuilderState::Browsing)
    }

    fn saved_definition(&self, id: u64) -> Result<&ReportDefinition, BuilderError> {
        self.saved.iter().find(|d| d.id == Some(id)).ok_or(BuilderError::UnknownReport(id))
    }

    // Editing

    pub fn set_name(&mut self, name: &str) -> Result<(), BuilderError> {
        self.draft_mut("rename")?.name = name.to_string();
        Ok(())
    }

    pub fn set_description(&mut self, description: &str) -> Result<(), BuilderError> {
        self.draft_mut("edit the description")?.description = description.to_string();
        Ok(())
    }

    pub fn set_category(&mut self, category: &str) -> Result<(), BuilderError> {
        self.draft_mut("edit the category")?.category = category.to_string();
        Ok(())
    }

    pub fn set_color(&mut self, color: &str) -> Result<(), BuilderError> {
        self.draft_mut("edit the color")?.color = color.to_string();
        Ok(())
    }

    /// Select or deselect a field; the column order follows the selection.
    /// Returns whether the field is now selected.
    pub fn toggle_field(&mut self, field_id: &str) -> Result<bool, BuilderError> {
        let draft = self.draft_mut("select fields")?;
        if catalog::get_field(field_id).is_none() {
            return Err(ValidationError::UnknownField(field_id.to_string()).into());
        }

        if let Some(pos) = draft.fields.iter().position(|f| f == field_id) {
            draft.fields.remove(pos);
            draft.column_order = columns::remove(&draft.column_order, field_id);
            Ok(false)
        } else {
            draft.fields.push(field_id.to_string());
            draft.column_order = columns::append(&draft.column_order, field_id);
            Ok(true)
        }
    }

    /// Add or replace the filter on a field. Placeholder values are kept but
    /// drop out of the effective query.
    pub fn apply_filter(&mut self, field_id: &str, value: FilterValue) -> Result<(), BuilderError> {
        let draft = self.draft_mut("filter")?;
        draft.filters = filter::add_or_replace(&draft.filters, field_id, value)?;
        Ok(())
    }

    pub fn clear_filter(&mut self, field_id: &str) -> Result<(), BuilderError> {
        let draft = self.draft_mut("filter")?;
        draft.filters = filter::remove_field(&draft.filters, field_id);
        Ok(())
    }

    pub fn move_column(&mut self, from: usize, to: usize) -> Result<(), BuilderError> {
        let draft = self.draft_mut("reorder columns")?;
        draft.column_order = columns::move_entry(&draft.column_order, from, to);
        Ok(())
    }

    /// Begin dragging the column at `index`
    pub fn start_drag(&mut self, index: usize) -> Result<(), BuilderError> {
        let drag = DragSession::start(&self.draft_mut("reorder columns")?.column_order, index);
        self.drag = drag;
        Ok(())
    }

    /// Dragged column hovers over `target`; repeated hovers are no-ops
    pub fn drag_over(&mut self, target: usize) -> Result<(), BuilderError> {
        let Some(drag) = self.drag.clone() else {
            return Ok(());
        };
        let draft = self.draft_mut("reorder columns")?;
        draft.column_order = drag.hover(&draft.column_order, target);
        Ok(())
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    // Generation

    /// Start generating the draft. Fails fast on validation; while a fetch
    /// is pending further requests are refused.
    pub fn request_generation(&mut self) -> Result<GenerationTicket, BuilderError> {
        self.require("generate", &[BuilderState::Editing, BuilderState::Previewing])?;
        let definition = self.draft.clone().ok_or(BuilderError::InvalidTransition {
            action: "generate",
            state: self.state.as_str(),
        })?;
        if self.state == BuilderState::Editing {
            self.return_to = BuilderState::Editing;
        }
        let origin = self.state;
        self.begin_generation(definition, origin)
    }

    fn begin_generation(
        &mut self,
        definition: ReportDefinition,
        origin: BuilderState,
    ) -> Result<GenerationTicket, BuilderError> {
        if self.loading {
            return Err(BuilderError::FetchInProgress);
        }
        if definition.fields.is_empty() {
            return Err(ValidationError::EmptyFieldSelection.into());
        }
        filter::validate_clauses(&definition.filters)?;

        self.generation += 1;
        self.loading = true;
        self.previous_preview = self.preview.replace(PreviewView::Loading);
        debug!("generation {} requested for '{}'", self.generation, definition.name);

        Ok(GenerationTicket { generation: self.generation, definition, origin })
    }

    /// Apply a fetch result. Returns `Ok(false)` when the ticket is stale
    /// and the result was discarded.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<GeneratedReport, FetchError>,
    ) -> Result<bool, BuilderError> {
        if !self.loading || ticket.generation != self.generation {
            debug!("discarding stale result for generation {} (current {})", ticket.generation, self.generation);
            return Ok(false);
        }
        self.loading = false;
        let previous = self.previous_preview.take();

        match result {
            Ok(report) => {
                self.preview = Some(PreviewView::from_report(&report, &self.session));
                self.report = Some(report);
                self.state = BuilderState::Previewing;
                Ok(true)
            }
            Err(e) => {
                // a failed refresh keeps the last good preview on screen
                match previous {
                    Some(view) if ticket.origin == BuilderState::Previewing && self.report.is_some() => {
                        self.preview = Some(view);
                    }
                    _ => {
                        self.preview = None;
                        self.report = None;
                    }
                }
                self.state = ticket.origin;
                self.notify(format!("Erro ao carregar dados: {}", e));
                Err(e.into())
            }
        }
    }

    /// Request, fetch and complete in one go
    pub fn generate(&mut self) -> Result<&PreviewView, BuilderError> {
        let ticket = self.request_generation()?;
        self.run(ticket)
    }

    fn run(&mut self, ticket: GenerationTicket) -> Result<&PreviewView, BuilderError> {
        let result = fetch::fetch(ticket.definition(), self.backend);
        self.complete_generation(ticket, result)?;
        self.preview.as_ref().ok_or(BuilderError::NothingToConfirm)
    }

    /// Generate a template inline
    pub fn run_template(&mut self, kind: TemplateKind, filters: Vec<FilterClause>) -> Result<&PreviewView, BuilderError> {
        let ticket = self.open_template(kind, filters)?;
        self.run(ticket)
    }

    /// Generate a saved report inline
    pub fn run_saved(&mut self, id: u64) -> Result<&PreviewView, BuilderError> {
        let ticket = self.open_saved(id)?;
        self.run(ticket)
    }

    /// Dismiss the preview. A pending fetch is abandoned and its result will
    /// be discarded on arrival.
    pub fn close_preview(&mut self) -> Result<(), BuilderError> {
        if self.loading {
            self.abandon_fetch();
        } else {
            self.require("close the preview", &[BuilderState::Previewing])?;
        }
        self.preview = None;
        self.previous_preview = None;
        self.report = None;
        self.state = self.return_to;
        if self.state == BuilderState::Browsing {
            self.draft = None;
        }
        Ok(())
    }

    /// Leave the editor, dropping the draft
    pub fn cancel(&mut self) -> Result<(), BuilderError> {
        self.require("cancel", &[BuilderState::Editing, BuilderState::Previewing])?;
        if self.loading {
            self.abandon_fetch();
        }
        self.draft = None;
        self.report = None;
        self.preview = None;
        self.previous_preview = None;
        self.drag = None;
        self.state = BuilderState::Browsing;
        self.return_to = BuilderState::Browsing;
        Ok(())
    }

    fn abandon_fetch(&mut self) {
        debug!("abandoning generation {}", self.generation);
        self.generation += 1;
        self.loading = false;
    }

    // Saving

    /// Persist the draft, then immediately preview the saved definition.
    ///
    /// On a store failure the builder stays in Editing with the draft intact.
    pub fn save(&mut self) -> Result<ReportDefinition, BuilderError> {
        self.require("save", &[BuilderState::Editing])?;
        let mut definition = self.draft.clone().ok_or(BuilderError::NothingToConfirm)?;
        definition.name = definition.name.trim().to_string();
        definition.column_order = columns::normalize(&definition.column_order);
        store::validate_shape(&definition)?;

        if self.loading {
            self.abandon_fetch();
        }
        self.state = BuilderState::Saving;
        let result = match definition.id {
            Some(id) => self.store.update(id, &definition),
            None => self.store.create(&definition),
        };

        let saved = match result {
            Ok(saved) => saved,
            Err(e) => {
                self.state = BuilderState::Editing;
                self.notify(format!("Erro ao salvar relatório: {}", e));
                return Err(e.into());
            }
        };
        info!("report '{}' saved with id {:?}", saved.name, saved.id);

        match self.saved.iter_mut().find(|d| d.id.is_some() && d.id == saved.id) {
            Some(slot) => *slot = saved.clone(),
            None => self.saved.push(saved.clone()),
        }
        self.draft = Some(saved.clone());
        self.return_to = BuilderState::Browsing;

        // the save stands even when its preview cannot be produced
        match self.begin_generation(saved.clone(), BuilderState::Editing) {
            Ok(ticket) => {
                if let Err(e) = self.run(ticket) {
                    debug!("post-save generation failed: {}", e);
                }
            }
            Err(e) => {
                self.state = BuilderState::Editing;
                self.notify(format!("Relatório salvo, mas não foi possível gerá-lo: {}", e));
            }
        }
        Ok(saved)
    }

    // Previewing

    /// Write the current preview in each format. Does not re-fetch and
    /// leaves the builder in Previewing.
    pub fn export(&mut self, formats: &[ExportFormat], dir: &Path) -> Result<Vec<PathBuf>, BuilderError> {
        self.require("export", &[BuilderState::Previewing])?;
        let Some(report) = self.report.as_ref() else {
            return Err(BuilderError::InvalidTransition { action: "export", state: self.state.as_str() });
        };
        let table = match self.preview.as_ref().and_then(PreviewView::table) {
            Some(table) => table.clone(),
            None => render::build_table(report, &self.session),
        };
        let accent = render::safe_color(&report.definition.color).to_string();

        self.state = BuilderState::Exporting;
        let mut written = Vec::new();
        let mut outcome = Ok(());
        for format in formats {
            match render::export_report(report, &table, *format, &accent, dir) {
                Ok(path) => written.push(path),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        self.state = BuilderState::Previewing;

        match outcome {
            Ok(()) => Ok(written),
            Err(e) => {
                self.notify(format!("Erro ao exportar relatório: {}", e));
                Err(e.into())
            }
        }
    }

    /// Printable HTML for the current preview
    pub fn print_document(&self) -> Result<String, BuilderError> {
        self.require("print", &[BuilderState::Previewing])?;
        let report = self
            .report
            .as_ref()
            .ok_or(BuilderError::InvalidTransition { action: "print", state: self.state.as_str() })?;
        Ok(render::render_print_document(report, &self.session))
    }

    // Deleting

    /// Ask to delete a saved report; nothing happens until confirmed
    pub fn request_delete(&mut self, id: u64) -> Result<(), BuilderError> {
        self.require("delete", &[BuilderState::Browsing])?;
        self.saved_definition(id)?;
        self.pending_delete = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn confirm_delete(&mut self) -> Result<u64, BuilderError> {
        self.require("delete", &[BuilderState::Browsing])?;
        let id = self.pending_delete.take().ok_or(BuilderError::NothingToConfirm)?;
        if let Err(e) = self.store.delete(id) {
            self.notify(format!("Erro ao excluir relatório: {}", e));
            return Err(e.into());
        }
        self.saved.retain(|d| d.id != Some(id));
        info!("deleted saved report {}", id);
        Ok(id)
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
