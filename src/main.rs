use licitacao_relatorios::api::ApiClient;
use licitacao_relatorios::builder::ReportBuilder;
use licitacao_relatorios::catalog;
use licitacao_relatorios::cli::{self, CliArgs, Command, DraftArgs, GenerateArgs, SaveArgs};
use licitacao_relatorios::config::{self, Settings, StoreKind};
use licitacao_relatorios::console_format::{self, TableWriter};
use licitacao_relatorios::error::BuilderError;
use licitacao_relatorios::fetch::{HttpBackend, OptionSource, ReportBackend};
use licitacao_relatorios::filter;
use licitacao_relatorios::render::{self, Column, PreviewView, ReportTable};
use licitacao_relatorios::store::{DefinitionStore, FileDefinitionStore, HttpDefinitionStore};
use licitacao_relatorios::templates;
use licitacao_relatorios::types::{FilterClause, ReportKind, SessionContext};
use licitacao_relatorios::ui;
use log::debug;
use std::env;
use std::error::Error;
use std::io;

type CliResult = Result<(), Box<dyn Error>>;

fn main() {
    env_logger::init();

    // Parse CLI arguments
    let args = CliArgs::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        ui::print_error(&e);
        std::process::exit(1);
    }

    // Set console width override if specified
    if let Some(width) = args.console_width {
        console_format::set_console_width(width);
    }

    let settings = match config::resolve(&args) {
        Ok(s) => s,
        Err(e) => {
            ui::print_error(&format!("Configuration error: {}", e));
            std::process::exit(1);
        }
    };
    let session = match settings.session_context() {
        Ok(s) => s,
        Err(e) => {
            ui::print_error(&format!("Configuration error: {}", e));
            std::process::exit(1);
        }
    };

    let client = ApiClient::new(&settings.api_base_url, settings.auth_token(|key| env::var(key).ok()));
    let backend = HttpBackend::new(client.clone());
    let store: Box<dyn DefinitionStore> = match settings.store.kind {
        StoreKind::Http => Box::new(HttpDefinitionStore::new(client)),
        StoreKind::File => Box::new(FileDefinitionStore::new(settings.store.file_path())),
    };
    debug!("Using API at {} with {:?} store", settings.api_base_url, settings.store.kind);

    let app = App { settings: &settings, use_colors: !args.plain, backend: &backend, store: store.as_ref() };
    if let Err(e) = app.run(&args.command, session) {
        ui::print_error(&e.to_string());
        std::process::exit(1);
    }
}

struct App<'a> {
    settings: &'a Settings,
    use_colors: bool,
    backend: &'a dyn ReportBackend,
    store: &'a dyn DefinitionStore,
}

impl<'a> App<'a> {
    fn run(&self, command: &Command, session: SessionContext) -> CliResult {
        match command {
            Command::Fields => self.list_fields(),
            Command::Templates => self.list_templates(),
            Command::Options { source } => self.list_options(source),
            Command::Saved => {
                let mut builder = ReportBuilder::new(self.backend, self.store, session);
                self.list_saved(&mut builder)
            }
            Command::Generate(args) => {
                let mut builder = ReportBuilder::new(self.backend, self.store, session);
                self.generate(&mut builder, args)
            }
            Command::Save(args) => {
                let mut builder = ReportBuilder::new(self.backend, self.store, session);
                self.save(&mut builder, args)
            }
            Command::Delete { id, yes } => {
                let mut builder = ReportBuilder::new(self.backend, self.store, session);
                self.delete(&mut builder, *id, *yes)
            }
        }
    }

    fn print_listing(&self, title: &str, headers: &[&str], rows: Vec<Vec<String>>) -> CliResult {
        let table = ReportTable {
            title: title.to_string(),
            description: String::new(),
            generated_at: String::new(),
            responsible_banner: None,
            columns: headers.iter().map(|h| Column { field_id: h.to_string(), title: h.to_string() }).collect(),
            rows,
            statistics: vec![],
        };
        ui::status(title);
        TableWriter::new(io::stdout(), self.use_colors).write_table(&table)?;
        Ok(())
    }

    fn list_fields(&self) -> CliResult {
        let mut rows = Vec::new();
        for category in catalog::categories() {
            for field in catalog::fields_in_category(category) {
                rows.push(vec![
                    field.id.to_string(),
                    field.display_name.to_string(),
                    field.semantic_type.as_str().to_string(),
                    category.to_string(),
                    field.description.to_string(),
                ]);
            }
        }
        self.print_listing("Campos disponíveis", &["Campo", "Nome", "Tipo", "Categoria", "Descrição"], rows)
    }

    fn list_templates(&self) -> CliResult {
        let rows = templates::list_templates()
            .iter()
            .map(|t| {
                let key = match t.kind {
                    ReportKind::Template(kind) => kind.as_str(),
                    ReportKind::Custom => "-",
                };
                vec![key.to_string(), t.name.clone(), t.category.clone(), t.fields.len().to_string(), t.description.clone()]
            })
            .collect();
        self.print_listing("Modelos de relatório", &["Modelo", "Nome", "Categoria", "Campos", "Descrição"], rows)
    }

    fn list_options(&self, source: &str) -> CliResult {
        let source = OptionSource::parse(source).ok_or_else(|| {
            let known: Vec<&str> = OptionSource::ALL.iter().map(|s| s.as_str()).collect();
            format!("Unknown option source '{}' (expected one of: {})", source, known.join(", "))
        })?;
        let options = self.backend.filter_options(source)?;
        let rows = options
            .into_iter()
            .map(|o| {
                let id = match o.id {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                vec![id, o.label]
            })
            .collect();
        self.print_listing(&format!("Opções de filtro: {} ({})", source.as_str(), source.field_id()), &["Id", "Nome"], rows)
    }

    fn list_saved(&self, builder: &mut ReportBuilder) -> CliResult {
        let rows = builder
            .load_saved()?
            .iter()
            .map(|d| {
                vec![
                    d.id.map(|id| id.to_string()).unwrap_or_default(),
                    d.name.clone(),
                    d.category.clone(),
                    d.fields.len().to_string(),
                    d.updated_at.map(|t| t.format("%d/%m/%Y %H:%M").to_string()).unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();
        self.print_listing("Relatórios salvos", &["Id", "Nome", "Categoria", "Campos", "Atualizado"], rows)
    }

    /// Show the builder's preview; a failed fetch shows the error view
    fn show_preview(&self, builder: &mut ReportBuilder, outcome: Result<(), BuilderError>) -> CliResult {
        match outcome {
            Ok(()) => {
                if let Some(view) = builder.preview() {
                    render::print_preview(view, self.use_colors);
                }
                Ok(())
            }
            Err(BuilderError::Fetch(e)) => {
                let message = builder.take_notification().unwrap_or_else(|| e.to_string());
                render::print_preview(&PreviewView::Error(message), self.use_colors);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn generate(&self, builder: &mut ReportBuilder, args: &GenerateArgs) -> CliResult {
        let outcome = if let Some(ref name) = args.template {
            let kind = cli::parse_template(name)?;
            let filters = template_filters(&args.draft)?;
            builder.run_template(kind, filters).map(|_| ())
        } else if let Some(id) = args.saved {
            builder.load_saved()?;
            builder.run_saved(id).map(|_| ())
        } else {
            builder.start_blank()?;
            builder.set_name(args.name.as_deref().unwrap_or("Relatório personalizado"))?;
            apply_draft(builder, &args.draft)?;
            builder.generate().map(|_| ())
        };
        self.show_preview(builder, outcome)?;

        let formats = cli::parse_export_formats(&args.export)?;
        if !formats.is_empty() {
            for path in builder.export(&formats, &self.settings.output_dir)? {
                ui::status(&format!("Exportado: {}", path.display()));
            }
        }
        Ok(())
    }

    fn save(&self, builder: &mut ReportBuilder, args: &SaveArgs) -> CliResult {
        if let Some(id) = args.id {
            builder.load_saved()?;
            builder.edit_saved(id)?;
        } else if let Some(ref name) = args.from_template {
            builder.customize_template(cli::parse_template(name)?)?;
        } else {
            builder.start_blank()?;
        }

        builder.set_name(&args.name)?;
        if let Some(ref description) = args.description {
            builder.set_description(description)?;
        }
        if let Some(ref category) = args.category {
            builder.set_category(category)?;
        }
        if let Some(ref color) = args.color {
            builder.set_color(color)?;
        }
        apply_draft(builder, &args.draft)?;

        let saved = builder.save()?;
        ui::status(&format!("Relatório \"{}\" salvo (id {})", saved.name, saved.id.unwrap_or_default()));

        if let Some(notice) = builder.take_notification() {
            ui::print_notice(&notice);
        } else if let Some(view) = builder.preview() {
            render::print_preview(view, self.use_colors);
        }
        Ok(())
    }

    fn delete(&self, builder: &mut ReportBuilder, id: u64, yes: bool) -> CliResult {
        builder.load_saved()?;
        builder.request_delete(id)?;

        let name = builder.saved().iter().find(|d| d.id == Some(id)).map(|d| d.name.clone()).unwrap_or_default();
        if yes || ui::confirm(&format!("Excluir o relatório \"{}\"?", name)) {
            builder.confirm_delete()?;
            ui::status(&format!("Relatório {} excluído", id));
        } else {
            builder.cancel_delete();
            ui::status("Exclusão cancelada");
        }
        Ok(())
    }
}

/// Apply field selection, column order and filters to the builder's draft
fn apply_draft(builder: &mut ReportBuilder, args: &DraftArgs) -> CliResult {
    if !args.fields.is_empty() {
        let current: Vec<String> = builder.draft().map(|d| d.fields.clone()).unwrap_or_default();
        for field in current.iter().filter(|f| !args.fields.contains(f)) {
            builder.toggle_field(field)?;
        }
        for field in args.fields.iter().filter(|f| !current.contains(f)) {
            builder.toggle_field(field)?;
        }
    }

    let order = if args.order.is_empty() { &args.fields } else { &args.order };
    for (target, field_id) in order.iter().enumerate() {
        let from = builder.draft().and_then(|d| d.column_order.iter().position(|e| &e.field_id == field_id));
        if let Some(from) = from {
            builder.move_column(from, target)?;
        }
    }

    for raw in &args.filters {
        let (field_id, value) = cli::parse_filter_arg(raw)?;
        builder.apply_filter(&field_id, filter::value_from_input(&field_id, &value)?)?;
    }
    Ok(())
}

/// Filters for a template run, built the same way the editor builds them
fn template_filters(args: &DraftArgs) -> Result<Vec<FilterClause>, Box<dyn Error>> {
    let mut clauses = Vec::new();
    for raw in &args.filters {
        let (field_id, value) = cli::parse_filter_arg(raw)?;
        clauses = filter::add_or_replace(&clauses, &field_id, filter::value_from_input(&field_id, &value)?)?;
    }
    Ok(clauses)
}
