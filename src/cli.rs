use crate::error::ConfigError;
use crate::render::ExportFormat;
use crate::types::TemplateKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "licitacao-relatorios")]
#[command(about = "Build, preview and export procurement process reports")]
#[command(version)]
pub struct CliArgs {
    /// Config file (default: $LICITACAO_CONFIG, ./relatorios.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backend API base URL (overrides config and $LICITACAO_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Name of the viewing user, shown in the responsible-party banner
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Viewer role: admin, gestor or responsavel
    #[arg(long, global = true)]
    pub role: Option<String>,

    /// Use a local JSON file as the saved-report store instead of the backend
    #[arg(long, global = true, value_name = "PATH")]
    pub store_file: Option<PathBuf>,

    /// Directory for exported files
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Override console width (default: auto-detect)
    #[arg(long, global = true, value_name = "COLUMNS")]
    pub console_width: Option<usize>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub plain: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the field catalog grouped by category
    Fields,

    /// List the built-in report templates
    Templates,

    /// List saved custom reports
    Saved,

    /// List the values of a filter option source
    Options {
        /// modalidades, situacoes, unidades or responsaveis
        source: String,
    },

    /// Generate a report, show the preview and optionally export it
    Generate(GenerateArgs),

    /// Save a custom report definition, then preview it
    Save(SaveArgs),

    /// Delete a saved report
    Delete {
        id: u64,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

/// Field selection, filters and column order shared by generate and save
#[derive(Args, Debug, Clone, Default)]
pub struct DraftArgs {
    /// Fields to include, in column order (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Filter as field=value; comma separated values filter by a list.
    /// Date ranges use <field>_start / <field>_end. Repeatable.
    #[arg(long = "filter", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,

    /// Column order override (comma separated field ids)
    #[arg(long, value_delimiter = ',')]
    pub order: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Generate a built-in template
    #[arg(long, conflicts_with_all = ["saved", "fields"])]
    pub template: Option<String>,

    /// Generate a saved report by id
    #[arg(long, conflicts_with = "fields")]
    pub saved: Option<u64>,

    /// Title for an ad-hoc report
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub draft: DraftArgs,

    /// Export formats: csv, json, md, html (pdf is an alias for html)
    #[arg(long, value_delimiter = ',')]
    pub export: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    /// Update this saved report instead of creating a new one
    #[arg(long)]
    pub id: Option<u64>,

    /// Start from a template's fields
    #[arg(long)]
    pub from_template: Option<String>,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Accent color (#rrggbb)
    #[arg(long)]
    pub color: Option<String>,

    #[command(flatten)]
    pub draft: DraftArgs,
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        CliArgs::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Generate(args) => {
                if args.template.is_none() && args.saved.is_none() && args.draft.fields.is_empty() {
                    return Err("Specify one of --template, --saved or --fields".to_string());
                }
                if let Some(ref t) = args.template {
                    parse_template(t)?;
                }
                if args.saved.is_some() && !args.draft.filters.is_empty() {
                    return Err("Saved reports carry their own filters; change them with `save --id`".to_string());
                }
                parse_export_formats(&args.export)?;
            }
            Command::Save(args) => {
                if let Some(ref t) = args.from_template {
                    parse_template(t)?;
                }
                if args.from_template.is_none() && args.id.is_none() && args.draft.fields.is_empty() {
                    return Err("Specify --fields or --from-template".to_string());
                }
            }
            Command::Fields | Command::Templates | Command::Saved | Command::Options { .. } | Command::Delete { .. } => {}
        }
        if self.console_width == Some(0) {
            return Err("--console-width must be positive".to_string());
        }
        Ok(())
    }
}

pub fn parse_template(name: &str) -> Result<TemplateKind, String> {
    TemplateKind::parse(name).ok_or_else(|| {
        let known: Vec<&str> = TemplateKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("Unknown template '{}' (expected one of: {})", name, known.join(", "))
    })
}

pub fn parse_export_formats(names: &[String]) -> Result<Vec<ExportFormat>, String> {
    names
        .iter()
        .map(|n| ExportFormat::parse(n).ok_or_else(|| format!("Unknown export format '{}'", n)))
        .collect()
}

/// Split a `--filter field=value` argument
pub fn parse_filter_arg(arg: &str) -> Result<(String, String), ConfigError> {
    match arg.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim().to_string(), value.trim().to_string())),
        _ => Err(ConfigError::InvalidFilterArg(arg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("licitacao-relatorios").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_generate_fields_and_filters() {
        let args = parse(&[
            "generate",
            "--fields",
            "nup,valor_estimado",
            "--filter",
            "modalidade_sigla=PE,CC",
            "--filter",
            "ano=2024",
            "--export",
            "csv,md",
        ]);
        let Command::Generate(ref g) = args.command else { panic!("expected generate") };
        assert_eq!(g.draft.fields, vec!["nup", "valor_estimado"]);
        assert_eq!(g.draft.filters, vec!["modalidade_sigla=PE,CC", "ano=2024"]);
        assert_eq!(parse_export_formats(&g.export).unwrap(), vec![ExportFormat::Csv, ExportFormat::Markdown]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_generate_needs_a_source() {
        assert!(parse(&["generate"]).validate().is_err());
        assert!(parse(&["generate", "--template", "prazos"]).validate().is_ok());
        assert!(parse(&["generate", "--template", "nenhum"]).validate().is_err());
    }

    #[test]
    fn test_template_conflicts_with_fields() {
        let result = CliArgs::try_parse_from(["licitacao-relatorios", "generate", "--template", "prazos", "--fields", "nup"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["saved", "--role", "gestor", "--user", "Ana"]);
        assert_eq!(args.role.as_deref(), Some("gestor"));
        assert_eq!(args.user.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_parse_filter_arg() {
        assert_eq!(parse_filter_arg("ano=2024").unwrap(), ("ano".to_string(), "2024".to_string()));
        assert_eq!(parse_filter_arg("objeto=").unwrap(), ("objeto".to_string(), String::new()));
        assert!(parse_filter_arg("=x").is_err());
        assert!(parse_filter_arg("sem_igual").is_err());
    }
}
