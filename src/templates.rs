/// Template registry
///
/// Fixed catalogue of built-in report definitions. Templates are never
/// mutated; "customize" copies a template's shape into a fresh draft.
use crate::columns;
use crate::types::{ReportDefinition, ReportKind, TemplateKind};
use lazy_static::lazy_static;

struct TemplateSpec {
    kind: TemplateKind,
    name: &'static str,
    description: &'static str,
    category: &'static str,
    color: &'static str,
    fields: &'static [&'static str],
}

const SPECS: &[TemplateSpec] = &[
    TemplateSpec {
        kind: TemplateKind::PorModalidade,
        name: "Processos por Modalidade",
        description: "Processos agrupados por modalidade de licitação, com valores estimados e realizados",
        category: "Gerencial",
        color: "#2563eb",
        fields: &["modalidade_nome", "nup", "objeto", "situacao_nome", "valor_estimado", "valor_realizado"],
    },
    TemplateSpec {
        kind: TemplateKind::PorSituacao,
        name: "Processos por Situação",
        description: "Distribuição dos processos pela situação atual e tempo na situação",
        category: "Gerencial",
        color: "#16a34a",
        fields: &["situacao_nome", "nup", "objeto", "unidade_nome", "data_situacao", "dias_situacao"],
    },
    TemplateSpec {
        kind: TemplateKind::PorUnidade,
        name: "Processos por Unidade",
        description: "Demandas de cada unidade requisitante",
        category: "Gerencial",
        color: "#9333ea",
        fields: &["unidade_nome", "nup", "objeto", "modalidade_sigla", "valor_estimado"],
    },
    TemplateSpec {
        kind: TemplateKind::PorResponsavel,
        name: "Processos por Responsável",
        description: "Carteira de processos de cada responsável",
        category: "Operacional",
        color: "#ea580c",
        fields: &["responsavel_nome", "nup", "objeto", "situacao_nome", "data_entrada"],
    },
    TemplateSpec {
        kind: TemplateKind::Economicidade,
        name: "Economicidade",
        description: "Comparativo entre valor estimado e realizado, com deságio e redução percentual",
        category: "Financeiro",
        color: "#0d9488",
        fields: &["nup", "objeto", "valor_estimado", "valor_realizado", "desagio", "percentual_reducao"],
    },
    TemplateSpec {
        kind: TemplateKind::Prazos,
        name: "Prazos de Tramitação",
        description: "Tempo de tramitação desde a entrada até a sessão pública",
        category: "Operacional",
        color: "#dc2626",
        fields: &["nup", "objeto", "situacao_nome", "data_entrada", "data_sessao", "dias_tramitacao"],
    },
];

lazy_static! {
    static ref TEMPLATES: Vec<ReportDefinition> = SPECS
        .iter()
        .map(|spec| ReportDefinition {
            name: spec.name.to_string(),
            description: spec.description.to_string(),
            category: spec.category.to_string(),
            color: spec.color.to_string(),
            kind: ReportKind::Template(spec.kind),
            fields: spec.fields.iter().map(|f| f.to_string()).collect(),
            ..ReportDefinition::blank()
        })
        .collect();
}

/// All built-in templates
pub fn list_templates() -> &'static [ReportDefinition] {
    &TEMPLATES
}

/// The built-in definition for a template kind
pub fn get_template(kind: TemplateKind) -> Option<&'static ReportDefinition> {
    TEMPLATES.iter().find(|t| t.kind == ReportKind::Template(kind))
}

/// Backend path serving a template's rows and statistics
pub fn endpoint(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::PorModalidade => "relatorios/processos-por-modalidade",
        TemplateKind::PorSituacao => "relatorios/processos-por-situacao",
        TemplateKind::PorUnidade => "relatorios/processos-por-unidade",
        TemplateKind::PorResponsavel => "relatorios/processos-por-responsavel",
        TemplateKind::Economicidade => "relatorios/economicidade",
        TemplateKind::Prazos => "relatorios/prazos",
    }
}

/// Copy a template's field selection and look into an editable custom draft.
pub fn customize(kind: TemplateKind) -> Option<ReportDefinition> {
    let template = get_template(kind)?;
    let mut draft = ReportDefinition::blank();
    draft.description = template.description.clone();
    draft.color = template.color.clone();
    draft.fields = template.fields.clone();
    draft.column_order = columns::from_field_selection(&draft.fields);
    Some(draft)
}
