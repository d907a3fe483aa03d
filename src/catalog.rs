/// Field catalog
///
/// Static registry of every reportable field of a procurement process.
/// Lookups signal an unknown id as `None`: callers routinely probe for
/// optional fields.
use crate::types::{FieldDescriptor, SemanticType};
use lazy_static::lazy_static;
use std::collections::HashMap;

const fn field(
    id: &'static str,
    display_name: &'static str,
    semantic_type: SemanticType,
    category: &'static str,
    description: &'static str,
) -> FieldDescriptor {
    FieldDescriptor { id, display_name, semantic_type, category, description }
}

static FIELDS: &[FieldDescriptor] = &[
    // Identificação
    field("nup", "NUP", SemanticType::Text, "Identificação", "Número único de protocolo do processo"),
    field("numero_processo", "Nº do Processo", SemanticType::Text, "Identificação", "Número interno do processo licitatório"),
    field("objeto", "Objeto", SemanticType::Text, "Identificação", "Descrição do objeto da contratação"),
    field("ano", "Ano", SemanticType::Number, "Identificação", "Ano de referência do processo"),
    // Classificação
    field("modalidade_sigla", "Modalidade (sigla)", SemanticType::Enumerated, "Classificação", "Sigla da modalidade de licitação"),
    field("modalidade_nome", "Modalidade", SemanticType::Enumerated, "Classificação", "Nome da modalidade de licitação"),
    field("situacao_nome", "Situação", SemanticType::Enumerated, "Classificação", "Situação atual do processo"),
    field("situacao_finalizadora", "Situação finalizadora", SemanticType::Boolean, "Classificação", "Indica se a situação encerra o processo"),
    field("prioridade", "Prioridade", SemanticType::Enumerated, "Classificação", "Nível de prioridade atribuído"),
    field("registro_precos", "Registro de Preços", SemanticType::Boolean, "Classificação", "Processo para sistema de registro de preços"),
    field("item_pca", "Item do PCA", SemanticType::Boolean, "Classificação", "Consta no plano de contratações anual"),
    // Organização
    field("unidade_nome", "Unidade", SemanticType::Enumerated, "Organização", "Unidade requisitante"),
    field("responsavel_nome", "Responsável", SemanticType::Enumerated, "Organização", "Responsável pela condução do processo"),
    // Datas
    field("data_entrada", "Data de Entrada", SemanticType::Date, "Datas", "Data de entrada do processo no setor"),
    field("data_sessao", "Data da Sessão", SemanticType::Date, "Datas", "Data da sessão pública"),
    field("data_situacao", "Data da Situação", SemanticType::Date, "Datas", "Data da última mudança de situação"),
    field("data_tce_1", "Envio TCE (1)", SemanticType::Date, "Datas", "Primeira remessa ao tribunal de contas"),
    field("data_tce_2", "Envio TCE (2)", SemanticType::Date, "Datas", "Segunda remessa ao tribunal de contas"),
    // Valores
    field("valor_estimado", "Valor Estimado", SemanticType::Number, "Valores", "Valor estimado da contratação"),
    field("valor_realizado", "Valor Realizado", SemanticType::Number, "Valores", "Valor efetivamente homologado"),
    field("desagio", "Deságio", SemanticType::Number, "Valores", "Diferença entre estimado e realizado"),
    field("percentual_reducao", "% de Redução", SemanticType::Number, "Valores", "Redução percentual sobre o estimado"),
    // Prazos
    field("dias_tramitacao", "Dias em Tramitação", SemanticType::Number, "Prazos", "Dias desde a entrada do processo"),
    field("dias_situacao", "Dias na Situação", SemanticType::Number, "Prazos", "Dias desde a última mudança de situação"),
    // Outros
    field("observacoes", "Observações", SemanticType::Text, "Outros", "Anotações livres sobre o processo"),
];

lazy_static! {
    static ref FIELD_INDEX: HashMap<&'static str, &'static FieldDescriptor> =
        FIELDS.iter().map(|f| (f.id, f)).collect();
}

/// All reportable fields, in catalog order
pub fn list_fields() -> &'static [FieldDescriptor] {
    FIELDS
}

/// Look up a field by id
pub fn get_field(id: &str) -> Option<&'static FieldDescriptor> {
    FIELD_INDEX.get(id).copied()
}

/// Distinct categories in catalog order
pub fn categories() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for f in FIELDS {
        if !seen.contains(&f.category) {
            seen.push(f.category);
        }
    }
    seen
}

/// Fields belonging to one category
pub fn fields_in_category(category: &str) -> impl Iterator<Item = &'static FieldDescriptor> + '_ {
    FIELDS.iter().filter(move |f| f.category == category)
}
