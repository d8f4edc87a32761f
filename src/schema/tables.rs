//! Sheet contracts and warehouse table definitions for the Ciranda Kids star schema

use super::types::*;

// =============================================================================
// Source sheet contracts
// =============================================================================

pub static PRODUTO: SheetContract = SheetContract {
    name: "produto",
    required: &[
        "cod_fornecedor",
        "cod_produto",
        "nome_produto",
        "categoria",
        "tamanho",
        "cor",
        "preco_custo",
        "preco_venda",
    ],
};

pub static ESTOQUE: SheetContract = SheetContract {
    name: "estoque",
    required: &[
        "cod_produto",
        "quantidade",
        "data_entrada",
        "data_saida",
        "local_estoque",
    ],
};

pub static VENDA: SheetContract = SheetContract {
    name: "venda",
    required: &["cod_produto", "data_venda", "quantidade", "valor_total"],
};

pub static FORNECEDOR: SheetContract = SheetContract {
    name: "fornecedor",
    required: &[
        "cod_fornecedor",
        "nome_fornecedor",
        "telefone",
        "email",
        "cod_ibge_cidade",
    ],
};

/// Every sheet the extraction stage recognizes
pub static CONTRACTS: &[&SheetContract] = &[&PRODUTO, &ESTOQUE, &VENDA, &FORNECEDOR];

// =============================================================================
// Dimensions
// =============================================================================

pub static DIM_FORNECEDOR: TableSchema = TableSchema {
    name: "dim_fornecedor",
    source_table: "fornecedor",
    surrogate_key: "id_fornecedor",
    columns: &[
        Column::required("cod_fornecedor", ColumnType::Text),
        Column::new("nome_fornecedor", ColumnType::Text),
        Column::new("telefone", ColumnType::Text),
        Column::new("email", ColumnType::Text),
        // City codes live in an external registry, so no FK here
        Column::new("cod_ibge_cidade", ColumnType::Integer),
    ],
    foreign_keys: &[],
    natural_key: &["cod_fornecedor"],
    conflict: ConflictPolicy::Overwrite,
};

pub static DIM_PRODUTO: TableSchema = TableSchema {
    name: "dim_produto",
    source_table: "produto",
    surrogate_key: "id_produto",
    columns: &[
        Column::required("cod_produto", ColumnType::Text),
        Column::new("nome_produto", ColumnType::Text),
        Column::new("categoria", ColumnType::Text),
        Column::new("tamanho", ColumnType::Text),
        Column::new("cor", ColumnType::Text),
        Column::new("preco_custo", ColumnType::Real),
        Column::new("preco_venda", ColumnType::Real),
        Column::new("cod_fornecedor", ColumnType::Text),
    ],
    foreign_keys: &[ForeignKey::new("cod_fornecedor", "dim_fornecedor")],
    natural_key: &["cod_produto"],
    conflict: ConflictPolicy::Overwrite,
};

// =============================================================================
// Facts
// =============================================================================

pub static FATO_ESTOQUE: TableSchema = TableSchema {
    name: "fato_estoque",
    source_table: "estoque",
    surrogate_key: "id_estoque",
    columns: &[
        Column::required("cod_produto", ColumnType::Text),
        Column::new("quantidade", ColumnType::Integer),
        Column::required("data_entrada", ColumnType::Date),
        Column::new("data_saida", ColumnType::Date),
        Column::required("local_estoque", ColumnType::Text),
    ],
    foreign_keys: &[ForeignKey::new("cod_produto", "dim_produto")],
    natural_key: &["cod_produto", "data_entrada", "local_estoque"],
    conflict: ConflictPolicy::Ignore,
};

pub static FATO_VENDA: TableSchema = TableSchema {
    name: "fato_venda",
    source_table: "venda",
    surrogate_key: "id_venda",
    columns: &[
        Column::required("cod_produto", ColumnType::Text),
        Column::required("data_venda", ColumnType::Date),
        Column::new("quantidade", ColumnType::Integer),
        Column::new("valor_total", ColumnType::Real),
    ],
    foreign_keys: &[ForeignKey::new("cod_produto", "dim_produto")],
    natural_key: &["cod_produto", "data_venda"],
    conflict: ConflictPolicy::Ignore,
};

/// All warehouse tables in load order: suppliers, products, then facts
pub static ALL_TABLES: &[&TableSchema] = &[&DIM_FORNECEDOR, &DIM_PRODUTO, &FATO_ESTOQUE, &FATO_VENDA];

/// Get table schema by name
pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    ALL_TABLES.iter().find(|t| t.name == name).copied()
}

/// Get the contract for a sheet, matching the trimmed lower-cased name
pub fn contract_for(sheet: &str) -> Option<&'static SheetContract> {
    let wanted = sheet.trim().to_lowercase();
    CONTRACTS.iter().find(|c| c.name == wanted).copied()
}

/// Conflict policy for a warehouse table; unknown tables never overwrite
pub fn conflict_policy_for(table: &str) -> ConflictPolicy {
    get_table(table)
        .map(|t| t.conflict)
        .unwrap_or(ConflictPolicy::Ignore)
}
