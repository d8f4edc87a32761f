#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ciranda_etl::area::DataArea;
use ciranda_etl::config::Settings;
use ciranda_etl::extract::{Cell, MemoryWorkbook};
use rusqlite::Connection;
use tempfile::{tempdir, TempDir};

pub const PRODUTO_HEADER: &[&str] = &[
    "Cod Fornecedor",
    "Cod Produto",
    "Nome Produto",
    "Categoria",
    "Tamanho",
    "Cor",
    "Preco Custo",
    "Preco Venda",
];
pub const ESTOQUE_HEADER: &[&str] = &[
    "cod_produto",
    "quantidade",
    "data_entrada",
    "data_saida",
    "local_estoque",
];
pub const VENDA_HEADER: &[&str] = &["cod_produto", "data_venda", "quantidade", "valor_total"];
pub const FORNECEDOR_HEADER: &[&str] = &[
    "cod_fornecedor",
    "nome_fornecedor",
    "telefone",
    "email",
    "cod_ibge_cidade",
];

/// Scratch data directory with the pipeline's standard layout
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn settings(&self) -> Settings {
        let mut settings = Settings::with_data_dir(self.path());
        settings.retry_delay = std::time::Duration::ZERO;
        settings
    }

    pub fn staging(&self) -> DataArea {
        DataArea::open(self.settings().staging_dir).expect("staging area")
    }

    pub fn processed(&self) -> DataArea {
        DataArea::open(self.settings().processed_dir).expect("processed area")
    }

    pub fn db_path(&self) -> PathBuf {
        self.settings().database
    }

    pub fn connection(&self) -> Connection {
        Connection::open(self.db_path()).expect("open warehouse")
    }

    /// Write a file relative to the workspace root, creating parents
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }
}

pub fn date(y: i32, m: u32, d: u32) -> Cell {
    Cell::DateTime(
        NaiveDate::from_ymd_opt(y, m, d)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time"),
    )
}

fn produto_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![
            "F1".into(),
            "P001".into(),
            "Vestido Floral".into(),
            "Vestidos".into(),
            "4".into(),
            "Rosa".into(),
            Cell::Float(30.0),
            Cell::Float(59.9),
        ],
        vec![
            "F2".into(),
            "P002".into(),
            "Camiseta Básica".into(),
            "Camisetas".into(),
            "6".into(),
            "Branco".into(),
            Cell::Float(12.5),
            Cell::Float(29.9),
        ],
    ]
}

fn estoque_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![
            "P001".into(),
            Cell::Int(10),
            date(2025, 10, 1),
            Cell::Empty,
            "Loja Centro".into(),
        ],
        vec![
            "P002".into(),
            Cell::Int(20),
            "2025-10-02".into(),
            "05/10/2025".into(),
            "Depósito".into(),
        ],
    ]
}

fn venda_rows() -> Vec<Vec<Cell>> {
    vec![
        vec!["P001".into(), date(2025, 10, 14), Cell::Int(2), Cell::Empty],
        vec!["P002".into(), date(2025, 10, 14), Cell::Int(1), Cell::Float(29.9)],
    ]
}

fn fornecedor_rows(telefone_f1: i64) -> Vec<Vec<Cell>> {
    vec![
        vec![
            "F1".into(),
            "Malharia Sol".into(),
            Cell::Int(telefone_f1),
            "contato@malhariasol.com.br".into(),
            Cell::Int(3550308),
        ],
        vec![
            "F2".into(),
            "Tecelagem Lua".into(),
            Cell::Int(4733221100),
            "NULL".into(),
            Cell::Int(4209102),
        ],
    ]
}

/// The four recognized sheets plus an unrecognized "brinde" sheet
pub fn sample_workbook() -> MemoryWorkbook {
    workbook_with_phone(1133334444)
}

pub fn workbook_with_phone(telefone_f1: i64) -> MemoryWorkbook {
    build_workbook(produto_rows(), telefone_f1)
}

/// Sample workbook where P001 is supplied by `cod_fornecedor`
pub fn workbook_with_p001_supplier(cod_fornecedor: &str) -> MemoryWorkbook {
    let mut products = produto_rows();
    products[0][0] = cod_fornecedor.into();
    build_workbook(products, 1133334444)
}

fn build_workbook(products: Vec<Vec<Cell>>, telefone_f1: i64) -> MemoryWorkbook {
    MemoryWorkbook::new()
        .with_sheet("produto", PRODUTO_HEADER, products)
        .with_sheet("estoque", ESTOQUE_HEADER, estoque_rows())
        .with_sheet("venda", VENDA_HEADER, venda_rows())
        .with_sheet("fornecedor", FORNECEDOR_HEADER, fornecedor_rows(telefone_f1))
        .with_sheet("brinde", &["item", "quantidade"], vec![vec!["Pirulito".into(), Cell::Int(50)]])
}

/// Sample workbook whose sales sheet lacks `valor_total`
pub fn workbook_without_sale_totals() -> MemoryWorkbook {
    let sales = venda_rows()
        .into_iter()
        .map(|mut row| {
            row.truncate(3);
            row
        })
        .collect();

    MemoryWorkbook::new()
        .with_sheet("produto", PRODUTO_HEADER, produto_rows())
        .with_sheet("estoque", ESTOQUE_HEADER, estoque_rows())
        .with_sheet("venda", &VENDA_HEADER[..3], sales)
        .with_sheet("fornecedor", FORNECEDOR_HEADER, fornecedor_rows(1133334444))
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .expect("count rows")
}

/// Every row of a table rendered as text, ordered by surrogate key
pub fn snapshot(conn: &Connection, table: &str) -> Vec<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {} ORDER BY 1", table))
        .expect("prepare snapshot");
    let width = stmt.column_count();
    stmt.query_map([], |row| {
        (0..width)
            .map(|i| {
                let value: rusqlite::types::Value = row.get(i)?;
                Ok(format!("{:?}", value))
            })
            .collect::<rusqlite::Result<Vec<String>>>()
    })
    .expect("query snapshot")
    .collect::<rusqlite::Result<Vec<_>>>()
    .expect("read snapshot")
}
