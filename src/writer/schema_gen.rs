use crate::schema::{ConflictPolicy, TableSchema};

/// Generate idempotent CREATE TABLE SQL for a table schema
pub fn generate_create_table(schema: &TableSchema) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", schema.name);
    let mut columns = vec![format!(
        "    {} INTEGER PRIMARY KEY AUTOINCREMENT",
        schema.surrogate_key
    )];

    for col in schema.columns {
        let null_constraint = if !col.nullable { " NOT NULL" } else { "" };
        columns.push(format!(
            "    {} {}{}",
            col.name,
            col.col_type.sql_type(),
            null_constraint
        ));
    }

    if !schema.natural_key.is_empty() {
        columns.push(format!(
            "    CONSTRAINT {} UNIQUE ({})",
            schema.unique_constraint(),
            schema.natural_key.join(", ")
        ));
    }

    // Add foreign key constraints
    for fk in schema.foreign_keys {
        columns.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {}({})",
            fk.column, fk.references_table, fk.references_column
        ));
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n) STRICT");

    sql
}

/// Generate CREATE INDEX statements for foreign key columns
pub fn generate_indexes(schema: &TableSchema) -> Vec<String> {
    schema
        .foreign_keys
        .iter()
        .map(|fk| {
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
                schema.name, fk.column, schema.name, fk.column
            )
        })
        .collect()
}

/// The ON CONFLICT clause for an insert of `columns`
pub fn conflict_clause(schema: &TableSchema, columns: &[&str]) -> String {
    if schema.natural_key.is_empty() {
        return "ON CONFLICT DO NOTHING".to_string();
    }

    let target = format!("ON CONFLICT ({})", schema.natural_key.join(", "));
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !schema.is_key_column(c))
        .map(|c| format!("{} = excluded.{}", c, c))
        .collect();

    match schema.conflict {
        ConflictPolicy::Overwrite if !updates.is_empty() => {
            format!("{} DO UPDATE SET {}", target, updates.join(", "))
        }
        _ => format!("{} DO NOTHING", target),
    }
}

/// Generate the per-row upsert statement for `columns`
pub fn generate_upsert(schema: &TableSchema, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) {}",
        schema.name,
        columns.join(", "),
        placeholders.join(", "),
        conflict_clause(schema, columns)
    )
}
