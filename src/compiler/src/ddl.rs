use common::table::Table;
use common::{get_attr, get_name, Attribute, DbError, TableSchema};
use sqlparser::ast::{ColumnDef, ColumnOption, Statement, TableConstraint};

/// Builds a catalog table from a `CREATE TABLE` statement.
///
/// Column types map onto NUMBER, CHAR and DATE. Column-level and table-level
/// `PRIMARY KEY` and `FOREIGN KEY` constraints are recorded on the table; other
/// constraints are accepted and ignored.
///
/// # Arguments
///
/// * `stmt` - Parsed `CREATE TABLE` statement.
pub fn table_from_create(stmt: &Statement) -> Result<Table, DbError> {
    let (name, columns, constraints) = match stmt {
        Statement::CreateTable {
            name,
            columns,
            constraints,
            ..
        } => (name, columns, constraints),
        _ => {
            return Err(DbError::ValidationError(String::from(
                "Not a CREATE TABLE statement",
            )));
        }
    };
    let table_name = get_name(name)?;
    if columns.is_empty() {
        return Err(DbError::ValidationError(format!(
            "Table {} has no columns",
            table_name
        )));
    }

    let mut attributes: Vec<Attribute> = Vec::new();
    let mut primary_key = Vec::new();
    // (referenced table, local column)
    let mut foreign_keys = Vec::new();
    for col in columns {
        attributes.push(column_to_attribute(col, &attributes)?);
        for def in &col.options {
            match &def.option {
                ColumnOption::Unique { is_primary: true } => {
                    primary_key.push(col.name.value.clone())
                }
                ColumnOption::ForeignKey { foreign_table, .. } => {
                    foreign_keys.push((get_name(foreign_table)?, col.name.value.clone()))
                }
                _ => {}
            }
        }
    }

    for constraint in constraints {
        match constraint {
            TableConstraint::Unique {
                columns,
                is_primary: true,
                ..
            } => {
                if !primary_key.is_empty() {
                    return Err(DbError::ValidationError(format!(
                        "Table {} declares more than one primary key",
                        table_name
                    )));
                }
                primary_key.extend(columns.iter().map(|c| c.value.clone()));
            }
            TableConstraint::ForeignKey {
                columns,
                foreign_table,
                ..
            } => {
                let referenced = get_name(foreign_table)?;
                for c in columns {
                    foreign_keys.push((referenced.clone(), c.value.clone()));
                }
            }
            _ => {}
        }
    }

    let schema = TableSchema::new(attributes);
    let key_columns = primary_key.iter().chain(foreign_keys.iter().map(|(_, c)| c));
    for column in key_columns {
        if !schema.contains(column) {
            return Err(DbError::ValidationError(format!(
                "Key column {} is not a column of {}",
                column, table_name
            )));
        }
    }

    let mut table = Table::new(table_name, schema).with_primary_key(primary_key);
    for (referenced, column) in foreign_keys {
        table = table.with_foreign_key(&referenced, &column);
    }
    Ok(table)
}

fn column_to_attribute(col: &ColumnDef, seen: &[Attribute]) -> Result<Attribute, DbError> {
    let name = col.name.value.clone();
    if seen.iter().any(|a| a.name.eq_ignore_ascii_case(&name)) {
        return Err(DbError::ValidationError(format!(
            "Duplicate column {}",
            name
        )));
    }
    let (dtype, size) = get_attr(&col.data_type)?;
    Ok(Attribute::new(name, dtype, size))
}
