//! SQL statements for sink connectors that speak a row-insert protocol.
//!
//! Column types and cell literals are chosen by the column's value type, so
//! both table backends produce the same text for the same data.

use crate::value_type::{AtomicValueType, InternalValue, PrimitiveValueType, ValueType, ValueTypeVisitor};

use super::{TableError, TableResult, Tabular};

pub fn generate_drop_table_statement(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS \"{}\";", table_name)
}

pub fn generate_create_table_statement<T: Tabular + ?Sized>(
    table: &T,
    table_name: &str,
) -> TableResult<String> {
    let columns = table
        .column_value_types()
        .into_iter()
        .map(|(name, value_type)| {
            let sql_type = value_type.accept_visitor(&mut SqlColumnType).ok_or_else(|| {
                TableError::NoSqlRepresentation {
                    column: name.clone(),
                    value_type: value_type.name(),
                }
            })?;
            Ok(format!("\"{}\" {}", name, sql_type))
        })
        .collect::<TableResult<Vec<_>>>()?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" ({});",
        table_name,
        columns.join(",")
    ))
}

pub fn generate_insert_values_statement<T: Tabular + ?Sized>(
    table: &T,
    table_name: &str,
) -> TableResult<String> {
    let column_types = table.column_value_types();
    let names = column_types
        .iter()
        .map(|(name, _)| format!("\"{}\"", name))
        .collect::<Vec<_>>()
        .join(",");
    let rows = (0..table.num_rows())
        .map(|row| {
            let cells = column_types
                .iter()
                .enumerate()
                .map(|(index, (name, value_type))| {
                    sql_literal(name, value_type, table.cell(row, index).as_ref())
                })
                .collect::<TableResult<Vec<_>>>()?;
            Ok(format!("({})", cells.join(",")))
        })
        .collect::<TableResult<Vec<_>>>()?;
    Ok(format!(
        "INSERT INTO \"{}\" ({}) VALUES {}",
        table_name,
        names,
        rows.join(", ")
    ))
}

fn sql_literal(
    column: &str,
    value_type: &ValueType,
    value: Option<&InternalValue>,
) -> TableResult<String> {
    let Some(value) = value else {
        return Ok("NULL".to_string());
    };
    let literal = match value_type.accept_visitor(&mut SqlColumnType) {
        Some("boolean") => value.as_bool().map(|b| format!("'{}'", b)),
        Some("integer") | Some("real") if value.is_numeric() => Some(value.to_string()),
        Some("text") => value.as_str().map(|s| format!("'{}'", s.replace('\'', "''"))),
        _ => None,
    };
    literal.ok_or_else(|| TableError::InvalidValue {
        column: column.to_string(),
        value_type: value_type.name(),
        value: value.to_string(),
    })
}

/// Maps a value type to its SQL column type; atomic types use their
/// supertype's.
struct SqlColumnType;

impl ValueTypeVisitor for SqlColumnType {
    type Output = Option<&'static str>;

    fn visit_primitive(&mut self, primitive: PrimitiveValueType) -> Self::Output {
        match primitive {
            PrimitiveValueType::Boolean => Some("boolean"),
            PrimitiveValueType::Integer => Some("integer"),
            PrimitiveValueType::Decimal => Some("real"),
            PrimitiveValueType::Text => Some("text"),
            _ => None,
        }
    }

    fn visit_atomic(&mut self, atomic: &AtomicValueType) -> Self::Output {
        atomic.supertype.accept_visitor(self)
    }

    fn visit_collection(&mut self, _element: Option<&ValueType>) -> Self::Output {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ArrayColumn, ArrayTable, ColumnarColumn, ColumnarTable};

    fn people() -> ArrayTable {
        ArrayTable::from_columns(vec![
            ArrayColumn::from_values("name", ValueType::TEXT, ["Ann", "Bo"].map(Into::into))
                .unwrap(),
            ArrayColumn::from_values("age", ValueType::INTEGER, [30i64, 25].map(Into::into))
                .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_insert_statement() {
        assert_eq!(
            people().generate_insert_values_statement("people").unwrap(),
            "INSERT INTO \"people\" (\"name\",\"age\") VALUES ('Ann',30), ('Bo',25)"
        );
    }

    #[test]
    fn test_create_and_drop_statements() {
        assert_eq!(
            people().generate_create_table_statement("people").unwrap(),
            "CREATE TABLE IF NOT EXISTS \"people\" (\"name\" text,\"age\" integer);"
        );
        assert_eq!(
            generate_drop_table_statement("people"),
            "DROP TABLE IF EXISTS \"people\";"
        );
    }

    #[test]
    fn test_literals_quote_and_null() {
        let table = ColumnarTable::from_columns(vec![
            ColumnarColumn::from_values(
                "quote",
                &ValueType::TEXT,
                &[Some("it's".into()), None],
            ),
            ColumnarColumn::from_values(
                "ratio",
                &ValueType::DECIMAL,
                &[Some(0.5.into()), Some(2i64.into())],
            ),
            ColumnarColumn::from_values(
                "ok",
                &ValueType::BOOLEAN,
                &[Some(true.into()), Some(false.into())],
            ),
        ])
        .unwrap();
        assert_eq!(
            table.generate_create_table_statement("t").unwrap(),
            "CREATE TABLE IF NOT EXISTS \"t\" (\"quote\" text,\"ratio\" real,\"ok\" boolean);"
        );
        assert_eq!(
            table.generate_insert_values_statement("t").unwrap(),
            "INSERT INTO \"t\" (\"quote\",\"ratio\",\"ok\") VALUES ('it''s',0.5,'true'), (NULL,2,'false')"
        );
    }

    #[test]
    fn test_regex_column_has_no_sql_type() {
        let table = ArrayTable::from_columns(vec![ArrayColumn::new("r", ValueType::REGEX)]).unwrap();
        assert!(matches!(
            table.generate_create_table_statement("t"),
            Err(TableError::NoSqlRepresentation { .. })
        ));
    }
}
