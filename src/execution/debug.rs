use serde::{Deserialize, Serialize};

use crate::table::{ArrayTable, ColumnarTable, TableVisitor, Tabular};

use super::Logger;

/// How much of a block's resulting table is logged in debug mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DebugGranularity {
    /// The first `peek_rows` rows.
    #[default]
    Peek,
    Exhaustive,
    Skip,
}

/// Blocks whose results are logged in debug mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugTargets {
    #[default]
    All,
    Blocks(Vec<String>),
}

impl DebugTargets {
    pub fn includes(&self, block: &str) -> bool {
        match self {
            Self::All => true,
            Self::Blocks(names) => names.iter().any(|name| name == block),
        }
    }
}

/// Renders the rows of a table that a [`DebugGranularity`] asks for.
pub(crate) struct TableDebugPrinter {
    rows: Option<usize>,
}

impl TableDebugPrinter {
    pub(crate) fn new(granularity: DebugGranularity, peek_rows: usize) -> Option<Self> {
        match granularity {
            DebugGranularity::Peek => Some(Self {
                rows: Some(peek_rows),
            }),
            DebugGranularity::Exhaustive => Some(Self { rows: None }),
            DebugGranularity::Skip => None,
        }
    }

    fn render(&self, backend: &str, table: &dyn Tabular) -> Vec<String> {
        let shown = self
            .rows
            .map_or(table.num_rows(), |rows| rows.min(table.num_rows()));
        let header = table
            .column_value_types()
            .iter()
            .map(|(name, value_type)| format!("{}: {}", name, value_type))
            .collect::<Vec<_>>()
            .join(" | ");
        let mut lines = vec![format!(
            "[{} table, {} row(s), {} column(s)] {}",
            backend,
            table.num_rows(),
            table.num_columns(),
            header
        )];
        for row in 0..shown {
            let cells = table
                .row(row)
                .into_iter()
                .map(|cell| cell.map_or_else(|| "NULL".to_string(), |v| v.to_string()))
                .collect::<Vec<_>>()
                .join(" | ");
            lines.push(cells);
        }
        if shown < table.num_rows() {
            lines.push(format!("... {} more row(s)", table.num_rows() - shown));
        }
        lines
    }

    pub(crate) fn log(lines: &[String], logger: &Logger) {
        for line in lines {
            logger.log_debug(line);
        }
    }
}

impl TableVisitor for TableDebugPrinter {
    type Output = Vec<String>;

    fn visit_array_table(&mut self, table: &ArrayTable) -> Self::Output {
        self.render("array", table)
    }

    fn visit_columnar_table(&mut self, table: &ColumnarTable) -> Self::Output {
        self.render("columnar", table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ArrayColumn, Table};
    use crate::value_type::ValueType;

    #[test]
    fn test_peek_limits_rows() {
        let table = Table::Array(
            ArrayTable::from_columns(vec![ArrayColumn::from_values(
                "n",
                ValueType::INTEGER,
                [1i64, 2, 3].map(Into::into),
            )
            .unwrap()])
            .unwrap(),
        );
        let mut printer = TableDebugPrinter::new(DebugGranularity::Peek, 2).unwrap();
        let lines = table.accept_visitor(&mut printer);
        assert_eq!(
            lines,
            vec![
                "[array table, 3 row(s), 1 column(s)] n: integer".to_string(),
                "1".to_string(),
                "2".to_string(),
                "... 1 more row(s)".to_string(),
            ]
        );
        assert!(TableDebugPrinter::new(DebugGranularity::Skip, 2).is_none());
    }

    #[test]
    fn test_targets() {
        assert!(DebugTargets::All.includes("anything"));
        let named = DebugTargets::Blocks(vec!["Interpreter".to_string()]);
        assert!(named.includes("Interpreter"));
        assert!(!named.includes("Loader"));
    }
}
