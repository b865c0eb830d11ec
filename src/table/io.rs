use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value_type::CellRange;

use super::{Table, Tabular};

/// Shape of a block's input or output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum IoType {
    None,
    File,
    Sheet,
    Table,
}

/// Rows of raw cell text, as produced by spreadsheet or delimited-file
/// readers. Rows may be ragged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sheet {
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn number_of_rows(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn number_of_columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn header_row(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Keeps only the cells inside `range`.
    pub fn select(&self, range: &CellRange) -> Sheet {
        let last_column = self.number_of_columns().saturating_sub(1);
        let last_row = self.number_of_rows().saturating_sub(1);
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(row_index, row)| {
                let cells: Vec<String> = row
                    .iter()
                    .enumerate()
                    .filter(|(column_index, _)| {
                        range.contains(*column_index, row_index, last_column, last_row)
                    })
                    .map(|(_, cell)| cell.clone())
                    .collect();
                (!cells.is_empty()).then_some(cells)
            })
            .collect();
        Sheet { rows }
    }
}

/// An opaque file handed over by an external reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileValue {
    pub name: String,
    pub extension: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl FileValue {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        let name = name.into();
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let mime_type = match extension.as_str() {
            "csv" => "text/csv",
            "txt" => "text/plain",
            "json" => "application/json",
            "zip" => "application/zip",
            _ => "application/octet-stream",
        }
        .to_string();
        Self {
            name,
            extension,
            mime_type,
            content,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// A value travelling along a pipe.
#[derive(Debug, Clone)]
pub enum IoValue {
    None,
    File(FileValue),
    Sheet(Sheet),
    Table(Table),
}

impl IoValue {
    pub fn io_type(&self) -> IoType {
        match self {
            Self::None => IoType::None,
            Self::File(_) => IoType::File,
            Self::Sheet(_) => IoType::Sheet,
            Self::Table(_) => IoType::Table,
        }
    }
}

impl fmt::Display for IoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::File(file) => write!(f, "file {} ({} bytes)", file.name, file.content.len()),
            Self::Sheet(sheet) => write!(
                f,
                "sheet {}x{}",
                sheet.number_of_rows(),
                sheet.number_of_columns()
            ),
            Self::Table(table) => write!(
                f,
                "{} table {}x{}",
                table.backend(),
                table.num_rows(),
                table.num_columns()
            ),
        }
    }
}
