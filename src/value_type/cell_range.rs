use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use super::ValueTypeError;

lazy_static! {
    static ref CELL_INDEX_REGEX: Regex = Regex::new(r"^([A-Z]+|\*)([0-9]+|\*)$").unwrap();
}

/// A single sheet coordinate in A1 notation. `None` stands for the `*`
/// wildcard (last column / last row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub column: Option<usize>,
    pub row: Option<usize>,
}

impl CellIndex {
    pub fn new(column: usize, row: usize) -> Self {
        Self {
            column: Some(column),
            row: Some(row),
        }
    }

    /// Replaces wildcards with the given last indices.
    pub fn bind(&self, last_column: usize, last_row: usize) -> (usize, usize) {
        (
            self.column.unwrap_or(last_column),
            self.row.unwrap_or(last_row),
        )
    }
}

fn column_to_letters(mut column: usize) -> String {
    let mut letters = Vec::new();
    column += 1;
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn letters_to_column(letters: &str) -> usize {
    letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
        - 1
}

impl FromStr for CellIndex {
    type Err = ValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = CELL_INDEX_REGEX
            .captures(s)
            .ok_or_else(|| ValueTypeError::InvalidCellRange(s.to_string()))?;
        let column = match &captures[1] {
            "*" => None,
            letters => Some(letters_to_column(letters)),
        };
        let row = match &captures[2] {
            "*" => None,
            digits => {
                let row: usize = digits
                    .parse()
                    .map_err(|_| ValueTypeError::InvalidCellRange(s.to_string()))?;
                if row == 0 {
                    return Err(ValueTypeError::InvalidCellRange(s.to_string()));
                }
                Some(row - 1)
            }
        };
        Ok(Self { column, row })
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(column) => write!(f, "{}", column_to_letters(column))?,
            None => write!(f, "*")?,
        }
        match self.row {
            Some(row) => write!(f, "{}", row + 1),
            None => write!(f, "*"),
        }
    }
}

/// Rectangular selection of sheet cells, both corners inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellIndex,
    pub end: CellIndex,
}

impl CellRange {
    pub fn new(start: CellIndex, end: CellIndex) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, column: usize, row: usize, last_column: usize, last_row: usize) -> bool {
        let (start_column, start_row) = self.start.bind(last_column, last_row);
        let (end_column, end_row) = self.end.bind(last_column, last_row);
        (start_column..=end_column).contains(&column) && (start_row..=end_row).contains(&row)
    }
}

impl FromStr for CellRange {
    type Err = ValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.split_once(':') {
            Some((start, end)) => Ok(Self::new(start.parse()?, end.parse()?)),
            None => {
                let cell: CellIndex = trimmed.parse()?;
                Ok(Self::new(cell, cell))
            }
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}
