/// Типы данных для подготовки датасета

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Значение ячейки таблицы
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    /// Приведение к числу; `None`, если значение не числовое
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            Cell::Number(_) | Cell::Empty => None,
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Сырая таблица, прочитанная из файла
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub source: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub row_ids: Vec<usize>, // номер строки данных в исходном листе (с нуля)
}

impl RawDataset {
    /// Строки короче заголовка дополняются пустыми ячейками, лишние ячейки отбрасываются
    pub fn new(source: impl Into<PathBuf>, columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows: Vec<Vec<Cell>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        let row_ids = (0..rows.len()).collect();

        Self {
            source: source.into(),
            columns,
            rows,
            row_ids,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Оставляет только строки, для которых `keep` вернул `true`
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        let mut kept_rows = Vec::with_capacity(self.rows.len());
        let mut kept_ids = Vec::with_capacity(self.row_ids.len());
        for (row, id) in self.rows.drain(..).zip(self.row_ids.drain(..)) {
            if keep(&row) {
                kept_rows.push(row);
                kept_ids.push(id);
            }
        }
        self.rows = kept_rows;
        self.row_ids = kept_ids;
    }
}

/// Числовая матрица признаков
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub index: Vec<usize>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values.column(idx))
    }

    pub fn select_rows(&self, rows: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            names: self.names.clone(),
            index: rows.iter().map(|&r| self.index[r]).collect(),
            values: self.values.select(Axis(0), rows),
        }
    }
}
