//! Загрузка датасета из таблицы Excel (.xls / .xlsx)

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xls, Xlsx};

use crate::error::{PipelineError, Result};
use crate::types::{Cell, RawDataset};

/// Поддерживаемые форматы таблиц
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Xls,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" => Ok(SheetFormat::Xlsx),
            "xls" => Ok(SheetFormat::Xls),
            _ => Err(PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// Читает первый лист книги. Первая строка листа - заголовок.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<RawDataset> {
    let path = path.as_ref();
    let format = SheetFormat::from_path(path)?;

    if !path.is_file() {
        return Err(PipelineError::io(
            "open",
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        ));
    }

    let range = match format {
        SheetFormat::Xlsx => {
            let mut workbook = open_workbook::<Xlsx<_>, _>(path).map_err(|e| decode_error(path, e))?;
            first_sheet(&mut workbook, path)?
        }
        SheetFormat::Xls => {
            let mut workbook = open_workbook::<Xls<_>, _>(path).map_err(|e| decode_error(path, e))?;
            first_sheet(&mut workbook, path)?
        }
    };

    let dataset = dataset_from_range(path, &range)?;
    tracing::info!(
        "Dataset loaded from {}: {} rows x {} columns",
        path.display(),
        dataset.n_rows(),
        dataset.n_cols()
    );
    tracing::debug!("Columns: {:?}", dataset.columns);

    Ok(dataset)
}

fn decode_error(path: &Path, err: impl Into<calamine::Error>) -> PipelineError {
    PipelineError::Decode {
        path: path.to_path_buf(),
        source: err.into(),
    }
}

fn first_sheet<R, RS>(workbook: &mut R, path: &Path) -> Result<Range<Data>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: Into<calamine::Error>,
{
    match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| decode_error(path, e)),
        None => Err(PipelineError::EmptyDataset {
            path: path.to_path_buf(),
        }),
    }
}

fn dataset_from_range(path: &Path, range: &Range<Data>) -> Result<RawDataset> {
    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| PipelineError::EmptyDataset {
        path: path.to_path_buf(),
    })?;

    let columns = header_names(header.iter().map(to_cell));
    let body: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(to_cell).collect())
        .collect();

    Ok(RawDataset::new(path, columns, body))
}

pub(crate) fn to_cell(value: &Data) -> Cell {
    match value {
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

/// Имена колонок: пустой заголовок -> "Unnamed: N", повторы -> "name.1", "name.2", ...
pub(crate) fn header_names(cells: impl IntoIterator<Item = Cell>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();

    for (idx, cell) in cells.into_iter().enumerate() {
        let base = match cell {
            Cell::Empty => format!("Unnamed: {idx}"),
            other => other.to_string(),
        };

        let name = match seen.get_mut(&base) {
            Some(count) => {
                *count += 1;
                format!("{base}.{count}")
            }
            None => {
                seen.insert(base.clone(), 0);
                base
            }
        };
        names.push(name);
    }

    names
}
