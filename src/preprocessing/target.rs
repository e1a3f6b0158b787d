//! Нормализация целевой колонки

use crate::error::{PipelineError, Result};
use crate::types::{Cell, RawDataset};

pub const TARGET_COLUMN: &str = "default";

/// Возможные имена целевой колонки, в порядке приоритета
pub const TARGET_CANDIDATES: [&str; 2] = ["default.payment.next.month", "Y"];

/// Колонка-индекс, которую оставляет экспорт таблицы
pub const INDEX_COLUMN: &str = "Unnamed: 0";

/// Переименовывает целевую колонку в `default`, убирает лишний индекс,
/// приводит цель к целому и отбрасывает строки без цели.
///
/// Очистка выполняется одинаково для обоих вариантов имени.
pub fn normalize_target(mut df: RawDataset) -> Result<RawDataset> {
    let found = TARGET_CANDIDATES
        .iter()
        .copied()
        .find(|name| df.has_column(name))
        .ok_or_else(|| PipelineError::MissingColumn {
            path: df.source.clone(),
            candidates: TARGET_CANDIDATES.iter().map(|c| c.to_string()).collect(),
        })?;

    // Уже существующая колонка `default` иначе даст дубликат
    if found != TARGET_COLUMN && df.has_column(TARGET_COLUMN) {
        tracing::warn!("Dropping pre-existing {:?} column in favour of {:?}", TARGET_COLUMN, found);
        df.drop_column(TARGET_COLUMN);
    }
    df.rename_column(found, TARGET_COLUMN);
    tracing::debug!("Target column {:?} renamed to {:?}", found, TARGET_COLUMN);

    if df.drop_column(INDEX_COLUMN) {
        tracing::debug!("Dropped index column {:?}", INDEX_COLUMN);
    }

    let target_idx = df
        .column_index(TARGET_COLUMN)
        .ok_or_else(|| PipelineError::MissingColumn {
            path: df.source.clone(),
            candidates: vec![TARGET_COLUMN.to_string()],
        })?;

    let before = df.n_rows();
    df.retain_rows(|row| row[target_idx].to_number().is_some());
    let dropped = before - df.n_rows();
    if dropped > 0 {
        tracing::warn!("Dropped {} rows with non-numeric target", dropped);
    }

    if df.rows.is_empty() {
        return Err(PipelineError::insufficient(format!(
            "no rows with a numeric target in {}",
            df.source.display()
        )));
    }

    for (row, &row_id) in df.rows.iter_mut().zip(&df.row_ids) {
        // retain_rows выше гарантирует числовое значение
        let value = row[target_idx].to_number().unwrap_or_default().trunc() as i64;
        if !(value == 0 || value == 1) {
            return Err(PipelineError::InvalidTarget { row: row_id, value });
        }
        row[target_idx] = Cell::Number(value as f64);
    }

    Ok(df)
}

/// Метки классов после `normalize_target`
pub fn target_labels(df: &RawDataset) -> Result<Vec<usize>> {
    let idx = df
        .column_index(TARGET_COLUMN)
        .ok_or_else(|| PipelineError::MissingColumn {
            path: df.source.clone(),
            candidates: vec![TARGET_COLUMN.to_string()],
        })?;

    df.rows
        .iter()
        .zip(&df.row_ids)
        .map(|(row, &row_id)| match row[idx].to_number() {
            Some(v) if v == 0.0 || v == 1.0 => Ok(v as usize),
            Some(v) => Err(PipelineError::InvalidTarget {
                row: row_id,
                value: v as i64,
            }),
            None => Err(PipelineError::NonNumericFeature {
                column: TARGET_COLUMN.to_string(),
                row: row_id,
                value: row[idx].to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(columns: &[&str], rows: Vec<Vec<Cell>>) -> RawDataset {
        RawDataset::new("test.xlsx", columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn num(v: f64) -> Cell {
        Cell::Number(v)
    }

    #[test]
    fn test_first_candidate_is_renamed() {
        let df = dataset(
            &["LIMIT_BAL", "default.payment.next.month"],
            vec![vec![num(100.0), num(1.0)], vec![num(200.0), num(0.0)]],
        );
        let df = normalize_target(df).unwrap();
        assert_eq!(df.columns, vec!["LIMIT_BAL", "default"]);
        assert_eq!(target_labels(&df).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_cleanup_applies_to_first_candidate_too() {
        let df = dataset(
            &["Unnamed: 0", "LIMIT_BAL", "default.payment.next.month"],
            vec![
                vec![num(0.0), num(100.0), Cell::Text("n/a".into())],
                vec![num(1.0), num(200.0), Cell::Text("1".into())],
            ],
        );
        let df = normalize_target(df).unwrap();
        assert_eq!(df.columns, vec!["LIMIT_BAL", "default"]);
        assert_eq!(df.n_rows(), 1);
        assert_eq!(df.row_ids, vec![1]);
        assert_eq!(df.rows[0][1], num(1.0));
    }

    #[test]
    fn test_second_candidate_drops_header_row() {
        // Второй строкой заголовка в исходной книге идут человекочитаемые имена
        let df = dataset(
            &["Unnamed: 0", "X1", "Y"],
            vec![
                vec![Cell::Text("ID".into()), Cell::Text("LIMIT_BAL".into()), Cell::Text("default payment next month".into())],
                vec![num(1.0), num(20000.0), num(1.0)],
                vec![num(2.0), num(120000.0), num(0.0)],
            ],
        );
        let df = normalize_target(df).unwrap();
        assert_eq!(df.columns, vec!["X1", "default"]);
        assert_eq!(df.n_rows(), 2);
        assert_eq!(target_labels(&df).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_float_target_is_truncated() {
        let df = dataset(&["Y"], vec![vec![num(1.0)], vec![Cell::Text("0.0".into())]]);
        let df = normalize_target(df).unwrap();
        assert_eq!(target_labels(&df).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_missing_target_column() {
        let df = dataset(&["LIMIT_BAL"], vec![vec![num(1.0)]]);
        let err = normalize_target(df).unwrap_err();
        match err {
            PipelineError::MissingColumn { candidates, .. } => {
                assert_eq!(candidates, vec!["default.payment.next.month", "Y"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_out_of_domain_target() {
        let df = dataset(&["Y"], vec![vec![num(0.0)], vec![num(2.0)]]);
        let err = normalize_target(df).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTarget { row: 1, value: 2 }));
    }

    #[test]
    fn test_all_targets_missing() {
        let df = dataset(&["Y"], vec![vec![Cell::Empty], vec![Cell::Text("x".into())]]);
        let err = normalize_target(df).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }
}
