//! 스프레드시트 읽기
//!
//! 첫 번째 워크시트를 헤더 행 + 데이터 행으로 읽는다 (calamine).

use crate::error::{Result, SurveyError};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

static EMPTY_CELL: Cell = Cell::Empty;

/// 셀 값
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 문자열 표현 (정수 값은 소수점 없이)
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }

    /// 숫자 해석. 숫자 형태의 문자열도 허용
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

/// 헤더 + 데이터 행
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.find_column(name)
            .ok_or_else(|| SurveyError::ColumnNotFound(name.to_string()))
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).as_text()
    }

    /// 앞에서 max_rows 행만 남긴다
    pub fn truncate(&mut self, max_rows: usize) {
        self.rows.truncate(max_rows);
    }

    /// 헤더 수에 맞춰 각 행 길이를 맞춘다
    fn align_row_lengths(&mut self) {
        let width = self
            .rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.headers.len());
        self.headers.resize(width, String::new());
        for row in &mut self.rows {
            row.resize(width, Cell::Empty);
        }
    }
}

/// 첫 번째 워크시트 읽기. 완전히 빈 행은 건너뛴다
pub fn read_first_sheet(path: &Path) -> Result<Sheet> {
    if !path.exists() {
        return Err(SurveyError::FileNotFound(path.display().to_string()));
    }

    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SurveyError::SheetRead(format!("워크시트가 없습니다: {}", path.display())))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows_iter = range.rows();

    let header_row = rows_iter
        .next()
        .ok_or_else(|| SurveyError::SheetRead(format!("빈 워크시트: {}", sheet_name)))?;

    let mut sheet = Sheet::new(
        header_row
            .iter()
            .map(|c| Cell::from(c).as_text().trim().to_string())
            .collect(),
    );

    for row in rows_iter {
        let cells: Vec<Cell> = row.iter().map(Cell::from).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        sheet.rows.push(cells);
    }

    sheet.align_row_lengths();
    tracing::debug!(
        "시트 읽기 완료: {} ({}행, {}열)",
        path.display(),
        sheet.len(),
        sheet.headers.len()
    );
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_and_number() {
        assert_eq!(Cell::Number(3.0).as_text(), "3");
        assert_eq!(Cell::Number(41.67).as_text(), "41.67");
        assert_eq!(Cell::Text(" 4 ".into()).as_number(), Some(4.0));
        assert_eq!(Cell::Text("없음".into()).as_number(), None);
        assert!(Cell::Text("   ".into()).is_empty());
    }

    #[test]
    fn test_sheet_lookup() {
        let mut sheet = Sheet::new(vec!["a".into(), "협업 후기".into()]);
        sheet.rows.push(vec![Cell::Number(1.0), "좋아요".into()]);
        assert_eq!(sheet.column_index("협업 후기").unwrap(), 1);
        assert!(matches!(
            sheet.column_index("없는컬럼"),
            Err(SurveyError::ColumnNotFound(_))
        ));
        assert_eq!(sheet.text(0, 1), "좋아요");
        assert_eq!(sheet.cell(5, 5), &Cell::Empty);
    }
}
