//! Excel 생성
//!
//! 원본 컬럼을 그대로 두고 분석 컬럼 7개를 뒤에 붙인 결과 시트, 그리고 요약용 보조 시트를 쓴다.

use crate::error::Result;
use crate::sheet::{Cell, Sheet};
use collab_survey_common::{AnalysisResult, ANALYSIS_COLUMNS};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use std::path::Path;

/// 워크시트 이름 최대 길이 (Excel 제한)
const MAX_SHEET_NAME: usize = 31;

/// 출력할 워크시트 한 장
#[derive(Debug, Clone)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetData {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn from_sheet(name: impl Into<String>, sheet: &Sheet) -> Self {
        Self {
            name: name.into(),
            headers: sheet.headers.clone(),
            rows: sheet.rows.clone(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA))
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Cell::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        Cell::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
    }
    Ok(())
}

fn write_worksheet(workbook: &mut Workbook, data: &SheetData) -> Result<()> {
    let header_format = header_format();
    let worksheet = workbook.add_worksheet();
    let name: String = data.name.chars().take(MAX_SHEET_NAME).collect();
    worksheet.set_name(&name)?;

    for (col, header) in data.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (row_idx, row) in data.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            write_cell(worksheet, (row_idx + 1) as u32, col as u16, cell)?;
        }
    }

    Ok(())
}

/// 여러 시트를 한 파일로 저장
pub fn write_workbook(output_path: &Path, sheets: &[SheetData]) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut workbook = Workbook::new();
    for sheet in sheets {
        write_worksheet(&mut workbook, sheet)?;
    }
    workbook.save(output_path)?;

    tracing::info!("Excel 저장: {}", output_path.display());
    Ok(())
}

/// 원본 행에 분석 결과를 덧붙인 시트 구성
///
/// `results`는 입력 행과 같은 순서여야 하며, 비어 있는 자리(None)는 빈 결과로 채운다.
pub fn annotated_sheet(
    name: &str,
    input: &Sheet,
    results: &[Option<AnalysisResult>],
) -> SheetData {
    let mut headers = input.headers.clone();
    headers.extend(ANALYSIS_COLUMNS.iter().map(|s| s.to_string()));

    let mut data = SheetData::new(name, headers);
    let empty = AnalysisResult::empty();

    for (idx, row) in input.rows.iter().enumerate() {
        let result = results.get(idx).and_then(Option::as_ref).unwrap_or(&empty);
        let mut cells = row.clone();
        cells.extend(result.to_cells().into_iter().map(Cell::from));
        data.push_row(cells);
    }

    data
}

/// 분석 결과 시트 저장
pub fn write_annotated(
    output_path: &Path,
    input: &Sheet,
    results: &[Option<AnalysisResult>],
) -> Result<()> {
    write_workbook(output_path, &[annotated_sheet("분석결과", input, results)])
}
