//! 매핑 테이블 로드
//!
//! - 부서-부문 매핑: `부서명`, `부문`, 선택적으로 `Unit명`(또는 `UNIT명`) 컬럼
//! - 부서명 표준화: `변경전_부서명`, `표준_부서명` 컬럼

use crate::error::{Result, SurveyError};
use crate::sheet::{self, Sheet};
use collab_survey_common::{DepartmentRow, StandardizationTable};
use std::path::Path;
use tracing::{info, warn};

const DEPT_COLUMN: &str = "부서명";
const DIVISION_COLUMN: &str = "부문";
const UNIT_COLUMNS: [&str; 2] = ["Unit명", "UNIT명"];
const RAW_NAME_COLUMN: &str = "변경전_부서명";
const STANDARD_NAME_COLUMN: &str = "표준_부서명";

fn required_column(sheet: &Sheet, name: &str, path: &Path) -> Result<usize> {
    sheet.find_column(name).ok_or_else(|| {
        SurveyError::SchemaMismatch(format!("{}에 '{}' 컬럼이 없습니다", path.display(), name))
    })
}

/// 시트에서 매핑 행 추출. 부서명 또는 부문이 빈 행은 건너뛴다
pub fn mapping_rows_from_sheet(sheet: &Sheet, path: &Path) -> Result<Vec<DepartmentRow>> {
    let dept_col = required_column(sheet, DEPT_COLUMN, path)?;
    let division_col = required_column(sheet, DIVISION_COLUMN, path)?;
    let unit_col = UNIT_COLUMNS.iter().find_map(|name| sheet.find_column(name));

    let mut skipped = 0;
    let rows: Vec<DepartmentRow> = (0..sheet.len())
        .filter_map(|row| {
            let department = sheet.text(row, dept_col).trim().to_string();
            let division = sheet.text(row, division_col).trim().to_string();
            if department.is_empty() || division.is_empty() {
                skipped += 1;
                return None;
            }
            let unit = unit_col
                .map(|col| sheet.text(row, col).trim().to_string())
                .filter(|u| !u.is_empty());
            Some(DepartmentRow {
                department,
                division,
                unit,
            })
        })
        .collect();

    if skipped > 0 {
        warn!("매핑 테이블에서 빈 행 {}개 건너뜀", skipped);
    }
    Ok(rows)
}

/// 부서-부문 매핑 파일 로드
pub fn load_mapping(path: &Path) -> Result<Vec<DepartmentRow>> {
    let sheet = sheet::read_first_sheet(path)?;
    let rows = mapping_rows_from_sheet(&sheet, path)?;
    info!("부문 매핑 로드: {}행 ({})", rows.len(), path.display());
    Ok(rows)
}

pub fn standardization_from_sheet(sheet: &Sheet, path: &Path) -> Result<StandardizationTable> {
    let raw_col = required_column(sheet, RAW_NAME_COLUMN, path)?;
    let standard_col = required_column(sheet, STANDARD_NAME_COLUMN, path)?;

    Ok((0..sheet.len())
        .map(|row| (sheet.text(row, raw_col), sheet.text(row, standard_col)))
        .filter(|(raw, standard)| !raw.trim().is_empty() && !standard.trim().is_empty())
        .collect())
}

/// 부서명 표준화 파일 로드
pub fn load_standardization(path: &Path) -> Result<StandardizationTable> {
    let sheet = sheet::read_first_sheet(path)?;
    let table = standardization_from_sheet(&sheet, path)?;
    info!("부서명 표준화 로드: {}건 ({})", table.len(), path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;

    fn sheet(headers: &[&str], rows: &[&[&str]]) -> Sheet {
        let mut sheet = Sheet::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            sheet.rows.push(row.iter().map(|c| Cell::from(*c)).collect());
        }
        sheet
    }

    #[test]
    fn test_mapping_rows() {
        let s = sheet(
            &["부서명", "부문", "UNIT명"],
            &[&["간호부", "간호부문", "병동간호팀"], &["원무팀", "행정부문", ""], &["", "x", ""]],
        );
        let rows = mapping_rows_from_sheet(&s, Path::new("map.xlsx")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].unit.as_deref(), Some("병동간호팀"));
        assert_eq!(rows[1].unit, None);
    }

    #[test]
    fn test_mapping_missing_column() {
        let s = sheet(&["부서", "부문"], &[]);
        assert!(matches!(
            mapping_rows_from_sheet(&s, Path::new("map.xlsx")),
            Err(SurveyError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_standardization() {
        let s = sheet(
            &["변경전_부서명", "표준_부서명"],
            &[&["원무과", "원무팀"], &["", "무시"]],
        );
        let table = standardization_from_sheet(&s, Path::new("std.xlsx")).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.apply("원무과"), "원무팀");
    }
}
