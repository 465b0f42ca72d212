//! 데이터 정제 리포트
//!
//! 처리 완료 결과 시트(위치 고정 27컬럼)에 제외 규칙을 순서대로 적용하고 단계별 연도별 행 수를 남긴다.
//! 1. 평가/피평가 부문이 제외 부문이면 제거
//! 2. 평가/피평가 부서가 제외 부서면 제거
//! 3. 종합점수가 숫자가 아니면 제거

use crate::config::CleaningRules;
use crate::error::{Result, SurveyError};
use crate::export::SheetData;
use crate::sheet::{Cell, Sheet};
use collab_survey_common::schema;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// 연도 → 행 수
pub type YearCounts = BTreeMap<String, usize>;

/// 한 정제 단계의 결과
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningStep {
    pub name: String,
    pub removed: usize,
    pub removed_by_year: YearCounts,
    pub remaining: usize,
    pub remaining_by_year: YearCounts,
}

#[derive(Debug, Clone)]
pub struct CleaningReport {
    pub original_rows: usize,
    pub original_by_year: YearCounts,
    pub steps: Vec<CleaningStep>,
    /// 정제 후 남은 행
    pub cleaned: Sheet,
}

struct Positions {
    year: usize,
    evaluator_dept: usize,
    evaluator_division: usize,
    evaluated_dept: usize,
    evaluated_division: usize,
    overall: usize,
}

impl Positions {
    fn locate(headers: &[String]) -> Option<Self> {
        let find = |name| schema::column_index(headers, name);
        Some(Self {
            year: find(schema::SURVEY_YEAR)?,
            evaluator_dept: find(schema::EVALUATOR_DEPT)?,
            evaluator_division: find(schema::EVALUATOR_DIVISION)?,
            evaluated_dept: find(schema::EVALUATED_DEPT)?,
            evaluated_division: find(schema::EVALUATED_DIVISION)?,
            overall: find(schema::OVERALL_SCORE)?,
        })
    }
}

fn count_by_year(rows: &[&Vec<Cell>], year_col: usize) -> YearCounts {
    let mut counts = YearCounts::new();
    for row in rows {
        let year = row.get(year_col).map(Cell::as_text).unwrap_or_default();
        *counts.entry(year.trim().to_string()).or_insert(0) += 1;
    }
    counts
}

/// 결과 시트 헤더를 위치 기준으로 재지정하고 드리프트를 경고
pub fn normalize_headers(sheet: &mut Sheet) -> Result<()> {
    let (headers, drift) = schema::reassign_headers(&sheet.headers)
        .map_err(|e| SurveyError::SchemaMismatch(e.to_string()))?;
    for d in &drift {
        warn!(
            "헤더 드리프트: {}번째 컬럼 '{}' → '{}'로 간주",
            d.position + 1,
            d.found,
            d.expected
        );
    }
    sheet.headers = headers;
    Ok(())
}

/// 정제 규칙 적용
pub fn clean_results(sheet: &Sheet, rules: &CleaningRules) -> Result<CleaningReport> {
    let mut sheet = sheet.clone();
    normalize_headers(&mut sheet)?;
    let pos = Positions::locate(&sheet.headers)
        .ok_or_else(|| SurveyError::SchemaMismatch("필수 컬럼 위치를 찾을 수 없습니다".into()))?;

    let text = |row: &Vec<Cell>, col: usize| -> String {
        row.get(col).map(Cell::as_text).unwrap_or_default().trim().to_string()
    };

    let mut current: Vec<&Vec<Cell>> = sheet.rows.iter().collect();
    let original_by_year = count_by_year(&current, pos.year);
    let original_rows = current.len();
    let mut steps = Vec::new();

    let mut apply = |name: String, current: &mut Vec<&Vec<Cell>>, keep: &dyn Fn(&Vec<Cell>) -> bool| {
        let (kept, removed): (Vec<&Vec<Cell>>, Vec<&Vec<Cell>>) =
            current.iter().copied().partition(|row| keep(*row));
        let step = CleaningStep {
            name,
            removed: removed.len(),
            removed_by_year: count_by_year(&removed, pos.year),
            remaining: kept.len(),
            remaining_by_year: count_by_year(&kept, pos.year),
        };
        info!("{}: {}행 제거, {}행 남음", step.name, step.removed, step.remaining);
        steps.push(step);
        *current = kept;
    };

    for division in &rules.excluded_divisions {
        apply(
            format!("부문 제외: {}", division),
            &mut current,
            &|row: &Vec<Cell>| {
                text(row, pos.evaluator_division) != *division
                    && text(row, pos.evaluated_division) != *division
            },
        );
    }

    for team in &rules.excluded_teams {
        apply(
            format!("부서 제외: {}", team),
            &mut current,
            &|row: &Vec<Cell>| text(row, pos.evaluator_dept) != *team && text(row, pos.evaluated_dept) != *team,
        );
    }

    apply(
        "종합점수 결측 제거".to_string(),
        &mut current,
        &|row: &Vec<Cell>| row.get(pos.overall).and_then(Cell::as_number).is_some(),
    );

    let mut cleaned = Sheet::new(sheet.headers.clone());
    cleaned.rows = current.into_iter().cloned().collect();

    Ok(CleaningReport {
        original_rows,
        original_by_year,
        steps,
        cleaned,
    })
}

impl CleaningReport {
    /// 단계별 연도별 행 수 시트
    pub fn summary_sheet(&self) -> SheetData {
        let mut data = SheetData::new(
            "정제요약",
            vec![
                "단계".into(),
                "연도".into(),
                "제거".into(),
                "남은 행".into(),
                "원본 대비 감소".into(),
            ],
        );

        for (year, count) in &self.original_by_year {
            data.push_row(vec![
                "원본".into(),
                year.as_str().into(),
                Cell::Number(0.0),
                Cell::Number(*count as f64),
                Cell::Number(0.0),
            ]);
        }

        for step in &self.steps {
            for (year, original) in &self.original_by_year {
                let remaining = step.remaining_by_year.get(year).copied().unwrap_or(0);
                let removed = step.removed_by_year.get(year).copied().unwrap_or(0);
                data.push_row(vec![
                    step.name.as_str().into(),
                    year.as_str().into(),
                    Cell::Number(removed as f64),
                    Cell::Number(remaining as f64),
                    Cell::Number(original.saturating_sub(remaining) as f64),
                ]);
            }
        }

        data
    }

    pub fn print(&self) {
        println!("원본: {}행", self.original_rows);
        for (year, count) in &self.original_by_year {
            println!("  {}년: {}행", year, count);
        }
        for step in &self.steps {
            println!("\n{}: {}행 제거 → {}행", step.name, step.removed, step.remaining);
            for (year, count) in &step.remaining_by_year {
                let original = self.original_by_year.get(year).copied().unwrap_or(0);
                println!(
                    "  {}년: {}행 (원본 대비 -{}행)",
                    year,
                    count,
                    original.saturating_sub(*count)
                );
            }
        }
    }

    /// 정제 데이터와 요약 시트를 저장
    pub fn write(&self, output: &std::path::Path) -> Result<()> {
        crate::export::write_workbook(
            output,
            &[
                SheetData::from_sheet("정제데이터", &self.cleaned),
                self.summary_sheet(),
            ],
        )
    }
}
