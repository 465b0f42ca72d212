//! 설문 준비 단계
//!
//! 원시 설문 시트에 부서명 표준화, 부문 판정, 점수 환산을 적용해 위치 고정 스키마의 시트를 만든다.
//! 평가자/피평가자 부문 판정은 각각 별도의 [`LabelingStats`]에 집계된다.

pub mod tables;

use crate::error::{Result, SurveyError};
use crate::export::SheetData;
use crate::sheet::{Cell, Sheet};
use collab_survey_common::schema::{self, QUESTION_COLUMNS, SURVEY_COLUMN_COUNT};
use collab_survey_common::{summarize_scores, DepartmentDirectory, LabelingStats};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

const EVALUATOR_DEPT_ALIASES: [&str; 2] = [schema::EVALUATOR_DEPT, "부서명"];
const EVALUATOR_UNIT_ALIASES: [&str; 2] = [schema::EVALUATOR_UNIT, "UNIT명"];
const EVALUATED_DEPT_ALIASES: [&str; 1] = [schema::EVALUATED_DEPT];
const EVALUATED_UNIT_ALIASES: [&str; 2] = [schema::EVALUATED_UNIT, "피평가대상 Unit명"];
/// 원시 시트의 서술형 문항 헤더 일부
const COLLAB_TYPE_MARKER: &str = "어떤 업무를 협력하여";
const REVIEW_MARKER: &str = "만족스러웠거나 아쉬웠던 경험";

#[derive(Debug, Clone, Default)]
pub struct PrepareOptions {
    /// response_id 접두사 (보통 입력 파일명)
    pub identifier: String,
    /// 시트에 설문시행연도 컬럼이 없을 때 사용할 연도
    pub year: Option<String>,
}

impl PrepareOptions {
    /// 지정 연도가 없으면 식별자의 첫 `_` 앞부분 (예: "2022_1" → "2022")
    fn fallback_year(&self) -> String {
        self.year.clone().unwrap_or_else(|| {
            self.identifier
                .split('_')
                .next()
                .unwrap_or(&self.identifier)
                .to_string()
        })
    }
}

/// 준비 결과 요약
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrepareSummary {
    pub input_rows: usize,
    pub duplicate_rows: usize,
    pub output_rows: usize,
    pub missing_rows: usize,
    pub extreme_rows: usize,
    pub mean_score: Option<f64>,
    pub evaluator: LabelingStats,
    pub evaluated: LabelingStats,
}

#[derive(Debug, Clone)]
pub struct PreparedSurvey {
    pub sheet: Sheet,
    pub summary: PrepareSummary,
}

struct SourceColumns {
    year: Option<usize>,
    evaluator_dept: Option<usize>,
    evaluator_unit: Option<usize>,
    evaluated_dept: usize,
    evaluated_unit: Option<usize>,
    questions: Vec<Option<usize>>,
    collab_type: Option<usize>,
    review: Option<usize>,
}

fn find_any(sheet: &Sheet, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| sheet.find_column(name))
}

fn find_containing(sheet: &Sheet, exact: &str, marker: &str) -> Option<usize> {
    sheet
        .find_column(exact)
        .or_else(|| sheet.headers.iter().position(|h| h.contains(marker)))
}

impl SourceColumns {
    fn locate(sheet: &Sheet) -> Result<Self> {
        let evaluated_dept = find_any(sheet, &EVALUATED_DEPT_ALIASES)
            .ok_or_else(|| SurveyError::ColumnNotFound(schema::EVALUATED_DEPT.to_string()))?;

        Ok(Self {
            year: sheet.find_column(schema::SURVEY_YEAR),
            evaluator_dept: find_any(sheet, &EVALUATOR_DEPT_ALIASES),
            evaluator_unit: find_any(sheet, &EVALUATOR_UNIT_ALIASES),
            evaluated_dept,
            evaluated_unit: find_any(sheet, &EVALUATED_UNIT_ALIASES),
            questions: QUESTION_COLUMNS
                .iter()
                .map(|q| sheet.find_column(q))
                .collect(),
            collab_type: find_containing(sheet, schema::COLLAB_TYPE, COLLAB_TYPE_MARKER),
            review: find_containing(sheet, schema::REVIEW_TEXT, REVIEW_MARKER),
        })
    }
}

fn optional_text(sheet: &Sheet, row: usize, col: Option<usize>) -> String {
    col.map(|c| sheet.text(row, c).trim().to_string())
        .unwrap_or_default()
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// 원시 설문 시트를 준비된 시트로 변환
pub fn prepare_survey(
    raw: &Sheet,
    directory: &DepartmentDirectory,
    options: &PrepareOptions,
) -> Result<PreparedSurvey> {
    let columns = SourceColumns::locate(raw)?;
    let fallback_year = options.fallback_year();
    let standard = directory.standardization();

    let headers: Vec<String> = schema::result_columns()
        .into_iter()
        .take(SURVEY_COLUMN_COUNT)
        .map(str::to_string)
        .collect();
    let mut sheet = Sheet::new(headers);

    let mut summary = PrepareSummary {
        input_rows: raw.len(),
        ..Default::default()
    };
    let mut seen = HashSet::new();
    let mut score_sum = 0.0;
    let mut score_count = 0usize;

    for row in 0..raw.len() {
        let key: Vec<String> = raw.rows[row].iter().map(Cell::as_text).collect();
        if !seen.insert(key) {
            summary.duplicate_rows += 1;
            continue;
        }

        let year = columns
            .year
            .map(|c| raw.text(row, c).trim().to_string())
            .filter(|y| !y.is_empty())
            .unwrap_or_else(|| fallback_year.clone());

        let evaluator_raw = optional_text(raw, row, columns.evaluator_dept);
        let evaluator_unit = optional_text(raw, row, columns.evaluator_unit);
        let evaluated_raw = raw.text(row, columns.evaluated_dept).trim().to_string();
        let evaluated_unit = optional_text(raw, row, columns.evaluated_unit);

        let evaluator = directory.resolve(
            non_empty(&evaluator_raw),
            non_empty(&evaluator_unit),
            &mut summary.evaluator,
        );
        let evaluated = directory.resolve(
            non_empty(&evaluated_raw),
            non_empty(&evaluated_unit),
            &mut summary.evaluated,
        );

        let answers: Vec<Option<f64>> = columns
            .questions
            .iter()
            .map(|col| col.and_then(|c| raw.cell(row, c).as_number()))
            .collect();
        let scores = summarize_scores(&answers);
        if scores.has_missing {
            summary.missing_rows += 1;
        }
        if scores.is_extreme {
            summary.extreme_rows += 1;
        }
        if let Some(overall) = scores.overall {
            score_sum += overall;
            score_count += 1;
        }

        let mut cells: Vec<Cell> = vec![
            format!("{}_{}", options.identifier, row + 1).into(),
            year.into(),
            standard.apply(&evaluator_raw).to_string().into(),
            evaluator_raw.as_str().into(),
            evaluator_unit.into(),
            evaluator.division.into(),
            standard.apply(&evaluated_raw).to_string().into(),
            evaluated_raw.as_str().into(),
            evaluated_unit.into(),
            evaluated.division.into(),
        ];
        cells.extend(scores.converted.iter().map(|s| Cell::from(*s)));
        cells.push(Cell::from(scores.overall));
        cells.push(scores.extreme_label().into());
        cells.push(scores.missing_label().into());
        cells.push(optional_text(raw, row, columns.collab_type).into());
        cells.push(optional_text(raw, row, columns.review).into());

        debug_assert_eq!(cells.len(), SURVEY_COLUMN_COUNT);
        sheet.rows.push(cells);
    }

    summary.output_rows = sheet.len();
    summary.mean_score = (score_count > 0)
        .then(|| ((score_sum / score_count as f64) * 100.0).round() / 100.0);

    if summary.duplicate_rows > 0 {
        debug!("중복 행 {}개 제거", summary.duplicate_rows);
    }
    info!(
        "설문 준비 완료: {}행 (결측 {}행, 극단값 {}행)",
        summary.output_rows, summary.missing_rows, summary.extreme_rows
    );

    Ok(PreparedSurvey { sheet, summary })
}

/// 라벨링 통계 시트
pub fn labeling_report_sheet(summary: &PrepareSummary) -> SheetData {
    let mut data = SheetData::new(
        "labeling_report",
        vec!["구분".into(), "항목".into(), "값".into()],
    );

    for (scope, stats) in [("평가자", &summary.evaluator), ("피평가자", &summary.evaluated)] {
        for (match_type, count) in stats.entries() {
            data.push_row(vec![
                scope.into(),
                match_type.as_str().into(),
                Cell::Number(count as f64),
            ]);
        }
        data.push_row(vec![scope.into(), "total".into(), Cell::Number(stats.total() as f64)]);
    }

    let totals = [
        ("입력 행", summary.input_rows),
        ("중복 제거", summary.duplicate_rows),
        ("출력 행", summary.output_rows),
        ("결측값 포함", summary.missing_rows),
        ("극단값", summary.extreme_rows),
    ];
    for (label, value) in totals {
        data.push_row(vec!["요약".into(), label.into(), Cell::Number(value as f64)]);
    }
    data.push_row(vec![
        "요약".into(),
        "평균 종합점수".into(),
        Cell::from(summary.mean_score),
    ]);

    data
}

/// 준비된 시트와 라벨링 리포트를 한 파일로 저장
pub fn write_prepared(output: &std::path::Path, prepared: &PreparedSurvey) -> Result<()> {
    crate::export::write_workbook(
        output,
        &[
            SheetData::from_sheet("설문데이터", &prepared.sheet),
            labeling_report_sheet(&prepared.summary),
        ],
    )
}

/// 통계를 콘솔에 출력
pub fn print_labeling_stats(summary: &PrepareSummary) {
    for (scope, stats) in [("평가자", &summary.evaluator), ("피평가자", &summary.evaluated)] {
        println!("  [{}] 총 {}건", scope, stats.total());
        for (match_type, count) in stats.entries() {
            println!("    {:<16} {}", match_type.as_str(), count);
        }
    }
}
