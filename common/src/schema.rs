//! 결과 시트 위치 기반 스키마
//!
//! 처리 완료 시트는 헤더 문자열이 아니라 컬럼 위치로 해석한다.
//! 원본 헤더가 기대값과 다르면 드리프트로 보고하고, 컬럼 수가 모자라면 오류로 처리한다.

use crate::error::{Error, Result};
use crate::types::ANALYSIS_COLUMNS;

pub const RESPONSE_ID: &str = "response_id";
pub const SURVEY_YEAR: &str = "설문시행연도";
pub const EVALUATOR_DEPT: &str = "평가_부서명";
pub const EVALUATOR_DEPT_ORIGINAL: &str = "평가_부서명_원본";
pub const EVALUATOR_UNIT: &str = "평가_Unit명";
pub const EVALUATOR_DIVISION: &str = "평가_부문";
pub const EVALUATED_DEPT: &str = "피평가대상 부서명";
pub const EVALUATED_DEPT_ORIGINAL: &str = "피평가대상_부서명_원본";
pub const EVALUATED_UNIT: &str = "피평가대상 UNIT명";
pub const EVALUATED_DIVISION: &str = "피평가대상 부문";
pub const OVERALL_SCORE: &str = "종합점수";
pub const EXTREME_FLAG: &str = "극단값";
pub const MISSING_FLAG: &str = "결측값";
pub const COLLAB_TYPE: &str = "협업 유형";
pub const REVIEW_TEXT: &str = "협업 후기";

/// 5개 설문 문항 (순서 고정)
pub const QUESTION_COLUMNS: [&str; 5] = [
    "○○은 타 부서의 입장을 존중하고 배려하여 협력해주며. 협업 관련 의견을 경청해준다.",
    "○○은 업무상 필요한 정보에 대해 공유가 잘 이루어진다.",
    "○○은 업무에 대한 명확한 담당자가 있고 업무를 일관성있게 처리해준다.",
    "○○은 이전보다 업무 협력에 대한 태도나 의지가 개선되고 있다.",
    "전반적으로 ○○과의 협업에 대해 만족한다.",
];

/// 설문 컬럼 수 (분석 컬럼 제외)
pub const SURVEY_COLUMN_COUNT: usize = 20;

/// 결과 시트의 전체 컬럼 (27개, 위치 고정)
pub fn result_columns() -> Vec<&'static str> {
    let mut columns = vec![
        RESPONSE_ID,
        SURVEY_YEAR,
        EVALUATOR_DEPT,
        EVALUATOR_DEPT_ORIGINAL,
        EVALUATOR_UNIT,
        EVALUATOR_DIVISION,
        EVALUATED_DEPT,
        EVALUATED_DEPT_ORIGINAL,
        EVALUATED_UNIT,
        EVALUATED_DIVISION,
    ];
    columns.extend(QUESTION_COLUMNS);
    columns.extend([OVERALL_SCORE, EXTREME_FLAG, MISSING_FLAG, COLLAB_TYPE, REVIEW_TEXT]);
    columns.extend(ANALYSIS_COLUMNS);
    columns
}

/// 위치 기준 헤더가 기대값과 다른 컬럼
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDrift {
    pub position: usize,
    pub expected: &'static str,
    pub found: String,
}

/// 실제 헤더를 위치 기준으로 기대 스키마에 재지정
///
/// 반환값은 (기대 헤더 목록, 드리프트 목록). 초과 컬럼은 원래 이름을 유지하며 무시된다.
///
/// # Errors
/// 실제 컬럼 수가 기대 컬럼 수보다 적으면 `Error::Validation`
pub fn reassign_headers(actual: &[String]) -> Result<(Vec<String>, Vec<HeaderDrift>)> {
    let expected = result_columns();
    if actual.len() < expected.len() {
        return Err(Error::Validation(format!(
            "결과 시트 컬럼 수 부족: 기대 {}개, 실제 {}개",
            expected.len(),
            actual.len()
        )));
    }

    let drift = expected
        .iter()
        .zip(actual)
        .enumerate()
        .filter(|(_, (want, got))| got.trim() != **want)
        .map(|(position, (want, got))| HeaderDrift {
            position,
            expected: *want,
            found: got.clone(),
        })
        .collect();

    let mut headers: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    headers.extend(actual[expected.len()..].iter().cloned());
    Ok((headers, drift))
}

/// 헤더 목록에서 컬럼 위치 검색
pub fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_columns_layout() {
        let columns = result_columns();
        assert_eq!(columns.len(), 27);
        assert_eq!(columns[0], RESPONSE_ID);
        assert_eq!(columns[10], QUESTION_COLUMNS[0]);
        assert_eq!(columns[SURVEY_COLUMN_COUNT - 1], REVIEW_TEXT);
        assert_eq!(columns[20], "정제된_텍스트");
    }

    #[test]
    fn test_reassign_reports_drift() {
        let mut actual: Vec<String> = result_columns().iter().map(|s| s.to_string()).collect();
        actual[2] = "평가부서".into();
        actual.push("메모".into());

        let (headers, drift) = reassign_headers(&actual).unwrap();
        assert_eq!(headers[2], EVALUATOR_DEPT);
        assert_eq!(headers[27], "메모");
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].position, 2);
        assert_eq!(drift[0].found, "평가부서");
    }

    #[test]
    fn test_reassign_too_few_columns() {
        let actual: Vec<String> = vec!["a".into(); 10];
        assert!(matches!(reassign_headers(&actual), Err(Error::Validation(_))));
    }

    #[test]
    fn test_column_index() {
        let headers: Vec<String> = vec!["a".into(), " 협업 후기 ".into()];
        assert_eq!(column_index(&headers, REVIEW_TEXT), Some(1));
        assert_eq!(column_index(&headers, "x"), None);
    }
}
