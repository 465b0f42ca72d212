//! 분석 결과 품질 점수
//!
//! 모델이 보고한 신뢰도에서 출발해 규칙별 감점을 적용한다.
//! 재분석 대상(needs_review)과 신뢰 가능(is_reliable) 판정 기준은 [`QualityThresholds`]로 설정한다.

use crate::types::{AnalysisResult, Sentiment};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

const DEFAULT_SCORE: i32 = 5;
const MISSING_FIELDS_PENALTY: i32 = 3;
const SENTIMENT_MISMATCH_PENALTY: i32 = 2;
const OVER_SHORTENED_PENALTY: i32 = 2;
const OVER_EXPANDED_PENALTY: i32 = 1;
const NO_KEYWORDS_PENALTY: i32 = 2;
const NAME_LEAK_PENALTY: i32 = 3;

lazy_static! {
    static ref NAME_WITH_TITLE_RE: Regex =
        Regex::new(r"[가-힣]{2,3}\s*(선생님|과장|팀장|대리)").unwrap();
}

/// 판정 기준
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// 이 점수 미만이면 재분석
    pub review_below: u8,
    /// 이슈가 이 개수를 넘으면 재분석
    pub review_max_issues: usize,
    pub reliable_min: u8,
    pub reliable_max_issues: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            review_below: 6,
            review_max_issues: 2,
            reliable_min: 7,
            reliable_max_issues: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub quality_score: u8,
    pub issues: Vec<String>,
    pub needs_review: bool,
    pub is_reliable: bool,
}

fn char_len(text: &str) -> usize {
    text.trim().chars().count()
}

/// 결과 하나의 품질을 평가
pub fn score_result(
    result: &AnalysisResult,
    original: &str,
    thresholds: &QualityThresholds,
) -> QualityReport {
    let mut score = result.confidence.map(i32::from).unwrap_or(DEFAULT_SCORE);
    let mut issues = Vec::new();

    if result.refined_text.trim().is_empty()
        || result.sentiment == Sentiment::Unspecified
        || result.intensity.is_none()
        || result.keywords.is_empty()
    {
        // 감점만 하고 이슈로는 세지 않는다
        score -= MISSING_FIELDS_PENALTY;
    }

    let intensity = result.intensity.map(i32::from).unwrap_or(DEFAULT_SCORE);
    match result.sentiment {
        Sentiment::Positive if intensity < 6 => {
            score -= SENTIMENT_MISMATCH_PENALTY;
            issues.push(format!("긍정인데 감정 강도가 낮음({})", intensity));
        }
        Sentiment::Negative if intensity > 5 => {
            score -= SENTIMENT_MISMATCH_PENALTY;
            issues.push(format!("부정인데 감정 강도가 높음({})", intensity));
        }
        _ => {}
    }

    let original_len = char_len(original);
    let refined_len = char_len(&result.refined_text);
    if original_len > 10 && refined_len * 10 < original_len * 3 {
        score -= OVER_SHORTENED_PENALTY;
        issues.push(format!("정제 텍스트가 과도하게 짧음({}/{})", refined_len, original_len));
    } else if refined_len > original_len * 2 {
        score -= OVER_EXPANDED_PENALTY;
        issues.push(format!("정제 텍스트가 과도하게 김({}/{})", refined_len, original_len));
    }

    if original_len > 20 && result.keywords.is_empty() {
        score -= NO_KEYWORDS_PENALTY;
        issues.push("긴 응답에 키워드 없음".to_string());
    }

    if result.is_anonymized && NAME_WITH_TITLE_RE.is_match(&result.refined_text) {
        score -= NAME_LEAK_PENALTY;
        issues.push("비식별 처리 후에도 이름+호칭 잔존".to_string());
    }

    let quality_score = score.clamp(1, 10) as u8;
    let needs_review =
        quality_score < thresholds.review_below || issues.len() > thresholds.review_max_issues;
    let is_reliable =
        quality_score >= thresholds.reliable_min && issues.len() <= thresholds.reliable_max_issues;

    QualityReport {
        quality_score,
        issues,
        needs_review,
        is_reliable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "항상 친절하게 협조해 주셔서 업무가 수월합니다.";

    fn good_result() -> AnalysisResult {
        AnalysisResult {
            refined_text: "항상 친절하게 협조해 주셔서 업무가 수월합니다.".into(),
            is_anonymized: false,
            sentiment: Sentiment::Positive,
            intensity: Some(8),
            keywords: vec!["협조".into(), "친절".into()],
            context_tags: vec!["업무_협조".into()],
            confidence: Some(9),
        }
    }

    #[test]
    fn test_clean_result_is_reliable() {
        let report = score_result(&good_result(), ORIGINAL, &QualityThresholds::default());
        assert_eq!(report.quality_score, 9);
        assert!(report.issues.is_empty());
        assert!(report.is_reliable);
        assert!(!report.needs_review);
    }

    #[test]
    fn test_sentiment_intensity_mismatch() {
        let mut result = good_result();
        result.intensity = Some(3);
        let report = score_result(&result, ORIGINAL, &QualityThresholds::default());
        assert_eq!(report.quality_score, 7);
        assert_eq!(report.issues.len(), 1);

        result.sentiment = Sentiment::Negative;
        result.intensity = Some(9);
        let report = score_result(&result, ORIGINAL, &QualityThresholds::default());
        assert_eq!(report.quality_score, 7);
    }

    #[test]
    fn test_over_shortened_and_over_expanded() {
        let mut result = good_result();
        result.refined_text = "협조".into();
        let report = score_result(&result, ORIGINAL, &QualityThresholds::default());
        assert_eq!(report.quality_score, 7);

        let mut result = good_result();
        result.refined_text = "좋아요 좋아요 좋아요".into();
        let report = score_result(&result, "좋아요", &QualityThresholds::default());
        assert_eq!(report.quality_score, 8);
    }

    #[test]
    fn test_name_leak_after_anonymization() {
        let mut result = good_result();
        result.is_anonymized = true;
        result.refined_text = "홍길동 선생님이 항상 친절하게 협조해 주셔서 수월합니다.".into();
        let report = score_result(&result, ORIGINAL, &QualityThresholds::default());
        assert_eq!(report.quality_score, 6);
        assert!(report.issues.iter().any(|i| i.contains("이름")));
    }

    #[test]
    fn test_fallback_needs_review() {
        let report = score_result(
            &AnalysisResult::fallback(ORIGINAL),
            ORIGINAL,
            &QualityThresholds::default(),
        );
        // 신뢰도 1에서 감점 후 하한 1
        assert_eq!(report.quality_score, 1);
        assert!(report.needs_review);
        assert!(!report.is_reliable);
    }

    #[test]
    fn test_score_clamped_to_range() {
        let mut result = good_result();
        result.confidence = Some(10);
        let report = score_result(&result, ORIGINAL, &QualityThresholds::default());
        assert!(report.quality_score <= 10);

        let empty = AnalysisResult::empty();
        let report = score_result(&empty, ORIGINAL, &QualityThresholds::default());
        assert_eq!(report.quality_score, 1);
    }

    #[test]
    fn test_missing_fields_only_lowers_score() {
        let mut result = good_result();
        result.sentiment = Sentiment::Neutral;
        result.intensity = None;
        let report = score_result(&result, ORIGINAL, &QualityThresholds::default());
        assert_eq!(report.quality_score, 6);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_each_defect_costs_its_penalty() {
        let thresholds = QualityThresholds::default();
        let base = good_result();
        assert_eq!(score_result(&base, ORIGINAL, &thresholds).quality_score, 9);

        let mut defects: Vec<(Box<dyn Fn(&mut AnalysisResult)>, u8)> = Vec::new();
        // 필드 누락 3 + 긴 응답 키워드 없음 2
        defects.push((Box::new(|r: &mut AnalysisResult| r.keywords.clear()), 4));
        defects.push((Box::new(|r: &mut AnalysisResult| r.intensity = Some(2)), 7));
        defects.push((Box::new(|r: &mut AnalysisResult| r.refined_text = "짧음".into()), 7));
        defects.push((
            Box::new(|r: &mut AnalysisResult| {
                r.is_anonymized = true;
                r.refined_text = format!("김철수 과장 {}", r.refined_text);
            }),
            6,
        ));

        for (defect, expected) in &defects {
            let mut damaged = base.clone();
            defect(&mut damaged);
            let report = score_result(&damaged, ORIGINAL, &thresholds);
            assert_eq!(report.quality_score, *expected);
        }

        // 누적하면 9 → 4 → 2 → 0(하한 1) → 하한 유지
        let mut all = base.clone();
        let scores: Vec<u8> = defects
            .iter()
            .map(|(defect, _)| {
                defect(&mut all);
                score_result(&all, ORIGINAL, &thresholds).quality_score
            })
            .collect();
        assert_eq!(scores, vec![4, 2, 1, 1]);
    }

    #[test]
    fn test_short_original_without_keywords() {
        // 20자 이하 원문은 키워드 없음 감점이 없다
        let mut result = good_result();
        result.refined_text = "협조가 좋았습니다".into();
        result.keywords.clear();
        let report = score_result(&result, "협조가 좋았습니다", &QualityThresholds::default());
        assert_eq!(report.quality_score, 6);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_custom_thresholds() {
        let strict = QualityThresholds {
            review_below: 10,
            ..QualityThresholds::default()
        };
        let report = score_result(&good_result(), ORIGINAL, &strict);
        assert!(report.needs_review);
    }
}
