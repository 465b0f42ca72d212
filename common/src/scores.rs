//! 설문 점수 집계
//!
//! 5점 척도 문항을 0-100 점수로 환산하고 종합점수/결측값/극단값을 계산한다.

use serde::Serialize;

pub const MISSING_YES: &str = "Y";
pub const MISSING_NO: &str = "N";
pub const EXTREME: &str = "극단값";
pub const NORMAL: &str = "정상";

/// 응답 한 행의 집계 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    /// 문항별 환산 점수 (유효하지 않은 응답은 None)
    pub converted: Vec<Option<f64>>,
    /// 종합점수 (소수 둘째 자리 반올림). 유효 문항이 없으면 None
    pub overall: Option<f64>,
    pub has_missing: bool,
    pub is_extreme: bool,
}

impl ScoreSummary {
    pub fn missing_label(&self) -> &'static str {
        if self.has_missing {
            MISSING_YES
        } else {
            MISSING_NO
        }
    }

    pub fn extreme_label(&self) -> &'static str {
        if self.is_extreme {
            EXTREME
        } else {
            NORMAL
        }
    }
}

/// 1-5 응답을 0-100으로 환산. 범위 밖이거나 정수가 아니면 None
pub fn convert_likert(raw: f64) -> Option<f64> {
    if raw.fract() != 0.0 || !(1.0..=5.0).contains(&raw) {
        return None;
    }
    Some((raw - 1.0) / 4.0 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 한 행의 문항 응답을 집계
pub fn summarize_scores(answers: &[Option<f64>]) -> ScoreSummary {
    let converted: Vec<Option<f64>> = answers
        .iter()
        .map(|a| a.and_then(convert_likert))
        .collect();

    let valid: Vec<f64> = converted.iter().flatten().copied().collect();
    let overall = if valid.is_empty() {
        None
    } else {
        Some(round2(valid.iter().sum::<f64>() / valid.len() as f64))
    };

    ScoreSummary {
        has_missing: converted.iter().any(Option::is_none),
        is_extreme: overall == Some(0.0),
        converted,
        overall,
    }
}
