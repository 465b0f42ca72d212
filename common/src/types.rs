//! 분석 결과 타입 정의
//!
//! 원격 모델 응답, 체크포인트, 결과 시트가 모두 같은 스키마를 공유한다.
//! 직렬화 키는 결과 시트의 한국어 컬럼명이고, 영어 키는 역직렬화 시에만 별칭으로 받는다.

use serde::{Deserialize, Serialize};

/// 감정 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "긍정", alias = "positive")]
    Positive,
    #[serde(rename = "부정", alias = "negative")]
    Negative,
    #[serde(rename = "중립", alias = "neutral")]
    Neutral,
    /// 무의미한 텍스트 (빈 문자열)
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl Sentiment {
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "긍정",
            Sentiment::Negative => "부정",
            Sentiment::Neutral => "중립",
            Sentiment::Unspecified => "",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 행 하나에 대한 분석 결과
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisResult {
    #[serde(rename = "정제된_텍스트", alias = "refined_text")]
    pub refined_text: String,

    #[serde(rename = "비식별_처리", alias = "is_anonymized")]
    pub is_anonymized: bool,

    #[serde(rename = "감정_분류", alias = "sentiment")]
    pub sentiment: Sentiment,

    /// 1-10, 무의미한 텍스트는 None
    #[serde(rename = "감정_강도_점수", alias = "sentiment_intensity", with = "score_field")]
    pub intensity: Option<u8>,

    #[serde(rename = "핵심_키워드", alias = "key_terms")]
    pub keywords: Vec<String>,

    #[serde(rename = "의료_맥락", alias = "medical_context")]
    pub context_tags: Vec<String>,

    /// 모델 자체 신뢰도 1-10
    #[serde(rename = "신뢰도_점수", alias = "confidence_score", with = "score_field")]
    pub confidence: Option<u8>,
}

/// 결과 시트에 덧붙는 분석 컬럼 (순서 고정)
pub const ANALYSIS_COLUMNS: [&str; 7] = [
    "정제된_텍스트",
    "비식별_처리",
    "감정_분류",
    "감정_강도_점수",
    "핵심_키워드",
    "의료_맥락",
    "신뢰도_점수",
];

impl AnalysisResult {
    /// 노이즈 행 및 미처리 행에 채우는 빈 결과
    pub fn empty() -> Self {
        Self::default()
    }

    /// 원격 호출 실패 시 대체 결과
    pub fn fallback(original_text: &str) -> Self {
        Self {
            refined_text: original_text.to_string(),
            is_anonymized: false,
            sentiment: Sentiment::Neutral,
            intensity: Some(5),
            keywords: Vec::new(),
            context_tags: Vec::new(),
            confidence: Some(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// 분석 컬럼 순서대로 셀 문자열을 만든다
    pub fn to_cells(&self) -> [String; 7] {
        [
            self.refined_text.clone(),
            self.is_anonymized.to_string(),
            self.sentiment.label().to_string(),
            self.intensity.map(|v| v.to_string()).unwrap_or_default(),
            self.keywords.join(", "),
            self.context_tags.join(", "),
            self.confidence.map(|v| v.to_string()).unwrap_or_default(),
        ]
    }
}

/// 1-10 점수 필드: 빈 문자열/null은 None, 그 외에는 1..=10 정수만 허용
mod score_field {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_u8(*v),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::Number(n) => {
                let v = n
                    .as_f64()
                    .ok_or_else(|| D::Error::custom(format!("점수가 숫자가 아님: {}", n)))?;
                if v.fract() != 0.0 || !(1.0..=10.0).contains(&v) {
                    return Err(D::Error::custom(format!("점수 범위(1-10) 초과: {}", n)));
                }
                Ok(Some(v as u8))
            }
            other => Err(D::Error::custom(format!("점수 형식 오류: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_korean_keys() {
        let json = r#"{"정제된_텍스트": "소통이 원활합니다.", "비식별_처리": false, "감정_분류": "긍정",
            "감정_강도_점수": 7, "핵심_키워드": ["소통"], "의료_맥락": ["존중_소통"], "신뢰도_점수": 8}"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.intensity, Some(7));
        assert_eq!(result.confidence, Some(8));
    }

    #[test]
    fn test_deserialize_english_aliases() {
        let json = r#"{"refined_text": "ok", "is_anonymized": true, "sentiment": "negative",
            "sentiment_intensity": 4, "key_terms": [], "medical_context": [], "confidence_score": ""}"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert!(result.is_anonymized);
        assert_eq!(result.confidence, None);
    }

    #[test]
    fn test_empty_scores_roundtrip_as_blank() {
        let json = serde_json::to_value(AnalysisResult::empty()).unwrap();
        assert_eq!(json["감정_강도_점수"], "");
        assert_eq!(json["감정_분류"], "");
        let back: AnalysisResult = serde_json::from_value(json).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let json = r#"{"정제된_텍스트": "", "비식별_처리": false, "감정_분류": "",
            "감정_강도_점수": 11, "핵심_키워드": [], "의료_맥락": [], "신뢰도_점수": ""}"#;
        assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let json = r#"{"정제된_텍스트": "", "비식별_처리": false, "감정_분류": "",
            "감정_강도_점수": "", "핵심_키워드": [], "의료_맥락": [], "신뢰도_점수": "", "extra": 1}"#;
        assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
    }

    #[test]
    fn test_fallback_values() {
        let fallback = AnalysisResult::fallback("원문");
        assert_eq!(fallback.refined_text, "원문");
        assert_eq!(fallback.sentiment, Sentiment::Neutral);
        assert_eq!(fallback.intensity, Some(5));
        assert_eq!(fallback.confidence, Some(1));
    }

    #[test]
    fn test_to_cells() {
        let result = AnalysisResult {
            refined_text: "정보 공유가 잘 됩니다.".into(),
            sentiment: Sentiment::Positive,
            intensity: Some(8),
            keywords: vec!["정보".into(), "공유".into()],
            confidence: Some(9),
            ..Default::default()
        };
        let cells = result.to_cells();
        assert_eq!(cells[1], "false");
        assert_eq!(cells[2], "긍정");
        assert_eq!(cells[4], "정보, 공유");
        assert_eq!(cells[5], "");
    }
}
