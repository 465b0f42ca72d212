//! 원격 모델 응답 파서
//!
//! 응답은 단일 JSON 객체여야 한다. 앞뒤 공백과 한 겹의 ```json 코드 펜스만 허용하며,
//! 본문 중간에서 JSON을 잘라내는 식의 관대한 추출은 하지 않는다.

use crate::error::{Error, Result};
use crate::types::AnalysisResult;

/// 한 겹의 코드 펜스를 벗긴다. 펜스가 없으면 그대로 돌려준다
fn strip_fence(body: &str) -> Result<&str> {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return Ok(trimmed);
    };

    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);

    let inner = rest
        .strip_suffix("```")
        .ok_or_else(|| Error::Parse("코드 펜스가 닫히지 않았습니다".into()))?;

    Ok(inner.trim())
}

/// 분석 응답을 파싱하고 검증
///
/// # Errors
/// * `Error::Parse` - 빈 응답, 닫히지 않은 펜스, 객체가 아닌 JSON
/// * `Error::Validation` - 스키마 불일치 (알 수 없는 키, 누락 키, 범위 밖 점수, 잘못된 감정값)
pub fn parse_analysis_response(body: &str) -> Result<AnalysisResult> {
    let json = strip_fence(body)?;
    if json.is_empty() {
        return Err(Error::Parse("빈 응답".into()));
    }
    if !json.starts_with('{') {
        return Err(Error::Parse(format!(
            "JSON 객체가 아닙니다: {}",
            json.chars().take(40).collect::<String>()
        )));
    }

    serde_json::from_str::<AnalysisResult>(json).map_err(|e| {
        if e.is_syntax() || e.is_eof() {
            Error::Parse(format!("JSON 구문 오류: {}", e))
        } else {
            Error::Validation(e.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sentiment;

    const VALID: &str = r#"{"정제된_텍스트": "업무 협조가 빠릅니다.", "비식별_처리": true,
        "감정_분류": "긍정", "감정_강도_점수": 8, "핵심_키워드": ["협조"],
        "의료_맥락": ["업무_협조"], "신뢰도_점수": 9}"#;

    #[test]
    fn test_plain_object() {
        let result = parse_analysis_response(VALID).unwrap();
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert!(result.is_anonymized);
    }

    #[test]
    fn test_fenced_object() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(parse_analysis_response(&fenced).is_ok());
        let bare_fence = format!("```\n{}\n```", VALID);
        assert!(parse_analysis_response(&bare_fence).is_ok());
    }

    #[test]
    fn test_surrounding_prose_rejected() {
        let chatty = format!("분석 결과입니다:\n{}", VALID);
        assert!(matches!(parse_analysis_response(&chatty), Err(Error::Parse(_))));
        let trailing = format!("{} 감사합니다", VALID);
        assert!(parse_analysis_response(&trailing).is_err());
    }

    #[test]
    fn test_unclosed_fence() {
        let broken = format!("```json\n{}", VALID);
        assert!(matches!(parse_analysis_response(&broken), Err(Error::Parse(_))));
    }

    #[test]
    fn test_array_rejected() {
        assert!(parse_analysis_response(&format!("[{}]", VALID)).is_err());
        assert!(parse_analysis_response("").is_err());
    }

    #[test]
    fn test_schema_violations_are_validation_errors() {
        let bad_sentiment = VALID.replace("\"긍정\"", "\"매우 긍정\"");
        assert!(matches!(
            parse_analysis_response(&bad_sentiment),
            Err(Error::Validation(_))
        ));

        let missing = r#"{"정제된_텍스트": "x"}"#;
        assert!(matches!(parse_analysis_response(missing), Err(Error::Validation(_))));

        let zero_score = VALID.replace("\"신뢰도_점수\": 9", "\"신뢰도_점수\": 0");
        assert!(matches!(
            parse_analysis_response(&zero_score),
            Err(Error::Validation(_))
        ));
    }
}
