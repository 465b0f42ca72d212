//! 실제 Gemini API 호출 테스트
//!
//! GEMINI_API_KEY가 없으면 건너뛴다.

use collab_survey::annotator::{GeminiClient, TextAnalyzer};
use collab_survey_common::{build_analysis_prompt, parse_analysis_response, Sentiment};
use std::time::Duration;

const MODEL: &str = "gemini-2.5-flash";

#[tokio::test]
async fn gemini_analysis_integration() {
    let api_key = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            eprintln!("GEMINI_API_KEY not set; skipping integration test");
            return;
        }
    };

    let client = GeminiClient::new(api_key, MODEL, Duration::from_secs(60))
        .expect("HTTP 클라이언트 생성 실패");
    let prompt = build_analysis_prompt("야간 응급 검사 요청에도 항상 친절하게 협조해 주셔서 감사합니다.");

    let body = client.complete(&prompt).await.expect("Gemini 호출 실패");
    let result = parse_analysis_response(&body).expect("응답 스키마 검증 실패");

    assert!(!result.refined_text.is_empty());
    assert_ne!(result.sentiment, Sentiment::Unspecified);
    assert!(result.intensity.is_some_and(|v| (1..=10).contains(&v)));
    assert!(result.confidence.is_some_and(|v| (1..=10).contains(&v)));
}
