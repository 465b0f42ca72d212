//! 원격 텍스트 분석 호출
//!
//! [`TextAnalyzer`]는 프롬프트 하나를 보내 응답 본문 문자열을 돌려받는 경계다.
//! 실제 구현은 Gemini REST(`generateContent`), 테스트는 메모리 내 가짜 구현을 쓴다.

use crate::error::{Result, SurveyError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// 일시적 오류로 보는 메시지 조각 (소문자 비교)
const TRANSIENT_MARKERS: &[&str] = &["429", "resource exhausted", "resource_exhausted", "quota", "rate limit"];

/// 원격 호출 실패
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("전송 오류: {0}")]
    Transport(String),

    #[error("응답 형식 오류: {0}")]
    Response(String),
}

impl RemoteError {
    /// 레이트 리밋/쿼터 계열인지
    pub fn is_transient(&self) -> bool {
        let message = self.to_string().to_lowercase();
        TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
    }
}

/// 프롬프트 → 응답 본문
pub trait TextAnalyzer: Send + Sync + 'static {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = std::result::Result<String, RemoteError>> + Send;
}

/// Gemini API 요청
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini API 응답
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SurveyError::ApiCall(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, RemoteError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json".into(),
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Response(e.to_string()))?;

        payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RemoteError::Response("candidates[0].content.parts[0].text 없음".into()))
    }
}

impl TextAnalyzer for GeminiClient {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = std::result::Result<String, RemoteError>> + Send {
        self.generate(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let rate_limited = RemoteError::Http {
            status: 429,
            body: "RESOURCE_EXHAUSTED".into(),
        };
        assert!(rate_limited.is_transient());
        assert!(RemoteError::Transport("Quota exceeded for metric".into()).is_transient());
        assert!(RemoteError::Transport("Resource exhausted".into()).is_transient());

        let server = RemoteError::Http {
            status: 500,
            body: "internal".into(),
        };
        assert!(!server.is_transient());
        assert!(!RemoteError::Response("빈 응답".into()).is_transient());
    }

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi".into() }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json".into(),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("k".into(), "gemini-2.5-flash", Duration::from_secs(5)).unwrap();
        assert!(client.endpoint().ends_with("/gemini-2.5-flash:generateContent"));
    }
}
