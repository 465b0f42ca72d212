//! 행 단위 재시도
//!
//! 호출 실패와 응답 검증 실패는 같은 재시도 예산을 쓴다. 예산을 다 쓰면 대체 결과로 채운다.

use super::client::{RemoteError, TextAnalyzer};
use crate::config::{RetryPolicy, MAX_RETRY_DELAY_SECS};
use collab_survey_common::{build_analysis_prompt, parse_analysis_response, AnalysisResult};
use std::time::Duration;
use tracing::{debug, warn};

/// 한 번의 시도가 실패한 이유
#[derive(Debug, thiserror::Error)]
pub enum AttemptFailure {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("응답 검증 실패: {0}")]
    Invalid(#[from] collab_survey_common::Error),
}

impl AttemptFailure {
    pub fn is_transient(&self) -> bool {
        match self {
            AttemptFailure::Remote(e) => e.is_transient(),
            AttemptFailure::Invalid(_) => false,
        }
    }
}

/// 다음 시도 전 대기 시간 (attempt는 0부터)
///
/// 일시적 오류: `base * 2^attempt + attempt * jitter_step`, 그 외: `base * (attempt + 1)`.
/// 결과는 `0..=MAX_RETRY_DELAY_SECS`로 자른다.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, transient: bool) -> Duration {
    let secs = if transient {
        policy.base_delay_secs * 2f64.powi(attempt as i32) + attempt as f64 * policy.jitter_step_secs
    } else {
        policy.base_delay_secs * (attempt + 1) as f64
    };
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_RETRY_DELAY_SECS))
}

/// 행 하나의 처리 결과와 집계용 수치
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub result: AnalysisResult,
    /// 실패한 시도 수 (타임아웃 포함)
    pub failed_attempts: u32,
    /// 재시도 횟수
    pub retries: u32,
    pub fell_back: bool,
    pub timed_out: bool,
}

impl RowOutcome {
    fn success(result: AnalysisResult, failed_attempts: u32) -> Self {
        Self {
            result,
            failed_attempts,
            retries: failed_attempts,
            fell_back: false,
            timed_out: false,
        }
    }

    /// 호출 전체가 시간 초과된 경우
    pub fn timed_out(original: &str) -> Self {
        Self {
            result: AnalysisResult::fallback(original),
            failed_attempts: 1,
            retries: 0,
            fell_back: true,
            timed_out: true,
        }
    }

    /// 작업 자체가 비정상 종료된 경우
    pub fn aborted(original: &str) -> Self {
        Self {
            result: AnalysisResult::fallback(original),
            failed_attempts: 1,
            retries: 0,
            fell_back: true,
            timed_out: false,
        }
    }
}

/// 분석 호출을 재시도 정책에 따라 실행
pub async fn analyze_with_retry<A: TextAnalyzer>(
    analyzer: &A,
    text: &str,
    policy: &RetryPolicy,
) -> RowOutcome {
    let prompt = build_analysis_prompt(text);
    let max_attempts = policy.max_attempts.max(1);
    let mut failed_attempts = 0;

    for attempt in 0..max_attempts {
        let outcome: Result<AnalysisResult, AttemptFailure> = match analyzer.complete(&prompt).await {
            Ok(body) => parse_analysis_response(&body).map_err(AttemptFailure::from),
            Err(e) => Err(AttemptFailure::from(e)),
        };

        match outcome {
            Ok(result) => return RowOutcome::success(result, failed_attempts),
            Err(failure) => {
                failed_attempts += 1;
                if attempt + 1 >= max_attempts {
                    warn!("분석 실패 ({}회 시도), 대체 결과 사용: {}", max_attempts, failure);
                    break;
                }
                let delay = backoff_delay(policy, attempt, failure.is_transient());
                debug!(
                    "시도 {}/{} 실패, {:.1}초 후 재시도: {}",
                    attempt + 1,
                    max_attempts,
                    delay.as_secs_f64(),
                    failure
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    RowOutcome {
        result: AnalysisResult::fallback(text),
        failed_attempts,
        retries: failed_attempts.saturating_sub(1),
        fell_back: true,
        timed_out: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_transient_is_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(backoff_delay(&policy, 0, true), Duration::from_secs_f64(1.0));
        assert_eq!(backoff_delay(&policy, 1, true), Duration::from_secs_f64(2.5));
        assert_eq!(backoff_delay(&policy, 2, true), Duration::from_secs_f64(5.0));
    }

    #[test]
    fn test_backoff_other_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(backoff_delay(&policy, 0, false), Duration::from_secs_f64(1.0));
        assert_eq!(backoff_delay(&policy, 1, false), Duration::from_secs_f64(2.0));
        assert_eq!(backoff_delay(&policy, 2, false), Duration::from_secs_f64(3.0));
    }

    #[test]
    fn test_immediate_policy_has_no_delay() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(backoff_delay(&policy, 2, true), Duration::ZERO);
    }

    #[test]
    fn test_backoff_is_capped() {
        let max = Duration::from_secs_f64(MAX_RETRY_DELAY_SECS);
        let huge = RetryPolicy {
            max_attempts: 3,
            base_delay_secs: 1e20,
            jitter_step_secs: 0.0,
        };
        assert_eq!(backoff_delay(&huge, 0, false), max);
        assert_eq!(backoff_delay(&huge, 2, true), max);

        // 시도가 많아도 지수 증가가 상한을 넘지 않는다
        assert_eq!(backoff_delay(&RetryPolicy::default(), 2000, true), max);

        let broken = RetryPolicy {
            max_attempts: 3,
            base_delay_secs: f64::NAN,
            jitter_step_secs: 0.0,
        };
        assert_eq!(backoff_delay(&broken, 1, false), Duration::ZERO);
    }

    #[test]
    fn test_parse_failure_is_not_transient() {
        let failure = AttemptFailure::from(collab_survey_common::Error::Parse("빈 응답".into()));
        assert!(!failure.is_transient());
        assert_eq!(failure.to_string(), "응답 검증 실패: Parse error: 빈 응답");
    }
}
