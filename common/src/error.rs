//! 에러 타입 정의

use thiserror::Error;

/// 공통 에러 타입
///
/// 이 크레이트는 입출력을 하지 않으므로 응답 해석과 스키마 검증 실패만 다룬다.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
