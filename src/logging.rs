//! 로그 초기화
//!
//! 진단 로그는 stderr(tracing), 진행 상황 출력은 stdout(println/indicatif)으로 분리한다.

use tracing_subscriber::EnvFilter;

/// RUST_LOG가 없으면 info, --verbose면 debug
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 테스트 등에서 이미 초기화된 경우 무시
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
