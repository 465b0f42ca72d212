//! 진행 표시와 작업 통계

use super::retry::RowOutcome;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// 작업 전체 통계. 제어 루프에서만 누적한다
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationStats {
    pub total_rows: usize,
    pub meaningful_rows: usize,
    pub noise_rows: usize,
    /// 체크포인트에서 이어받아 건너뛴 행
    pub resumed_rows: usize,
    pub processed_rows: usize,
    /// 실패한 시도 수 (타임아웃 포함)
    pub errors: u32,
    pub retries: u32,
    pub fallbacks: usize,
    pub timeouts: usize,
    /// 품질 재분석 대상
    pub requalified: usize,
    /// 재분석으로 점수가 오른 행
    pub improved: usize,
}

impl AnnotationStats {
    pub fn absorb(&mut self, outcome: &RowOutcome) {
        self.processed_rows += 1;
        self.errors += outcome.failed_attempts;
        self.retries += outcome.retries;
        if outcome.fell_back {
            self.fallbacks += 1;
        }
        if outcome.timed_out {
            self.timeouts += 1;
        }
    }

    /// 재분석 호출은 처리 건수에 넣지 않는다
    pub fn absorb_requalification(&mut self, outcome: &RowOutcome) {
        self.errors += outcome.failed_attempts;
        self.retries += outcome.retries;
        if outcome.timed_out {
            self.timeouts += 1;
        }
    }

    pub fn print_summary(&self) {
        println!("  전체 행: {}", self.total_rows);
        println!("  분석 대상: {} (노이즈 {})", self.meaningful_rows, self.noise_rows);
        if self.resumed_rows > 0 {
            println!("  이어받은 행: {}", self.resumed_rows);
        }
        println!("  이번 실행 처리: {}", self.processed_rows);
        println!(
            "  오류: {} (재시도 {}, 대체 결과 {}, 시간 초과 {})",
            self.errors, self.retries, self.fallbacks, self.timeouts
        );
        if self.requalified > 0 {
            println!("  품질 재분석: {} (개선 {})", self.requalified, self.improved);
        }
    }
}

/// 진행 막대. 비활성화 시 아무것도 출력하지 않는다
pub fn progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}
