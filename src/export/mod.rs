pub mod excel;

pub use excel::{annotated_sheet, write_annotated, write_workbook, SheetData};

use std::path::{Path, PathBuf};

/// 파일명용 타임스탬프 (YYYYmmdd_HHMMSS)
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// 입력 파일 옆에 `{stem}_{tag}_{timestamp}.xlsx` 경로를 만든다
pub fn sibling_output_path(input: &Path, tag: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".into());
    let dir = input.parent().unwrap_or(Path::new("."));
    dir.join(format!("{}_{}_{}.xlsx", stem, tag, timestamp()))
}

/// 중단 시 부분 결과 파일 경로
pub fn partial_output_path(input: &Path) -> PathBuf {
    sibling_output_path(input, "partial")
}
