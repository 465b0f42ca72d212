//! Collaboration Survey Common Library
//!
//! CLI와 배치 분석기가 공유하는 타입과 규칙:
//! - 부서/부문 라벨 판정 (department)
//! - 주관식 응답 노이즈 필터 (noise)
//! - 원격 모델 응답의 엄격한 파싱 (parser)
//! - 분석 품질 점수 (quality)
//! - 설문 점수 집계 (scores)
//! - 위치 기반 컬럼 스키마 (schema)

pub mod types;
pub mod department;
pub mod error;
pub mod noise;
pub mod parser;
pub mod prompts;
pub mod quality;
pub mod schema;
pub mod scores;

pub use types::{AnalysisResult, Sentiment, ANALYSIS_COLUMNS};
pub use department::{
    DepartmentDirectory, DepartmentRow, LabelingStats, MatchType, Resolution, ResolverOptions,
    StandardizationTable, UNCLASSIFIED, normalize_name,
};
pub use error::{Error, Result};
pub use noise::is_noise;
pub use parser::parse_analysis_response;
pub use prompts::build_analysis_prompt;
pub use quality::{QualityReport, QualityThresholds, score_result};
pub use schema::{HeaderDrift, reassign_headers, result_columns};
pub use scores::{ScoreSummary, convert_likert, summarize_scores};
