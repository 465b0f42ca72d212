use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "collab-survey")]
#[command(about = "부서 간 협업 설문 분석 도구", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 상세 로그 출력
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 주관식 응답 컬럼을 AI로 분석해 결과 컬럼을 추가
    Annotate {
        /// 입력 Excel 파일
        #[arg(required = true)]
        input: PathBuf,

        /// 분석할 텍스트 컬럼명
        #[arg(short, long, default_value = "협업 후기")]
        column: String,

        /// 출력 파일 (기본: 입력파일명_분석결과_타임스탬프.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 배치 크기 (설정값보다 우선)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// 배치당 동시 호출 상한 (설정값보다 우선)
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// 앞에서부터 N행만 처리 (테스트용)
        #[arg(long)]
        max_rows: Option<usize>,

        /// 같은 입력의 최신 체크포인트에서 이어서 처리
        #[arg(long)]
        resume: bool,

        /// 배치 없이 한 행씩 처리
        #[arg(long)]
        sequential: bool,

        /// 품질 점수가 낮은 결과를 한 번 더 분석
        #[arg(long)]
        quality_pass: bool,

        /// 진행 막대 숨김
        #[arg(long)]
        no_progress: bool,
    },

    /// 원시 설문 파일에 부문 라벨링과 점수 환산 적용
    Prepare {
        /// 원시 설문 Excel 파일
        #[arg(required = true)]
        input: PathBuf,

        /// 부서-부문 매핑 테이블 (부서명/부문/Unit명)
        #[arg(short, long, required = true)]
        mapping: PathBuf,

        /// 부서명 표준화 테이블 (변경전_부서명/표준_부서명)
        #[arg(short, long)]
        standard: Option<PathBuf>,

        /// 설문시행연도 (시트에 없을 때)
        #[arg(short, long)]
        year: Option<String>,

        /// 출력 파일
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Unit이 매핑에 없으면 부서 단독 매핑으로 판정
        #[arg(long)]
        unit_fallback: bool,
    },

    /// 분석 결과 파일 정제와 단계별 리포트
    Clean {
        /// 분석 결과 Excel 파일
        #[arg(required = true)]
        input: PathBuf,

        /// 출력 파일
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 체크포인트에서 부분 결과 파일 생성
    Partial {
        /// 세션 ID (생략 시 최신 체크포인트)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// 체크포인트 관리
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// 설정 표시/편집
    Config {
        /// API 키 설정
        #[arg(long)]
        set_api_key: Option<String>,

        /// 설정 표시
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum CheckpointAction {
    /// 체크포인트 목록
    List,

    /// 체크포인트 상세 정보
    Info {
        /// 세션 ID
        #[arg(required = true)]
        session: String,
    },

    /// 모든 체크포인트 삭제
    Clear {
        /// 확인 없이 삭제
        #[arg(short, long)]
        yes: bool,
    },

    /// 오래된 체크포인트 삭제
    Cleanup {
        /// 보관 일수
        #[arg(long, default_value = "7")]
        keep_days: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_annotate_defaults() {
        let cli = Cli::parse_from(["collab-survey", "annotate", "survey.xlsx"]);
        match cli.command {
            Commands::Annotate { column, resume, batch_size, .. } => {
                assert_eq!(column, "협업 후기");
                assert!(!resume);
                assert_eq!(batch_size, None);
            }
            _ => panic!("annotate가 아님"),
        }
    }

    #[test]
    fn test_checkpoint_cleanup_default() {
        let cli = Cli::parse_from(["collab-survey", "checkpoint", "cleanup"]);
        match cli.command {
            Commands::Checkpoint {
                action: CheckpointAction::Cleanup { keep_days },
            } => assert_eq!(keep_days, 7),
            _ => panic!("checkpoint cleanup이 아님"),
        }
    }
}
