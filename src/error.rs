use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("설정 오류: {0}")]
    Config(String),

    #[error("API 키가 설정되지 않았습니다. `collab-survey config --set-api-key YOUR_KEY` 또는 GEMINI_API_KEY 환경 변수로 설정하세요")]
    MissingApiKey,

    #[error("파일을 찾을 수 없습니다: {0}")]
    FileNotFound(String),

    #[error("컬럼을 찾을 수 없습니다: {0}")]
    ColumnNotFound(String),

    #[error("시트 스키마 불일치: {0}")]
    SchemaMismatch(String),

    #[error("Excel 읽기 오류: {0}")]
    SheetRead(String),

    #[error("Excel 생성 오류: {0}")]
    ExcelGeneration(String),

    #[error("체크포인트 오류: {0}")]
    Checkpoint(String),

    #[error("체크포인트 형식 버전 불일치: 파일 {found}, 지원 {expected} ({path})")]
    CheckpointVersion {
        path: String,
        found: u32,
        expected: u32,
    },

    #[error("API 호출 오류: {0}")]
    ApiCall(String),

    #[error("JSON 파싱 오류: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO 오류: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SurveyError>;

impl From<calamine::Error> for SurveyError {
    fn from(err: calamine::Error) -> Self {
        SurveyError::SheetRead(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for SurveyError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        SurveyError::ExcelGeneration(err.to_string())
    }
}

impl SurveyError {
    /// 사용자에게 보여줄 조치 목록
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            SurveyError::MissingApiKey => &[
                "GEMINI_API_KEY 환경 변수를 설정하거나",
                "`collab-survey config --set-api-key KEY`로 키를 저장하세요",
            ],
            SurveyError::FileNotFound(_) => &[
                "입력 파일 경로가 올바른지 확인하세요",
                "상대 경로는 현재 작업 디렉터리 기준입니다",
            ],
            SurveyError::ColumnNotFound(_) => &[
                "첫 번째 시트의 헤더 행에 해당 컬럼이 있는지 확인하세요",
                "--column 옵션으로 분석할 컬럼명을 지정하세요",
            ],
            SurveyError::SchemaMismatch(_) | SurveyError::SheetRead(_) => &[
                "파일이 .xlsx/.xls 형식이고 다른 프로그램에서 열려 있지 않은지 확인하세요",
                "매핑 테이블은 부서명/부문/Unit명 컬럼을 포함해야 합니다",
            ],
            SurveyError::CheckpointVersion { .. } | SurveyError::Checkpoint(_) => &[
                "`collab-survey checkpoint list`로 체크포인트를 확인하세요",
                "호환되지 않는 체크포인트는 `collab-survey checkpoint clear`로 삭제 후 다시 실행하세요",
            ],
            SurveyError::Config(_) => &[
                "~/.config/collab-survey/config.json 형식을 확인하세요",
                "`collab-survey config --show`로 현재 설정을 확인하세요",
            ],
            _ => &["--verbose 옵션으로 상세 로그를 확인하세요"],
        }
    }
}
