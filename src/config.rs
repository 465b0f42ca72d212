use crate::error::{Result, SurveyError};
use collab_survey_common::{QualityThresholds, ResolverOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// 재시도 한 번의 최대 대기 시간 (초)
pub const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// 재시도 정책
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    /// 지수 백오프에 시도 횟수만큼 더하는 간격
    pub jitter_step_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            jitter_step_secs: 0.5,
        }
    }
}

impl RetryPolicy {
    /// 테스트용: 대기 없이 재시도
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_secs: 0.0,
            jitter_step_secs: 0.0,
        }
    }
}

/// 데이터 정제 제외 목록
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleaningRules {
    pub excluded_divisions: Vec<String>,
    pub excluded_teams: Vec<String>,
}

impl Default for CleaningRules {
    fn default() -> Self {
        Self {
            excluded_divisions: vec!["미분류".into(), "윤리경영실".into()],
            excluded_teams: vec!["내분비외과".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub default_batch_size: usize,
    /// 배치당 동시 호출 상한
    pub max_concurrency: usize,
    pub timeout_seconds: u64,
    /// 순차 처리 시 체크포인트 저장 간격 (행)
    pub checkpoint_interval: usize,
    pub checkpoint_dir: PathBuf,
    pub retry: RetryPolicy,
    pub quality: QualityThresholds,
    pub resolver: ResolverOptions,
    pub cleaning: CleaningRules,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| SurveyError::Config(format!("{}: {}", config_path.display(), e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SurveyError::Config("홈 디렉터리를 찾을 수 없습니다".into()))?;
        Ok(home.join(".config").join("collab-survey").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            default_batch_size: 10,
            max_concurrency: 20,
            timeout_seconds: 60,
            checkpoint_interval: 100,
            checkpoint_dir: PathBuf::from("checkpoints"),
            retry: RetryPolicy::default(),
            quality: QualityThresholds::default(),
            resolver: ResolverOptions::default(),
            cleaning: CleaningRules::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_batch_size == 0 {
            return Err(SurveyError::Config("default_batch_size는 1 이상이어야 합니다".into()));
        }
        if self.max_concurrency == 0 {
            return Err(SurveyError::Config("max_concurrency는 1 이상이어야 합니다".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SurveyError::Config("retry.max_attempts는 1 이상이어야 합니다".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(SurveyError::Config("timeout_seconds는 1 이상이어야 합니다".into()));
        }
        for (name, secs) in [
            ("retry.base_delay_secs", self.retry.base_delay_secs),
            ("retry.jitter_step_secs", self.retry.jitter_step_secs),
        ] {
            if !(0.0..=MAX_RETRY_DELAY_SECS).contains(&secs) {
                return Err(SurveyError::Config(format!(
                    "{}는 0 이상 {}초 이하여야 합니다 (현재 {})",
                    name, MAX_RETRY_DELAY_SECS, secs
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 환경 변수 우선
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(SurveyError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }
}
