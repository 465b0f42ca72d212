//! 체크포인트 저장소
//!
//! 진행 중인 작업 상태를 `checkpoints/checkpoint_{session_id}.json`에 통째로 덮어쓴다.
//! 저장은 임시 파일 + rename으로 원자적으로 수행하며, 형식 버전이 다르면 불러오지 않고 오류를 낸다.

use crate::error::{Result, SurveyError};
use collab_survey_common::AnalysisResult;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const FILE_PREFIX: &str = "checkpoint_";
const FILE_EXTENSION: &str = "json";

lazy_static! {
    static ref UNSAFE_CHARS_RE: Regex = Regex::new(r"[^0-9A-Za-z가-힣_\-]+").unwrap();
}

/// 작업 상태 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    pub session_id: String,
    pub input_file: String,
    /// 입력 파일 SHA-256
    pub input_fingerprint: String,
    pub column_name: String,
    pub total_count: usize,
    pub processed_count: usize,
    /// 입력 행 순서와 동일. 미처리 행은 None
    pub results: Vec<Option<AnalysisResult>>,
    /// 노이즈가 아닌 행 인덱스
    pub valid_indices: Vec<usize>,
    /// 마지막 저장 시각 (unix seconds)
    pub timestamp: i64,
}

/// 형식 버전만 먼저 읽기 위한 구조
#[derive(Deserialize)]
struct VersionProbe {
    format_version: Option<u32>,
}

impl Checkpoint {
    pub const FORMAT_VERSION: u32 = 1;

    pub fn new(
        session_id: String,
        input_file: String,
        input_fingerprint: String,
        column_name: String,
        total_count: usize,
    ) -> Self {
        Self {
            format_version: Self::FORMAT_VERSION,
            session_id,
            input_file,
            input_fingerprint,
            column_name,
            total_count,
            processed_count: 0,
            results: vec![None; total_count],
            valid_indices: Vec::new(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn record(&mut self, index: usize, result: AnalysisResult) {
        if let Some(slot) = self.results.get_mut(index) {
            *slot = Some(result);
        }
    }

    pub fn is_processed(&self, index: usize) -> bool {
        matches!(self.results.get(index), Some(Some(_)))
    }

    /// 처리 건수와 시각 갱신
    pub fn touch(&mut self) {
        self.processed_count = self.results.iter().filter(|r| r.is_some()).count();
        self.timestamp = chrono::Utc::now().timestamp();
    }
}

/// 목록 출력용 요약
#[derive(Debug, Clone)]
pub struct CheckpointSummary {
    pub session_id: String,
    pub path: PathBuf,
    pub input_file: String,
    pub column_name: String,
    pub processed_count: usize,
    pub total_count: usize,
    pub timestamp: i64,
    pub size_bytes: u64,
}

/// 파일명에 쓸 수 있도록 세션 ID 정리
pub fn sanitize_session_id(raw: &str) -> String {
    UNSAFE_CHARS_RE.replace_all(raw, "_").trim_matches('_').to_string()
}

/// 세션 ID 접두사: `{입력파일명}_{컬럼명}_`
pub fn session_prefix(input_stem: &str, column: &str) -> String {
    format!("{}_", sanitize_session_id(&format!("{}_{}", input_stem, column)))
}

/// 새 세션 ID: `{입력파일명}_{컬럼명}_{unix_ts}`
pub fn new_session_id(input_stem: &str, column: &str) -> String {
    format!("{}{}", session_prefix(input_stem, column), chrono::Utc::now().timestamp())
}

/// 입력 파일 SHA-256 (hex)
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", FILE_PREFIX, session_id, FILE_EXTENSION))
    }

    /// 원자적 저장 (임시 파일에 쓴 뒤 rename)
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&checkpoint.session_id);
        let tmp_path = path.with_extension("json.tmp");

        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, checkpoint)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        std::fs::rename(&tmp_path, &path)?;

        debug!(
            "체크포인트 저장: {} ({}/{})",
            path.display(),
            checkpoint.processed_count,
            checkpoint.total_count
        );
        Ok(path)
    }

    /// 경로에서 직접 읽기. 형식 버전 불일치는 `CheckpointVersion`
    pub fn load_path(path: &Path) -> Result<Checkpoint> {
        let content = std::fs::read_to_string(path)?;

        let probe: VersionProbe = serde_json::from_str(&content).map_err(|e| {
            SurveyError::Checkpoint(format!("{}: {}", path.display(), e))
        })?;
        let found = probe.format_version.unwrap_or(0);
        if found != Checkpoint::FORMAT_VERSION {
            return Err(SurveyError::CheckpointVersion {
                path: path.display().to_string(),
                found,
                expected: Checkpoint::FORMAT_VERSION,
            });
        }

        serde_json::from_str(&content)
            .map_err(|e| SurveyError::Checkpoint(format!("{}: {}", path.display(), e)))
    }

    pub fn load(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_path(&path).map(Some)
    }

    /// 체크포인트 파일 경로 목록
    fn checkpoint_files(&self) -> Vec<PathBuf> {
        if !self.dir.exists() {
            return Vec::new();
        }

        WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                let name = p.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                name.starts_with(FILE_PREFIX) && name.ends_with(&format!(".{}", FILE_EXTENSION))
            })
            .collect()
    }

    /// 읽을 수 있는 체크포인트 요약 (최신 순)
    pub fn list(&self) -> Result<Vec<CheckpointSummary>> {
        let mut summaries = Vec::new();
        for path in self.checkpoint_files() {
            match Self::load_path(&path) {
                Ok(cp) => {
                    let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                    summaries.push(CheckpointSummary {
                        session_id: cp.session_id,
                        path,
                        input_file: cp.input_file,
                        column_name: cp.column_name,
                        processed_count: cp.processed_count,
                        total_count: cp.total_count,
                        timestamp: cp.timestamp,
                        size_bytes,
                    });
                }
                Err(e) => warn!("체크포인트 건너뜀: {}", e),
            }
        }
        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.session_id.cmp(&a.session_id)));
        Ok(summaries)
    }

    /// 가장 최근 체크포인트
    pub fn latest(&self) -> Result<Option<Checkpoint>> {
        match self.list()?.into_iter().next() {
            Some(summary) => Self::load_path(&summary.path).map(Some),
            None => Ok(None),
        }
    }

    /// 접두사, 입력 지문, 컬럼명, 행 수가 모두 일치하는 가장 최근 체크포인트
    ///
    /// 컬럼명이 다른 컬럼의 접두사일 수 있으므로 (`협업` / `협업_후기`) 접두사만으로는 판정하지 않는다.
    pub fn latest_matching(
        &self,
        prefix: &str,
        fingerprint: &str,
        column: &str,
        total: usize,
    ) -> Result<Option<Checkpoint>> {
        for summary in self.list()? {
            if !summary.session_id.starts_with(prefix) {
                continue;
            }
            let checkpoint = Self::load_path(&summary.path)?;
            if checkpoint.input_fingerprint != fingerprint {
                debug!("입력 파일이 변경되어 체크포인트 무시: {}", summary.session_id);
                continue;
            }
            if checkpoint.column_name != column {
                debug!(
                    "컬럼이 달라 체크포인트 무시: {} ({} != {})",
                    summary.session_id, checkpoint.column_name, column
                );
                continue;
            }
            if checkpoint.results.len() != total {
                warn!(
                    "체크포인트 행 수 불일치로 무시: {} ({} != {})",
                    summary.session_id,
                    checkpoint.results.len(),
                    total
                );
                continue;
            }
            return Ok(Some(checkpoint));
        }
        Ok(None)
    }

    pub fn remove(&self, session_id: &str) -> Result<bool> {
        let path = self.path_for(session_id);
        if path.exists() {
            std::fs::remove_file(&path)?;
            info!("체크포인트 삭제: {}", path.display());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 모든 체크포인트 파일 삭제 (형식이 맞지 않는 파일 포함)
    pub fn clear(&self) -> Result<usize> {
        let files = self.checkpoint_files();
        for path in &files {
            std::fs::remove_file(path)?;
        }
        Ok(files.len())
    }

    /// 수정 시각이 keep_days일보다 오래된 파일 삭제
    pub fn cleanup_older_than(&self, keep_days: u64) -> Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(keep_days * 24 * 60 * 60))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        for path in self.checkpoint_files() {
            let modified = std::fs::metadata(&path).and_then(|m| m.modified())?;
            if modified < cutoff {
                std::fs::remove_file(&path)?;
                info!("오래된 체크포인트 삭제: {}", path.display());
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// 존재 여부만 확인 (info 출력용)
    pub fn exists(&self, session_id: &str) -> bool {
        self.path_for(session_id).exists()
    }
}
