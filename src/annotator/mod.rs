//! 재개 가능한 배치 분석기
//!
//! 스프레드시트의 텍스트 컬럼 하나를 행 단위로 원격 모델에 보내 분석 결과를 붙인다.
//!
//! 상태 전이: `Init → Filtering → Running ⇄ Checkpointing → QualityPass? → Done`
//!
//! - 노이즈 행은 원격 호출 없이 빈 결과로 채운다.
//! - 배치마다 `min(max_concurrency, batch_len)` 폭의 풀을 새로 만들고, 결과는 행 인덱스로 되돌려 쓴다.
//! - 배치가 끝날 때마다 체크포인트를 덮어쓴다. 중단 신호는 배치 경계에서만 확인한다.

pub mod checkpoint;
pub mod client;
pub mod progress;
pub mod retry;

pub use checkpoint::{fingerprint_file, Checkpoint, CheckpointStore, CheckpointSummary};
pub use client::{GeminiClient, RemoteError, TextAnalyzer};
pub use progress::AnnotationStats;
pub use retry::{analyze_with_retry, backoff_delay, RowOutcome};

use crate::config::{Config, RetryPolicy};
use crate::error::Result;
use crate::export;
use crate::sheet::{self, Sheet};
use collab_survey_common::{is_noise, score_result, AnalysisResult, QualityThresholds};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// 작업 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Filtering,
    Running,
    Checkpointing,
    QualityPass,
    Done,
}

#[derive(Debug, Clone)]
pub struct AnnotatorOptions {
    /// 분석할 텍스트 컬럼명
    pub column: String,
    pub batch_size: usize,
    pub max_concurrency: usize,
    /// 행 하나(재시도 포함) 전체에 대한 제한 시간
    pub call_timeout: Duration,
    /// 순차 처리 시 체크포인트 간격 (행)
    pub checkpoint_interval: usize,
    pub retry: RetryPolicy,
    pub resume: bool,
    pub max_rows: Option<usize>,
    pub quality_pass: bool,
    pub thresholds: QualityThresholds,
    /// 배치 없이 한 행씩 처리
    pub sequential: bool,
    pub show_progress: bool,
}

impl AnnotatorOptions {
    pub fn from_config(config: &Config, column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            batch_size: config.default_batch_size,
            max_concurrency: config.max_concurrency,
            call_timeout: config.timeout(),
            checkpoint_interval: config.checkpoint_interval,
            retry: config.retry,
            resume: false,
            max_rows: None,
            quality_pass: false,
            thresholds: config.quality,
            sequential: false,
            show_progress: true,
        }
    }
}

/// 입력 파일 식별 정보
#[derive(Debug, Clone)]
pub struct JobInput {
    pub input_file: String,
    pub stem: String,
    pub fingerprint: String,
}

impl JobInput {
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self {
            input_file: path.display().to_string(),
            stem: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "input".into()),
            fingerprint: fingerprint_file(path)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationReport {
    pub session_id: String,
    /// 입력 행 순서와 동일
    pub results: Vec<AnalysisResult>,
    pub stats: AnnotationStats,
}

#[derive(Debug, Clone)]
pub enum AnnotationOutcome {
    Completed(AnnotationReport),
    /// 중단 신호로 멈춤. 체크포인트는 저장되어 있다
    Interrupted {
        session_id: String,
        stats: AnnotationStats,
    },
}

pub struct Annotator<A: TextAnalyzer> {
    analyzer: Arc<A>,
    store: CheckpointStore,
    options: AnnotatorOptions,
    stop: Arc<AtomicBool>,
}

impl<A: TextAnalyzer> Annotator<A> {
    pub fn new(analyzer: A, store: CheckpointStore, options: AnnotatorOptions) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            store,
            options,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Ctrl-C 핸들러 등에서 세울 중단 플래그
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn enter(&self, phase: Phase) {
        debug!("단계 전환: {:?}", phase);
    }

    fn save_checkpoint(&self, checkpoint: &mut Checkpoint) -> Result<()> {
        checkpoint.touch();
        self.store.save(checkpoint)?;
        Ok(())
    }

    /// 스프레드시트 파일의 지정 컬럼을 분석
    pub async fn annotate_file(&self, path: &Path) -> Result<(Sheet, AnnotationOutcome)> {
        let mut sheet = sheet::read_first_sheet(path)?;
        if let Some(max_rows) = self.options.max_rows {
            sheet.truncate(max_rows);
        }
        let col = sheet.column_index(&self.options.column)?;
        let texts: Vec<String> = (0..sheet.len()).map(|row| sheet.text(row, col)).collect();

        let job = JobInput::from_path(path)?;
        let outcome = self.annotate_texts(&job, &texts).await?;
        Ok((sheet, outcome))
    }

    /// 텍스트 목록 분석 (입력 순서 보존)
    pub async fn annotate_texts(&self, job: &JobInput, texts: &[String]) -> Result<AnnotationOutcome> {
        let texts = match self.options.max_rows {
            Some(max_rows) if texts.len() > max_rows => &texts[..max_rows],
            _ => texts,
        };

        self.enter(Phase::Init);
        let mut checkpoint = self.initial_checkpoint(job, texts.len())?;
        let mut stats = AnnotationStats {
            total_rows: texts.len(),
            ..Default::default()
        };

        self.enter(Phase::Filtering);
        let valid: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !is_noise(text))
            .map(|(idx, _)| idx)
            .collect();
        let pending: Vec<usize> = valid
            .iter()
            .copied()
            .filter(|&idx| !checkpoint.is_processed(idx))
            .collect();

        stats.meaningful_rows = valid.len();
        stats.noise_rows = texts.len() - valid.len();
        stats.resumed_rows = valid.len() - pending.len();
        checkpoint.valid_indices = valid;
        self.save_checkpoint(&mut checkpoint)?;

        info!(
            "세션 {}: 전체 {}행, 분석 대상 {}행 (노이즈 {}행, 이어받음 {}행)",
            checkpoint.session_id,
            stats.total_rows,
            stats.meaningful_rows,
            stats.noise_rows,
            stats.resumed_rows
        );

        self.enter(Phase::Running);
        let bar = progress::progress_bar(pending.len(), self.options.show_progress);
        let interrupted = if self.options.sequential {
            self.run_sequential(texts, &pending, &mut checkpoint, &mut stats, &bar)
                .await?
        } else {
            self.run_batched(texts, &pending, &mut checkpoint, &mut stats, &bar)
                .await?
        };
        bar.finish_and_clear();

        if interrupted {
            return Ok(AnnotationOutcome::Interrupted {
                session_id: checkpoint.session_id,
                stats,
            });
        }

        if self.options.quality_pass {
            self.enter(Phase::QualityPass);
            if self.quality_pass(texts, &mut checkpoint, &mut stats).await? {
                return Ok(AnnotationOutcome::Interrupted {
                    session_id: checkpoint.session_id,
                    stats,
                });
            }
        }

        self.enter(Phase::Done);
        let results = checkpoint
            .results
            .iter()
            .map(|r| r.clone().unwrap_or_default())
            .collect();
        self.store.remove(&checkpoint.session_id)?;

        info!(
            "분석 완료: 처리 {}행, 오류 {}회, 대체 결과 {}행",
            stats.processed_rows, stats.errors, stats.fallbacks
        );

        Ok(AnnotationOutcome::Completed(AnnotationReport {
            session_id: checkpoint.session_id,
            results,
            stats,
        }))
    }

    fn initial_checkpoint(&self, job: &JobInput, total: usize) -> Result<Checkpoint> {
        let column = &self.options.column;

        if self.options.resume {
            let prefix = checkpoint::session_prefix(&job.stem, column);
            match self
                .store
                .latest_matching(&prefix, &job.fingerprint, column, total)?
            {
                Some(cp) => {
                    info!(
                        "체크포인트에서 재개: {} ({}/{})",
                        cp.session_id, cp.processed_count, cp.total_count
                    );
                    return Ok(cp);
                }
                None => info!("재개할 체크포인트가 없어 새로 시작합니다"),
            }
        }

        Ok(Checkpoint::new(
            checkpoint::new_session_id(&job.stem, column),
            job.input_file.clone(),
            job.fingerprint.clone(),
            column.clone(),
            total,
        ))
    }

    /// 배치 경로. 중단되면 true
    async fn run_batched(
        &self,
        texts: &[String],
        pending: &[usize],
        checkpoint: &mut Checkpoint,
        stats: &mut AnnotationStats,
        bar: &ProgressBar,
    ) -> Result<bool> {
        let batch_size = self.options.batch_size.max(1);
        let total_batches = pending.len().div_ceil(batch_size);

        for (batch_no, batch) in pending.chunks(batch_size).enumerate() {
            if self.stop_requested() {
                self.save_checkpoint(checkpoint)?;
                warn!("중단 요청: 배치 {}/{} 이전에서 멈춤", batch_no + 1, total_batches);
                return Ok(true);
            }

            debug!("배치 {}/{} ({}행)", batch_no + 1, total_batches, batch.len());
            for (idx, outcome) in self.run_batch(batch, texts).await {
                stats.absorb(&outcome);
                checkpoint.record(idx, outcome.result);
            }
            bar.inc(batch.len() as u64);

            self.enter(Phase::Checkpointing);
            self.save_checkpoint(checkpoint)?;
            self.enter(Phase::Running);
        }

        Ok(false)
    }

    /// 순차 경로. 중단되면 true
    async fn run_sequential(
        &self,
        texts: &[String],
        pending: &[usize],
        checkpoint: &mut Checkpoint,
        stats: &mut AnnotationStats,
        bar: &ProgressBar,
    ) -> Result<bool> {
        let interval = self.options.checkpoint_interval.max(1);

        for (n, &idx) in pending.iter().enumerate() {
            if self.stop_requested() {
                self.save_checkpoint(checkpoint)?;
                warn!("중단 요청: {}/{}행 처리 후 멈춤", n, pending.len());
                return Ok(true);
            }

            let outcome = analyze_row(
                Arc::clone(&self.analyzer),
                texts[idx].clone(),
                self.options.retry,
                self.options.call_timeout,
            )
            .await;
            stats.absorb(&outcome);
            checkpoint.record(idx, outcome.result);
            bar.inc(1);

            if (n + 1) % interval == 0 {
                self.enter(Phase::Checkpointing);
                self.save_checkpoint(checkpoint)?;
                self.enter(Phase::Running);
            }
        }

        self.save_checkpoint(checkpoint)?;
        Ok(false)
    }

    /// 한 배치를 동시에 처리. 반환 순서는 `indices` 순서와 같다
    async fn run_batch(&self, indices: &[usize], texts: &[String]) -> Vec<(usize, RowOutcome)> {
        let width = self.options.max_concurrency.min(indices.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(width));

        let handles: Vec<_> = indices
            .iter()
            .map(|&idx| {
                let analyzer = Arc::clone(&self.analyzer);
                let semaphore = Arc::clone(&semaphore);
                let text = texts[idx].clone();
                let retry = self.options.retry;
                let timeout = self.options.call_timeout;

                let handle = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    analyze_row(analyzer, text, retry, timeout).await
                });
                (idx, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (idx, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push((idx, outcome)),
                Err(e) => {
                    error!("행 {} 작업 실패: {}", idx, e);
                    outcomes.push((idx, RowOutcome::aborted(&texts[idx])));
                }
            }
        }
        outcomes
    }

    /// 품질 재분석. 중단되면 true
    async fn quality_pass(
        &self,
        texts: &[String],
        checkpoint: &mut Checkpoint,
        stats: &mut AnnotationStats,
    ) -> Result<bool> {
        let thresholds = self.options.thresholds;

        let flagged: Vec<(usize, u8)> = {
            let results = &checkpoint.results;
            checkpoint
                .valid_indices
                .par_iter()
                .filter_map(|&idx| {
                    let result = results.get(idx)?.as_ref()?;
                    let report = score_result(result, &texts[idx], &thresholds);
                    report.needs_review.then_some((idx, report.quality_score))
                })
                .collect()
        };

        stats.requalified = flagged.len();
        info!("품질 재분석 대상: {}행", flagged.len());
        if flagged.is_empty() {
            return Ok(false);
        }

        let bar = progress::progress_bar(flagged.len(), self.options.show_progress);
        for batch in flagged.chunks(self.options.batch_size.max(1)) {
            if self.stop_requested() {
                self.save_checkpoint(checkpoint)?;
                warn!("중단 요청: 품질 재분석 중 멈춤");
                bar.finish_and_clear();
                return Ok(true);
            }

            let indices: Vec<usize> = batch.iter().map(|(idx, _)| *idx).collect();
            let outcomes = self.run_batch(&indices, texts).await;

            for ((idx, outcome), (_, old_score)) in outcomes.into_iter().zip(batch) {
                stats.absorb_requalification(&outcome);
                let new_score = score_result(&outcome.result, &texts[idx], &thresholds).quality_score;
                if new_score > *old_score {
                    debug!("행 {} 품질 개선: {} → {}", idx, old_score, new_score);
                    checkpoint.record(idx, outcome.result);
                    stats.improved += 1;
                }
            }
            bar.inc(batch.len() as u64);
            self.save_checkpoint(checkpoint)?;
        }
        bar.finish_and_clear();

        Ok(false)
    }
}

/// 행 하나를 제한 시간 안에서 재시도와 함께 분석
async fn analyze_row<A: TextAnalyzer>(
    analyzer: Arc<A>,
    text: String,
    retry: RetryPolicy,
    timeout: Duration,
) -> RowOutcome {
    match tokio::time::timeout(timeout, analyze_with_retry(analyzer.as_ref(), &text, &retry)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("분석 시간 초과 ({:?}), 대체 결과 사용", timeout);
            RowOutcome::timed_out(&text)
        }
    }
}

/// 체크포인트 결과를 원본 입력에 합쳐 `_partial` 파일로 저장
pub fn write_partial_output(checkpoint: &Checkpoint) -> Result<PathBuf> {
    let input = Path::new(&checkpoint.input_file);
    let mut sheet = sheet::read_first_sheet(input)?;
    sheet.truncate(checkpoint.total_count);

    let output = export::partial_output_path(input);
    export::write_annotated(&output, &sheet, &checkpoint.results)?;

    info!(
        "부분 결과 저장: {} ({}/{}행 처리됨)",
        output.display(),
        checkpoint.processed_count,
        checkpoint.total_count
    );
    Ok(output)
}
