use anyhow::Context;
use clap::Parser;
use collab_survey::annotator::{self, AnnotationOutcome, Annotator, AnnotatorOptions, CheckpointStore, GeminiClient};
use collab_survey::cli::{CheckpointAction, Cli, Commands};
use collab_survey::config::Config;
use collab_survey::error::SurveyError;
use collab_survey::{cleaning, export, labeling, logging, sheet};
use collab_survey_common::DepartmentDirectory;
use dialoguer::Confirm;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("\n❌ 오류: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("  원인: {}", cause);
            }
            let checklist = err
                .chain()
                .find_map(|e| e.downcast_ref::<SurveyError>())
                .map(SurveyError::remediation)
                .unwrap_or(&["--verbose 옵션으로 상세 로그를 확인하세요"]);
            eprintln!("\n확인할 사항:");
            for item in checklist {
                eprintln!("  - {}", item);
            }
            ExitCode::FAILURE
        }
    }
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Annotate {
            input,
            column,
            output,
            batch_size,
            max_concurrency,
            max_rows,
            resume,
            sequential,
            quality_pass,
            no_progress,
        } => {
            println!("📝 collab-survey - 주관식 분석\n");

            if !input.exists() {
                return Err(SurveyError::FileNotFound(input.display().to_string()).into());
            }

            println!("[1/3] 설정 확인 중...");
            let api_key = config.get_api_key()?;
            let client = GeminiClient::new(api_key, config.model.clone(), config.timeout())?;

            let mut options = AnnotatorOptions::from_config(&config, column);
            if let Some(n) = batch_size {
                options.batch_size = n;
            }
            if let Some(n) = max_concurrency {
                options.max_concurrency = n;
            }
            options.max_rows = max_rows;
            options.resume = resume;
            options.sequential = sequential;
            options.quality_pass = quality_pass;
            options.show_progress = !no_progress;
            println!(
                "✔ 모델 {} / 배치 {} / 동시 호출 {}\n",
                client.model(),
                options.batch_size,
                options.max_concurrency
            );

            let stop = Arc::new(AtomicBool::new(false));
            {
                let stop = Arc::clone(&stop);
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        eprintln!("\n⚠ 중단 요청을 받았습니다. 현재 배치가 끝나면 멈춥니다...");
                        stop.store(true, Ordering::SeqCst);
                    }
                });
            }

            let store = CheckpointStore::new(&config.checkpoint_dir);
            let runner = Annotator::new(client, store, options).with_stop_flag(stop);

            println!("[2/3] AI 분석 중...{}", if resume { " (재개 모드)" } else { "" });
            let (sheet, outcome) = runner
                .annotate_file(&input)
                .await
                .with_context(|| format!("분석 실패: {}", input.display()))?;

            match outcome {
                AnnotationOutcome::Completed(report) => {
                    println!("✔ 분석 완료\n");
                    report.stats.print_summary();

                    println!("\n[3/3] 결과 저장 중...");
                    let output =
                        output.unwrap_or_else(|| export::sibling_output_path(&input, "분석결과"));
                    let results: Vec<_> = report.results.into_iter().map(Some).collect();
                    export::write_annotated(&output, &sheet, &results)?;
                    println!("✔ 결과 저장: {}", output.display());
                    println!("\n✅ 완료");
                }
                AnnotationOutcome::Interrupted { session_id, stats } => {
                    println!("\n⏸ 중단됨 (세션 {})", session_id);
                    stats.print_summary();

                    let checkpoint = runner
                        .store()
                        .load(&session_id)?
                        .ok_or_else(|| SurveyError::Checkpoint(format!("세션 {} 없음", session_id)))?;
                    let partial = annotator::write_partial_output(&checkpoint)?;
                    println!("✔ 부분 결과 저장: {}", partial.display());
                    println!("\n`--resume`으로 다시 실행하면 이어서 처리합니다");
                }
            }
        }

        Commands::Prepare {
            input,
            mapping,
            standard,
            year,
            output,
            unit_fallback,
        } => {
            println!("🏷 collab-survey - 설문 준비\n");

            println!("[1/3] 매핑 테이블 로드 중...");
            let rows = labeling::tables::load_mapping(&mapping)
                .with_context(|| format!("매핑 테이블 로드 실패: {}", mapping.display()))?;
            let mut resolver = config.resolver;
            resolver.unit_fallback_to_department |= unit_fallback;
            let mut directory = DepartmentDirectory::from_rows(&rows).with_options(resolver);
            if let Some(path) = standard {
                let table = labeling::tables::load_standardization(&path)
                    .with_context(|| format!("표준화 테이블 로드 실패: {}", path.display()))?;
                directory = directory.with_standardization(table);
            }
            println!(
                "✔ 부서 매핑 {}건, 부서+Unit 매핑 {}건\n",
                directory.basic_len(),
                directory.enhanced_len()
            );

            println!("[2/3] 라벨링 중...");
            let raw = sheet::read_first_sheet(&input)?;
            let identifier = input
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let prepared = labeling::prepare_survey(
                &raw,
                &directory,
                &labeling::PrepareOptions { identifier, year },
            )?;
            labeling::print_labeling_stats(&prepared.summary);
            println!("✔ {}행 준비 (중복 {}행 제거)\n", prepared.summary.output_rows, prepared.summary.duplicate_rows);

            println!("[3/3] 저장 중...");
            let output = output.unwrap_or_else(|| export::sibling_output_path(&input, "prepared"));
            labeling::write_prepared(&output, &prepared)?;
            println!("✔ 저장: {}", output.display());
            println!("\n✅ 완료");
        }

        Commands::Clean { input, output } => {
            println!("🧹 collab-survey - 데이터 정제\n");

            let sheet = sheet::read_first_sheet(&input)?;
            let report = cleaning::clean_results(&sheet, &config.cleaning)?;
            report.print();

            let output = output.unwrap_or_else(|| export::sibling_output_path(&input, "정제"));
            report.write(&output)?;
            println!("\n✔ 저장: {}", output.display());
        }

        Commands::Partial { session } => {
            let store = CheckpointStore::new(&config.checkpoint_dir);
            let checkpoint = match session {
                Some(id) => store
                    .load(&id)?
                    .ok_or_else(|| SurveyError::Checkpoint(format!("세션 {} 없음", id)))?,
                None => store
                    .latest()?
                    .ok_or_else(|| SurveyError::Checkpoint("체크포인트가 없습니다".into()))?,
            };

            println!(
                "세션 {} ({}/{}행 처리됨)",
                checkpoint.session_id, checkpoint.processed_count, checkpoint.total_count
            );
            let output = annotator::write_partial_output(&checkpoint)?;
            println!("✔ 부분 결과 저장: {}", output.display());
        }

        Commands::Checkpoint { action } => {
            let store = CheckpointStore::new(&config.checkpoint_dir);
            run_checkpoint(&store, action)?;
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ API 키를 설정했습니다");
            }

            if show {
                println!("설정 ({}):", Config::config_path()?.display());
                println!("  모델: {}", config.model);
                println!("  배치 크기: {}", config.default_batch_size);
                println!("  동시 호출 상한: {}", config.max_concurrency);
                println!("  호출 제한 시간: {}초", config.timeout_seconds);
                println!("  체크포인트: {} (간격 {}행)", config.checkpoint_dir.display(), config.checkpoint_interval);
                println!(
                    "  재시도: 최대 {}회 (기본 {}초, 지터 {}초)",
                    config.retry.max_attempts, config.retry.base_delay_secs, config.retry.jitter_step_secs
                );
                println!("  API 키: {}", if config.get_api_key().is_ok() { "설정됨" } else { "미설정" });
            }
        }
    }

    Ok(())
}

fn run_checkpoint(store: &CheckpointStore, action: CheckpointAction) -> anyhow::Result<()> {
    match action {
        CheckpointAction::List => {
            let summaries = store.list()?;
            if summaries.is_empty() {
                println!("체크포인트가 없습니다: {}", store.dir().display());
                return Ok(());
            }
            println!("체크포인트 {}개:", summaries.len());
            for s in summaries {
                println!(
                    "  {}  {}/{}행  {}  [{}]",
                    s.session_id,
                    s.processed_count,
                    s.total_count,
                    format_timestamp(s.timestamp),
                    s.column_name
                );
            }
        }

        CheckpointAction::Info { session } => {
            if !store.exists(&session) {
                println!("체크포인트가 없습니다: {}", store.path_for(&session).display());
                return Ok(());
            }
            if let Some(cp) = store.load(&session)? {
                println!("체크포인트 정보:");
                println!("  경로: {}", store.path_for(&session).display());
                println!("  입력 파일: {}", cp.input_file);
                println!("  컬럼: {}", cp.column_name);
                println!("  진행: {}/{}행", cp.processed_count, cp.total_count);
                println!("  분석 대상: {}행", cp.valid_indices.len());
                println!("  저장 시각: {}", format_timestamp(cp.timestamp));
                println!("  형식 버전: {}", cp.format_version);
            }
        }

        CheckpointAction::Clear { yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("{}의 체크포인트를 모두 삭제할까요?", store.dir().display()))
                    .default(false)
                    .interact()
                    .context("확인 입력 실패")?;
            if confirmed {
                let removed = store.clear()?;
                println!("✔ 체크포인트 {}개 삭제", removed);
            } else {
                println!("취소했습니다");
            }
        }

        CheckpointAction::Cleanup { keep_days } => {
            let removed = store.cleanup_older_than(keep_days)?;
            println!("✔ {}일보다 오래된 체크포인트 {}개 삭제", keep_days, removed);
        }
    }

    Ok(())
}
