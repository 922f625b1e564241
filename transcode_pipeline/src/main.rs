// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Worker process entry point: CLI parsing and ambient-stack wiring live
//! here; `transcode_pipeline::{mp4,hls,storage,rpc,runtime}` do the work.
//!
//! The `run` command preloads the MP4 source and then attempts to fan out to
//! each requested destination. Concrete encoder/decoder backends are an
//! external collaborator (spec's codec invocations are opaque
//! `decode_packet`/`encode_frame` operations) — no backend ships in this
//! binary, so destination encoding replies with a service-unavailable error
//! rather than faking a transcode.

use async_trait::async_trait;
use prometheus::Registry;
use std::io::Write;
use std::path::{Path, PathBuf};
use transcode_bootstrap::cli::ValidatedCommand;
use transcode_bootstrap::exit_code::result_to_exit_code;
use transcode_domain::{CorrelationId, FileProcessor, TranscodeError, VersionLabel};
use transcode_pipeline::infrastructure::config::WorkerConfig;
use transcode_pipeline::infrastructure::logging::{init_tracing, LogFormat};
use transcode_pipeline::infrastructure::metrics::WorkerMetrics;
use transcode_pipeline::mp4::{self, Mp4FileProcessor};
use transcode_pipeline::rpc::{ProgressReply, RpcTransport, TerminalReply, TerminalReplyErr, TranscodeRequest};
use transcode_pipeline::storage::{FilesystemStorage, StorageBackend, StoragePaths};

/// Publishes replies as newline-delimited JSON to stdout, standing in for a
/// broker connection the worker does not own (spec's Non-goals exclude the
/// AMQP client itself).
struct StdoutRpcTransport;

#[async_trait]
impl RpcTransport for StdoutRpcTransport {
    async fn publish_progress(&self, correlation_id: &str, progress: ProgressReply) -> Result<(), TranscodeError> {
        let line = serde_json::json!({ "corr_id": correlation_id, "progress": progress.progress });
        println!("{line}");
        Ok(())
    }

    async fn publish_terminal(&self, correlation_id: &str, reply: TerminalReply) -> Result<(), TranscodeError> {
        let line = serde_json::json!({ "corr_id": correlation_id, "reply": reply });
        println!("{line}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let validated_cli = match transcode_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("CLI error: {e}");
            return std::process::ExitCode::from(64);
        }
    };

    init_tracing(
        if validated_cli.verbose { LogFormat::Pretty } else { LogFormat::Json },
        "info",
    );

    let config = match WorkerConfig::load(validated_cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return result_to_exit_code::<(), _>(Err(e)),
    };

    let registry = Registry::new();
    let metrics = match WorkerMetrics::new(&registry) {
        Ok(m) => m,
        Err(e) => return result_to_exit_code::<(), _>(Err(TranscodeError::service(e.to_string()))),
    };

    // This process owns one event loop and a process-wide shutdown flag, per
    // the worker's single-threaded-per-job scheduling model. A signal handler
    // runs concurrently on its own task and only ever calls
    // `initiate_shutdown`; nothing here races it against in-flight work — a
    // request that has already started drains to completion rather than being
    // aborted mid-flight.
    let shutdown = transcode_bootstrap::shutdown::ShutdownCoordinator::default();
    let signal_handler = transcode_bootstrap::signals::create_signal_handler();
    let shutdown_for_signal = shutdown.clone();
    let signal_task = tokio::spawn(async move {
        signal_handler
            .wait_for_signal(Box::new(move || shutdown_for_signal.initiate_shutdown()))
            .await;
    });

    let result = if shutdown.is_shutting_down() {
        Err(TranscodeError::service("shutdown already in progress, refusing new work"))
    } else {
        match validated_cli.command {
            ValidatedCommand::ValidateRequest { request } => validate_request(&request).await,
            ValidatedCommand::Run { request } => run_request(&request, &config, &metrics).await,
            ValidatedCommand::Serve {
                resource_id: _,
                version,
                asset,
            } => serve_asset(&config, &version, &asset).await,
        }
    };

    shutdown.initiate_shutdown();
    signal_task.abort();

    result_to_exit_code(result)
}

#[tracing::instrument(skip_all, fields(request = %request_path.display()))]
async fn validate_request(request_path: &Path) -> Result<(), TranscodeError> {
    let body = tokio::fs::read_to_string(request_path).await?;
    let request: TranscodeRequest = serde_json::from_str(&body)
        .map_err(|e| TranscodeError::format(format!("invalid request document: {e}")))?;

    tracing::info!(
        resource_id = %request.resource_id,
        usr_id = request.usr_id,
        outputs = request.outputs.len(),
        "request is well-formed"
    );
    Ok(())
}

#[tracing::instrument(skip_all, fields(request = %request_path.display()))]
async fn run_request(request_path: &Path, config: &WorkerConfig, metrics: &WorkerMetrics) -> Result<(), TranscodeError> {
    let body = tokio::fs::read_to_string(request_path).await?;
    let request: TranscodeRequest = serde_json::from_str(&body)
        .map_err(|e| TranscodeError::format(format!("invalid request document: {e}")))?;
    metrics.requests_accepted.inc();

    let version_labels: Vec<VersionLabel> = request
        .outputs
        .keys()
        .map(|k| VersionLabel::new(k.clone()))
        .collect::<Result<_, _>>()?;
    let timestamp_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    let corr_id = CorrelationId::derive("transcode_video_file", &request.usr_id.to_string(), timestamp_ms, &version_labels);

    let storage = FilesystemStorage::new();
    let paths = StoragePaths::new(config.storage_root.clone(), config.local_tmp_root.clone());
    let transport = StdoutRpcTransport;

    let source_result = preload_source(&storage, &paths, &request).await;

    let reply = match source_result {
        Ok(locator_body_size) => {
            tracing::info!(body_size = locator_body_size, "source preload complete");
            TerminalReplyErr::from_error(&TranscodeError::service(
                "no compiled-in encoder backend registered for any requested output container",
            ))
        }
        Err(e) => {
            metrics.record_error(e.category());
            TerminalReplyErr::from_error(&e)
        }
    };

    transport.publish_terminal(&corr_id.to_string(), TerminalReply::Err(reply)).await?;
    Ok(())
}

/// Reads the request's source chunks from storage and runs the MP4 pre-load
/// state machine to completion, returning the located `mdat` body size.
///
/// The source processor is looked up by label through
/// [`mp4::registry`] rather than constructed directly, matching how a
/// MIME-sniffed label routes instantiation; the registry hands back a
/// `Box<dyn FileProcessor>`, so the concrete `Mp4FileProcessor` is recovered
/// via `as_any_mut` to reach the chunk-feeding API the shared trait doesn't
/// expose.
async fn preload_source(
    storage: &FilesystemStorage,
    paths: &StoragePaths,
    request: &TranscodeRequest,
) -> Result<u64, TranscodeError> {
    let mut boxed = mp4::registry()
        .instantiate("mp4")
        .ok_or_else(|| TranscodeError::service("no processor registered for label 'mp4'"))?;
    boxed.init()?;
    let processor = boxed
        .as_any_mut()
        .downcast_mut::<Mp4FileProcessor>()
        .expect("the 'mp4' label always constructs an Mp4FileProcessor");

    let mut chunks = Vec::with_capacity(request.parts_size.len());
    for seq in 1..=request.parts_size.len() as u32 {
        let path = paths.source_chunk(request.usr_id, request.last_upld_req, seq);
        chunks.push(storage.read(&path).await?);
    }

    let chunk_refs: Vec<&[u8]> = chunks.iter().map(|c| c.as_slice()).collect();
    processor.preload_from_chunks(&chunk_refs)?;

    let locator = processor
        .mdat_locator()
        .ok_or_else(|| TranscodeError::format("mdat atom not found in source"))?;
    Ok(locator.body_size())
}

async fn serve_asset(config: &WorkerConfig, version: &str, asset: &Path) -> Result<(), TranscodeError> {
    let storage = FilesystemStorage::new();
    let path: PathBuf = config.storage_root.join("committed").join(version).join(asset);
    let bytes = storage.read(&path).await?;
    std::io::stdout()
        .write_all(&bytes)
        .map_err(|e| TranscodeError::service(format!("failed writing asset to stdout: {e}")))
}
