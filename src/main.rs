use std::io::Write;
use std::process::ExitCode;

use msgstream::attachment::AttachmentTags;
use msgstream::config::{load_config_or_default, AppConfig, StreamConfig};
use msgstream::error::PipelineError;
use msgstream::observability::init_tracing;
use msgstream::render::RenderSession;
use msgstream::stream::{read_sse_events, DeltaAccumulator, ReadOutcome};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const CONFIG_ENV: &str = "MSGSTREAM_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

fn main() -> ExitCode {
    let config_path =
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match load_config_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from '{config_path}': {e}");
            eprintln!("Copy 'config.example.yaml' to 'config.yaml' and adjust it, or set {CONFIG_ENV}.");
            return exit_code(&PipelineError::Config(e));
        }
    };

    init_tracing(&config.features.log_level, config.features.log_format);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return exit_code(&PipelineError::Io(e));
        }
    };

    let input = std::env::args().nth(1);
    match runtime.block_on(run(config, input)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("msgstream failed: {e}");
            eprintln!("msgstream: {e}");
            exit_code(&e)
        }
    }
}

fn exit_code(error: &PipelineError) -> ExitCode {
    ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(1))
}

async fn run(config: AppConfig, input: Option<String>) -> Result<(), PipelineError> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let tags = AttachmentTags::from_config(&config.attachments);
    let (mut session, _snapshots) = RenderSession::new(&config.render, tags);
    let mut accumulator = DeltaAccumulator::new();

    info!(
        source = input.as_deref().unwrap_or("stdin"),
        mode = ?config.stream.delivery_mode,
        "reading SSE capture"
    );

    let outcome = match input.as_deref() {
        Some(path) if path != "-" => {
            let file = tokio::fs::File::open(path).await?;
            read_capture(file, &config.stream, &cancel, &mut accumulator, &mut session).await?
        }
        _ => {
            read_capture(
                tokio::io::stdin(),
                &config.stream,
                &cancel,
                &mut accumulator,
                &mut session,
            )
            .await?
        }
    };

    if outcome.cancelled {
        session.cancel();
        warn!("interrupted, rendering the text received so far");
    }
    if !accumulator.is_done() && !outcome.cancelled {
        warn!("stream ended without a completion marker");
    }

    let snapshot = session.finish(accumulator.into_text()).await?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &*snapshot)?;
    writeln!(stdout)?;

    info!(
        events = outcome.events,
        bytes = outcome.bytes,
        elements = snapshot.elements.len(),
        hidden_chars = snapshot.hidden_chars,
        "render complete"
    );
    Ok(())
}

async fn read_capture<R>(
    reader: R,
    stream: &StreamConfig,
    cancel: &CancellationToken,
    accumulator: &mut DeltaAccumulator,
    session: &mut RenderSession,
) -> std::io::Result<ReadOutcome>
where
    R: AsyncRead + Unpin,
{
    read_sse_events(
        reader,
        stream.delivery_mode,
        stream.read_buffer_size,
        cancel,
        |payload| {
            if accumulator.apply_payload(&payload) {
                session.update(accumulator.text());
            }
        },
    )
    .await
}
