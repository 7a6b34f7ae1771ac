//! Debounced, cancellable rendering of one displayed message.
//!
//! Every update bumps a generation counter. A parse job carries the
//! generation it was scheduled under and commits only while that generation
//! is still the newest, so a slow parse can never overwrite a newer result.
//! Snapshots are published on a [`watch`] channel.
//!
//! All scheduling methods spawn onto the ambient tokio runtime and must be
//! called from inside it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::element::MessageElement;
use super::incremental::{ColorScheme, Finality, IncrementalParser};
use super::policy::{LargeMessagePolicy, RenderPlan};
use super::scanner::ScanOptions;
use crate::attachment::AttachmentTags;
use crate::config::RenderConfig;
use crate::error::PipelineError;
use crate::observability::log_parse_complete;

/// What the renderer receives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderSnapshot {
    pub generation: u64,
    pub elements: Vec<MessageElement>,
    pub is_final: bool,
    /// Characters left unparsed by the large-message policy.
    pub hidden_chars: usize,
}

#[derive(Debug)]
struct Inputs {
    text: Arc<str>,
    scheme: ColorScheme,
    full_requested: bool,
    is_final: bool,
}

struct Shared {
    parser: Mutex<IncrementalParser>,
    inputs: Mutex<Inputs>,
    generation: AtomicU64,
    policy: LargeMessagePolicy,
    tags: AttachmentTags,
    snapshots: watch::Sender<Arc<RenderSnapshot>>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Parse the current inputs and publish the result. Returns `None` when a
    /// newer generation took over at any point.
    fn run_parse(&self, generation: u64) -> Option<Arc<RenderSnapshot>> {
        if !self.is_current(generation) {
            return None;
        }
        let (text, scheme, full_requested, is_final) = {
            let inputs = self.inputs.lock();
            (
                Arc::clone(&inputs.text),
                inputs.scheme,
                inputs.full_requested,
                inputs.is_final,
            )
        };

        let mut parser = self.parser.lock();
        if !self.is_current(generation) {
            return None;
        }

        let started = Instant::now();
        let plan = self.policy.plan(&text, &self.tags, full_requested);
        let finality = match plan {
            RenderPlan::Full if is_final => Finality::Final,
            _ => Finality::Streaming,
        };
        let Some(mode) =
            parser.try_parse(plan.slice(&text), scheme, finality, || !self.is_current(generation))
        else {
            debug!(generation, "parse superseded mid-scan");
            return None;
        };
        log_parse_complete(mode, parser.elements().len(), started);

        // Generation bumps happen under this lock too, so no cancel can slip
        // between the check and the publish.
        let _inputs = self.inputs.lock();
        if !self.is_current(generation) {
            debug!(generation, "discarding superseded parse");
            return None;
        }
        let snapshot = Arc::new(RenderSnapshot {
            generation,
            elements: parser.elements().to_vec(),
            is_final,
            hidden_chars: plan.hidden_chars(),
        });
        self.snapshots.send_replace(Arc::clone(&snapshot));
        Some(snapshot)
    }
}

pub struct RenderSession {
    shared: Arc<Shared>,
    debounce: Duration,
    pending: Option<JoinHandle<()>>,
}

impl RenderSession {
    #[must_use]
    pub fn new(
        config: &RenderConfig,
        tags: AttachmentTags,
    ) -> (Self, watch::Receiver<Arc<RenderSnapshot>>) {
        let options = ScanOptions::new(tags.clone(), config.thinking_expanded);
        let (snapshots, receiver) = watch::channel(Arc::new(RenderSnapshot::default()));
        let shared = Arc::new(Shared {
            parser: Mutex::new(IncrementalParser::new(options)),
            inputs: Mutex::new(Inputs {
                text: Arc::from(""),
                scheme: ColorScheme::default(),
                full_requested: false,
                is_final: false,
            }),
            generation: AtomicU64::new(0),
            policy: LargeMessagePolicy::from_config(config),
            tags,
            snapshots,
        });
        let session = Self {
            shared,
            debounce: Duration::from_millis(config.debounce_ms),
            pending: None,
        };
        (session, receiver)
    }

    /// Replace the message text while it is still streaming. The parse runs
    /// after the debounce interval unless another update arrives first.
    pub fn update(&mut self, text: impl Into<Arc<str>>) {
        {
            let mut inputs = self.shared.inputs.lock();
            inputs.text = text.into();
            inputs.is_final = false;
        }
        self.schedule(self.debounce);
    }

    /// Render the completed message right away and return the committed
    /// snapshot.
    pub async fn finish(
        &mut self,
        text: impl Into<Arc<str>>,
    ) -> Result<Arc<RenderSnapshot>, PipelineError> {
        {
            let mut inputs = self.shared.inputs.lock();
            inputs.text = text.into();
            inputs.is_final = true;
        }
        let generation = self.next_generation();
        let shared = Arc::clone(&self.shared);
        let committed = tokio::task::spawn_blocking(move || shared.run_parse(generation)).await?;
        Ok(committed.unwrap_or_else(|| self.latest()))
    }

    /// Re-render under another colour scheme. Forces a cold parse.
    pub fn set_color_scheme(&mut self, scheme: ColorScheme) {
        {
            let mut inputs = self.shared.inputs.lock();
            if inputs.scheme == scheme {
                return;
            }
            inputs.scheme = scheme;
        }
        self.schedule(Duration::ZERO);
    }

    /// Parse the whole message even when it exceeds the large-message
    /// threshold.
    pub fn expand_full(&mut self) {
        {
            let mut inputs = self.shared.inputs.lock();
            if inputs.full_requested {
                return;
            }
            inputs.full_requested = true;
        }
        self.schedule(Duration::ZERO);
    }

    /// Drop any pending or in-flight parse. The last committed snapshot
    /// stays published, and nothing older commits after this returns.
    pub fn cancel(&mut self) {
        self.next_generation();
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<RenderSnapshot>> {
        self.shared.snapshots.subscribe()
    }

    /// Most recently committed snapshot.
    #[must_use]
    pub fn latest(&self) -> Arc<RenderSnapshot> {
        Arc::clone(&self.shared.snapshots.borrow())
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    fn next_generation(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let _inputs = self.shared.inputs.lock();
        self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn schedule(&mut self, delay: Duration) {
        let generation = self.next_generation();
        let shared = Arc::clone(&self.shared);
        self.pending = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if !shared.is_current(generation) {
                return;
            }
            let job = Arc::clone(&shared);
            if let Err(error) = tokio::task::spawn_blocking(move || job.run_parse(generation)).await
            {
                warn!(generation, error = %error, "render parse task failed");
            }
        }));
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
