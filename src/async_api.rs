//! Async conversion API.
//!
//! Enable the `async` feature to use these APIs:
//!
//! ```toml
//! [dependencies]
//! usfmconv = { version = "0.1", features = ["async"] }
//! ```
//!
//! A conversion runs on Tokio's blocking pool; its [`SessionEvent`]s arrive
//! on a channel in the order they were emitted.

use crate::error::{Error, Result};
use crate::model::SourceFileList;
use crate::render::OutputKind;
use crate::session::{
    failure_message, ConversionJob, ConversionSession, Outcome, Pipeline, SessionEvent,
};
use crate::toggles::ToggleSet;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Event stream of one running conversion.
pub struct ConversionStream {
    events: mpsc::UnboundedReceiver<SessionEvent>,
    task: JoinHandle<Outcome>,
}

impl ConversionStream {
    /// Runs `job` on the blocking pool.
    pub fn spawn(job: ConversionJob) -> Self {
        let (sender, events) = mpsc::unbounded_channel();
        let task = tokio::task::spawn_blocking(move || {
            job.run(|event| {
                // A closed channel only means nobody is listening; the
                // outcome still arrives through the join handle.
                sender.send(event).ok();
            })
        });
        Self { events, task }
    }

    /// Next event, or `None` once the job has finished.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Waits for the job and returns its outcome.
    pub async fn outcome(self) -> Result<Outcome> {
        self.task
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
    }
}

/// Admits a conversion on `session` and starts it in the background.
///
/// Returns `Ok(None)` for a cancelled destination. The caller feeds events
/// back with [`ConversionSession::apply_progress`] and finishes with
/// [`ConversionSession::complete`]; [`run_conversion`] does both.
pub fn start_conversion(
    session: &mut ConversionSession,
    destination: Option<PathBuf>,
) -> Result<Option<ConversionStream>> {
    let Some(destination) = destination else {
        return Ok(None);
    };
    let job = session.begin(destination)?;
    Ok(Some(ConversionStream::spawn(job)))
}

/// Runs a conversion to completion without blocking the async runtime.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> usfmconv::Result<()> {
/// use usfmconv::ConversionSession;
///
/// let mut session = ConversionSession::new();
/// session.discover("./usfm")?;
/// let outcome = usfmconv::async_api::run_conversion(&mut session, Some("out.html".into())).await?;
/// println!("{:?}", outcome);
/// # Ok(())
/// # }
/// ```
pub async fn run_conversion(
    session: &mut ConversionSession,
    destination: Option<PathBuf>,
) -> Result<Option<Outcome>> {
    let Some(mut stream) = start_conversion(session, destination)? else {
        return Ok(None);
    };

    while let Some(event) = stream.next_event().await {
        session.apply_progress(event);
    }

    let outcome = match stream.outcome().await {
        Ok(outcome) => outcome,
        Err(err) => Outcome::Failed {
            message: failure_message(&err),
            kind: err.kind(),
        },
    };
    session.complete(outcome.clone())?;
    Ok(Some(outcome))
}

/// Converts `files` to `destination` outside of any session.
pub async fn convert(
    files: SourceFileList,
    toggles: ToggleSet,
    destination: PathBuf,
    pipeline: Pipeline,
) -> Result<OutputKind> {
    tokio::task::spawn_blocking(move || pipeline.run(&files, &toggles, &destination, |_| {}))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?
}
