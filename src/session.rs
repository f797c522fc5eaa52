//! Conversion session state machine.
//!
//! A [`ConversionSession`] owns the file list, the toggle set and the
//! observable status of the pipeline. A conversion runs as a
//! [`ConversionJob`] holding snapshots of both, so a failure never touches
//! the user's input.
//!
//! ```text
//! Idle -> FilesLoaded -> Running -> Succeeded | Failed -> FilesLoaded
//!                                         new_project() -> Idle
//! ```

use crate::aggregate::aggregate;
use crate::discover::{accept_drop, discover, discover_selection};
use crate::error::{Error, ErrorKind, Result};
use crate::model::{SourceFileList, Row};
use crate::parse_options::ParseOptions;
use crate::render::{OutputKind, RenderDispatcher};
use crate::toggles::{resolve, Toggle, ToggleSet};
use crate::usfm::{MarkerParser, UsfmParser};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Observable pipeline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// No files loaded
    Idle,
    /// At least one file loaded, controls enabled
    FilesLoaded,
    /// Conversion in progress, editing controls disabled
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::FilesLoaded => "files loaded",
            SessionStatus::Running => "running",
            SessionStatus::Succeeded => "succeeded",
            SessionStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// The page a UI shows. Exactly one is visible at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum View {
    Home,
    Conversion,
    Format,
    Loading,
    Success,
    Error,
}

/// Final result of one conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    Succeeded {
        destination: PathBuf,
        kind: OutputKind,
    },
    Failed {
        message: String,
        kind: ErrorKind,
    },
}

impl Outcome {
    /// Returns true for a successful conversion.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }
}

/// Status updates delivered to the UI, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    /// Percentage of files parsed and merged
    Progress(u8),
    Finished(Outcome),
}

/// Builds the single message shown for a failed conversion.
pub fn failure_message(error: &Error) -> String {
    format!(
        "Error converting. Please submit a bug with a link to the USFM you're using and the following error message: {}",
        error
    )
}

/// Default output file name for a user-entered base name.
pub fn suggested_file_name(base: &str) -> String {
    let base = base.trim();
    let base = if base.is_empty() { "out" } else { base };
    format!("{}.html", base)
}

/// Collaborators used by every conversion.
#[derive(Clone)]
pub struct Pipeline {
    parser: Arc<dyn MarkerParser>,
    dispatcher: RenderDispatcher,
    options: ParseOptions,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("dispatcher", &self.dispatcher)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with the bundled parser and renderers.
    pub fn new(options: ParseOptions) -> Self {
        Self {
            parser: Arc::new(UsfmParser::with_options(options.clone())),
            dispatcher: RenderDispatcher::default(),
            options,
        }
    }

    /// Replaces the marker parser.
    pub fn with_parser(mut self, parser: impl MarkerParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Replaces the render dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: RenderDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Parse options in effect.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Render dispatcher in effect.
    pub fn dispatcher(&self) -> &RenderDispatcher {
        &self.dispatcher
    }

    /// Aggregates, resolves and renders in one pass.
    pub fn run(
        &self,
        files: &SourceFileList,
        toggles: &ToggleSet,
        destination: &Path,
        progress: impl FnMut(u8),
    ) -> Result<OutputKind> {
        let document = aggregate(files, self.parser.as_ref(), &self.options, progress)?;
        let configs = resolve(toggles);
        self.dispatcher.dispatch(&document, &configs, destination)
    }
}

/// One admitted conversion, independent of the session that started it.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    files: SourceFileList,
    toggles: ToggleSet,
    destination: PathBuf,
    pipeline: Pipeline,
}

impl ConversionJob {
    /// Destination of the output.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Number of files to convert.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Runs the conversion, reporting progress to `observer`.
    pub fn run(self, mut observer: impl FnMut(SessionEvent)) -> Outcome {
        let result = self.pipeline.run(&self.files, &self.toggles, &self.destination, |p| {
            observer(SessionEvent::Progress(p))
        });
        match result {
            Ok(kind) => Outcome::Succeeded {
                destination: self.destination,
                kind,
            },
            Err(err) => Outcome::Failed {
                message: failure_message(&err),
                kind: err.kind(),
            },
        }
    }
}

type Observer = Box<dyn FnMut(&SessionEvent) + Send>;

/// Conversion session.
pub struct ConversionSession {
    status: SessionStatus,
    view: View,
    files: SourceFileList,
    toggles: ToggleSet,
    destination_text: String,
    controls_enabled: bool,
    progress: u8,
    last_outcome: Option<Outcome>,
    pipeline: Pipeline,
    observer: Option<Observer>,
}

impl Default for ConversionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConversionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionSession")
            .field("status", &self.status)
            .field("view", &self.view)
            .field("files", &self.files.len())
            .field("toggles", &self.toggles)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl ConversionSession {
    /// Creates an idle session with the bundled pipeline.
    pub fn new() -> Self {
        Self::with_pipeline(Pipeline::default())
    }

    /// Creates an idle session with the given pipeline.
    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            status: SessionStatus::Idle,
            view: View::Home,
            files: SourceFileList::new(),
            toggles: ToggleSet::default(),
            destination_text: String::new(),
            controls_enabled: true,
            progress: 0,
            last_outcome: None,
            pipeline,
            observer: None,
        }
    }

    /// Registers the observer that receives every [`SessionEvent`].
    pub fn set_observer(&mut self, observer: impl FnMut(&SessionEvent) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn files(&self) -> &SourceFileList {
        &self.files
    }

    pub fn toggles(&self) -> &ToggleSet {
        &self.toggles
    }

    /// Destination shown while a conversion runs; empty otherwise.
    pub fn destination_text(&self) -> &str {
        &self.destination_text
    }

    /// Whether the file list and add-file controls accept input.
    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Adds every supported file under `root`. Returns the number added.
    pub fn discover(&mut self, root: impl AsRef<Path>) -> Result<usize> {
        self.ensure_not_running()?;
        let found = discover(root)?;
        Ok(self.load(found))
    }

    /// Adds explicitly selected files (directories are expanded).
    pub fn add_files<I, P>(&mut self, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.ensure_not_running()?;
        let found = discover_selection(paths)?;
        Ok(self.load(found))
    }

    /// Accepts a drag-and-drop of exactly one directory.
    pub fn drop_items<P: AsRef<Path>>(&mut self, items: &[P]) -> Result<usize> {
        self.ensure_not_running()?;
        let dir = accept_drop(items)?;
        let found = discover(dir)?;
        Ok(self.load(found))
    }

    /// Number of real files a removal of `selected_rows` would delete.
    pub fn removal_count(&self, selected_rows: &[usize]) -> usize {
        self.files.removal_count(selected_rows)
    }

    /// Label for the remove control.
    pub fn removal_label(&self, selected_rows: &[usize]) -> String {
        format!("Delete ({}) Files", self.removal_count(selected_rows))
    }

    /// Rows as a UI lists them, including the trailing placeholder.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.files.rows()
    }

    /// Removes the selected rows. The placeholder row is ignored.
    pub fn remove_files(&mut self, selected_rows: &[usize]) -> Result<usize> {
        self.ensure_not_running()?;
        let removed = self.files.remove_rows(selected_rows);
        if self.files.is_empty() && self.status == SessionStatus::FilesLoaded {
            self.view = View::Home;
            self.set_status(SessionStatus::Idle);
        }
        Ok(removed)
    }

    /// Applies one formatting toggle.
    pub fn set_toggle(&mut self, toggle: Toggle) -> Result<()> {
        self.ensure_not_running()?;
        self.toggles.set(toggle);
        Ok(())
    }

    /// Replaces the whole toggle set, e.g. from a saved file.
    pub fn set_toggles(&mut self, toggles: ToggleSet) -> Result<()> {
        self.ensure_not_running()?;
        self.toggles = toggles;
        Ok(())
    }

    /// Opens the formatting page.
    pub fn show_format(&mut self) -> Result<()> {
        self.ensure_not_running()?;
        self.view = View::Format;
        Ok(())
    }

    /// Leaves the formatting page.
    pub fn close_format(&mut self) -> Result<()> {
        self.ensure_not_running()?;
        self.view = self.resting_view();
        Ok(())
    }

    /// Runs a conversion to `destination` on the calling thread.
    ///
    /// `None` is a cancelled destination prompt: nothing changes and no
    /// outcome is produced.
    pub fn start_conversion(&mut self, destination: Option<PathBuf>) -> Result<Option<Outcome>> {
        let Some(destination) = destination else {
            return Ok(None);
        };
        let job = self.begin(destination)?;
        let outcome = job.run(|event| self.apply_progress(event));
        self.complete(outcome.clone())?;
        Ok(Some(outcome))
    }

    /// Admits a conversion and enters `Running`.
    ///
    /// Rejected without side effects while running, without real files, or
    /// for a destination that is neither HTML nor DOCX.
    pub fn begin(&mut self, destination: PathBuf) -> Result<ConversionJob> {
        if self.status == SessionStatus::Running {
            return Err(Error::SessionBusy);
        }
        if self.files.is_empty() {
            return Err(Error::EmptyFileList);
        }
        OutputKind::from_path(&destination)?;

        self.destination_text = destination.display().to_string();
        self.controls_enabled = false;
        self.progress = 0;
        self.last_outcome = None;
        self.view = View::Loading;
        self.set_status(SessionStatus::Running);

        Ok(ConversionJob {
            files: self.files.clone(),
            toggles: self.toggles,
            destination,
            pipeline: self.pipeline.clone(),
        })
    }

    /// Records a progress event from a running job.
    pub fn apply_progress(&mut self, event: SessionEvent) {
        if let SessionEvent::Progress(percent) = event {
            if self.status == SessionStatus::Running {
                self.progress = percent;
            }
        }
        self.emit(event);
    }

    /// Finishes the running conversion and recovers to `FilesLoaded`.
    pub fn complete(&mut self, outcome: Outcome) -> Result<()> {
        if self.status != SessionStatus::Running {
            return Err(Error::InvalidState(format!(
                "cannot complete a conversion while {}",
                self.status
            )));
        }

        let (terminal, view) = if outcome.is_success() {
            (SessionStatus::Succeeded, View::Success)
        } else {
            (SessionStatus::Failed, View::Error)
        };
        self.view = view;
        self.set_status(terminal);
        self.last_outcome = Some(outcome.clone());
        self.emit(SessionEvent::Finished(outcome));

        self.destination_text.clear();
        self.controls_enabled = true;
        self.progress = 0;
        self.set_status(SessionStatus::FilesLoaded);
        Ok(())
    }

    /// Leaves the success or error page and returns to the file list.
    pub fn reset_session(&mut self) -> Result<()> {
        self.ensure_not_running()?;
        self.last_outcome = None;
        self.view = self.resting_view();
        Ok(())
    }

    /// Clears the file list and restores default toggles.
    pub fn new_project(&mut self) -> Result<()> {
        self.ensure_not_running()?;
        self.files.clear();
        self.toggles = ToggleSet::default();
        self.destination_text.clear();
        self.progress = 0;
        self.last_outcome = None;
        self.view = View::Home;
        self.set_status(SessionStatus::Idle);
        Ok(())
    }

    fn load(&mut self, found: SourceFileList) -> usize {
        let added = found.len();
        self.files.extend(found);
        if !self.files.is_empty() {
            self.view = View::Conversion;
            if self.status == SessionStatus::Idle {
                self.set_status(SessionStatus::FilesLoaded);
            }
        }
        added
    }

    fn resting_view(&self) -> View {
        if self.files.is_empty() {
            View::Home
        } else {
            View::Conversion
        }
    }

    fn ensure_not_running(&self) -> Result<()> {
        if self.status == SessionStatus::Running {
            Err(Error::SessionBusy)
        } else {
            Ok(())
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            self.status = status;
            self.emit(SessionEvent::StatusChanged(status));
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }
}
