//! Spinner that animates while a single background task runs.
//!
//! [`Spinner::run`] starts the task on its own thread and drives a small
//! event loop: frame ticks, the task's result and the cancel key all arrive as
//! [`Message`]s on one channel and are handled in order by a
//! [`SpinnerModel`].
//!
//! ```text
//! | Fetching index          (running)
//! * Fetching index ... Done (finished)
//! ```

use std::any::Any;
use std::fmt::Display;
use std::io::IsTerminal;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use console::{Style, Term};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// How often the input thread checks whether the run is over.
const KEY_POLL: Duration = Duration::from_millis(50);

/// Shortest frame interval the ticker will sleep for.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// An animation: the frames to cycle through and how long each is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frames {
    frames: &'static [&'static str],
    interval: Duration,
}

impl Frames {
    /// Classic line spinner.
    #[must_use]
    pub const fn line() -> Self {
        Self::custom(&["|", "/", "-", "\\"], Duration::from_millis(100))
    }

    #[must_use]
    pub const fn dot() -> Self {
        Self::custom(
            &["⣾ ", "⣽ ", "⣻ ", "⢿ ", "⡿ ", "⣟ ", "⣯ ", "⣷ "],
            Duration::from_millis(100),
        )
    }

    #[must_use]
    pub const fn mini_dot() -> Self {
        Self::custom(
            &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
            Duration::from_millis(83),
        )
    }

    #[must_use]
    pub const fn jump() -> Self {
        Self::custom(
            &["⢄", "⢂", "⢁", "⡁", "⡈", "⡐", "⡠"],
            Duration::from_millis(100),
        )
    }

    #[must_use]
    pub const fn pulse() -> Self {
        Self::custom(&["█", "▓", "▒", "░"], Duration::from_millis(125))
    }

    #[must_use]
    pub const fn points() -> Self {
        Self::custom(&["∙∙∙", "●∙∙", "∙●∙", "∙∙●"], Duration::from_millis(143))
    }

    #[must_use]
    pub const fn meter() -> Self {
        Self::custom(
            &["▱▱▱", "▰▱▱", "▰▰▱", "▰▰▰", "▰▰▱", "▰▱▱", "▱▱▱"],
            Duration::from_millis(143),
        )
    }

    #[must_use]
    pub const fn ellipsis() -> Self {
        Self::custom(&["", ".", "..", "..."], Duration::from_millis(333))
    }

    /// Custom frames. An empty slice renders an empty frame; intervals below
    /// [`MIN_INTERVAL`] are raised to it.
    #[must_use]
    pub const fn custom(frames: &'static [&'static str], interval: Duration) -> Self {
        let interval = if interval.as_nanos() < MIN_INTERVAL.as_nanos() {
            MIN_INTERVAL
        } else {
            interval
        };
        Self { frames, interval }
    }

    /// Look up a built-in animation by name, e.g. `line` or `mini_dot`.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "line" => Some(Self::line()),
            "dot" => Some(Self::dot()),
            "mini_dot" => Some(Self::mini_dot()),
            "jump" => Some(Self::jump()),
            "pulse" => Some(Self::pulse()),
            "points" => Some(Self::points()),
            "meter" => Some(Self::meter()),
            "ellipsis" => Some(Self::ellipsis()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    const fn get(&self, index: usize) -> &'static str {
        if self.frames.is_empty() {
            ""
        } else {
            self.frames[index % self.frames.len()]
        }
    }
}

impl Default for Frames {
    fn default() -> Self {
        Self::line()
    }
}

/// Styles of the three kinds of spinner line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpinnerStyle {
    pub progress: Style,
    pub success: Style,
    pub failure: Style,
}

impl Default for SpinnerStyle {
    fn default() -> Self {
        Self {
            progress: Style::new().color256(15).dim(),
            success: Style::new().green(),
            failure: Style::new().red().bold(),
        }
    }
}

/// Where the spinner draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Target {
    #[default]
    Stdout,
    Stderr,
    /// Draw nothing; the task still runs.
    Hidden,
}

impl Target {
    fn draw_target(self) -> ProgressDrawTarget {
        match self {
            Self::Stdout => ProgressDrawTarget::stdout(),
            Self::Stderr => ProgressDrawTarget::stderr(),
            Self::Hidden => ProgressDrawTarget::hidden(),
        }
    }

    fn term(self) -> Option<Term> {
        match self {
            Self::Stdout => Some(Term::stdout()),
            Self::Stderr => Some(Term::stderr()),
            Self::Hidden => None,
        }
    }
}

/// Events handled by the spinner's event loop.
#[derive(Debug)]
pub enum Message<E> {
    /// Advance the animation by one frame.
    Tick,
    /// The task returned.
    Finished(Result<(), E>),
    /// The user pressed the cancel key.
    Interrupt,
}

/// What the event loop should do after a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Lifecycle of a spinner. Every state but `Running` is final.
#[derive(Debug)]
pub enum SpinnerState<E> {
    Running,
    Done(Result<(), E>),
    Interrupted,
}

/// How a run ended.
#[derive(Debug)]
pub enum Outcome<E> {
    /// The task returned this result.
    Completed(Result<(), E>),
    /// The display was cancelled before the task returned.
    Interrupted,
}

impl<E> Outcome<E> {
    /// The task's result; `Ok(())` if the run was interrupted.
    ///
    /// # Errors
    ///
    /// Returns the task's error if it completed with one.
    pub fn into_result(self) -> Result<(), E> {
        match self {
            Self::Completed(result) => result,
            Self::Interrupted => Ok(()),
        }
    }

    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// State machine and view of a spinner, independent of any terminal.
#[derive(Debug)]
pub struct SpinnerModel<E> {
    title: String,
    frames: Frames,
    frame: usize,
    style: SpinnerStyle,
    frame_style: Style,
    state: SpinnerState<E>,
}

impl<E: Display> SpinnerModel<E> {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            frames: Frames::default(),
            frame: 0,
            style: SpinnerStyle::default(),
            frame_style: Style::new(),
            state: SpinnerState::Running,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: SpinnerStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub const fn with_frames(mut self, frames: Frames) -> Self {
        self.frames = frames;
        self
    }

    #[must_use]
    pub fn with_frame_style(mut self, style: Style) -> Self {
        self.frame_style = style;
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn state(&self) -> &SpinnerState<E> {
        &self.state
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, SpinnerState::Running)
    }

    /// The task's error, once it has failed.
    #[must_use]
    pub const fn err(&self) -> Option<&E> {
        match &self.state {
            SpinnerState::Done(Err(err)) => Some(err),
            _ => None,
        }
    }

    /// Apply one message. Messages arriving after a final state are ignored.
    pub fn update(&mut self, msg: Message<E>) -> Control {
        if !self.is_running() {
            return Control::Quit;
        }

        match msg {
            Message::Tick => {
                self.frame = self.frame.wrapping_add(1);
                Control::Continue
            }
            Message::Finished(result) => {
                self.state = SpinnerState::Done(result);
                Control::Quit
            }
            Message::Interrupt => {
                self.state = SpinnerState::Interrupted;
                Control::Quit
            }
        }
    }

    /// The current line followed by a single newline.
    #[must_use]
    pub fn view(&self) -> String {
        let mut view = self.line();
        view.push('\n');
        view
    }

    /// The current line, without a terminator.
    #[must_use]
    pub fn line(&self) -> String {
        match &self.state {
            SpinnerState::Running | SpinnerState::Interrupted => {
                let frame = self.frame_style.apply_to(self.frames.get(self.frame));
                self.style
                    .progress
                    .apply_to(format!("{frame} {}", self.title))
                    .to_string()
            }
            SpinnerState::Done(Ok(())) => self
                .style
                .success
                .apply_to(format!("* {} ... Done", self.title))
                .to_string(),
            SpinnerState::Done(Err(err)) => self
                .style
                .failure
                .apply_to(format!("* {} ... Failed: {err}", self.title))
                .to_string(),
        }
    }

    /// Final outcome. `None` while still running.
    #[must_use]
    pub fn into_outcome(self) -> Option<Outcome<E>> {
        match self.state {
            SpinnerState::Running => None,
            SpinnerState::Done(result) => Some(Outcome::Completed(result)),
            SpinnerState::Interrupted => Some(Outcome::Interrupted),
        }
    }
}

/// Runs a task while showing a spinner.
///
/// ```text
/// Spinner::new("Fetching index").run(|| fetch_index())?;
/// ```
#[derive(Clone, Debug)]
pub struct Spinner {
    title: String,
    frames: Frames,
    style: SpinnerStyle,
    frame_style: Style,
    target: Target,
    interruptible: bool,
}

impl Spinner {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            frames: Frames::default(),
            style: SpinnerStyle::default(),
            frame_style: Style::new(),
            target: Target::default(),
            interruptible: true,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: SpinnerStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub const fn with_frames(mut self, frames: Frames) -> Self {
        self.frames = frames;
        self
    }

    /// Style of the animated frame, nested inside the progress style.
    #[must_use]
    pub fn with_frame_style(mut self, style: Style) -> Self {
        self.frame_style = style;
        self
    }

    #[must_use]
    pub const fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Whether Ctrl-C stops the display. Only honoured when stdin is a terminal.
    #[must_use]
    pub const fn with_interrupt(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    /// Run `task` to completion and return its result.
    ///
    /// If the user interrupts first, returns `Ok(())` straight away; the task
    /// keeps running on its thread.
    ///
    /// # Errors
    ///
    /// Returns the task's error unchanged.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the task on the calling thread.
    pub fn run<F, E>(self, task: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.run_to_end(task).into_result()
    }

    /// Like [`Spinner::run`] but reports whether the run was interrupted.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the task on the calling thread, after the
    /// spinner line is cleared and raw mode is left.
    pub fn run_to_end<F, E>(self, task: F) -> Outcome<E>
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();

        spawn_task(task, tx.clone());
        spawn_ticker(self.frames.interval(), tx.clone());
        let listener = (self.interruptible && std::io::stdin().is_terminal())
            .then(|| InterruptListener::start(tx.clone()))
            .flatten();
        drop(tx);

        let mut model = SpinnerModel::new(self.title)
            .with_frames(self.frames)
            .with_style(self.style)
            .with_frame_style(self.frame_style);

        let bar = ProgressBar::with_draw_target(None, self.target.draw_target());
        bar.set_style(
            ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let panicked = drive(&mut model, &rx, &bar);

        if let Some(listener) = listener {
            listener.stop();
        }
        bar.finish_and_clear();

        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }

        if let Some(term) = self.target.term()
            && let Err(e) = term.write_str(&model.view())
        {
            tracing::warn!("Failed to draw spinner result: {e}");
        }

        model.into_outcome().unwrap_or(Outcome::Interrupted)
    }
}

/// A [`Message`], or a panic carried out of the task thread.
enum Envelope<E> {
    Msg(Message<E>),
    Panicked(Box<dyn Any + Send>),
}

/// Feed messages into `model` until it quits, redrawing after each one.
///
/// Returns the payload if the task panicked.
fn drive<E: Display>(
    model: &mut SpinnerModel<E>,
    rx: &Receiver<Envelope<E>>,
    bar: &ProgressBar,
) -> Option<Box<dyn Any + Send>> {
    bar.set_message(model.line());

    while let Ok(event) = rx.recv() {
        let msg = match event {
            Envelope::Msg(msg) => msg,
            Envelope::Panicked(payload) => return Some(payload),
        };

        let finished = matches!(msg, Message::Finished(_));
        let control = model.update(msg);
        bar.set_message(model.line());

        if control == Control::Quit {
            if finished {
                tracing::debug!(title = model.title(), "Spinner task finished");
            } else {
                tracing::debug!(title = model.title(), "Spinner interrupted");
            }
            return None;
        }
    }

    None
}

fn spawn_task<F, E>(task: F, tx: Sender<Envelope<E>>)
where
    F: FnOnce() -> Result<(), E> + Send + 'static,
    E: Send + 'static,
{
    thread::spawn(move || {
        let event = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(result) => Envelope::Msg(Message::Finished(result)),
            Err(payload) => Envelope::Panicked(payload),
        };
        // The loop may already be gone after an interrupt.
        let _ = tx.send(event);
    });
}

fn spawn_ticker<E: Send + 'static>(interval: Duration, tx: Sender<Envelope<E>>) {
    thread::spawn(move || {
        loop {
            thread::sleep(interval);
            if tx.send(Envelope::Msg(Message::Tick)).is_err() {
                break;
            }
        }
    });
}

/// Reads keys in raw mode and turns Ctrl-C into [`Message::Interrupt`].
struct InterruptListener {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl InterruptListener {
    fn start<E: Send + 'static>(tx: Sender<Envelope<E>>) -> Option<Self> {
        if let Err(e) = terminal::enable_raw_mode() {
            tracing::warn!("Ctrl-C handling disabled, raw mode unavailable: {e}");
            return None;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                match event::poll(KEY_POLL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        tracing::warn!("Stopped reading keys: {e}");
                        break;
                    }
                }

                if let Ok(Event::Key(key)) = event::read()
                    && key.kind == KeyEventKind::Press
                    && key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL)
                {
                    let _ = tx.send(Envelope::Msg(Message::Interrupt));
                    break;
                }
            }
        });

        Some(Self { stop, handle })
    }

    fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        if self.handle.join().is_err() {
            tracing::warn!("Key reader thread panicked");
        }
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("Failed to leave raw mode: {e}");
        }
    }
}
