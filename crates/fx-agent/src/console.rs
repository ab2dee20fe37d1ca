//! Terminal plumbing shared by the binaries.

use std::fmt::Display;
use std::io::{self as std_io, Write as _};
use std::pin::pin;
use std::time::Duration;

use fx_agent_model::{ToolCallRequest, ToolCallResult};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::sleep;

/// The gutter printed in front of agent output.
pub const BAR_CHAR: &str = "▎";

/// Installs the `RUST_LOG`-driven log subscriber. Logs go to stderr, so
/// they never mix with what is printed on stdout.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std_io::stderr)
        .init();
}

/// Loads `.env` from the working directory or its parents, if there is
/// one. Variables already set in the environment win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("loaded {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("ignoring .env: {err}"),
    }
}

/// Line reader over stdin.
pub struct Input {
    lines: Lines<BufReader<Stdin>>,
}

impl Input {
    /// Creates a reader over the process stdin.
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(io::stdin()).lines(),
        }
    }

    /// Prints `prompt` and reads one line.
    ///
    /// Returns `None` at EOF or if stdin cannot be read.
    pub async fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        std_io::stdout().flush().ok();

        match self.lines.next_line().await {
            Ok(line) => line,
            Err(err) => {
                error!("error reading input: {err}");
                None
            }
        }
    }
}

/// Something the agent did that is worth showing.
pub enum Event {
    /// A piece of the model's answer.
    Transcript(String),
    /// A tool is about to run.
    ToolCall(ToolCallRequest),
    /// A tool has finished.
    ToolResult(ToolCallResult),
}

/// Hands out agent callbacks that forward to an [`Activity`].
#[derive(Clone)]
pub struct Reporter {
    event_tx: UnboundedSender<Event>,
}

impl Reporter {
    /// Callback for `on_transcript`.
    pub fn transcript(&self) -> impl Fn(&str) + Send + Sync + 'static {
        let event_tx = self.event_tx.clone();
        move |transcript| {
            event_tx.send(Event::Transcript(transcript.to_owned())).ok();
        }
    }

    /// Callback for `on_tool_call`.
    pub fn tool_call(
        &self,
    ) -> impl Fn(&ToolCallRequest) + Send + Sync + 'static {
        let event_tx = self.event_tx.clone();
        move |request| {
            event_tx.send(Event::ToolCall(request.clone())).ok();
        }
    }

    /// Callback for `on_tool_result`.
    pub fn tool_result(
        &self,
    ) -> impl Fn(&ToolCallResult) + Send + Sync + 'static {
        let event_tx = self.event_tx.clone();
        move |result| {
            event_tx.send(Event::ToolResult(result.clone())).ok();
        }
    }
}

/// Shows a spinner while the agent works and prints its events as they
/// arrive.
pub struct Activity {
    event_rx: UnboundedReceiver<Event>,
    progress_style: ProgressStyle,
    in_transcript: bool,
}

impl Activity {
    /// Creates an activity display and the reporter feeding it.
    pub fn new() -> (Self, Reporter) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let progress_style =
            ProgressStyle::with_template("{spinner} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        let activity = Self {
            event_rx,
            progress_style,
            in_transcript: false,
        };
        (activity, Reporter { event_tx })
    }

    /// Drives `task` to completion, keeping the terminal up to date.
    pub async fn watch<F: Future>(&mut self, task: F) -> F::Output {
        let mut task = pin!(task);
        let mut progress_bar = None;

        let output = loop {
            // Create a new progress bar if it has been finished, unless
            // an answer is being streamed.
            if !self.in_transcript {
                progress_bar
                    .get_or_insert_with(|| {
                        let progress_bar = ProgressBar::new_spinner();
                        progress_bar.set_style(self.progress_style.clone());
                        progress_bar.set_message("🤔 Thinking...");
                        progress_bar
                    })
                    .inc(1);
            }

            let tick = sleep(Duration::from_millis(100));
            let event = select! {
                output = &mut task => break output,
                event = self.event_rx.recv() => match event {
                    Some(event) => event,
                    None => break task.as_mut().await,
                },
                _ = tick => continue,
            };

            // Finish the progress bar before printing anything else.
            if let Some(progress_bar) = progress_bar.take() {
                progress_bar.finish_and_clear();
            }
            self.show(event);
        };

        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        while let Ok(event) = self.event_rx.try_recv() {
            self.show(event);
        }
        self.end_transcript();
        output
    }

    fn show(&mut self, event: Event) {
        match event {
            Event::Transcript(transcript) => {
                if !self.in_transcript {
                    print!("{}🤖 ", BAR_CHAR.bright_cyan());
                    self.in_transcript = true;
                }
                print!("{}", transcript.bright_white());
                std_io::stdout().flush().ok();
            }
            Event::ToolCall(request) => {
                self.end_transcript();
                let bar = BAR_CHAR.bright_yellow();
                println!("{bar}🔧 Calling {}", request.name.bold());
                if let Some(arguments) = &request.arguments {
                    println!("{bar}📦 Args: {arguments}");
                }
            }
            Event::ToolResult(result) => {
                self.end_transcript();
                if result.outcome.is_error() {
                    println!(
                        "{}❌ {}",
                        BAR_CHAR.bright_red(),
                        result.outcome.text()
                    );
                } else {
                    println!(
                        "{}💱 {}",
                        BAR_CHAR.bright_green(),
                        result.outcome.text()
                    );
                }
            }
        }
    }

    fn end_transcript(&mut self) {
        if self.in_transcript {
            println!();
            self.in_transcript = false;
        }
    }
}

/// Prints an error in the agent's gutter.
pub fn print_error(message: impl Display) {
    println!("{}⚠️  {}", BAR_CHAR.bright_red(), message.bright_red());
}
