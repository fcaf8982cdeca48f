/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes four top-level command modules:

- `subjects` - List the subjects known to the server
- `upload`   - Upload a batch of documents into one subject
- `ask`      - Ask a single question
- `chat`     - Interactive chat mode

Every handler wires the same pieces together: an HTTP backend, a
notification bus, and a terminal renderer that prints notifications as they
appear.
*/

use crate::backend::{HttpBackend, KnowledgeBackend};
use crate::chat::ChatSession;
use crate::config::Config;
use crate::error::Result;
use crate::notifications::NotificationBus;
use crate::render::NotificationRenderer;
use crate::subjects::SubjectDirectory;
use std::sync::Arc;
use std::time::Duration;

// Special commands parser for the chat loop
pub mod special_commands;

/// Shared services for one CLI invocation
struct Services {
    backend: Arc<dyn KnowledgeBackend>,
    bus: NotificationBus,
    renderer: NotificationRenderer,
}

impl Services {
    fn connect(config: &Config) -> Result<Self> {
        let backend: Arc<dyn KnowledgeBackend> =
            Arc::new(HttpBackend::new(&config.api, &config.upload)?);
        let bus = NotificationBus::with_default_ttl(Duration::from_millis(
            config.notifications.default_ttl_ms,
        ));
        let renderer = NotificationRenderer::attach(&bus);
        Ok(Self {
            backend,
            bus,
            renderer,
        })
    }

    fn chat_session(&self, config: &Config) -> ChatSession {
        ChatSession::new(Arc::clone(&self.backend), self.bus.clone())
            .with_fallback_message(config.chat.fallback_message.clone())
            .with_copy_ttl(Duration::from_millis(config.notifications.copy_ttl_ms))
    }

    fn subject_directory(&self) -> SubjectDirectory {
        SubjectDirectory::new(Arc::clone(&self.backend))
    }

    fn finish(self) {
        self.renderer.detach();
    }
}

fn print_subjects(subjects: &[String]) {
    use colored::Colorize;

    if subjects.is_empty() {
        println!("No subjects yet. Upload documents with `notemind upload`.");
        return;
    }
    println!("{}", "Subjects:".bold());
    for subject in subjects {
        println!("  - {}", subject);
    }
}

// Subject listing handler
pub mod subjects {
    //! List the subjects that have ingested documents.

    use super::*;

    /// Fetch and print the subjects known to the server
    ///
    /// # Errors
    ///
    /// Returns error if the server cannot be reached or reports a failure
    pub async fn list_subjects(config: Config) -> Result<()> {
        let services = Services::connect(&config)?;
        let mut directory = services.subject_directory();

        directory.refresh().await?;
        print_subjects(directory.subjects());

        services.finish();
        Ok(())
    }
}

// Batch upload handler
pub mod upload {
    //! Upload handler with a live progress line.
    //!
    //! Files are checked locally first; missing paths abort before anything
    //! is sent. Files with an unexpected extension are uploaded anyway after
    //! a warning.

    use super::*;
    use crate::backend::UploadFile;
    use crate::notifications::NotificationSpec;
    use crate::upload::{BatchProgress, UploadOrchestrator, UploadOutcome, UploadState};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::watch;

    const BAR_WIDTH: usize = 30;

    /// Upload `files` into `subject`, one at a time
    ///
    /// # Errors
    ///
    /// Returns error if a path does not exist, input is invalid, or any
    /// file fails to upload
    pub async fn run_upload(
        config: Config,
        subject: String,
        handwritten: bool,
        files: Vec<PathBuf>,
    ) -> Result<()> {
        let files = check_files(files)?;

        let services = Services::connect(&config)?;
        warn_unaccepted(&services.bus, &files, &config.upload.accepted_extensions);

        let subjects_changed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&subjects_changed);
        let backend = Arc::clone(&services.backend);
        let mut uploader = UploadOrchestrator::new(backend, services.bus.clone())
            .with_subjects_changed(move || flag.store(true, Ordering::SeqCst));

        let printer = tokio::spawn(draw_progress(uploader.watch_progress()));
        let outcome = uploader.submit(files, &subject, handwritten).await;
        printer.abort();
        let _ = printer.await;
        if uploader.state() != UploadState::Idle {
            eprintln!("\r{}", render_progress(&uploader.watch_progress().borrow()));
        }

        let result = match outcome {
            UploadOutcome::Succeeded { files, subject } => {
                println!("Uploaded {} file(s) to \"{}\"", files, subject);
                Ok(())
            }
            UploadOutcome::Rejected(reason) => Err(reason.into()),
            UploadOutcome::Failed { error, .. } => Err(error.into()),
        };

        if subjects_changed.load(Ordering::SeqCst) {
            let mut directory = services.subject_directory();
            match directory.refresh().await {
                Ok(()) => print_subjects(directory.subjects()),
                Err(e) => tracing::debug!("Skipping subject listing: {}", e),
            }
        }

        services.finish();
        result
    }

    /// Resolve paths, failing on the first one that is not a file
    fn check_files(paths: Vec<PathBuf>) -> Result<Vec<UploadFile>> {
        paths
            .into_iter()
            .map(|path| {
                if path.is_file() {
                    Ok(UploadFile::new(path))
                } else {
                    Err(anyhow::anyhow!("File not found: {}", path.display()))
                }
            })
            .collect()
    }

    fn warn_unaccepted(bus: &NotificationBus, files: &[UploadFile], accepted: &[String]) {
        for file in files {
            if !file.has_accepted_extension(accepted) {
                bus.notify(NotificationSpec::warning(
                    "Unsupported File Type",
                    format!(
                        "{} is not one of {}; uploading anyway",
                        file.name(),
                        accepted.join(", ")
                    ),
                ));
            }
        }
    }

    /// Redraw the progress line whenever the batch changes
    async fn draw_progress(mut progress: watch::Receiver<BatchProgress>) {
        loop {
            let snapshot = progress.borrow_and_update().clone();
            if snapshot.state != UploadState::Idle {
                eprint!("\r{}", render_progress(&snapshot));
                let _ = std::io::stderr().flush();
            }
            if progress.changed().await.is_err() {
                break;
            }
        }
    }

    /// Progress line such as `[#####-----]  50% notes.pdf (2/4)`
    pub(crate) fn render_progress(progress: &BatchProgress) -> String {
        let filled = BAR_WIDTH * progress.aggregate_progress as usize / 100;
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
        let file = match (progress.current_index, &progress.current_file) {
            (Some(index), Some(name)) => {
                format!(" {} ({}/{})", name, index + 1, progress.total_files)
            }
            _ => String::new(),
        };
        let state = match progress.state {
            UploadState::InProgress => String::new(),
            other => format!(" {}", other),
        };
        format!("[{}] {:>3}%{}{}", bar, progress.aggregate_progress, file, state)
    }

}

// One-shot question handler
pub mod ask {
    //! Ask one question and print the answer.

    use super::*;
    use crate::chat::SendOutcome;

    /// Ask `question` about `subject` and print the answer
    ///
    /// # Errors
    ///
    /// Returns error if input is invalid or the exchange fails
    pub async fn ask_question(config: Config, subject: String, question: String) -> Result<()> {
        let services = Services::connect(&config)?;
        let mut session = services.chat_session(&config);
        session.select_topic(&subject);

        let result = match session.send(&question).await {
            SendOutcome::Answered { reply } => {
                if let Some(message) = session.message(reply) {
                    println!("{}", message.text);
                }
                Ok(())
            }
            SendOutcome::Failed { error, .. } => Err(error.into()),
            SendOutcome::Rejected(reason) => Err(reason.into()),
        };

        services.finish();
        result
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Runs a readline-based loop. Plain input is sent as a question about
    //! the current subject; input starting with `/` is a special command.

    use super::*;
    use crate::chat::{ChatMessage, Role, SendOutcome};
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::notifications::NotificationSpec;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `subject` - Optional starting subject; falls back to
    ///   `chat.default_subject` from the configuration
    pub async fn run_chat(config: Config, subject: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let services = Services::connect(&config)?;
        let mut session = services.chat_session(&config);
        let mut directory = services.subject_directory();

        if let Err(e) = directory.refresh().await {
            eprintln!("Could not load subjects: {}", e);
        }

        if let Some(subject) = subject.or_else(|| config.chat.default_subject.clone()) {
            select_subject(&mut session, &directory, &subject);
        }

        let mut rl = DefaultEditor::new()?;
        print_welcome_banner(session.topic());

        loop {
            let prompt = format_prompt(session.topic());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}\n", e);
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::SelectSubject(name) => {
                            select_subject(&mut session, &directory, &name);
                        }
                        SpecialCommand::ListSubjects => {
                            if let Err(e) = directory.refresh().await {
                                eprintln!("Could not load subjects: {}", e);
                            }
                            print_subjects(directory.subjects());
                        }
                        SpecialCommand::History => print_history(session.history()),
                        SpecialCommand::Copy(n) => match session.history().get(n - 1) {
                            Some(message) => {
                                let id = message.id;
                                if let Some(text) = session.copy_message(id) {
                                    println!("{}", text);
                                }
                            }
                            None => {
                                services.bus.notify(NotificationSpec::error(
                                    "Copy Failed",
                                    format!("No message #{}", n),
                                ));
                            }
                        },
                        SpecialCommand::Clear => session.clear(),
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => {
                            let outcome = session.send(trimmed).await;
                            let reply = match outcome {
                                SendOutcome::Answered { reply } => Some(reply),
                                SendOutcome::Failed { reply, .. } => Some(reply),
                                SendOutcome::Rejected(_) => None,
                            };
                            if let Some(message) = reply.and_then(|id| session.message(id)) {
                                println!("\n{}\n", message.text);
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        services.finish();
        println!("Goodbye!");
        Ok(())
    }

    fn select_subject(session: &mut ChatSession, directory: &SubjectDirectory, name: &str) {
        if !directory.subjects().is_empty() && !directory.contains(name) {
            eprintln!(
                "{} '{}' has no documents yet; answers may be empty",
                "Note:".yellow(),
                name.trim()
            );
        }
        session.select_topic(name);
        println!("Asking about {}\n", session.topic().cyan());
    }

    fn format_prompt(topic: &str) -> String {
        if topic.is_empty() {
            format!("[{}] >>> ", "no subject".dimmed())
        } else {
            format!("[{}] >>> ", topic.cyan())
        }
    }

    fn print_history(history: &[ChatMessage]) {
        if history.is_empty() {
            println!("No messages yet.\n");
            return;
        }
        for (i, message) in history.iter().enumerate() {
            let role = match message.role {
                Role::User => message.role.to_string().green(),
                Role::Assistant => message.role.to_string().cyan(),
            };
            println!(
                "{:>3}. {} [{}]: {}",
                i + 1,
                role,
                message.created_at.format("%H:%M:%S"),
                message.text
            );
        }
        println!();
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner(topic: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║         NoteMind Interactive Chat - Welcome!                 ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        if topic.is_empty() {
            println!("No subject selected. Use '/subject <name>' to pick one.");
        }
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }
}
