//! Single-threaded event loop around [`EngineState`].
//!
//! Stdin lines, worker results and reveal ticks all arrive on one channel and
//! are applied in order. Each submission runs on its own worker thread; reveal
//! ticks come from one timer thread that sleeps between steps.

use std::io::{self, BufRead, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chat_provider::CompletionFailure;
use olaf::{
    run_turn, Confirmed, EngineError, EngineHost, EngineState, Generation, Notice, RevealStep, Role,
    SessionId, Theme, TurnEvent, TurnJob,
};
use tracing::{debug, error};

use crate::avatar::data_url_from_file;
use crate::commands::{
    parse_slash_command, AvatarSource, AvatarTarget, SessionRef, SlashCommand, ToggleTarget,
    HELP_TEXT,
};
use crate::providers::Providers;
use crate::view::{
    notice_prefix, render_models, render_sessions, render_transcript, render_turn, speaker_label,
    Palette,
};

#[derive(Debug)]
pub enum LoopEvent {
    Input(String),
    InputClosed,
    Turn(TurnEvent),
    RevealTick(Generation),
}

/// [`EngineHost`] backed by worker threads and a reveal timer thread.
pub struct LoopHost {
    events: Sender<LoopEvent>,
    timer: Sender<Generation>,
    providers: Providers,
    notices: Vec<Notice>,
}

impl LoopHost {
    pub fn new(
        events: Sender<LoopEvent>,
        providers: Providers,
        reveal_tick: Duration,
    ) -> io::Result<Self> {
        let (timer, ticks) = mpsc::channel::<Generation>();
        let tick_events = events.clone();
        thread::Builder::new()
            .name("olaf-reveal-timer".to_string())
            .spawn(move || {
                for generation in ticks {
                    if !reveal_tick.is_zero() {
                        thread::sleep(reveal_tick);
                    }
                    if tick_events.send(LoopEvent::RevealTick(generation)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            events,
            timer,
            providers,
            notices: Vec::new(),
        })
    }

    fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

impl EngineHost for LoopHost {
    fn start_turn(&mut self, job: TurnJob) {
        let request_id = job.request_id;
        let events = self.events.clone();
        let chat = Arc::clone(&self.providers.chat);
        let search = self.providers.search.clone();

        let spawned = thread::Builder::new()
            .name(format!("olaf-turn-{request_id}"))
            .spawn(move || {
                let mut terminal_sent = false;
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    run_turn(job, chat.as_ref(), search.as_deref(), &mut |event| {
                        terminal_sent |= matches!(
                            event,
                            TurnEvent::Completed { .. } | TurnEvent::Failed { .. }
                        );
                        let _ = events.send(LoopEvent::Turn(event));
                    });
                }));

                if outcome.is_err() && !terminal_sent {
                    error!(request_id, "turn worker panicked");
                    let _ = events.send(LoopEvent::Turn(TurnEvent::Failed {
                        request_id,
                        failure: CompletionFailure::transport("chat provider panicked"),
                    }));
                }
            });

        if let Err(spawn_error) = spawned {
            error!(request_id, error = %spawn_error, "failed to spawn turn worker");
            let _ = self.events.send(LoopEvent::Turn(TurnEvent::Failed {
                request_id,
                failure: CompletionFailure::transport(format!(
                    "failed to start request worker: {spawn_error}"
                )),
            }));
        }
    }

    fn schedule_reveal_step(&mut self, generation: Generation) {
        if self.timer.send(generation).is_err() {
            debug!(generation, "reveal timer stopped; delivering step immediately");
            let _ = self.events.send(LoopEvent::RevealTick(generation));
        }
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

/// Reads stdin lines into the loop until EOF.
pub fn spawn_stdin_reader(events: Sender<LoopEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("olaf-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if events.send(LoopEvent::Input(line)).is_err() {
                            return;
                        }
                    }
                    Err(read_error) => {
                        error!(error = %read_error, "stdin read failed");
                        break;
                    }
                }
            }
            let _ = events.send(LoopEvent::InputClosed);
        })?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingConfirmation {
    Delete(SessionId),
    DeleteAll,
}

/// Drives the engine from loop events and renders to `out`.
pub struct ChatLoop<W: Write> {
    engine: EngineState,
    host: LoopHost,
    events: Receiver<LoopEvent>,
    out: W,
    palette: Palette,
    confirmation: Option<PendingConfirmation>,
    /// Bytes of the current reveal already written.
    reveal_printed: Option<usize>,
    reveal_line_open: bool,
    input_closed: bool,
    quit: bool,
}

impl<W: Write> ChatLoop<W> {
    pub fn new(
        engine: EngineState,
        host: LoopHost,
        events: Receiver<LoopEvent>,
        out: W,
        ansi: bool,
    ) -> Self {
        let palette = Palette::new(engine.preferences().theme(), ansi);
        Self {
            engine,
            host,
            events,
            out,
            palette,
            confirmation: None,
            reveal_printed: None,
            reveal_line_open: false,
            input_closed: false,
            quit: false,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &EngineState {
        &self.engine
    }

    pub fn into_parts(self) -> (EngineState, W) {
        (self.engine, self.out)
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Starts up, then processes events until quit.
    pub fn run(&mut self) -> io::Result<()> {
        self.start()?;
        while !self.quit {
            let Ok(event) = self.events.recv() else {
                break;
            };
            self.handle(event)?;
        }
        self.out.flush()
    }

    /// Processes queued events until no request is pending.
    ///
    /// For headless drivers that feed input through [`ChatLoop::handle`].
    pub fn settle(&mut self) -> io::Result<()> {
        while self.engine.is_busy() {
            let Ok(event) = self.events.recv() else {
                break;
            };
            self.handle(event)?;
        }
        Ok(())
    }

    /// Lists models and shows the active chat.
    pub fn start(&mut self) -> io::Result<()> {
        self.refresh_models();
        writeln!(self.out, "{}. Type /help for commands.", self.palette.paint("Olaf"))?;
        if let Some(model) = self.engine.preferences().selected_model() {
            writeln!(self.out, "Model: {model}")?;
        }
        if self.engine.search_enabled() {
            writeln!(self.out, "Web search: on")?;
        }
        self.flush_notices()?;
        self.show_sidebar()?;
        if !self.engine.active_turns().is_empty() {
            self.show_history()?;
        }
        self.out.flush()
    }

    pub fn handle(&mut self, event: LoopEvent) -> io::Result<()> {
        match event {
            LoopEvent::Input(line) => self.on_input(&line)?,
            LoopEvent::InputClosed => {
                self.input_closed = true;
                self.confirmation = None;
            }
            LoopEvent::Turn(event) => self.on_turn_event(event)?,
            LoopEvent::RevealTick(generation) => self.on_reveal_tick(generation)?,
        }

        if self.input_closed && !self.engine.is_busy() {
            self.quit = true;
        }
        self.flush_notices()?;
        self.out.flush()
    }

    fn on_input(&mut self, line: &str) -> io::Result<()> {
        self.interrupt_reveal_line()?;
        self.dispatch_input(line)?;
        if self.engine.revealing_text().is_none() {
            self.reveal_printed = None;
        }
        Ok(())
    }

    fn dispatch_input(&mut self, line: &str) -> io::Result<()> {
        if let Some(pending) = self.confirmation.take() {
            return self.resolve_confirmation(pending, line);
        }

        match parse_slash_command(line) {
            Some(command) => self.on_command(command),
            None => {
                if let Err(submit_error) = self.engine.submit(line, &mut self.host) {
                    self.report(&submit_error)?;
                }
                Ok(())
            }
        }
    }

    fn on_command(&mut self, command: SlashCommand) -> io::Result<()> {
        match command {
            SlashCommand::Help => writeln!(self.out, "{HELP_TEXT}"),
            SlashCommand::Quit => {
                self.quit = true;
                Ok(())
            }
            SlashCommand::New => {
                match self.engine.new_chat() {
                    Ok(_) => {
                        writeln!(self.out, "Started a new chat.")?;
                        self.show_sidebar()
                    }
                    Err(engine_error) => self.report(&engine_error),
                }
            }
            SlashCommand::Sessions => self.show_sessions(),
            SlashCommand::Load(reference) => match self.resolve_session(reference)? {
                Some(id) => {
                    self.engine.load_session(id);
                    writeln!(self.out, "Opened {}.", id.title())?;
                    self.show_history()
                }
                None => Ok(()),
            },
            SlashCommand::Delete(reference) => match self.resolve_session(reference)? {
                Some(id) => {
                    self.confirmation = Some(PendingConfirmation::Delete(id));
                    write!(self.out, "Delete {}? [y/N] ", id.title())
                }
                None => Ok(()),
            },
            SlashCommand::DeleteAll => {
                self.confirmation = Some(PendingConfirmation::DeleteAll);
                write!(self.out, "Delete all chats? [y/N] ")
            }
            SlashCommand::Models => {
                self.refresh_models();
                let listing = render_models(
                    self.engine.models(),
                    self.engine.preferences().selected_model(),
                );
                writeln!(self.out, "{listing}")
            }
            SlashCommand::Model(model) => {
                self.refresh_models();
                match self.engine.set_selected_model(&model) {
                    Ok(()) => writeln!(self.out, "Model set to {}.", model.trim()),
                    Err(engine_error) => self.report(&engine_error),
                }
            }
            SlashCommand::Search(enabled) => {
                self.engine.set_search_enabled(enabled);
                writeln!(self.out, "Web search {}.", if enabled { "on" } else { "off" })
            }
            SlashCommand::Theme(name) => match name.parse::<Theme>() {
                Ok(theme) => match self.engine.set_theme(theme) {
                    Ok(()) => {
                        self.palette.set_theme(theme);
                        writeln!(self.out, "Theme set to {}.", self.palette.paint(theme.as_str()))
                    }
                    Err(engine_error) => self.report(&engine_error),
                },
                Err(unknown) => writeln!(self.out, "! {unknown}"),
            },
            SlashCommand::Username(name) => {
                match self.engine.set_username(name.as_deref().unwrap_or_default()) {
                    Ok(()) => writeln!(
                        self.out,
                        "Username set to {}.",
                        self.engine.preferences().username()
                    ),
                    Err(engine_error) => self.report(&engine_error),
                }
            }
            SlashCommand::Avatar { target, source } => self.set_avatar(target, source),
            SlashCommand::Toggle(target) => self.toggle(target),
            SlashCommand::History => self.show_history(),
            SlashCommand::Usage(usage) => writeln!(self.out, "Usage: {usage}"),
            SlashCommand::Unknown(command) => {
                writeln!(self.out, "Unknown command {command}. Type /help for commands.")
            }
        }
    }

    fn on_turn_event(&mut self, event: TurnEvent) -> io::Result<()> {
        let before = self.engine.active_turns().len();
        self.engine.on_turn_event(event, &mut self.host);

        let appended: Vec<String> = self
            .engine
            .active_turns()
            .get(before..)
            .unwrap_or_default()
            .iter()
            .filter(|turn| turn.augmented)
            .map(|turn| render_turn(self.engine.preferences(), turn, self.palette))
            .collect();
        for line in appended {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn on_reveal_tick(&mut self, generation: Generation) -> io::Result<()> {
        match self.engine.on_reveal_step(generation, &mut self.host) {
            RevealStep::Stale => Ok(()),
            RevealStep::Partial(text) => self.print_reveal(&text),
            RevealStep::Complete(text) => {
                self.print_reveal(&text)?;
                self.end_reveal_line()?;
                if let Some(throughput) = self.engine.throughput() {
                    writeln!(self.out, "  ({throughput})")?;
                }
                Ok(())
            }
        }
    }

    /// Writes the unseen part of `visible`. A reveal resumed after other
    /// output gets a fresh label and an ellipsis instead of a repeat.
    fn print_reveal(&mut self, visible: &str) -> io::Result<()> {
        let printed = self.reveal_printed.unwrap_or(0);
        if !self.reveal_line_open {
            let label = speaker_label(self.engine.preferences(), Role::Assistant, self.palette);
            let resumed = if printed > 0 { "…" } else { "" };
            write!(self.out, "{label}: {resumed}")?;
            self.reveal_line_open = true;
        }
        if let Some(delta) = visible.get(printed..) {
            write!(self.out, "{delta}")?;
        }
        self.reveal_printed = Some(visible.len());
        Ok(())
    }

    /// Moves off a half-written reveal line so other output starts clean.
    fn interrupt_reveal_line(&mut self) -> io::Result<()> {
        if std::mem::take(&mut self.reveal_line_open) {
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn end_reveal_line(&mut self) -> io::Result<()> {
        self.reveal_printed = None;
        self.interrupt_reveal_line()
    }

    fn resolve_confirmation(&mut self, pending: PendingConfirmation, answer: &str) -> io::Result<()> {
        let Some(confirmed) = Confirmed::from_answer(answer) else {
            return writeln!(self.out, "Cancelled.");
        };

        let result = match pending {
            PendingConfirmation::Delete(id) => self
                .engine
                .delete_session(id, confirmed)
                .map(|()| format!("Deleted {}.", id.title())),
            PendingConfirmation::DeleteAll => self
                .engine
                .delete_all(confirmed)
                .map(|removed| format!("Deleted {removed} chats.")),
        };
        match result {
            Ok(message) => {
                writeln!(self.out, "{message}")?;
                self.show_sidebar()
            }
            Err(engine_error) => self.report(&engine_error),
        }
    }

    fn resolve_session(&mut self, reference: SessionRef) -> io::Result<Option<SessionId>> {
        let sessions = self.engine.sessions();
        let found = match reference {
            SessionRef::Index(position) => position
                .checked_sub(1)
                .and_then(|index| sessions.get(index))
                .map(|summary| summary.id),
            SessionRef::Id(id) => sessions
                .iter()
                .any(|summary| summary.id == id)
                .then_some(id),
        };
        if found.is_none() {
            writeln!(self.out, "No such chat. Use /sessions to list saved chats.")?;
        }
        Ok(found)
    }

    fn set_avatar(&mut self, target: AvatarTarget, source: AvatarSource) -> io::Result<()> {
        let data_url = match source {
            AvatarSource::Reset => None,
            AvatarSource::File(path) => match data_url_from_file(&path) {
                Ok(data_url) => Some(data_url),
                Err(avatar_error) => return writeln!(self.out, "! {avatar_error}"),
            },
        };
        let reset = data_url.is_none();

        let (saved, who) = match target {
            AvatarTarget::User => (self.engine.set_user_avatar(data_url), "User"),
            AvatarTarget::Bot => (self.engine.set_bot_avatar(data_url), "Bot"),
        };
        match saved {
            Ok(()) if reset => writeln!(self.out, "{who} avatar reset."),
            Ok(()) => writeln!(self.out, "{who} avatar updated."),
            Err(engine_error) => self.report(&engine_error),
        }
    }

    fn toggle(&mut self, target: ToggleTarget) -> io::Result<()> {
        let preferences = self.engine.preferences();
        let (result, name, now) = match target {
            ToggleTarget::Username => {
                let now = !preferences.show_username();
                (self.engine.set_show_username(now), "Username", now)
            }
            ToggleTarget::Avatars => {
                let now = !preferences.show_avatars();
                (self.engine.set_show_avatars(now), "Avatars", now)
            }
            ToggleTarget::Sidebar => {
                let now = !preferences.sidebar_open();
                (self.engine.set_sidebar_open(now), "Sidebar", now)
            }
        };
        match result {
            Ok(()) => writeln!(self.out, "{name} {}.", if now { "shown" } else { "hidden" }),
            Err(engine_error) => self.report(&engine_error),
        }
    }

    fn refresh_models(&mut self) {
        let chat = Arc::clone(&self.host.providers.chat);
        self.engine.refresh_models(chat.as_ref(), &mut self.host);
    }

    fn show_sessions(&mut self) -> io::Result<()> {
        let listing = render_sessions(&self.engine.sessions(), self.engine.active_session_id());
        writeln!(self.out, "{listing}")
    }

    fn show_sidebar(&mut self) -> io::Result<()> {
        if self.engine.preferences().sidebar_open() {
            self.show_sessions()?;
        }
        Ok(())
    }

    fn show_history(&mut self) -> io::Result<()> {
        let transcript = render_transcript(
            self.engine.preferences(),
            self.engine.active_turns(),
            self.palette,
        );
        writeln!(self.out, "{transcript}")
    }

    fn flush_notices(&mut self) -> io::Result<()> {
        for notice in self.host.take_notices() {
            writeln!(self.out, "{} {}", notice_prefix(notice.level), notice.text)?;
        }
        Ok(())
    }

    fn report(&mut self, engine_error: &EngineError) -> io::Result<()> {
        if engine_error.is_validation() {
            debug!(error = %engine_error, "input rejected");
        } else {
            error!(error = %engine_error, "engine operation failed");
        }
        writeln!(self.out, "! {engine_error}")
    }
}
