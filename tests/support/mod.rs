#![allow(dead_code)]

use std::path::Path;

use chat_provider::{ChatProvider, SearchProvider};
use olaf::{
    run_turn, EngineConfig, EngineHost, EngineState, Generation, ManualClock, Notice, TurnEvent,
    TurnJob,
};
use session_store::FileStore;

#[derive(Default)]
pub struct HostSpy {
    pub jobs: Vec<TurnJob>,
    pub scheduled: Vec<Generation>,
    pub notices: Vec<Notice>,
}

impl HostSpy {
    pub fn take_job(&mut self) -> TurnJob {
        assert!(!self.jobs.is_empty(), "a turn job should have been started");
        self.jobs.remove(0)
    }
}

impl EngineHost for HostSpy {
    fn start_turn(&mut self, job: TurnJob) {
        self.jobs.push(job);
    }

    fn schedule_reveal_step(&mut self, generation: Generation) {
        self.scheduled.push(generation);
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

pub fn open_engine(root: &Path, clock: &ManualClock, config: EngineConfig) -> EngineState {
    let store = FileStore::open(root).expect("store should open");
    EngineState::new(Box::new(store), Box::new(clock.clone()), config).expect("engine should open")
}

/// Runs `job` the way a worker thread would and returns its events in order.
pub fn run_job(
    job: TurnJob,
    chat: &dyn ChatProvider,
    search: Option<&dyn SearchProvider>,
) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    run_turn(job, chat, search, &mut |event| events.push(event));
    events
}

/// Delivers scheduled reveal steps until none remain.
pub fn drain_reveal(engine: &mut EngineState, host: &mut HostSpy) {
    while !host.scheduled.is_empty() {
        let generation = host.scheduled.remove(0);
        engine.on_reveal_step(generation, host);
    }
}

/// Submits `prompt`, runs the job against `chat`, and reveals the reply.
pub fn exchange(
    engine: &mut EngineState,
    host: &mut HostSpy,
    chat: &dyn ChatProvider,
    search: Option<&dyn SearchProvider>,
    prompt: &str,
) {
    engine.submit(prompt, host).expect("submit should be accepted");
    let job = host.take_job();
    for event in run_job(job, chat, search) {
        engine.on_turn_event(event, host);
    }
    drain_reveal(engine, host);
}
