mod support;

use chat_provider::{Completion, SearchFailure, SearchHit};
use chat_provider_mock::{MockChatProvider, MockSearchProvider};
use olaf::{
    AugmentationConfig, Confirmed, EngineConfig, EngineState, MarkerPolicy, ManualClock,
    NoticeLevel, RevealStep, Revealer, Role, SessionId, Turn, TurnEvent,
};
use pretty_assertions::assert_eq;
use session_store::KeyValueStore;

use support::{drain_reveal, exchange, open_engine, run_job, HostSpy};

fn search_config(marker_policy: MarkerPolicy) -> EngineConfig {
    EngineConfig {
        augmentation: AugmentationConfig {
            enabled: true,
            marker_policy,
        },
        reveal_chunk_chars: 3,
    }
}

#[test]
fn superseding_reveal_never_shows_old_text_again() {
    let mut revealer = Revealer::new(2);
    let first = revealer.reveal("AAAAAAAAAA");
    let mut displayed = Vec::new();
    if let RevealStep::Partial(text) = revealer.step(first) {
        displayed.push(text);
    }

    let second = revealer.reveal("bbbbbb");
    let mut pending = vec![first, second, first];
    while let Some(generation) = pending.pop() {
        match revealer.step(generation) {
            RevealStep::Stale => {}
            RevealStep::Partial(text) => {
                displayed.push(text);
                pending.insert(0, generation);
            }
            RevealStep::Complete(text) => displayed.push(text),
        }
    }

    let after_switch = &displayed[1..];
    assert!(after_switch.iter().all(|text| !text.contains('A')));
    assert_eq!(displayed.last().map(String::as_str), Some("bbbbbb"));
}

#[test]
fn reply_is_revealed_in_chunks_before_commit() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    chat.push_reply(Completion::from_reply(Some("abcdefgh".to_string()), None, None));
    let mut host = HostSpy::default();
    let mut engine = open_engine(
        dir.path(),
        &clock,
        EngineConfig {
            reveal_chunk_chars: 3,
            ..EngineConfig::default()
        },
    );
    engine.refresh_models(&chat, &mut host);

    engine.submit("spell it", &mut host).expect("submit");
    for event in run_job(host.take_job(), &chat, None) {
        engine.on_turn_event(event, &mut host);
    }

    let mut visible = Vec::new();
    while let Some(generation) = host.scheduled.pop() {
        match engine.on_reveal_step(generation, &mut host) {
            RevealStep::Partial(text) => {
                assert_eq!(engine.revealing_text(), Some(text.as_str()));
                assert_eq!(engine.active_turns().len(), 1);
                visible.push(text);
            }
            RevealStep::Complete(text) => visible.push(text),
            RevealStep::Stale => panic!("reveal step should not be stale"),
        }
    }

    assert_eq!(visible, vec!["abc", "abcdef", "abcdefgh"]);
    assert_eq!(engine.active_turns()[1], Turn::assistant("abcdefgh"));
    assert_eq!(engine.revealing_text(), None);
    assert!(!engine.is_busy());
}

#[test]
fn throughput_is_reported_only_with_eval_metrics() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    chat.push_reply(Completion::from_reply(
        Some("hi".to_string()),
        Some(50),
        Some(1_000_000_000),
    ));
    chat.push_reply(Completion::from_reply(Some("hi".to_string()), None, Some(1_000_000_000)));
    let mut host = HostSpy::default();
    let mut engine = open_engine(dir.path(), &clock, EngineConfig::default());
    engine.refresh_models(&chat, &mut host);

    exchange(&mut engine, &mut host, &chat, None, "one");
    assert_eq!(
        engine.throughput().map(|value| value.to_string()).as_deref(),
        Some("50.00 tokens/sec")
    );

    exchange(&mut engine, &mut host, &chat, None, "two");
    assert_eq!(engine.throughput(), None);
}

#[test]
fn empty_reply_is_committed_as_placeholder() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    chat.push_reply(Completion::from_reply(Some(String::new()), None, None));
    let mut host = HostSpy::default();
    let mut engine = open_engine(dir.path(), &clock, EngineConfig::default());
    engine.refresh_models(&chat, &mut host);

    exchange(&mut engine, &mut host, &chat, None, "say nothing");

    assert_eq!(engine.active_turns()[1], Turn::assistant("(No response)"));
}

#[test]
fn search_failure_sends_original_turns_and_persists_no_search_content() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    let search = MockSearchProvider::new();
    search.push_failure(SearchFailure::new("connection refused"));
    let mut host = HostSpy::default();
    let mut engine = open_engine(dir.path(), &clock, search_config(MarkerPolicy::Exclude));
    engine.refresh_models(&chat, &mut host);

    exchange(&mut engine, &mut host, &chat, Some(&search), "latest rust release");

    let requests = chat.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, Role::User);
    assert_eq!(requests[0].messages[0].content, "latest rust release");

    assert_eq!(host.notices.len(), 1);
    assert_eq!(host.notices[0].level, NoticeLevel::Warning);

    let stored = engine
        .store()
        .get(&engine.active_session_id().key())
        .expect("get")
        .expect("session persisted");
    assert!(!stored.contains("\"system\""));
    assert_eq!(engine.active_turns().len(), 2);
}

#[test]
fn successful_search_records_marker_but_not_results() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    let search = MockSearchProvider::new();
    search.push_hits(vec![SearchHit {
        title: "Rust 1.80 released".to_string(),
        snippet: "LazyCell and LazyLock are stable".to_string(),
        url: Some("https://blog.rust-lang.org".to_string()),
    }]);
    let mut host = HostSpy::default();
    let mut engine = open_engine(dir.path(), &clock, search_config(MarkerPolicy::Exclude));
    engine.refresh_models(&chat, &mut host);

    exchange(&mut engine, &mut host, &chat, Some(&search), "latest rust release");

    let roles: Vec<Role> = chat.requests()[0]
        .messages
        .iter()
        .map(|message| message.role)
        .collect();
    assert_eq!(roles, vec![Role::System, Role::System, Role::User]);
    assert_eq!(
        engine.active_turns(),
        &[
            Turn::user("latest rust release"),
            Turn::search_marker("latest rust release"),
            Turn::assistant("Mock reply from mock: latest rust release"),
        ]
    );
    let stored = engine
        .store()
        .get(&engine.active_session_id().key())
        .expect("get")
        .expect("session persisted");
    assert!(!stored.contains("LazyCell"));
}

#[test]
fn marker_policy_controls_follow_up_requests() {
    for (policy, expected_messages) in [(MarkerPolicy::Exclude, 3), (MarkerPolicy::Forward, 4)] {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let clock = ManualClock::new(1_000);
        let chat = MockChatProvider::new();
        let search = MockSearchProvider::new();
        let mut host = HostSpy::default();
        let mut engine = open_engine(dir.path(), &clock, search_config(policy));
        engine.refresh_models(&chat, &mut host);

        exchange(&mut engine, &mut host, &chat, Some(&search), "first");
        engine.set_search_enabled(false);
        exchange(&mut engine, &mut host, &chat, Some(&search), "second");

        let follow_up = &chat.requests()[1];
        assert_eq!(follow_up.messages.len(), expected_messages, "{policy:?}");
        assert_eq!(search.queries(), vec!["first".to_string()]);
    }
}

#[test]
fn completion_for_abandoned_session_is_discarded() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    let mut host = HostSpy::default();
    let mut engine = open_engine(dir.path(), &clock, EngineConfig::default());
    engine.refresh_models(&chat, &mut host);

    engine.submit("slow question", &mut host).expect("submit");
    let origin = engine.active_session_id();
    let job = host.take_job();

    clock.advance(1_000);
    engine.new_chat().expect("new chat");
    assert!(!engine.is_busy());

    for event in run_job(job, &chat, None) {
        engine.on_turn_event(event, &mut host);
    }
    drain_reveal(&mut engine, &mut host);

    assert_eq!(engine.transcript(origin), vec![Turn::user("slow question")]);
    assert!(engine.active_turns().is_empty());
    assert!(host.scheduled.is_empty());

    engine.load_session(origin);
    assert_eq!(engine.active_turns(), &[Turn::user("slow question")]);
}

/// Opens an engine with one answered session, then starts a second chat.
/// Returns the engine and the id of the answered session.
fn engine_with_earlier_chat(
    dir: &std::path::Path,
    clock: &ManualClock,
    chat: &MockChatProvider,
    host: &mut HostSpy,
) -> (EngineState, SessionId) {
    let config = EngineConfig {
        reveal_chunk_chars: 3,
        ..EngineConfig::default()
    };
    let mut engine = open_engine(dir, clock, config);
    engine.refresh_models(chat, host);
    exchange(&mut engine, host, chat, None, "earlier question");
    let earlier = engine.active_session_id();

    clock.advance(1_000);
    engine.new_chat().expect("new chat");
    (engine, earlier)
}

#[test]
fn reloading_active_session_keeps_pending_reply() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    let mut host = HostSpy::default();
    let mut engine = open_engine(dir.path(), &clock, EngineConfig::default());
    engine.refresh_models(&chat, &mut host);

    engine.submit("hi", &mut host).expect("submit");
    let job = host.take_job();
    engine.load_session(engine.active_session_id());
    assert!(engine.is_busy());

    for event in run_job(job, &chat, None) {
        engine.on_turn_event(event, &mut host);
    }
    drain_reveal(&mut engine, &mut host);

    let turns = engine.active_turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role, Role::Assistant);
    assert!(!engine.is_busy());
}

#[test]
fn switching_to_existing_session_discards_pending_completion() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    let mut host = HostSpy::default();
    let (mut engine, earlier) = engine_with_earlier_chat(dir.path(), &clock, &chat, &mut host);
    let earlier_turns = engine.transcript(earlier);
    assert_eq!(earlier_turns.len(), 2);

    engine.submit("slow question", &mut host).expect("submit");
    let current = engine.active_session_id();
    let job = host.take_job();
    engine.load_session(earlier);
    assert!(!engine.is_busy());

    for event in run_job(job, &chat, None) {
        engine.on_turn_event(event, &mut host);
    }
    drain_reveal(&mut engine, &mut host);

    assert_eq!(engine.active_turns(), earlier_turns.as_slice());
    assert_eq!(engine.transcript(earlier), earlier_turns);
    assert_eq!(engine.transcript(current), vec![Turn::user("slow question")]);
}

#[test]
fn switching_sessions_mid_reveal_cancels_commit() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    let mut host = HostSpy::default();
    let (mut engine, earlier) = engine_with_earlier_chat(dir.path(), &clock, &chat, &mut host);
    let earlier_turns = engine.transcript(earlier);

    engine.submit("long answer please", &mut host).expect("submit");
    let current = engine.active_session_id();
    for event in run_job(host.take_job(), &chat, None) {
        engine.on_turn_event(event, &mut host);
    }
    let generation = host.scheduled.remove(0);
    assert!(matches!(
        engine.on_reveal_step(generation, &mut host),
        RevealStep::Partial(_)
    ));

    engine.load_session(earlier);
    assert_eq!(engine.revealing_text(), None);
    drain_reveal(&mut engine, &mut host);

    assert_eq!(engine.transcript(earlier), earlier_turns);
    assert_eq!(engine.transcript(current), vec![Turn::user("long answer please")]);
}

#[test]
fn late_reply_never_recreates_deleted_session() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    let mut host = HostSpy::default();
    let (mut engine, earlier) = engine_with_earlier_chat(dir.path(), &clock, &chat, &mut host);
    let earlier_turns = engine.transcript(earlier);

    engine.submit("forget this", &mut host).expect("submit");
    let doomed = engine.active_session_id();
    let job = host.take_job();
    engine
        .delete_session(doomed, Confirmed::granted())
        .expect("delete active session");
    assert!(!engine.is_busy());
    assert_eq!(engine.active_session_id(), earlier);

    for event in run_job(job, &chat, None) {
        engine.on_turn_event(event, &mut host);
    }
    drain_reveal(&mut engine, &mut host);

    assert_eq!(engine.store().get(&doomed.key()).expect("store read"), None);
    assert!(engine.sessions().iter().all(|summary| summary.id != doomed));
    assert_eq!(engine.transcript(earlier), earlier_turns);
}

#[test]
fn completion_failure_keeps_user_turn_and_allows_resubmit() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let clock = ManualClock::new(1_000);
    let chat = MockChatProvider::new();
    chat.push_failure(chat_provider::CompletionFailure::status("HTTP 404: model not found"));
    let mut host = HostSpy::default();
    let mut engine = open_engine(dir.path(), &clock, EngineConfig::default());
    engine.refresh_models(&chat, &mut host);

    engine.submit("hello", &mut host).expect("submit");
    let events = run_job(host.take_job(), &chat, None);
    assert!(matches!(events.as_slice(), [TurnEvent::Failed { .. }]));
    for event in events {
        engine.on_turn_event(event, &mut host);
    }

    assert_eq!(engine.active_turns(), &[Turn::user("hello")]);
    assert_eq!(host.notices[0].level, NoticeLevel::Error);
    assert!(host.notices[0].text.contains("model not found"));
    assert!(!engine.is_busy());

    exchange(&mut engine, &mut host, &chat, None, "hello again");
    assert_eq!(engine.active_turns().len(), 3);
}
