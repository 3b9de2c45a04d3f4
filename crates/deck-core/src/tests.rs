#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::pin::Pin;

    use async_trait::async_trait;
    use futures::{stream, Stream};

    use deck_types::config::ApiConfig;
    use deck_types::event::UiEvent;
    use deck_types::history::HistoryEntry;
    use deck_types::template::Template;
    use deck_types::DeckError;

    use crate::event_bus::EventBus;
    use crate::history::{HistoryStore, HISTORY_KEY, HISTORY_LIMIT};
    use crate::ports::*;
    use crate::protocol::*;
    use crate::session::{SessionManager, SessionPhase};
    use crate::submit::{validate, SubmitController};

    fn entry(template: &str, input: &str, timestamp: &str) -> HistoryEntry {
        HistoryEntry {
            template_name: template.to_string(),
            input_texts: vec![input.to_string()],
            config_id: None,
            temperature: None,
            response: "r".to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    fn config(id: &str, temp: Option<f32>) -> ApiConfig {
        ApiConfig {
            id: id.to_string(),
            name: format!("config {}", id),
            default_temperature: temp,
            url: None,
            model: None,
        }
    }

    // Single-threaded executor for port mocks (everything resolves
    // immediately; no WASM runtime in native tests).
    fn block_on<F: std::future::Future<Output = T>, T>(f: F) -> T {
        use std::sync::Arc;
        use std::task::{Context, Poll, Wake, Waker};

        struct NoopWaker;
        impl Wake for NoopWaker {
            fn wake(self: Arc<Self>) {}
        }

        let waker = Waker::from(Arc::new(NoopWaker));
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(val) => return val,
                Poll::Pending => std::thread::yield_now(),
            }
        }
    }

    // ─── EventBus Tests ──────────────────────────────────────

    #[test]
    fn test_event_bus_emit_and_drain() {
        let bus = EventBus::new();
        bus.emit(UiEvent::SubmitStarted { session_id: 1 });
        bus.emit(UiEvent::ResponseDelta {
            session_id: 1,
            chunk: "x".to_string(),
        });

        assert!(bus.has_pending());
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert!(!bus.has_pending());
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_event_bus_clone_shares_state() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();
        bus1.emit(UiEvent::SubmitStarted { session_id: 1 });
        assert!(bus2.has_pending());
        assert_eq!(bus2.drain().len(), 1);
        assert!(!bus1.has_pending());
    }

    // ─── Protocol Tests ──────────────────────────────────────

    #[test]
    fn test_parse_frame_delta() {
        assert_eq!(
            parse_frame("data: Hel"),
            Some(ChatStreamEvent::Delta("Hel".to_string()))
        );
    }

    #[test]
    fn test_parse_frame_done() {
        assert_eq!(parse_frame("data: [DONE]"), Some(ChatStreamEvent::Done));
    }

    #[test]
    fn test_parse_frame_error() {
        assert_eq!(
            parse_frame("data: ERROR: rate limited (code 429)"),
            Some(ChatStreamEvent::Error("rate limited (code 429)".to_string()))
        );
    }

    #[test]
    fn test_parse_frame_ignores_blank_and_foreign_lines() {
        assert_eq!(parse_frame(""), None);
        assert_eq!(parse_frame(": keepalive"), None);
        assert_eq!(parse_frame("event: message"), None);
    }

    #[test]
    fn test_frame_decoder_concatenation_order() {
        let mut decoder = FrameDecoder::new();
        let mut events = Vec::new();
        events.extend(decoder.push(b"data: Hel\n\ndata: lo\n\n"));
        events.extend(decoder.push(b"data: [DONE]\n\n"));
        events.extend(decoder.finish());

        assert_eq!(
            events,
            vec![
                ChatStreamEvent::Delta("Hel".to_string()),
                ChatStreamEvent::Delta("lo".to_string()),
                ChatStreamEvent::Done,
            ]
        );
    }

    #[test]
    fn test_frame_decoder_split_mid_line() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: Hel").is_empty());
        let events = decoder.push(b"lo\n");
        assert_eq!(events, vec![ChatStreamEvent::Delta("Hello".to_string())]);
    }

    #[test]
    fn test_frame_decoder_split_mid_utf8() {
        // "é" is two bytes; cut between them.
        let bytes = "data: caf\u{e9}\n".as_bytes();
        let cut = bytes.len() - 2;
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&bytes[..cut]).is_empty());
        let events = decoder.push(&bytes[cut..]);
        assert_eq!(events, vec![ChatStreamEvent::Delta("caf\u{e9}".to_string())]);
    }

    #[test]
    fn test_frame_decoder_finish_flushes_partial_line() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        let events = decoder.finish();
        assert_eq!(events, vec![ChatStreamEvent::Delta("tail".to_string())]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_frame_decoder_crlf() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"data: chunk\r\n");
        assert_eq!(events, vec![ChatStreamEvent::Delta("chunk".to_string())]);
    }

    #[test]
    fn test_extract_error_json_field_first() {
        let body = r#"{"error": "Temperature must be between 0.0 and 2.0"}"#;
        assert_eq!(
            extract_error_message(400, body),
            "Temperature must be between 0.0 and 2.0"
        );
    }

    #[test]
    fn test_extract_error_html_title() {
        let body = "<html><title>Bad Gateway</title></html>";
        assert_eq!(extract_error_message(502, body), "Bad Gateway");
    }

    #[test]
    fn test_extract_error_html_h1_with_attributes() {
        let body = r#"<html><body><h1 class="err">Service Unavailable</h1></body></html>"#;
        assert_eq!(extract_error_message(503, body), "Service Unavailable");
    }

    #[test]
    fn test_extract_error_raw_body() {
        assert_eq!(extract_error_message(500, "upstream exploded"), "upstream exploded");
    }

    #[test]
    fn test_extract_error_generic_fallback() {
        assert_eq!(extract_error_message(500, "   "), "server error (500)");
        assert_eq!(extract_error_message(404, ""), "server error (404)");
    }

    #[test]
    fn test_extract_error_json_without_error_field() {
        // Valid JSON without an `error` key falls through to the raw body.
        let body = r#"{"detail": "nope"}"#;
        assert_eq!(extract_error_message(500, body), body);
    }

    // ─── HistoryStore Tests ──────────────────────────────────

    #[test]
    fn test_history_store_starts_empty() {
        let store = HistoryStore::new();
        assert!(store.is_empty());
        assert!(store.template_names().is_empty());
    }

    #[test]
    fn test_history_append_then_reload_is_equal() {
        let mut store = HistoryStore::new();
        let e = HistoryEntry {
            template_name: "t.txt".to_string(),
            input_texts: vec!["a".to_string(), "b".to_string()],
            config_id: Some("1".to_string()),
            temperature: Some(0.5),
            response: "hi".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        };
        store.append(e.clone());

        let reloaded = HistoryStore::from_json(&store.to_json().unwrap(), &[]);
        assert_eq!(reloaded.entries(), &[e]);
    }

    #[test]
    fn test_history_truncates_to_limit() {
        let mut store = HistoryStore::new();
        for i in 0..HISTORY_LIMIT + 5 {
            store.append(entry("t", "x", &format!("2026-01-01T00:00:{:02}Z", i % 60)));
        }
        assert_eq!(store.len(), HISTORY_LIMIT);
    }

    #[test]
    fn test_history_sorted_descending_by_timestamp() {
        let mut store = HistoryStore::new();
        store.append(entry("t", "old", "2025-01-01T00:00:00Z"));
        store.append(entry("t", "new", "2026-01-01T00:00:00Z"));
        store.append(entry("t", "middle", "2025-06-01T00:00:00Z"));

        let inputs: Vec<&str> = store.entries().iter().map(|e| e.first_input()).collect();
        assert_eq!(inputs, vec!["new", "middle", "old"]);
    }

    #[test]
    fn test_history_cap_is_global_not_per_template() {
        let mut store = HistoryStore::new();
        store.append(entry("rare", "keep?", "2020-01-01T00:00:00Z"));
        for i in 0..HISTORY_LIMIT {
            store.append(entry("busy", "x", &format!("2026-01-{:02}T00:00:00Z", (i % 28) + 1)));
        }
        assert_eq!(store.len(), HISTORY_LIMIT);
        // The old entry of the quiet template was evicted by the busy one.
        assert!(store.for_template("rare").is_empty());
    }

    #[test]
    fn test_history_grouping_and_views() {
        let mut store = HistoryStore::new();
        store.append(entry("a", "1", "2026-01-01T00:00:01Z"));
        store.append(entry("b", "2", "2026-01-01T00:00:02Z"));
        store.append(entry("a", "3", "2026-01-01T00:00:03Z"));

        assert_eq!(store.template_names(), vec!["a".to_string(), "b".to_string()]);
        let a = store.for_template("a");
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].first_input(), "3");
    }

    #[test]
    fn test_history_delete_for_template_uses_local_index() {
        let mut store = HistoryStore::new();
        store.append(entry("a", "a0", "2026-01-01T00:00:01Z"));
        store.append(entry("b", "b0", "2026-01-01T00:00:02Z"));
        store.append(entry("a", "a1", "2026-01-01T00:00:03Z"));

        // Index 1 of template "a" is the older "a0", not "b0".
        let removed = store.delete_for_template("a", 1).unwrap();
        assert_eq!(removed.first_input(), "a0");
        assert_eq!(store.len(), 2);
        assert_eq!(store.for_template("b").len(), 1);
    }

    #[test]
    fn test_history_delete_out_of_range() {
        let mut store = HistoryStore::new();
        store.append(entry("a", "x", "2026-01-01T00:00:00Z"));
        assert!(store.delete(5).is_none());
        assert!(store.delete_for_template("a", 1).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_history_corrupt_storage_is_empty() {
        assert!(HistoryStore::from_json("not json at all", &[]).is_empty());
        assert!(HistoryStore::from_json(r#"{"an": "object"}"#, &[]).is_empty());
    }

    #[test]
    fn test_history_skips_non_object_elements() {
        let store = HistoryStore::from_json(
            r#"[{"template_name": "t", "input_texts": ["a"], "response": "r",
                 "timestamp": "2026-01-01T00:00:00Z"}, 42, "junk"]"#,
            &[],
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_history_load_mixes_all_generations() {
        let raw = r#"[
            {"template_name": "t", "input_texts": ["a"], "config_id": "1",
             "response": "r1", "timestamp": "2026-01-03T00:00:00Z"},
            {"template_name": "t", "input_text": "b", "response": "r2",
             "timestamp": "2026-01-02T00:00:00Z"},
            {"prompt": "[Template: t] c", "response": "r3",
             "timestamp": "2026-01-01T00:00:00Z"}
        ]"#;
        let store = HistoryStore::from_json(raw, &[]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.template_names(), vec!["t".to_string()]);
        let inputs: Vec<&str> = store.entries().iter().map(|e| e.first_input()).collect();
        assert_eq!(inputs, vec!["a", "b", "c"]);
    }

    // ─── SessionManager Tests ────────────────────────────────

    #[test]
    fn test_open_creates_and_focuses() {
        let mut mgr = SessionManager::new();
        let id = mgr.open("t1");
        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.active_id(), Some(id));
        assert_eq!(mgr.phase(id), Some(SessionPhase::Active));
    }

    #[test]
    fn test_open_same_template_focuses_existing() {
        let mut mgr = SessionManager::new();
        let id1 = mgr.open("t1");
        let id2 = mgr.open("t2");
        assert_eq!(mgr.active_id(), Some(id2));

        let again = mgr.open("t1");
        assert_eq!(again, id1);
        assert_eq!(mgr.len(), 2);
        assert_eq!(mgr.active_id(), Some(id1));
    }

    #[test]
    fn test_switch_changes_focus_only() {
        let mut mgr = SessionManager::new();
        let id1 = mgr.open("t1");
        let id2 = mgr.open("t2");

        assert!(mgr.switch(id1));
        assert_eq!(mgr.phase(id1), Some(SessionPhase::Active));
        assert_eq!(mgr.phase(id2), Some(SessionPhase::Background));
        assert!(!mgr.switch(999));
        assert_eq!(mgr.active_id(), Some(id1));
    }

    #[test]
    fn test_close_last_session_is_refused() {
        let mut mgr = SessionManager::new();
        let id = mgr.open("t1");
        let result = mgr.close(id);
        assert!(matches!(result, Err(DeckError::LastSession)));
        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.active_id(), Some(id));
    }

    #[test]
    fn test_close_active_activates_first_remaining() {
        let mut mgr = SessionManager::new();
        let id1 = mgr.open("t1");
        let id2 = mgr.open("t2");
        let id3 = mgr.open("t3");

        // Close the active (last-opened) tab: focus falls back to the
        // first tab in creation order, not the most recently used.
        mgr.close(id3).unwrap();
        assert_eq!(mgr.active_id(), Some(id1));

        mgr.switch(id2);
        mgr.close(id1).unwrap();
        assert_eq!(mgr.active_id(), Some(id2));
    }

    #[test]
    fn test_close_unknown_session() {
        let mut mgr = SessionManager::new();
        mgr.open("t1");
        mgr.open("t2");
        assert!(matches!(mgr.close(42), Err(DeckError::NotFound(_))));
        assert_eq!(mgr.len(), 2);
    }

    #[test]
    fn test_bootstrap_opens_history_groups() {
        let mut store = HistoryStore::new();
        store.append(entry("old.txt", "x", "2025-01-01T00:00:00Z"));
        store.append(entry("recent.txt", "y", "2026-01-01T00:00:00Z"));

        let mut mgr = SessionManager::new();
        let opened = mgr.bootstrap(&store, &["a.txt".to_string()]);
        assert_eq!(opened.len(), 2);
        assert_eq!(mgr.sessions()[0].template_name, "recent.txt");
        assert_eq!(mgr.sessions()[1].template_name, "old.txt");
        // Leftmost tab is focused.
        assert_eq!(mgr.active_id(), Some(mgr.sessions()[0].id));
    }

    #[test]
    fn test_bootstrap_without_history_opens_first_template() {
        let store = HistoryStore::new();
        let mut mgr = SessionManager::new();
        let opened = mgr.bootstrap(&store, &["a.txt".to_string(), "b.txt".to_string()]);
        assert_eq!(opened.len(), 1);
        assert_eq!(mgr.sessions()[0].template_name, "a.txt");
    }

    #[test]
    fn test_bootstrap_with_nothing_at_all() {
        let store = HistoryStore::new();
        let mut mgr = SessionManager::new();
        assert!(mgr.bootstrap(&store, &[]).is_empty());
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_refresh_history_views() {
        let mut store = HistoryStore::new();
        store.append(entry("t1", "x", "2026-01-01T00:00:00Z"));

        let mut mgr = SessionManager::new();
        mgr.open("t1");
        mgr.open("t2");
        mgr.refresh_history_views(&store);

        assert_eq!(mgr.sessions()[0].history.len(), 1);
        assert!(mgr.sessions()[1].history.is_empty());
    }

    // ─── Validation Tests ────────────────────────────────────

    fn manager_with_session(body: Option<&str>) -> (SessionManager, u64) {
        let mut mgr = SessionManager::new();
        let id = mgr.open("t.txt");
        if let Some(body) = body {
            mgr.get_mut(id).unwrap().template = Some(Template::new("t.txt", body));
        }
        (mgr, id)
    }

    #[test]
    fn test_validate_requires_template_first() {
        let (mut mgr, id) = manager_with_session(None);
        let session = mgr.get_mut(id).unwrap();
        session.inputs[0] = "a".to_string();
        session.config_id = Some("1".to_string());

        let err = validate(session, &[]).unwrap_err();
        assert!(matches!(err, DeckError::Validation(m) if m.contains("template")));
    }

    #[test]
    fn test_validate_requires_input1_trimmed() {
        let (mut mgr, id) = manager_with_session(Some("{input_txt}"));
        let session = mgr.get_mut(id).unwrap();
        session.inputs[0] = "   ".to_string();
        session.config_id = Some("1".to_string());

        let err = validate(session, &[]).unwrap_err();
        assert!(matches!(err, DeckError::Validation(m) if m == "Input text is required."));
    }

    #[test]
    fn test_validate_requires_declared_optional_inputs() {
        let (mut mgr, id) = manager_with_session(Some("{input_txt} {input2_txt}"));
        let session = mgr.get_mut(id).unwrap();
        session.inputs[0] = "a".to_string();
        session.config_id = Some("1".to_string());

        let err = validate(session, &[]).unwrap_err();
        assert!(matches!(err, DeckError::Validation(m) if m.contains("input 2")));
    }

    #[test]
    fn test_validate_requires_config_last() {
        let (mut mgr, id) = manager_with_session(Some("{input_txt}"));
        let session = mgr.get_mut(id).unwrap();
        session.inputs[0] = "a".to_string();

        let err = validate(session, &[]).unwrap_err();
        assert!(matches!(err, DeckError::Validation(m) if m.contains("configuration")));
    }

    #[test]
    fn test_validate_assembles_declared_inputs() {
        let (mut mgr, id) = manager_with_session(Some("{input_txt} {input2_txt} {input3_txt}"));
        let session = mgr.get_mut(id).unwrap();
        session.inputs = ["a".to_string(), "b".to_string(), "c".to_string()];
        session.config_id = Some("1".to_string());

        let payload = validate(session, &[config("1", None)]).unwrap();
        assert_eq!(payload.input_texts, vec!["a", "b", "c"]);
        assert_eq!(payload.template_name, "t.txt");
        assert!(payload.temperature.is_none());
    }

    #[test]
    fn test_validate_duplicates_slot2_when_only_input3_declared() {
        let (mut mgr, id) = manager_with_session(Some("{input_txt} and {input3_txt}"));
        let session = mgr.get_mut(id).unwrap();
        session.inputs = ["a".to_string(), String::new(), "c".to_string()];
        session.config_id = Some("1".to_string());

        let payload = validate(session, &[config("1", None)]).unwrap();
        assert_eq!(payload.input_texts, vec!["a", "a", "c"]);
    }

    #[test]
    fn test_validate_single_input_template() {
        let (mut mgr, id) = manager_with_session(Some("just {input_txt}"));
        let session = mgr.get_mut(id).unwrap();
        session.inputs[0] = "  trimmed  ".to_string();
        session.config_id = Some("1".to_string());

        let payload = validate(session, &[config("1", None)]).unwrap();
        assert_eq!(payload.input_texts, vec!["trimmed"]);
    }

    #[test]
    fn test_validate_temperature_follows_capability() {
        let (mut mgr, id) = manager_with_session(Some("{input_txt}"));
        let session = mgr.get_mut(id).unwrap();
        session.inputs[0] = "a".to_string();
        session.config_id = Some("1".to_string());

        // Config with a default: session value wins, default fills in.
        session.temperature = Some(1.2);
        let payload = validate(session, &[config("1", Some(0.7))]).unwrap();
        assert_eq!(payload.temperature, Some(1.2));

        session.temperature = None;
        let payload = validate(session, &[config("1", Some(0.7))]).unwrap();
        assert_eq!(payload.temperature, Some(0.7));

        // Config without the capability: no temperature, even if set.
        session.temperature = Some(1.2);
        let payload = validate(session, &[config("1", None)]).unwrap();
        assert!(payload.temperature.is_none());
    }

    #[test]
    fn test_payload_serialization_omits_missing_temperature() {
        let payload = ChatPayload {
            template_name: "t".to_string(),
            input_texts: vec!["a".to_string()],
            config_id: "1".to_string(),
            temperature: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("temperature"));
    }

    // ─── SubmitController Tests ──────────────────────────────

    struct MockBackend {
        outcome: std::result::Result<Vec<ChatStreamEvent>, DeckError>,
    }

    #[async_trait(?Send)]
    impl BackendPort for MockBackend {
        async fn list_configs(&self) -> deck_types::Result<Vec<ApiConfig>> {
            Ok(vec![])
        }

        async fn list_templates(&self) -> deck_types::Result<Vec<String>> {
            Ok(vec![])
        }

        async fn fetch_template(&self, name: &str) -> deck_types::Result<Template> {
            Ok(Template::new(name, "{input_txt}"))
        }

        async fn chat(
            &self,
            _payload: &ChatPayload,
        ) -> deck_types::Result<Pin<Box<dyn Stream<Item = ChatStreamEvent>>>> {
            match &self.outcome {
                Ok(events) => Ok(Box::pin(stream::iter(events.clone()))),
                Err(e) => Err(e.clone()),
            }
        }
    }

    struct MockStorage {
        data: RefCell<HashMap<String, String>>,
        fail_writes: bool,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                data: RefCell::new(HashMap::new()),
                fail_writes: false,
            }
        }
    }

    #[async_trait(?Send)]
    impl StoragePort for MockStorage {
        async fn get(&self, key: &str) -> deck_types::Result<Option<String>> {
            Ok(self.data.borrow().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> deck_types::Result<()> {
            if self.fail_writes {
                return Err(DeckError::Storage("quota exceeded".to_string()));
            }
            self.data
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> deck_types::Result<()> {
            self.data.borrow_mut().remove(key);
            Ok(())
        }

        fn backend_name(&self) -> &str {
            "mock"
        }
    }

    fn payload() -> ChatPayload {
        ChatPayload {
            template_name: "t.txt".to_string(),
            input_texts: vec!["a".to_string()],
            config_id: "1".to_string(),
            temperature: Some(0.7),
        }
    }

    #[test]
    fn test_submit_streams_and_appends_history() {
        let bus = EventBus::new();
        let controller = SubmitController::new(bus.clone());
        let backend = MockBackend {
            outcome: Ok(vec![
                ChatStreamEvent::Delta("Hel".to_string()),
                ChatStreamEvent::Delta("lo".to_string()),
                ChatStreamEvent::Done,
            ]),
        };
        let history = RefCell::new(HistoryStore::new());
        let storage = MockStorage::new();

        block_on(controller.submit(7, payload(), &backend, &history, &storage)).unwrap();

        let events = bus.drain();
        assert!(matches!(events[0], UiEvent::SubmitStarted { session_id: 7 }));
        let deltas: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                UiEvent::ResponseDelta { chunk, .. } => Some(chunk.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["Hel", "lo"]);

        let complete = events
            .iter()
            .find_map(|e| match e {
                UiEvent::ResponseComplete { entry, .. } => Some(entry.clone()),
                _ => None,
            })
            .expect("missing ResponseComplete");
        assert_eq!(complete.response, "Hello");
        assert_eq!(complete.temperature, Some(0.7));

        let store = history.borrow();
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].response, "Hello");

        // Persisted in canonical shape under the single key.
        let persisted = block_on(storage.get(HISTORY_KEY)).unwrap().unwrap();
        assert!(persisted.contains("\"template_name\":\"t.txt\""));
    }

    #[test]
    fn test_submit_request_error_writes_nothing() {
        let bus = EventBus::new();
        let controller = SubmitController::new(bus.clone());
        let backend = MockBackend {
            outcome: Err(DeckError::Server {
                status: 502,
                message: "Bad Gateway".to_string(),
            }),
        };
        let history = RefCell::new(HistoryStore::new());
        let storage = MockStorage::new();

        let result = block_on(controller.submit(1, payload(), &backend, &history, &storage));
        assert!(result.is_err());

        let events = bus.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::SubmitFailed { message, .. } if message == "Bad Gateway"
        )));
        assert!(history.borrow().is_empty());
        assert!(block_on(storage.get(HISTORY_KEY)).unwrap().is_none());
    }

    #[test]
    fn test_submit_stream_error_frame_aborts() {
        let bus = EventBus::new();
        let controller = SubmitController::new(bus.clone());
        let backend = MockBackend {
            outcome: Ok(vec![
                ChatStreamEvent::Delta("partial".to_string()),
                ChatStreamEvent::Error("model fell over".to_string()),
            ]),
        };
        let history = RefCell::new(HistoryStore::new());
        let storage = MockStorage::new();

        let result = block_on(controller.submit(1, payload(), &backend, &history, &storage));
        assert!(result.is_err());
        assert!(history.borrow().is_empty());

        let events = bus.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::SubmitFailed { message, .. } if message == "model fell over"
        )));
    }

    #[test]
    fn test_submit_end_of_stream_without_done_completes() {
        let bus = EventBus::new();
        let controller = SubmitController::new(bus.clone());
        let backend = MockBackend {
            outcome: Ok(vec![ChatStreamEvent::Delta("all of it".to_string())]),
        };
        let history = RefCell::new(HistoryStore::new());
        let storage = MockStorage::new();

        block_on(controller.submit(1, payload(), &backend, &history, &storage)).unwrap();
        assert_eq!(history.borrow().entries()[0].response, "all of it");
    }

    #[test]
    fn test_submit_survives_persistence_failure() {
        let bus = EventBus::new();
        let controller = SubmitController::new(bus.clone());
        let backend = MockBackend {
            outcome: Ok(vec![ChatStreamEvent::Delta("ok".to_string()), ChatStreamEvent::Done]),
        };
        let history = RefCell::new(HistoryStore::new());
        let storage = MockStorage {
            data: RefCell::new(HashMap::new()),
            fail_writes: true,
        };

        // Quota failure is logged, not surfaced: the in-memory store stays
        // authoritative and the submission still completes.
        block_on(controller.submit(1, payload(), &backend, &history, &storage)).unwrap();
        assert_eq!(history.borrow().len(), 1);
        let events = bus.drain();
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::ResponseComplete { .. })));
    }

    #[test]
    fn test_history_load_via_storage_port() {
        let storage = MockStorage::new();
        block_on(storage.set(
            HISTORY_KEY,
            r#"[{"prompt": "[Template: X] hello", "response": "hi", "temperature": 0.5}]"#,
        ))
        .unwrap();

        let store = block_on(HistoryStore::load(&storage, &[]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].template_name, "X");
        assert_eq!(store.entries()[0].input_texts, vec!["hello".to_string()]);

        // Absent key is an empty store, not an error.
        block_on(storage.remove(HISTORY_KEY)).unwrap();
        assert!(block_on(HistoryStore::load(&storage, &[])).is_empty());
    }
}
