//! Submission: validate, assemble the payload, run the chat request, and
//! reconcile the result into the history store.

use std::cell::RefCell;

use futures::StreamExt;

use deck_types::{
    config::ApiConfig, event::UiEvent, history::HistoryEntry, DeckError, Result,
};

use crate::event_bus::EventBus;
use crate::history::{HistoryStore, HISTORY_KEY};
use crate::ports::{BackendPort, ChatPayload, ChatStreamEvent, StoragePort};
use crate::session::{Session, SessionId};

/// Check a session's form in order, first failure wins. The message is a
/// blocking user prompt, never a system fault.
///
/// Order: template selected, input 1 non-empty (trimmed), input 2 if the
/// body declares `{input2_txt}`, input 3 if it declares `{input3_txt}`,
/// config selected.
pub fn validate(session: &Session, configs: &[ApiConfig]) -> Result<ChatPayload> {
    let template = session
        .template
        .as_ref()
        .ok_or_else(|| DeckError::Validation("Select a template first.".to_string()))?;

    let input1 = session.inputs[0].trim();
    if input1.is_empty() {
        return Err(DeckError::Validation("Input text is required.".to_string()));
    }

    let has2 = template.has_input2();
    let has3 = template.has_input3();

    let input2 = session.inputs[1].trim();
    if has2 && input2.is_empty() {
        return Err(DeckError::Validation(
            "This template requires input 2.".to_string(),
        ));
    }

    let input3 = session.inputs[2].trim();
    if has3 && input3.is_empty() {
        return Err(DeckError::Validation(
            "This template requires input 3.".to_string(),
        ));
    }

    let config_id = session
        .config_id
        .clone()
        .ok_or_else(|| DeckError::Validation("Select an API configuration.".to_string()))?;

    let mut input_texts = vec![input1.to_string()];
    if has2 {
        input_texts.push(input2.to_string());
    } else if has3 {
        // Templates that skip slot 2 still send three inputs; the backend
        // substitutes the first input for the missing placeholder.
        input_texts.push(input1.to_string());
    }
    if has3 {
        input_texts.push(input3.to_string());
    }

    // Temperature rides along only for configs that declare one.
    let temperature = configs
        .iter()
        .find(|c| c.id == config_id)
        .filter(|c| c.supports_temperature())
        .and_then(|c| session.temperature.or(c.default_temperature));

    Ok(ChatPayload {
        template_name: template.name.clone(),
        input_texts,
        config_id,
        temperature,
    })
}

/// Runs validated submissions and is the only writer of new history
/// entries. Progress is published on the event bus; the caller just spawns
/// `submit` and repaints.
#[derive(Clone)]
pub struct SubmitController {
    bus: EventBus,
}

impl SubmitController {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Issue the chat request for one session and reconcile the outcome.
    ///
    /// On success the new entry is appended to `history` and persisted
    /// before `ResponseComplete` is published. On any failure nothing is
    /// written and `SubmitFailed` carries the display message.
    pub async fn submit(
        &self,
        session_id: SessionId,
        payload: ChatPayload,
        backend: &dyn BackendPort,
        history: &RefCell<HistoryStore>,
        storage: &dyn StoragePort,
    ) -> Result<()> {
        self.bus.emit(UiEvent::SubmitStarted { session_id });

        let mut stream = match backend.chat(&payload).await {
            Ok(stream) => stream,
            Err(e) => {
                self.bus.emit(UiEvent::SubmitFailed {
                    session_id,
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event {
                ChatStreamEvent::Delta(chunk) => {
                    text.push_str(&chunk);
                    self.bus.emit(UiEvent::ResponseDelta { session_id, chunk });
                }
                ChatStreamEvent::Done => break,
                ChatStreamEvent::Error(message) => {
                    self.bus.emit(UiEvent::SubmitFailed {
                        session_id,
                        message: message.clone(),
                    });
                    return Err(DeckError::Server {
                        status: 200,
                        message,
                    });
                }
            }
        }

        let entry = HistoryEntry::now(
            payload.template_name,
            payload.input_texts,
            Some(payload.config_id),
            payload.temperature,
            text,
        );

        // Mutate, snapshot, then write: no RefCell borrow is held across
        // the storage await.
        let snapshot = {
            let mut store = history.borrow_mut();
            store.append(entry.clone());
            store.to_json()
        };
        match snapshot {
            Ok(json) => {
                if let Err(e) = storage.set(HISTORY_KEY, &json).await {
                    log::warn!("history not persisted: {}", e);
                }
            }
            Err(e) => log::warn!("history not serializable: {}", e),
        }

        self.bus.emit(UiEvent::ResponseComplete { session_id, entry });
        Ok(())
    }
}
