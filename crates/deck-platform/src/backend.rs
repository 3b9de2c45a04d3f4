//! HTTP adapter for the template backend.
//!
//! The three read endpoints go through browser `fetch()` via gloo-net. The
//! chat endpoint uses the raw web-sys fetch API instead, because its
//! response body may be a `text/event-stream` that has to be consumed
//! chunk-by-chunk through a `ReadableStream` reader.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::Deserialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::ReadableStreamDefaultReader;

use deck_core::ports::{BackendPort, ChatPayload, ChatStreamEvent};
use deck_core::protocol::{extract_error_message, FrameDecoder};
use deck_types::{config::ApiConfig, template::Template, DeckError, Result};

/// Backend client bound to one base URL (usually the serving origin, i.e.
/// an empty base).
pub struct HttpBackend {
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Same-origin client.
    pub fn same_origin() -> Self {
        Self::new("")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait(?Send)]
impl BackendPort for HttpBackend {
    async fn list_configs(&self) -> Result<Vec<ApiConfig>> {
        let response = gloo_net::http::Request::get(&self.url("/api/configs"))
            .send()
            .await
            .map_err(|e| DeckError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(server_error(response).await);
        }

        let data: ConfigsEnvelope = response
            .json()
            .await
            .map_err(|e| DeckError::Serialization(e.to_string()))?;
        Ok(data.configs)
    }

    async fn list_templates(&self) -> Result<Vec<String>> {
        let response = gloo_net::http::Request::get(&self.url("/api/templates"))
            .send()
            .await
            .map_err(|e| DeckError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(server_error(response).await);
        }

        let data: TemplatesEnvelope = response
            .json()
            .await
            .map_err(|e| DeckError::Serialization(e.to_string()))?;
        Ok(data.templates)
    }

    async fn fetch_template(&self, name: &str) -> Result<Template> {
        let encoded = String::from(js_sys::encode_uri_component(name));
        let response = gloo_net::http::Request::get(&self.url(&format!("/api/templates/{}", encoded)))
            .send()
            .await
            .map_err(|e| DeckError::Network(e.to_string()))?;

        if response.status() == 404 {
            return Err(DeckError::NotFound(name.to_string()));
        }
        if !response.ok() {
            return Err(server_error(response).await);
        }

        let data: TemplateEnvelope = response
            .json()
            .await
            .map_err(|e| DeckError::Serialization(e.to_string()))?;
        Ok(Template::new(name, data.content))
    }

    async fn chat(
        &self,
        payload: &ChatPayload,
    ) -> Result<Pin<Box<dyn Stream<Item = ChatStreamEvent>>>> {
        let body = serde_json::to_string(payload)?;

        let headers = web_sys::Headers::new().map_err(js_network_err)?;
        headers
            .set("Content-Type", "application/json")
            .map_err(js_network_err)?;

        let init = web_sys::RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&body));

        let request = web_sys::Request::new_with_str_and_init(&self.url("/api/chat"), &init)
            .map_err(js_network_err)?;

        let response: web_sys::Response =
            JsFuture::from(gloo_utils::window().fetch_with_request(&request))
                .await
                .map_err(js_network_err)?
                .dyn_into()
                .map_err(|_| DeckError::Network("fetch returned a non-Response".to_string()))?;

        let status = response.status();
        if !response.ok() {
            let body = response_text(&response).await.unwrap_or_default();
            return Err(DeckError::Server {
                status,
                message: extract_error_message(status, &body),
            });
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .ok()
            .flatten()
            .unwrap_or_default();

        if content_type.contains("text/event-stream") {
            let stream_body = response
                .body()
                .ok_or_else(|| DeckError::Network("response has no body".to_string()))?;
            let reader: ReadableStreamDefaultReader = stream_body
                .get_reader()
                .dyn_into()
                .map_err(|_| DeckError::Network("response body is not readable".to_string()))?;
            return Ok(Box::pin(frame_stream(reader)));
        }

        // Buffered JSON shape: `{response}` or `{error}`, error verbatim.
        let text = response_text(&response).await?;
        let parsed: BufferedChatEnvelope = serde_json::from_str(&text)?;
        if let Some(message) = parsed.error {
            return Err(DeckError::Server { status, message });
        }
        match parsed.response {
            Some(full) => Ok(Box::pin(stream::iter(vec![
                ChatStreamEvent::Delta(full),
                ChatStreamEvent::Done,
            ]))),
            None => Err(DeckError::Network("malformed chat response".to_string())),
        }
    }
}

/// Drive a `ReadableStream` reader and decode `data:` frames as they land.
/// `[DONE]` and `ERROR:` frames are terminal; a body that ends without
/// `[DONE]` still completes.
fn frame_stream(reader: ReadableStreamDefaultReader) -> impl Stream<Item = ChatStreamEvent> {
    struct State {
        reader: ReadableStreamDefaultReader,
        decoder: FrameDecoder,
        pending: VecDeque<ChatStreamEvent>,
        eof: bool,
        finished: bool,
    }

    let state = State {
        reader,
        decoder: FrameDecoder::new(),
        pending: VecDeque::new(),
        eof: false,
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if st.finished {
                return None;
            }

            if let Some(event) = st.pending.pop_front() {
                if matches!(event, ChatStreamEvent::Done | ChatStreamEvent::Error(_)) {
                    st.finished = true;
                }
                return Some((event, st));
            }

            if st.eof {
                st.finished = true;
                return Some((ChatStreamEvent::Done, st));
            }

            match JsFuture::from(st.reader.read()).await {
                Ok(result) => {
                    let done = js_sys::Reflect::get(&result, &JsValue::from_str("done"))
                        .ok()
                        .and_then(|v| v.as_bool())
                        .unwrap_or(true);
                    if done {
                        st.eof = true;
                        let tail = st.decoder.finish();
                        st.pending.extend(tail);
                    } else if let Ok(value) =
                        js_sys::Reflect::get(&result, &JsValue::from_str("value"))
                    {
                        let chunk = js_sys::Uint8Array::new(&value).to_vec();
                        let events = st.decoder.push(&chunk);
                        st.pending.extend(events);
                    }
                }
                Err(e) => {
                    st.finished = true;
                    return Some((
                        ChatStreamEvent::Error(format!("connection lost: {:?}", e)),
                        st,
                    ));
                }
            }
        }
    })
}

async fn response_text(response: &web_sys::Response) -> Result<String> {
    let promise = response.text().map_err(js_network_err)?;
    let value = JsFuture::from(promise).await.map_err(js_network_err)?;
    Ok(value.as_string().unwrap_or_default())
}

async fn server_error(response: gloo_net::http::Response) -> DeckError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    DeckError::Server {
        status,
        message: extract_error_message(status, &body),
    }
}

fn js_network_err(e: JsValue) -> DeckError {
    DeckError::Network(format!("{:?}", e))
}

// ─── Wire envelopes ──────────────────────────────────────────

#[derive(Deserialize)]
struct ConfigsEnvelope {
    #[serde(default)]
    configs: Vec<ApiConfig>,
}

#[derive(Deserialize)]
struct TemplatesEnvelope {
    #[serde(default)]
    templates: Vec<String>,
}

#[derive(Deserialize)]
struct TemplateEnvelope {
    content: String,
}

#[derive(Deserialize)]
struct BufferedChatEnvelope {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}
