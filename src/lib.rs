pub mod assembler;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod decoder;
pub mod error;
pub mod providers;
pub mod transport;

use colored::*;
use serde::Serialize;
use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use assembler::StreamAssembler;
use conversation::{ChatMessage, Conversation, Role};
use providers::{ChatRequest, ErrorBody, WireMessage};
use transport::{read_body_text, ByteStream, ChatTransport};

pub use config::AssistantConfig;
pub use error::ChatError;
pub use transport::HttpTransport;

pub const OFFLINE_NOTICE: &str =
    "❌ I'm offline. Please check your internet connection and try again.";
pub const DEFAULT_FAILURE: &str = "Failed to get a response from the assistant.";

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

/// Why a request produced no (or only a partial) reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Known offline before sending; no network call was made.
    Offline,
    /// The request never reached a response (DNS, refused, timeout).
    Connection { detail: String },
    /// HTTP 429.
    RateLimited,
    /// HTTP 402.
    CreditsExhausted,
    /// Any other non-2xx status.
    Rejected { status: u16, message: String },
    /// 2xx with no readable body.
    MissingBody,
    /// The body failed before any text arrived.
    Interrupted { detail: String },
}

impl FailureReason {
    /// Map a non-2xx status and its body text to a failure.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => FailureReason::RateLimited,
            402 => FailureReason::CreditsExhausted,
            _ => FailureReason::Rejected {
                status,
                message: ErrorBody::message_from(body).unwrap_or_else(|| DEFAULT_FAILURE.to_string()),
            },
        }
    }

    /// Text of the synthetic assistant message shown for this failure.
    pub fn notice(&self) -> String {
        match self {
            FailureReason::Offline => OFFLINE_NOTICE.to_string(),
            FailureReason::Connection { .. } => {
                "⚠️ I'm having trouble connecting. The model might be loading. Please try again in a moment."
                    .to_string()
            }
            FailureReason::RateLimited => {
                "⚠️ Rate limit exceeded. Please wait a moment and try again.".to_string()
            }
            FailureReason::CreditsExhausted => {
                "⚠️ AI credits exhausted. Please add credits to continue.".to_string()
            }
            FailureReason::Rejected { message, .. } => format!("⚠️ {message}"),
            FailureReason::MissingBody => {
                "⚠️ The assistant returned an empty response. Please try again.".to_string()
            }
            FailureReason::Interrupted { .. } => {
                "⚠️ The connection dropped before a reply arrived. Please try again.".to_string()
            }
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Offline => write!(f, "offline"),
            FailureReason::Connection { detail } => write!(f, "connection failed: {detail}"),
            FailureReason::RateLimited => write!(f, "rate limited (429)"),
            FailureReason::CreditsExhausted => write!(f, "credits exhausted (402)"),
            FailureReason::Rejected { status, message } => write!(f, "rejected ({status}): {message}"),
            FailureReason::MissingBody => write!(f, "missing response body"),
            FailureReason::Interrupted { detail } => write!(f, "stream interrupted: {detail}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes and events
// ---------------------------------------------------------------------------

/// Result of one `send_message` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing was sent or recorded.
    Ignored,
    /// The stream finished. `interrupted` is set when a read error cut it
    /// short after some text had already arrived.
    Completed { reply: String, interrupted: bool },
    /// The request failed and a notice was appended to the conversation.
    Failed(FailureReason),
}

/// Incremental updates for a UI rendering the reply as it streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyEvent {
    Delta { text: String },
    /// `interrupted` mirrors `SendOutcome::Completed`.
    Finished { reply: String, interrupted: bool },
    Failed { notice: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

// ---------------------------------------------------------------------------
// ChatAssistant
// ---------------------------------------------------------------------------

/// One chat session: the conversation plus the transport it talks through.
pub struct ChatAssistant<T: ChatTransport> {
    transport: T,
    conversation: Conversation,
    pub connectivity: Connectivity,
    /// Optional instruction sent as a leading `system` message.
    pub system_prompt: Option<String>,
    /// When set, reply events are sent here instead of printed to stdout.
    pub reply_tx: Option<mpsc::UnboundedSender<ReplyEvent>>,
    /// Print deltas to stdout as they arrive (terminal mode).
    pub echo: bool,
}

impl<T: ChatTransport> ChatAssistant<T> {
    pub fn new(transport: T) -> Self {
        ChatAssistant {
            transport,
            conversation: Conversation::new(),
            connectivity: Connectivity::Online,
            system_prompt: None,
            reply_tx: None,
            echo: false,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the outbound body from the system instruction and history.
    pub fn build_request(&self) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(sys) = self.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(WireMessage { role: Role::System, content: sys.to_string() });
        }
        messages.extend(self.conversation.history());
        ChatRequest { messages }
    }

    // -----------------------------------------------------------------------
    // Public entry point
    // -----------------------------------------------------------------------

    /// Send one user message and stream the assistant's reply into the
    /// conversation.
    ///
    /// Request failures are not errors: they are recorded as a notice and
    /// returned as [`SendOutcome::Failed`]. `Err` means the call was refused
    /// outright because another reply is still being generated.
    pub async fn send_message(&mut self, input: &str) -> error::Result<SendOutcome> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        if self.conversation.request_state().is_in_flight() {
            return Err(ChatError::RequestInFlight);
        }
        if self.connectivity == Connectivity::Offline {
            debug!("offline, request not sent");
            self.conversation.push(ChatMessage::notice(OFFLINE_NOTICE));
            self.emit(ReplyEvent::Failed { notice: OFFLINE_NOTICE.to_string() });
            return Ok(SendOutcome::Failed(FailureReason::Offline));
        }

        self.conversation.push(ChatMessage::user(text));
        self.conversation.begin_request()?;
        let request = self.build_request();
        debug!(messages = request.messages.len(), "sending chat request");

        let response = match self.transport.post_chat(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "chat request failed before a response");
                return Ok(self.fail(FailureReason::Connection { detail: e.to_string() }));
            }
        };

        if !response.is_success() {
            let body = match response.body {
                Some(body) => read_body_text(body).await.unwrap_or_default(),
                None => String::new(),
            };
            let reason = FailureReason::from_status(response.status, &body);
            warn!(status = response.status, reason = %reason, "chat request rejected");
            return Ok(self.fail(reason));
        }

        let Some(body) = response.body else {
            warn!(status = response.status, "response carried no body");
            return Ok(self.fail(FailureReason::MissingBody));
        };

        Ok(self.stream_reply(body).await)
    }

    // -----------------------------------------------------------------------
    // Streaming
    // -----------------------------------------------------------------------

    async fn stream_reply(&mut self, mut body: ByteStream) -> SendOutcome {
        let mut assembler = StreamAssembler::new();
        let mut started = false;
        let mut read_error: Option<ChatError> = None;

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for delta in assembler.feed(&bytes) {
                        self.apply_delta(&delta, assembler.reply(), &mut started);
                    }
                    if assembler.is_done() {
                        break;
                    }
                }
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = read_error {
            if !started {
                warn!(error = %e, "stream failed before any text arrived");
                return self.fail(FailureReason::Interrupted { detail: e.to_string() });
            }
            warn!(error = %e, chars = assembler.reply().chars().count(), "stream interrupted, keeping partial reply");
            return self.finish(assembler.into_reply(), true);
        }

        for delta in assembler.finish() {
            self.apply_delta(&delta, assembler.reply(), &mut started);
        }
        self.finish(assembler.into_reply(), false)
    }

    /// The first delta appends the assistant message; later ones grow it.
    fn apply_delta(&mut self, delta: &str, reply: &str, started: &mut bool) {
        if *started {
            self.conversation.update_last_content(reply);
        } else {
            self.conversation.push(ChatMessage::assistant(reply));
            *started = true;
        }
        self.emit(ReplyEvent::Delta { text: delta.to_string() });
    }

    fn finish(&mut self, reply: String, interrupted: bool) -> SendOutcome {
        self.conversation.complete_request();
        info!(chars = reply.chars().count(), interrupted, "reply complete");
        self.emit(ReplyEvent::Finished { reply: reply.clone(), interrupted });
        SendOutcome::Completed { reply, interrupted }
    }

    fn fail(&mut self, reason: FailureReason) -> SendOutcome {
        let notice = reason.notice();
        self.conversation.push(ChatMessage::notice(notice.clone()));
        self.conversation.fail_request();
        self.emit(ReplyEvent::Failed { notice });
        SendOutcome::Failed(reason)
    }

    fn emit(&self, event: ReplyEvent) {
        if let Some(tx) = &self.reply_tx {
            let _ = tx.send(event);
            return;
        }
        if !self.echo {
            return;
        }
        match event {
            ReplyEvent::Delta { text } => print!("{}", text),
            ReplyEvent::Finished { .. } => println!(),
            ReplyEvent::Failed { notice } => println!("{}", notice.bright_red()),
        }
        let _ = io::stdout().flush();
    }
}
