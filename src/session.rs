//! The chat operations the UI triggers. Every operation catches its own
//! failure, logs it and leaves the rest of the window running.

use std::cell::RefCell;

use crate::api::client::ChatService;
use crate::api::models::{Chat, ChatDetail, ChatId, IncomingFrame, User, UserId};
use crate::api::stream::{FrameSink, StreamEvent, StreamState};
use crate::error::ChatError;
use crate::view_model::{ChatViewModel, Delivery, ViewChange};

/// Draws view-model state. Called after every mutation with what changed.
pub trait ChatRenderer {
    fn render(&self, model: &ChatViewModel, change: &ViewChange);
}

pub struct ChatSession<S: ChatService> {
    model: RefCell<ChatViewModel>,
    service: S,
    sink: Box<dyn FrameSink>,
    renderer: Box<dyn ChatRenderer>,
}

impl<S: ChatService> ChatSession<S> {
    pub fn new(service: S, sink: Box<dyn FrameSink>, renderer: Box<dyn ChatRenderer>) -> Self {
        Self {
            model: RefCell::new(ChatViewModel::new()),
            service,
            sink,
            renderer,
        }
    }

    /// Read access for code that draws outside a render call.
    pub fn with_model<T>(&self, f: impl FnOnce(&ChatViewModel) -> T) -> T {
        f(&self.model.borrow())
    }

    fn mutate<T>(&self, change: impl FnOnce(&mut ChatViewModel) -> (T, Option<ViewChange>)) -> T {
        let (out, view_change) = change(&mut self.model.borrow_mut());
        if let Some(view_change) = view_change {
            self.renderer.render(&self.model.borrow(), &view_change);
        }
        out
    }

    /// Refreshes the chat list. A failed refresh keeps the previous list.
    pub async fn load_chat_list(&self) -> Result<Vec<Chat>, ChatError> {
        match self.service.fetch_chats().await {
            Ok(chats) => {
                log::debug!("Loaded {} chats", chats.len());
                self.mutate(|m| {
                    m.replace_chats(chats);
                    ((), Some(ViewChange::ChatList))
                });
                Ok(self.with_model(|m| m.chats().to_vec()))
            }
            Err(err) => {
                log::error!("Failed to load chats: {err}");
                Err(err)
            }
        }
    }

    /// Makes `chat_id` the active chat. The previous chat is deactivated right
    /// away; if a newer activation starts before this one resolves, this one
    /// ends with [`ChatError::Superseded`] and changes nothing.
    pub async fn activate_chat(&self, chat_id: ChatId) -> Result<ChatDetail, ChatError> {
        let ticket = self.mutate(|m| (m.begin_activation(chat_id), Some(ViewChange::Conversation)));
        let result = self.service.fetch_chat(chat_id).await;
        let outcome = self.mutate(|m| {
            let outcome = m.finish_activation(ticket, result);
            let change = match &outcome {
                Err(ChatError::Superseded(_)) => None,
                _ => Some(ViewChange::Conversation),
            };
            (outcome, change)
        });
        match &outcome {
            Ok(detail) => log::debug!("Chat {chat_id} active with {} messages", detail.messages.len()),
            Err(ChatError::Superseded(_)) => log::debug!("Dropped stale answer for chat {chat_id}"),
            Err(err) => log::error!("Failed to open chat {chat_id}: {err}"),
        }
        outcome
    }

    pub fn append_incoming(&self, frame: IncomingFrame) -> Delivery {
        let chat_id = frame.chat_id;
        let delivery = self.mutate(|m| {
            let delivery = m.append_incoming(frame);
            let change = match &delivery {
                Delivery::Appended => m.messages().last().cloned().map(ViewChange::MessageAppended),
                Delivery::Held(_) | Delivery::Unread(_) => Some(ViewChange::ChatList),
                Delivery::Dropped => None,
            };
            (delivery, change)
        });
        if delivery == Delivery::Dropped {
            log::debug!("Dropped message for unknown chat {chat_id}");
        }
        delivery
    }

    /// Sends `text` to the active chat. Returns whether a frame went out; the
    /// message shows up only once the server echoes it back.
    pub fn send_outgoing(&self, text: &str) -> Result<bool, ChatError> {
        let prepared = self.with_model(|m| m.prepare_outgoing(text, self.sink.state()));
        let sent = match prepared {
            Ok(Some(frame)) => self.sink.send(frame).map(|()| true),
            Ok(None) => Ok(false),
            Err(err) => Err(err),
        };
        if let Err(err) = &sent {
            log::warn!("Message not sent: {err}");
        }
        sent
    }

    pub fn stream_state_changed(&self, state: StreamState) {
        log::info!("Message stream {state}");
        self.mutate(|m| {
            m.set_stream_state(state);
            ((), Some(ViewChange::Connection(state)))
        });
    }

    pub fn handle_stream_event(&self, event: StreamEvent) {
        match event {
            StreamEvent::State(state) => self.stream_state_changed(state),
            StreamEvent::Frame(frame) => {
                self.append_incoming(frame);
            }
        }
    }

    pub async fn load_users(&self) -> Result<Vec<User>, ChatError> {
        let res = self.service.fetch_users().await;
        if let Err(err) = &res {
            log::error!("Failed to load users: {err}");
        }
        res
    }

    /// Starts a chat with `user_id` and reloads the chat list.
    pub async fn add_chat(&self, user_id: UserId) -> Result<(), ChatError> {
        if let Err(err) = self.service.add_chat(user_id).await {
            log::error!("Failed to add chat with user {user_id}: {err}");
            return Err(err);
        }
        log::info!("Chat with user {user_id} added");
        // A failed reload is logged there; the chat itself exists.
        let _ = self.load_chat_list().await;
        Ok(())
    }
}
