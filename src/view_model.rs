//! Chat session state: which chats exist, which one is shown, and the
//! messages in the pane.
//!
//! Everything here is synchronous. [`crate::session::ChatSession`] drives it
//! from the network and stream callbacks and re-renders after each change.

use crate::api::models::{Chat, ChatDetail, ChatId, IncomingFrame, Message, OutgoingFrame, User, UserId};
use crate::api::stream::StreamState;
use crate::error::ChatError;

/// What a renderer has to redraw after a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewChange {
    ChatList,
    Conversation,
    MessageAppended(Message),
    Connection(StreamState),
}

/// Outcome of feeding one stream frame to the view model.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Appended,
    /// Held until the history of the chat being activated arrives.
    Held(ChatId),
    Unread(ChatId),
    Dropped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChat {
    pub chat_id: ChatId,
    pub participant_name: String,
    pub is_online: bool,
}

/// Issued when an activation starts; only the latest ticket may complete it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationTicket {
    seq: u64,
    chat_id: ChatId,
}

#[derive(Debug)]
pub struct ChatViewModel {
    chats: Vec<Chat>,
    active: Option<ActiveChat>,
    log: Vec<Message>,
    pending: Option<ActivationTicket>,
    held: Vec<Message>,
    next_seq: u64,
    me: Option<UserId>,
    stream: StreamState,
}

impl Default for ChatViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatViewModel {
    pub fn new() -> Self {
        Self {
            chats: Vec::new(),
            active: None,
            log: Vec::new(),
            pending: None,
            held: Vec::new(),
            next_seq: 0,
            me: None,
            stream: StreamState::Connecting,
        }
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn chat(&self, chat_id: ChatId) -> Option<&Chat> {
        self.chats.iter().find(|c| c.chat_id == chat_id)
    }

    pub fn active(&self) -> Option<&ActiveChat> {
        self.active.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    pub fn stream_state(&self) -> StreamState {
        self.stream
    }

    /// The one chat drawn as selected: the active chat, or the chat whose
    /// activation is still in flight.
    pub fn highlighted(&self) -> Option<ChatId> {
        self.pending
            .map(|t| t.chat_id)
            .or_else(|| self.active.as_ref().map(|a| a.chat_id))
    }

    /// Replaces the whole list, keeping unread counts of chats still present.
    pub fn replace_chats(&mut self, mut chats: Vec<Chat>) {
        for chat in &mut chats {
            if let Some(old) = self.chat(chat.chat_id) {
                chat.unread = old.unread;
            }
        }
        self.chats = chats;
    }

    /// Deactivates the current chat and starts activating `chat_id`.
    pub fn begin_activation(&mut self, chat_id: ChatId) -> ActivationTicket {
        self.release_held();
        self.next_seq += 1;
        let ticket = ActivationTicket { seq: self.next_seq, chat_id };
        self.active = None;
        self.log.clear();
        self.pending = Some(ticket);
        ticket
    }

    /// Applies the chat service's answer to an activation. Answers to any
    /// ticket but the latest are discarded.
    pub fn finish_activation(
        &mut self,
        ticket: ActivationTicket,
        result: Result<ChatDetail, ChatError>,
    ) -> Result<ChatDetail, ChatError> {
        if self.pending != Some(ticket) {
            return Err(ChatError::Superseded(ticket.chat_id));
        }
        self.pending = None;
        let detail = match result {
            Ok(detail) => detail,
            Err(err) => {
                self.release_held();
                return Err(err);
            }
        };

        let chat_id = ticket.chat_id;
        self.me = Some(detail.uid);
        self.log = detail
            .messages
            .iter()
            .cloned()
            .map(|m| Message::from_history(chat_id, detail.uid, m))
            .collect();
        // Frames that raced the history request; skip those it already holds.
        for mut message in std::mem::take(&mut self.held) {
            if let Some(sender) = message.sender_id {
                message.is_mine = sender == detail.uid;
            }
            let known = self.log.iter().any(|h| {
                h.sender_id == message.sender_id
                    && h.text == message.text
                    && h.display_time() == message.display_time()
            });
            if !known {
                self.log.push(message);
            }
        }
        let participant_name = match self.chats.iter_mut().find(|c| c.chat_id == chat_id) {
            Some(chat) => {
                chat.unread = 0;
                chat.participant_name.clone()
            }
            None => String::new(),
        };
        self.active = Some(ActiveChat {
            chat_id,
            participant_name,
            is_online: detail.is_online,
        });
        Ok(detail)
    }

    /// Feeds one stream frame. Only frames for the active chat reach the log.
    /// Frames for the chat being activated wait for its history; frames for
    /// other known chats bump their unread counter.
    pub fn append_incoming(&mut self, frame: IncomingFrame) -> Delivery {
        let message = Message::from_frame(frame, self.me);
        let chat_id = message.chat_id;
        if let Some(chat) = self.chats.iter_mut().find(|c| c.chat_id == chat_id) {
            chat.last_message_text = Some(message.text.clone());
            chat.last_message_time = Some(message.time.clone());
        }

        if self.active.as_ref().is_some_and(|a| a.chat_id == chat_id) {
            self.log.push(message);
            return Delivery::Appended;
        }
        if self.pending.is_some_and(|t| t.chat_id == chat_id) {
            self.held.push(message);
            return Delivery::Held(chat_id);
        }
        match self.chats.iter_mut().find(|c| c.chat_id == chat_id) {
            Some(chat) => {
                chat.unread += 1;
                Delivery::Unread(chat_id)
            }
            None => Delivery::Dropped,
        }
    }

    /// Held frames whose activation will not complete count as unread.
    fn release_held(&mut self) {
        for message in std::mem::take(&mut self.held) {
            if let Some(chat) = self.chats.iter_mut().find(|c| c.chat_id == message.chat_id) {
                chat.unread += 1;
            }
        }
    }

    /// Builds the frame for `text`. `Ok(None)` means there is nothing to send:
    /// blank text, or no active chat.
    pub fn prepare_outgoing(&self, text: &str, stream: StreamState) -> Result<Option<OutgoingFrame>, ChatError> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let Some(active) = &self.active else {
            return Ok(None);
        };
        if stream != StreamState::Open {
            return Err(ChatError::Protocol(stream));
        }
        Ok(Some(OutgoingFrame {
            chat_id: active.chat_id,
            content: content.to_string(),
        }))
    }

    pub fn set_stream_state(&mut self, state: StreamState) {
        self.stream = state;
    }
}

/// Users whose nickname contains `term`, ignoring case. A blank term keeps everyone.
pub fn filter_users<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    let term = term.trim().to_lowercase();
    users
        .iter()
        .filter(|u| u.nickname.to_lowercase().contains(&term))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::HistoryMessage;

    fn chat(id: ChatId, name: &str) -> Chat {
        Chat {
            chat_id: id,
            participant_name: name.into(),
            last_message_text: None,
            last_message_time: None,
            unread: 0,
        }
    }

    fn detail(uid: UserId, texts: &[(UserId, &str)]) -> ChatDetail {
        ChatDetail {
            is_online: true,
            uid,
            messages: texts
                .iter()
                .map(|(sender, text)| HistoryMessage {
                    sender_id: *sender,
                    text: text.to_string(),
                    time: "2024-03-05T13:07:00Z".into(),
                })
                .collect(),
        }
    }

    fn frame(chat_id: ChatId, sender: UserId, content: &str) -> IncomingFrame {
        IncomingFrame {
            chat_id,
            content: content.into(),
            time: "2024-03-05T13:08:00Z".into(),
            sender_id: Some(sender),
            is_my_message: None,
        }
    }

    fn with_active(chat_id: ChatId) -> ChatViewModel {
        let mut vm = ChatViewModel::new();
        vm.replace_chats(vec![chat(1, "alice"), chat(2, "bob")]);
        let ticket = vm.begin_activation(chat_id);
        vm.finish_activation(ticket, Ok(detail(10, &[(10, "m1")]))).unwrap();
        vm
    }

    #[test]
    fn activation_replaces_log_and_marks_ownership() {
        let vm = with_active(1);
        let active = vm.active().unwrap();
        assert_eq!(active.chat_id, 1);
        assert_eq!(active.participant_name, "alice");
        assert!(active.is_online);
        assert_eq!(vm.messages().len(), 1);
        assert!(vm.messages()[0].is_mine);
        assert_eq!(vm.highlighted(), Some(1));
    }

    #[test]
    fn switching_chats_deactivates_previous() {
        let mut vm = with_active(1);
        let ticket = vm.begin_activation(2);
        assert!(vm.active().is_none());
        assert!(vm.messages().is_empty());
        assert_eq!(vm.highlighted(), Some(2));

        vm.finish_activation(ticket, Ok(detail(10, &[(11, "b1"), (10, "b2")]))).unwrap();
        assert_eq!(vm.active().unwrap().chat_id, 2);
        let texts: Vec<_> = vm.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["b1", "b2"]);
        assert!(!vm.messages()[0].is_mine);
    }

    #[test]
    fn failed_activation_leaves_nothing_active() {
        let mut vm = with_active(1);
        let ticket = vm.begin_activation(2);
        let res = vm.finish_activation(ticket, Err(ChatError::NotFound(2)));
        assert!(matches!(res, Err(ChatError::NotFound(2))));
        assert!(vm.active().is_none());
        assert_eq!(vm.highlighted(), None);
    }

    #[test]
    fn stale_activation_is_ignored() {
        let mut vm = ChatViewModel::new();
        vm.replace_chats(vec![chat(1, "alice"), chat(2, "bob")]);
        let first = vm.begin_activation(1);
        let second = vm.begin_activation(2);

        vm.finish_activation(second, Ok(detail(10, &[(11, "from bob")]))).unwrap();
        let res = vm.finish_activation(first, Ok(detail(10, &[(12, "from alice")])));

        assert!(matches!(res, Err(ChatError::Superseded(1))));
        assert_eq!(vm.active().unwrap().chat_id, 2);
        assert_eq!(vm.messages()[0].text, "from bob");
    }

    #[test]
    fn stale_answer_arriving_first_is_ignored_too() {
        let mut vm = ChatViewModel::new();
        let first = vm.begin_activation(1);
        let second = vm.begin_activation(2);
        assert!(vm.finish_activation(first, Ok(detail(10, &[]))).is_err());
        assert!(vm.active().is_none());
        assert_eq!(vm.highlighted(), Some(2));
        vm.finish_activation(second, Ok(detail(10, &[]))).unwrap();
        assert_eq!(vm.active().unwrap().chat_id, 2);
    }

    #[test]
    fn frame_for_active_chat_is_appended_after_history() {
        let mut vm = with_active(1);
        assert_eq!(vm.append_incoming(frame(1, 11, "m2")), Delivery::Appended);
        let texts: Vec<_> = vm.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["m1", "m2"]);
        assert!(!vm.messages()[1].is_mine);
        assert_eq!(vm.chat(1).unwrap().last_message_text.as_deref(), Some("m2"));
    }

    #[test]
    fn frame_for_other_chat_leaves_log_unchanged() {
        let mut vm = with_active(1);
        let before = vm.messages().to_vec();
        assert_eq!(vm.append_incoming(frame(2, 11, "psst")), Delivery::Unread(2));
        assert_eq!(vm.messages(), before.as_slice());
        assert_eq!(vm.chat(2).unwrap().unread, 1);
        assert_eq!(vm.chat(2).unwrap().last_message_text.as_deref(), Some("psst"));
    }

    #[test]
    fn frame_for_unknown_chat_is_dropped() {
        let mut vm = with_active(1);
        assert_eq!(vm.append_incoming(frame(99, 11, "?")), Delivery::Dropped);
        assert_eq!(vm.messages().len(), 1);
    }

    #[test]
    fn activation_clears_unread_and_refresh_keeps_it() {
        let mut vm = with_active(1);
        vm.append_incoming(frame(2, 11, "a"));
        vm.append_incoming(frame(2, 11, "b"));
        vm.replace_chats(vec![chat(2, "bob"), chat(3, "carol")]);
        assert_eq!(vm.chat(2).unwrap().unread, 2);
        assert_eq!(vm.chat(3).unwrap().unread, 0);

        let ticket = vm.begin_activation(2);
        vm.finish_activation(ticket, Ok(detail(10, &[]))).unwrap();
        assert_eq!(vm.chat(2).unwrap().unread, 0);
    }

    #[test]
    fn frame_racing_history_is_merged_after_it() {
        let mut vm = with_active(1);
        let ticket = vm.begin_activation(2);
        assert_eq!(vm.append_incoming(frame(2, 11, "late")), Delivery::Held(2));
        assert!(vm.messages().is_empty());
        assert_eq!(vm.chat(2).unwrap().unread, 0);
        assert_eq!(vm.chat(2).unwrap().last_message_text.as_deref(), Some("late"));

        vm.finish_activation(ticket, Ok(detail(10, &[(11, "b1")]))).unwrap();
        let texts: Vec<_> = vm.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["b1", "late"]);
        assert!(!vm.messages()[1].is_mine);
    }

    #[test]
    fn held_frame_already_in_history_is_not_doubled() {
        let mut vm = with_active(1);
        let ticket = vm.begin_activation(2);
        vm.append_incoming(frame(2, 11, "b1"));

        let mut history = detail(10, &[(11, "b1")]);
        history.messages[0].time = "2024-03-05T13:08:00.123456".into();
        vm.finish_activation(ticket, Ok(history)).unwrap();
        assert_eq!(vm.messages().len(), 1);
    }

    #[test]
    fn held_frames_count_as_unread_when_activation_does_not_land() {
        let mut vm = with_active(1);
        let ticket = vm.begin_activation(2);
        vm.append_incoming(frame(2, 11, "x"));
        vm.finish_activation(ticket, Err(ChatError::Network("HTTP 500".into()))).unwrap_err();
        assert_eq!(vm.chat(2).unwrap().unread, 1);

        let ticket = vm.begin_activation(2);
        vm.append_incoming(frame(2, 11, "y"));
        let _newer = vm.begin_activation(1);
        assert_eq!(vm.chat(2).unwrap().unread, 2);
        assert!(vm.finish_activation(ticket, Ok(detail(10, &[]))).is_err());
        assert_eq!(vm.chat(2).unwrap().unread, 2);
    }

    #[test]
    fn outgoing_requires_text_chat_and_open_stream() {
        let vm = with_active(1);
        assert!(vm.prepare_outgoing("", StreamState::Open).unwrap().is_none());
        assert!(vm.prepare_outgoing("   ", StreamState::Open).unwrap().is_none());
        assert!(matches!(
            vm.prepare_outgoing("hi", StreamState::Closed),
            Err(ChatError::Protocol(StreamState::Closed))
        ));
        let frame = vm.prepare_outgoing("  hi ", StreamState::Open).unwrap().unwrap();
        assert_eq!(frame, OutgoingFrame { chat_id: 1, content: "hi".into() });

        let idle = ChatViewModel::new();
        assert!(idle.prepare_outgoing("hi", StreamState::Open).unwrap().is_none());
    }

    #[test]
    fn filters_users_by_nickname() {
        let users = vec![
            User { id: 1, nickname: "Alice".into() },
            User { id: 2, nickname: "malik".into() },
            User { id: 3, nickname: "Bob".into() },
        ];
        let ids: Vec<_> = filter_users(&users, "LI").iter().map(|u| u.id).collect();
        assert_eq!(ids, [1, 2]);
        assert_eq!(filter_users(&users, "  ").len(), 3);
        assert!(filter_users(&users, "zed").is_empty());
    }
}
