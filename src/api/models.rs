use serde::{Deserialize, Serialize};

pub type ChatId = i64;
pub type UserId = i64;

/// One entry of `GET /getChats`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Chat {
    pub chat_id: ChatId,
    pub participant_name: String,
    #[serde(default)]
    pub last_message_text: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<String>,
    /// Stream messages received while the chat was not active.
    #[serde(skip)]
    pub unread: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryMessage {
    pub sender_id: UserId,
    pub text: String,
    pub time: String,
}

/// Body of `GET /chat/{id}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatDetail {
    #[serde(rename = "isOnline", default)]
    pub is_online: bool,
    pub uid: UserId,
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

/// One entry of `GET /getUsers`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub nickname: String,
}

#[derive(Debug, Serialize)]
pub struct AddChatRequest {
    pub user_id: UserId,
}

/// Client to server stream frame.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutgoingFrame {
    pub chat_id: ChatId,
    pub content: String,
}

/// Server to client stream frame.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IncomingFrame {
    pub chat_id: ChatId,
    pub content: String,
    pub time: String,
    #[serde(default)]
    pub sender_id: Option<UserId>,
    #[serde(rename = "isMyMessage", default)]
    pub is_my_message: Option<bool>,
}

/// A message as shown in the chat pane.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub chat_id: ChatId,
    pub sender_id: Option<UserId>,
    pub text: String,
    pub time: String,
    pub is_mine: bool,
}

impl Message {
    pub fn from_history(chat_id: ChatId, me: UserId, msg: HistoryMessage) -> Self {
        Self {
            chat_id,
            is_mine: msg.sender_id == me,
            sender_id: Some(msg.sender_id),
            text: msg.text,
            time: msg.time,
        }
    }

    /// Ownership is decided by sender id when both ids are known, and by the
    /// server's `isMyMessage` hint otherwise.
    pub fn from_frame(frame: IncomingFrame, me: Option<UserId>) -> Self {
        let is_mine = match (frame.sender_id, me) {
            (Some(sender), Some(me)) => sender == me,
            _ => frame.is_my_message.unwrap_or(false),
        };
        Self {
            chat_id: frame.chat_id,
            sender_id: frame.sender_id,
            text: frame.content,
            time: frame.time,
            is_mine,
        }
    }

    pub fn display_time(&self) -> String {
        crate::utils::format_timestamp(&self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_list_tolerates_missing_preview() {
        let json = r#"[
            {"chat_id": 1, "participant_name": "alice", "last_message_text": "hey", "last_message_time": "2024-03-05T13:07:00"},
            {"chat_id": 2, "participant_name": "bob", "last_message_text": null}
        ]"#;
        let chats: Vec<Chat> = serde_json::from_str(json).unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].last_message_text.as_deref(), Some("hey"));
        assert_eq!(chats[1].last_message_text, None);
        assert_eq!(chats[1].last_message_time, None);
        assert_eq!(chats[1].unread, 0);
    }

    #[test]
    fn chat_detail_defaults_online_flag() {
        let json = r#"{"uid": 3, "messages": [{"sender_id": 3, "text": "hi", "time": "2024-03-05T13:07:00Z", "id": 10}]}"#;
        let detail: ChatDetail = serde_json::from_str(json).unwrap();
        assert!(!detail.is_online);
        assert_eq!(detail.uid, 3);
        assert_eq!(detail.messages[0].text, "hi");
    }

    #[test]
    fn incoming_frame_ownership() {
        let json = r#"{"chat_id": 4, "content": "yo", "isMyMessage": true, "message_id": 9, "sender_id": 2, "time": "2024-03-05T13:07:00+00:00"}"#;
        let frame: IncomingFrame = serde_json::from_str(json).unwrap();

        let known = Message::from_frame(frame.clone(), Some(5));
        assert!(!known.is_mine);

        let unknown_user = Message::from_frame(frame, None);
        assert!(unknown_user.is_mine);
        assert_eq!(unknown_user.display_time(), "05-03-2024 13:07");
    }

    #[test]
    fn outgoing_frame_wire_shape() {
        let frame = OutgoingFrame { chat_id: 4, content: "hi".into() };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({"chat_id": 4, "content": "hi"})
        );
    }
}
