use std::future::Future;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::api::models::{AddChatRequest, Chat, ChatDetail, ChatId, User, UserId};
use crate::error::ChatError;

/// The request/response side of the chat server.
pub trait ChatService {
    fn fetch_chats(&self) -> impl Future<Output = Result<Vec<Chat>, ChatError>>;
    fn fetch_chat(&self, chat_id: ChatId) -> impl Future<Output = Result<ChatDetail, ChatError>>;
    fn fetch_users(&self) -> impl Future<Output = Result<Vec<User>, ChatError>>;
    fn add_chat(&self, user_id: UserId) -> impl Future<Output = Result<(), ChatError>>;
}

#[derive(Clone)]
pub struct ApiClient {
    pub http: HttpClient,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, access_token: Option<String>) -> Self {
        Self::with_http(HttpClient::new(), base_url, access_token)
    }

    pub fn with_http(http: HttpClient, base_url: &str, access_token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// The server reads the session from the `access_token` cookie.
    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(t) => req.header(reqwest::header::COOKIE, format!("access_token={}", t)),
            None => req,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, chat_id: Option<ChatId>) -> Result<T, ChatError> {
        let endpoint = self.endpoint(path);
        let resp = self.with_auth(self.http.get(&endpoint)).send().await?;
        if !resp.status().is_success() {
            return Err(ChatError::from_status(resp.status(), chat_id));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// List the current user's chats.
    pub async fn chats(&self) -> Result<Vec<Chat>, ChatError> {
        self.get_json("getChats", None).await
    }

    /// Participant status and message history of one chat.
    pub async fn chat(&self, chat_id: ChatId) -> Result<ChatDetail, ChatError> {
        self.get_json(&format!("chat/{}", chat_id), Some(chat_id)).await
    }

    /// Everyone a new chat can be started with.
    pub async fn users(&self) -> Result<Vec<User>, ChatError> {
        self.get_json("getUsers", None).await
    }

    pub async fn create_chat(&self, user_id: UserId) -> Result<(), ChatError> {
        let endpoint = self.endpoint("addChat");
        let req = self.http.post(&endpoint).json(&AddChatRequest { user_id });
        let resp = self.with_auth(req).send().await?;
        if !resp.status().is_success() {
            return Err(ChatError::from_status(resp.status(), None));
        }
        Ok(())
    }
}

// Each request runs on the shared tokio runtime so callers on the glib main
// context can await it.
impl ChatService for ApiClient {
    fn fetch_chats(&self) -> impl Future<Output = Result<Vec<Chat>, ChatError>> {
        let client = self.clone();
        crate::utils::on_runtime(async move { client.chats().await })
    }

    fn fetch_chat(&self, chat_id: ChatId) -> impl Future<Output = Result<ChatDetail, ChatError>> {
        let client = self.clone();
        crate::utils::on_runtime(async move { client.chat(chat_id).await })
    }

    fn fetch_users(&self) -> impl Future<Output = Result<Vec<User>, ChatError>> {
        let client = self.clone();
        crate::utils::on_runtime(async move { client.users().await })
    }

    fn add_chat(&self, user_id: UserId) -> impl Future<Output = Result<(), ChatError>> {
        let client = self.clone();
        crate::utils::on_runtime(async move { client.create_chat(user_id).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoints_from_base() {
        let client = ApiClient::new("http://localhost:8000/", None);
        assert_eq!(client.endpoint("getChats"), "http://localhost:8000/getChats");
        assert_eq!(client.endpoint("/chat/4"), "http://localhost:8000/chat/4");
    }

    #[test]
    fn attaches_session_cookie() {
        let client = ApiClient::new("http://localhost:8000", Some("abc".into()));
        let req = client.with_auth(client.http.get(client.endpoint("getChats"))).build().unwrap();
        assert_eq!(req.headers()[reqwest::header::COOKIE], "access_token=abc");

        let anonymous = ApiClient::new("http://localhost:8000", Some(String::new()));
        let req = anonymous.with_auth(anonymous.http.get(anonymous.endpoint("getChats"))).build().unwrap();
        assert!(req.headers().get(reqwest::header::COOKIE).is_none());
    }

    #[test]
    fn unreachable_server_is_a_network_error() {
        let client = ApiClient::new("http://127.0.0.1:9", None);
        let res = crate::utils::RUNTIME.block_on(client.chats());
        assert!(matches!(res, Err(ChatError::Network(_))));
    }
}
