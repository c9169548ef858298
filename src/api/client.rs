use tracing::debug;

use crate::api::{
    BackendMessage, ChatListResponse, ChatSummary, CreateChatRequest, NewChatResponse,
    PostMessageRequest, PostedMessage, RenameChatRequest,
};
use crate::utils::url::construct_api_url;

/// HTTP client for the Ultron chat service.
///
/// All durable data lives behind this API; the console only keeps
/// presentation state.
#[derive(Clone)]
pub struct UltronClient {
    client: reqwest::Client,
    base_url: String,
}

impl UltronClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: crate::utils::url::normalize_base_url(&base_url.into()),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chats_for_category(
        &self,
        slug: &str,
    ) -> Result<Vec<ChatSummary>, Box<dyn std::error::Error>> {
        let url = construct_api_url(&self.base_url, &format!("chats/{slug}"));
        debug!(%url, "fetching chats for category");
        let response = self.client.get(url).send().await?;
        // A category with no chats yet comes back as 404 from the service
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = Self::check_status(response).await?;
        let list = response.json::<ChatListResponse>().await?;
        Ok(list.chats)
    }

    pub async fn recent_chats(&self) -> Result<Vec<ChatSummary>, Box<dyn std::error::Error>> {
        let url = construct_api_url(&self.base_url, "recent-chats");
        debug!(%url, "fetching recent chats");
        let response = Self::check_status(self.client.get(url).send().await?).await?;
        let list = response.json::<ChatListResponse>().await?;
        Ok(list.chats)
    }

    pub async fn create_chat(
        &self,
        slug: &str,
        chat_name: &str,
    ) -> Result<NewChatResponse, Box<dyn std::error::Error>> {
        let url = construct_api_url(&self.base_url, "chats/");
        debug!(%url, slug, "creating chat");
        let request = CreateChatRequest {
            slug: slug.to_string(),
            chat_name: chat_name.to_string(),
        };
        let response = Self::check_status(self.client.post(url).json(&request).send().await?)
            .await?;
        Ok(response.json::<NewChatResponse>().await?)
    }

    pub async fn rename_chat(
        &self,
        chat_id: &str,
        new_title: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let url = construct_api_url(&self.base_url, &format!("chats/{chat_id}/rename"));
        debug!(%url, "renaming chat");
        let request = RenameChatRequest {
            new_title: new_title.to_string(),
        };
        Self::check_status(self.client.put(url).json(&request).send().await?).await?;
        Ok(())
    }

    pub async fn delete_chat(&self, chat_id: &str) -> Result<(), Box<dyn std::error::Error>> {
        let url = construct_api_url(&self.base_url, &format!("chats/{chat_id}"));
        debug!(%url, "deleting chat");
        Self::check_status(self.client.delete(url).send().await?).await?;
        Ok(())
    }

    /// Message history for a chat. The service answers 404 for chats with
    /// no messages yet; that is an empty transcript, not an error.
    pub async fn chat_messages(
        &self,
        chat_id: &str,
    ) -> Result<Vec<BackendMessage>, Box<dyn std::error::Error>> {
        let url = construct_api_url(&self.base_url, &format!("chats/{chat_id}/messages"));
        debug!(%url, "fetching chat messages");
        let response = self.client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = Self::check_status(response).await?;
        Ok(response.json::<Vec<BackendMessage>>().await?)
    }

    pub async fn post_message(
        &self,
        chat_id: &str,
        sender: &str,
        text: &str,
    ) -> Result<PostedMessage, Box<dyn std::error::Error>> {
        let url = construct_api_url(&self.base_url, &format!("chats/{chat_id}/messages"));
        debug!(%url, "posting message");
        let request = PostMessageRequest {
            sender: sender.to_string(),
            text: text.to_string(),
        };
        let response = Self::check_status(self.client.post(url).json(&request).send().await?)
            .await?;
        Ok(response.json::<PostedMessage>().await?)
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(format!("API request failed with status {status}: {error_text}").into())
    }
}
