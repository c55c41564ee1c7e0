//! Chat gateway port
//!
//! The platform's REST/gateway layer is an external collaborator; this trait
//! captures exactly the capabilities the daemon needs from it. Production
//! uses `HttpGateway`, a JSON-over-HTTP client for the connector sidecar;
//! tests use an in-memory fake.
//!
//! Every method is a suspension point: control can yield to other pending
//! events at each call, which is why the ticket registry and the restriction
//! scheduler guard their check-then-act sequences.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use warden_common::{ChannelId, MessageId, RoleId, UserId};

/// Summary of a text channel as reported by the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

/// One entry from a channel history fetch. The connector returns history
/// oldest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub timestamp: DateTime<Utc>,
    pub author_display: String,
    /// Empty for attachment/embed-only messages.
    #[serde(default)]
    pub content: String,
}

/// Permission overwrites applied when provisioning a ticket channel: view
/// denied for the community, view+send for the requester and support role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketOverwrites {
    pub requester: UserId,
    pub support_role: Option<RoleId>,
}

/// Capabilities the daemon needs from the chat platform.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// The bot's own user id, used to attribute automated infractions.
    async fn identity(&self) -> anyhow::Result<UserId>;

    async fn send_message(&self, channel: ChannelId, text: &str) -> anyhow::Result<MessageId>;

    /// Message carrying a single interactive button.
    async fn send_with_button(
        &self,
        channel: ChannelId,
        text: &str,
        button_id: &str,
        label: &str,
    ) -> anyhow::Result<MessageId>;

    /// Short-lived notice in a channel; the platform removes it after a few
    /// seconds.
    async fn send_notice(&self, channel: ChannelId, text: &str) -> anyhow::Result<()>;

    /// Private acknowledgment visible only to `user`.
    async fn send_private(&self, user: UserId, text: &str) -> anyhow::Result<()>;

    /// Styled announcement embed.
    async fn post_announcement(
        &self,
        channel: ChannelId,
        title: &str,
        body: &str,
        color: u32,
    ) -> anyhow::Result<()>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> anyhow::Result<()>;

    async fn list_text_channels(&self) -> anyhow::Result<Vec<ChannelInfo>>;
    async fn find_text_channel(&self, name: &str) -> anyhow::Result<Option<ChannelId>>;
    async fn find_category(&self, name: &str) -> anyhow::Result<Option<ChannelId>>;
    async fn create_category(&self, name: &str) -> anyhow::Result<ChannelId>;
    async fn create_ticket_channel(
        &self,
        name: &str,
        category: ChannelId,
        overwrites: TicketOverwrites,
    ) -> anyhow::Result<ChannelId>;
    async fn delete_channel(&self, channel: ChannelId) -> anyhow::Result<()>;
    async fn user_can_view(&self, channel: ChannelId, user: UserId) -> anyhow::Result<bool>;
    async fn channel_history(&self, channel: ChannelId) -> anyhow::Result<Vec<HistoryMessage>>;

    /// Deliver a text file to a channel alongside a note.
    async fn upload_file(
        &self,
        channel: ChannelId,
        filename: &str,
        contents: &str,
        note: &str,
    ) -> anyhow::Result<()>;

    async fn find_role(&self, name: &str) -> anyhow::Result<Option<RoleId>>;
    async fn create_role(&self, name: &str) -> anyhow::Result<RoleId>;
    /// Deny send/speak for the role on every channel. One-time setup cost
    /// when the mute role is first created.
    async fn deny_role_everywhere(&self, role: RoleId) -> anyhow::Result<()>;
    async fn add_role(&self, user: UserId, role: RoleId) -> anyhow::Result<()>;
    async fn remove_role(&self, user: UserId, role: RoleId) -> anyhow::Result<()>;
    async fn member_has_role(&self, user: UserId, role: RoleId) -> anyhow::Result<bool>;

    async fn ban(&self, user: UserId, reason: &str) -> anyhow::Result<()>;
    async fn kick(&self, user: UserId, reason: &str) -> anyhow::Result<()>;
}

// ============================================================================
// HTTP adapter
// ============================================================================

#[derive(Debug, Deserialize)]
struct IdResp {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct FoundResp {
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BoolResp {
    value: bool,
}

#[derive(Debug, Deserialize)]
struct ChannelsResp {
    channels: Vec<ChannelInfo>,
}

#[derive(Debug, Deserialize)]
struct HistoryResp {
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
struct Ack {}

/// JSON-over-HTTP client for the external connector.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn call<B, R>(&self, op: &str, body: &B) -> anyhow::Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/v1/{}", self.base_url, op);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("gateway call '{op}' failed"))?
            .error_for_status()
            .with_context(|| format!("gateway call '{op}' rejected"))?;
        resp.json::<R>()
            .await
            .with_context(|| format!("gateway call '{op}' returned malformed payload"))
    }
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn identity(&self) -> anyhow::Result<UserId> {
        let resp: IdResp = self.call("identity", &json!({})).await?;
        Ok(UserId(resp.id))
    }

    async fn send_message(&self, channel: ChannelId, text: &str) -> anyhow::Result<MessageId> {
        let resp: IdResp = self
            .call("send_message", &json!({ "channel": channel, "text": text }))
            .await?;
        Ok(MessageId(resp.id))
    }

    async fn send_with_button(
        &self,
        channel: ChannelId,
        text: &str,
        button_id: &str,
        label: &str,
    ) -> anyhow::Result<MessageId> {
        let resp: IdResp = self
            .call(
                "send_with_button",
                &json!({
                    "channel": channel,
                    "text": text,
                    "button_id": button_id,
                    "label": label,
                }),
            )
            .await?;
        Ok(MessageId(resp.id))
    }

    async fn send_notice(&self, channel: ChannelId, text: &str) -> anyhow::Result<()> {
        let _: Ack = self
            .call("send_notice", &json!({ "channel": channel, "text": text }))
            .await?;
        Ok(())
    }

    async fn send_private(&self, user: UserId, text: &str) -> anyhow::Result<()> {
        let _: Ack = self
            .call("send_private", &json!({ "user": user, "text": text }))
            .await?;
        Ok(())
    }

    async fn post_announcement(
        &self,
        channel: ChannelId,
        title: &str,
        body: &str,
        color: u32,
    ) -> anyhow::Result<()> {
        let _: Ack = self
            .call(
                "post_announcement",
                &json!({ "channel": channel, "title": title, "body": body, "color": color }),
            )
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> anyhow::Result<()> {
        let _: Ack = self
            .call("delete_message", &json!({ "channel": channel, "message": message }))
            .await?;
        Ok(())
    }

    async fn list_text_channels(&self) -> anyhow::Result<Vec<ChannelInfo>> {
        let resp: ChannelsResp = self.call("list_text_channels", &json!({})).await?;
        Ok(resp.channels)
    }

    async fn find_text_channel(&self, name: &str) -> anyhow::Result<Option<ChannelId>> {
        let resp: FoundResp = self.call("find_text_channel", &json!({ "name": name })).await?;
        Ok(resp.id.map(ChannelId))
    }

    async fn find_category(&self, name: &str) -> anyhow::Result<Option<ChannelId>> {
        let resp: FoundResp = self.call("find_category", &json!({ "name": name })).await?;
        Ok(resp.id.map(ChannelId))
    }

    async fn create_category(&self, name: &str) -> anyhow::Result<ChannelId> {
        let resp: IdResp = self.call("create_category", &json!({ "name": name })).await?;
        Ok(ChannelId(resp.id))
    }

    async fn create_ticket_channel(
        &self,
        name: &str,
        category: ChannelId,
        overwrites: TicketOverwrites,
    ) -> anyhow::Result<ChannelId> {
        let resp: IdResp = self
            .call(
                "create_ticket_channel",
                &json!({ "name": name, "category": category, "overwrites": overwrites }),
            )
            .await?;
        Ok(ChannelId(resp.id))
    }

    async fn delete_channel(&self, channel: ChannelId) -> anyhow::Result<()> {
        let _: Ack = self.call("delete_channel", &json!({ "channel": channel })).await?;
        Ok(())
    }

    async fn user_can_view(&self, channel: ChannelId, user: UserId) -> anyhow::Result<bool> {
        let resp: BoolResp = self
            .call("user_can_view", &json!({ "channel": channel, "user": user }))
            .await?;
        Ok(resp.value)
    }

    async fn channel_history(&self, channel: ChannelId) -> anyhow::Result<Vec<HistoryMessage>> {
        let resp: HistoryResp = self
            .call("channel_history", &json!({ "channel": channel, "oldest_first": true }))
            .await?;
        Ok(resp.messages)
    }

    async fn upload_file(
        &self,
        channel: ChannelId,
        filename: &str,
        contents: &str,
        note: &str,
    ) -> anyhow::Result<()> {
        let _: Ack = self
            .call(
                "upload_file",
                &json!({
                    "channel": channel,
                    "filename": filename,
                    "contents": contents,
                    "note": note,
                }),
            )
            .await?;
        Ok(())
    }

    async fn find_role(&self, name: &str) -> anyhow::Result<Option<RoleId>> {
        let resp: FoundResp = self.call("find_role", &json!({ "name": name })).await?;
        Ok(resp.id.map(RoleId))
    }

    async fn create_role(&self, name: &str) -> anyhow::Result<RoleId> {
        let resp: IdResp = self.call("create_role", &json!({ "name": name })).await?;
        Ok(RoleId(resp.id))
    }

    async fn deny_role_everywhere(&self, role: RoleId) -> anyhow::Result<()> {
        let _: Ack = self.call("deny_role_everywhere", &json!({ "role": role })).await?;
        Ok(())
    }

    async fn add_role(&self, user: UserId, role: RoleId) -> anyhow::Result<()> {
        let _: Ack = self.call("add_role", &json!({ "user": user, "role": role })).await?;
        Ok(())
    }

    async fn remove_role(&self, user: UserId, role: RoleId) -> anyhow::Result<()> {
        let _: Ack = self.call("remove_role", &json!({ "user": user, "role": role })).await?;
        Ok(())
    }

    async fn member_has_role(&self, user: UserId, role: RoleId) -> anyhow::Result<bool> {
        let resp: BoolResp = self
            .call("member_has_role", &json!({ "user": user, "role": role }))
            .await?;
        Ok(resp.value)
    }

    async fn ban(&self, user: UserId, reason: &str) -> anyhow::Result<()> {
        let _: Ack = self.call("ban", &json!({ "user": user, "reason": reason })).await?;
        Ok(())
    }

    async fn kick(&self, user: UserId, reason: &str) -> anyhow::Result<()> {
        let _: Ack = self.call("kick", &json!({ "user": user, "reason": reason })).await?;
        Ok(())
    }
}
