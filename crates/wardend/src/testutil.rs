//! In-memory `ChatGateway` for unit tests.
//!
//! Records every outbound call so tests can assert on side effects, and lets
//! tests seed channels, roles, memberships, and channel history up front.

use crate::gateway::{ChatGateway, ChannelInfo, HistoryMessage, TicketOverwrites};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use warden_common::{ChannelId, MessageId, RoleId, UserId};

struct ChannelRecord {
    info: ChannelInfo,
    /// `None` means visible to everyone; ticket channels list their viewers.
    viewers: Option<Vec<UserId>>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    channels: Vec<ChannelRecord>,
    categories: Vec<ChannelInfo>,
    histories: HashMap<ChannelId, Vec<HistoryMessage>>,
    roles: Vec<(RoleId, String)>,
    memberships: HashMap<UserId, HashSet<RoleId>>,
    sent: Vec<(ChannelId, String)>,
    buttons: Vec<(ChannelId, String)>,
    notices: Vec<(ChannelId, String)>,
    private: HashMap<UserId, Vec<String>>,
    announcements: Vec<(ChannelId, String, String, u32)>,
    deleted: Vec<(ChannelId, MessageId)>,
    uploads: Vec<(ChannelId, String, String, String)>,
    grants: Vec<(UserId, RoleId)>,
    removals: Vec<(UserId, RoleId)>,
    denied_everywhere: Vec<RoleId>,
    banned: Vec<UserId>,
}

impl Inner {
    fn alloc(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct InMemoryGateway {
    inner: Mutex<Inner>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    // ---- seeding -----------------------------------------------------------

    pub async fn seed_text_channel(&self, name: &str) -> ChannelId {
        let mut inner = self.inner.lock().await;
        let id = ChannelId(inner.alloc());
        inner.channels.push(ChannelRecord {
            info: ChannelInfo {
                id,
                name: name.to_string(),
            },
            viewers: None,
        });
        id
    }

    pub async fn seed_role(&self, name: &str) -> RoleId {
        let mut inner = self.inner.lock().await;
        let id = RoleId(inner.alloc());
        inner.roles.push((id, name.to_string()));
        id
    }

    pub async fn grant_role(&self, user: UserId, role: RoleId) {
        let mut inner = self.inner.lock().await;
        inner.memberships.entry(user).or_default().insert(role);
    }

    pub async fn seed_history(&self, channel: ChannelId, messages: Vec<HistoryMessage>) {
        self.inner.lock().await.histories.insert(channel, messages);
    }

    // ---- inspection --------------------------------------------------------

    pub async fn text_channels(&self) -> Vec<ChannelInfo> {
        self.inner
            .lock()
            .await
            .channels
            .iter()
            .map(|c| c.info.clone())
            .collect()
    }

    pub async fn find_role_by_name(&self, name: &str) -> Option<RoleId> {
        self.inner
            .lock()
            .await
            .roles
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| *id)
    }

    pub async fn member_has(&self, user: UserId, role: RoleId) -> bool {
        self.inner
            .lock()
            .await
            .memberships
            .get(&user)
            .is_some_and(|roles| roles.contains(&role))
    }

    pub async fn sent_messages(&self) -> Vec<(ChannelId, String)> {
        self.inner.lock().await.sent.clone()
    }

    pub async fn button_messages(&self) -> Vec<(ChannelId, String)> {
        self.inner.lock().await.buttons.clone()
    }

    pub async fn notices(&self) -> Vec<(ChannelId, String)> {
        self.inner.lock().await.notices.clone()
    }

    pub async fn private_for(&self, user: UserId) -> Vec<String> {
        self.inner
            .lock()
            .await
            .private
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn announcements(&self) -> Vec<(ChannelId, String, String, u32)> {
        self.inner.lock().await.announcements.clone()
    }

    pub async fn deleted_messages(&self) -> Vec<(ChannelId, MessageId)> {
        self.inner.lock().await.deleted.clone()
    }

    pub async fn uploads(&self) -> Vec<(ChannelId, String, String, String)> {
        self.inner.lock().await.uploads.clone()
    }

    pub async fn role_grants(&self) -> Vec<(UserId, RoleId)> {
        self.inner.lock().await.grants.clone()
    }

    pub async fn role_removals(&self) -> Vec<(UserId, RoleId)> {
        self.inner.lock().await.removals.clone()
    }

    pub async fn roles_denied_everywhere(&self) -> Vec<RoleId> {
        self.inner.lock().await.denied_everywhere.clone()
    }

    pub async fn banned(&self) -> Vec<UserId> {
        self.inner.lock().await.banned.clone()
    }
}

#[async_trait]
impl ChatGateway for InMemoryGateway {
    async fn identity(&self) -> anyhow::Result<UserId> {
        Ok(UserId(999))
    }

    async fn send_message(&self, channel: ChannelId, text: &str) -> anyhow::Result<MessageId> {
        let mut inner = self.inner.lock().await;
        inner.sent.push((channel, text.to_string()));
        let id = inner.alloc();
        Ok(MessageId(id))
    }

    async fn send_with_button(
        &self,
        channel: ChannelId,
        _text: &str,
        button_id: &str,
        _label: &str,
    ) -> anyhow::Result<MessageId> {
        let mut inner = self.inner.lock().await;
        inner.buttons.push((channel, button_id.to_string()));
        let id = inner.alloc();
        Ok(MessageId(id))
    }

    async fn send_notice(&self, channel: ChannelId, text: &str) -> anyhow::Result<()> {
        self.inner
            .lock()
            .await
            .notices
            .push((channel, text.to_string()));
        Ok(())
    }

    async fn send_private(&self, user: UserId, text: &str) -> anyhow::Result<()> {
        self.inner
            .lock()
            .await
            .private
            .entry(user)
            .or_default()
            .push(text.to_string());
        Ok(())
    }

    async fn post_announcement(
        &self,
        channel: ChannelId,
        title: &str,
        body: &str,
        color: u32,
    ) -> anyhow::Result<()> {
        self.inner.lock().await.announcements.push((
            channel,
            title.to_string(),
            body.to_string(),
            color,
        ));
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> anyhow::Result<()> {
        self.inner.lock().await.deleted.push((channel, message));
        Ok(())
    }

    async fn list_text_channels(&self) -> anyhow::Result<Vec<ChannelInfo>> {
        Ok(self.text_channels().await)
    }

    async fn find_text_channel(&self, name: &str) -> anyhow::Result<Option<ChannelId>> {
        Ok(self
            .inner
            .lock()
            .await
            .channels
            .iter()
            .find(|c| c.info.name == name)
            .map(|c| c.info.id))
    }

    async fn find_category(&self, name: &str) -> anyhow::Result<Option<ChannelId>> {
        Ok(self
            .inner
            .lock()
            .await
            .categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id))
    }

    async fn create_category(&self, name: &str) -> anyhow::Result<ChannelId> {
        let mut inner = self.inner.lock().await;
        let id = ChannelId(inner.alloc());
        inner.categories.push(ChannelInfo {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn create_ticket_channel(
        &self,
        name: &str,
        _category: ChannelId,
        overwrites: TicketOverwrites,
    ) -> anyhow::Result<ChannelId> {
        let mut inner = self.inner.lock().await;
        let id = ChannelId(inner.alloc());
        inner.channels.push(ChannelRecord {
            info: ChannelInfo {
                id,
                name: name.to_string(),
            },
            viewers: Some(vec![overwrites.requester]),
        });
        Ok(id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        inner.channels.retain(|c| c.info.id != channel);
        inner.histories.remove(&channel);
        Ok(())
    }

    async fn user_can_view(&self, channel: ChannelId, user: UserId) -> anyhow::Result<bool> {
        Ok(self
            .inner
            .lock()
            .await
            .channels
            .iter()
            .find(|c| c.info.id == channel)
            .map(|c| match &c.viewers {
                None => true,
                Some(viewers) => viewers.contains(&user),
            })
            .unwrap_or(false))
    }

    async fn channel_history(&self, channel: ChannelId) -> anyhow::Result<Vec<HistoryMessage>> {
        Ok(self
            .inner
            .lock()
            .await
            .histories
            .get(&channel)
            .cloned()
            .unwrap_or_default())
    }

    async fn upload_file(
        &self,
        channel: ChannelId,
        filename: &str,
        contents: &str,
        note: &str,
    ) -> anyhow::Result<()> {
        self.inner.lock().await.uploads.push((
            channel,
            filename.to_string(),
            contents.to_string(),
            note.to_string(),
        ));
        Ok(())
    }

    async fn find_role(&self, name: &str) -> anyhow::Result<Option<RoleId>> {
        Ok(self.find_role_by_name(name).await)
    }

    async fn create_role(&self, name: &str) -> anyhow::Result<RoleId> {
        let mut inner = self.inner.lock().await;
        let id = RoleId(inner.alloc());
        inner.roles.push((id, name.to_string()));
        Ok(id)
    }

    async fn deny_role_everywhere(&self, role: RoleId) -> anyhow::Result<()> {
        self.inner.lock().await.denied_everywhere.push(role);
        Ok(())
    }

    async fn add_role(&self, user: UserId, role: RoleId) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        inner.memberships.entry(user).or_default().insert(role);
        inner.grants.push((user, role));
        Ok(())
    }

    async fn remove_role(&self, user: UserId, role: RoleId) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(roles) = inner.memberships.get_mut(&user) {
            roles.remove(&role);
        }
        inner.removals.push((user, role));
        Ok(())
    }

    async fn member_has_role(&self, user: UserId, role: RoleId) -> anyhow::Result<bool> {
        Ok(self.member_has(user, role).await)
    }

    async fn ban(&self, user: UserId, _reason: &str) -> anyhow::Result<()> {
        self.inner.lock().await.banned.push(user);
        Ok(())
    }

    async fn kick(&self, _user: UserId, _reason: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
