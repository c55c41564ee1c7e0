//! Ticket registry
//!
//! Allocates unique, monotonically increasing ticket numbers from a durable
//! counter, provisions an access-restricted channel per ticket, and handles
//! closure with transcript archival.
//!
//! The whole open sequence - duplicate check, counter increment + persist,
//! channel creation - runs under one mutex. Two concurrent openers can never
//! receive the same number, and a requester racing themselves cannot end up
//! with two channels. The counter is persisted before the channel is
//! created, so a crash in between burns a number; numbers are unique and
//! increasing, not gapless.

use crate::gateway::{ChatGateway, HistoryMessage, TicketOverwrites};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use warden_common::{ChannelId, CounterStore, Result, UserId, WardenError};

/// Ticket channels are named `ticket-<number>`.
pub const TICKET_PREFIX: &str = "ticket-";

/// Button id on the affordance message that opens a ticket.
pub const OPEN_BUTTON_ID: &str = "ticket_open";

/// Button id on the ticket intro message that closes it.
pub const CLOSE_BUTTON_ID: &str = "ticket_close";

/// Rendered in transcripts for messages with no text content.
pub const TRANSCRIPT_PLACEHOLDER: &str = "[embed/attachment]";

/// A freshly opened ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketHandle {
    pub number: u64,
    pub channel: ChannelId,
}

pub struct TicketRegistry {
    gateway: Arc<dyn ChatGateway>,
    counter: CounterStore,
    alloc_lock: Mutex<()>,
    support_role: String,
    category_name: String,
    archive_channel: String,
}

impl TicketRegistry {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        counter_path: PathBuf,
        support_role: &str,
        category_name: &str,
        archive_channel: &str,
    ) -> Self {
        Self {
            gateway,
            counter: CounterStore::new(counter_path),
            alloc_lock: Mutex::new(()),
            support_role: support_role.to_string(),
            category_name: category_name.to_string(),
            archive_channel: archive_channel.to_string(),
        }
    }

    /// Open a ticket for `requester`: allocate the next number, provision the
    /// restricted channel, post the intro, and acknowledge privately.
    ///
    /// Returns `TicketAlreadyOpen` without creating anything when the
    /// requester can already view a ticket channel.
    pub async fn open_ticket(&self, requester: UserId) -> Result<TicketHandle> {
        let guard = self.alloc_lock.lock().await;

        if self.has_open_ticket(requester).await? {
            return Err(WardenError::TicketAlreadyOpen);
        }

        let support_role = self.gateway.find_role(&self.support_role).await?;
        let category = match self.gateway.find_category(&self.category_name).await? {
            Some(id) => id,
            None => self.gateway.create_category(&self.category_name).await?,
        };

        let number = self.counter.load()? + 1;
        self.counter.save(number)?;

        let name = format!("{TICKET_PREFIX}{number}");
        let channel = self
            .gateway
            .create_ticket_channel(
                &name,
                category,
                TicketOverwrites {
                    requester,
                    support_role,
                },
            )
            .await?;
        drop(guard);

        info!("ticket #{number} opened by {requester} in channel {channel}");

        self.gateway
            .send_with_button(
                channel,
                &format!(
                    "Ticket #{number}\n<@{requester}>, describe your problem and a team \
                     member will assist you."
                ),
                CLOSE_BUTTON_ID,
                "Close Ticket",
            )
            .await?;
        self.gateway
            .send_private(requester, &format!("Ticket created: #{name}"))
            .await?;

        Ok(TicketHandle { number, channel })
    }

    /// Close the ticket channel: export the transcript to the archive channel
    /// (best-effort) and destroy the channel. Only support-role holders may
    /// close; `NotAuthorized` leaves the channel untouched.
    pub async fn close_ticket(&self, actor: UserId, channel: ChannelId) -> Result<()> {
        let authorized = match self.gateway.find_role(&self.support_role).await? {
            Some(role) => self.gateway.member_has_role(actor, role).await?,
            None => false,
        };
        if !authorized {
            return Err(WardenError::NotAuthorized);
        }

        let name = self
            .gateway
            .list_text_channels()
            .await?
            .into_iter()
            .find(|c| c.id == channel)
            .map(|c| c.name)
            .unwrap_or_else(|| format!("channel-{channel}"));

        let history = self.gateway.channel_history(channel).await?;
        let transcript = render_transcript(&history);

        match self.gateway.find_text_channel(&self.archive_channel).await? {
            Some(archive) => {
                self.gateway
                    .upload_file(
                        archive,
                        &format!("{name}.txt"),
                        &transcript,
                        &format!("Ticket closed by <@{actor}> - `{name}`"),
                    )
                    .await?;
            }
            None => info!("no archive channel '{}', transcript dropped", self.archive_channel),
        }

        self.gateway.delete_channel(channel).await?;
        info!("ticket channel {name} closed by {actor}");
        Ok(())
    }

    /// True when any `ticket-*` channel is visible to the requester. Must be
    /// called with the allocation lock held.
    async fn has_open_ticket(&self, requester: UserId) -> Result<bool> {
        for channel in self.gateway.list_text_channels().await? {
            if channel.name.starts_with(TICKET_PREFIX)
                && self.gateway.user_can_view(channel.id, requester).await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Render a channel history as one line per message, chronological order:
/// `[timestamp] display_name: content`.
pub fn render_transcript(messages: &[HistoryMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let content = if m.content.is_empty() {
                TRANSCRIPT_PLACEHOLDER
            } else {
                m.content.as_str()
            };
            format!("[{}] {}: {}", m.timestamp, m.author_display, content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
