//! Command dispatch
//!
//! Thin mapping from the platform's command surface onto the core services.
//! Authorization is enforced here: privileged commands from actors without
//! the support role are answered privately and change nothing.

use crate::gateway::ChatGateway;
use crate::moderation::ModerationService;
use crate::tickets::{TicketRegistry, OPEN_BUTTON_ID};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warden_common::{ChannelId, UserId};

/// A command as delivered by the connector's dispatch layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Command {
    /// Post the ticket-open affordance into the current channel.
    Setup,
    Ban { target: UserId, reason: Option<String> },
    Kick { target: UserId, reason: Option<String> },
    Warn { target: UserId, reason: Option<String> },
    Mute { target: UserId, minutes: Option<u64> },
    Unmute { target: UserId },
    Announce {
        title: String,
        body: String,
        color: Option<String>,
    },
}

const NO_REASON: &str = "No reason given";

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?([0-9a-fA-F]{6})$").expect("hex color pattern"));

/// Parse an optional `#rrggbb` string; anything else gets a random color.
pub fn parse_color(value: Option<&str>) -> u32 {
    if let Some(v) = value {
        if let Some(caps) = HEX_COLOR.captures(v.trim()) {
            if let Ok(color) = u32::from_str_radix(&caps[1], 16) {
                return color;
            }
        }
    }
    rand::thread_rng().gen_range(0..=0xFF_FF_FF)
}

pub struct CommandDispatcher {
    gateway: Arc<dyn ChatGateway>,
    moderation: Arc<ModerationService>,
    tickets: Arc<TicketRegistry>,
}

impl CommandDispatcher {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        moderation: Arc<ModerationService>,
        tickets: Arc<TicketRegistry>,
    ) -> Self {
        Self {
            gateway,
            moderation,
            tickets,
        }
    }

    pub fn tickets(&self) -> &Arc<TicketRegistry> {
        &self.tickets
    }

    pub async fn dispatch(
        &self,
        channel: ChannelId,
        actor: UserId,
        command: Command,
    ) -> anyhow::Result<()> {
        // Setup is the one unprivileged command: it only re-posts the
        // affordance message.
        if let Command::Setup = command {
            self.gateway
                .send_with_button(
                    channel,
                    "Need help? Click the button to open a support ticket.",
                    OPEN_BUTTON_ID,
                    "Open Ticket",
                )
                .await?;
            return Ok(());
        }

        if !self.moderation.actor_is_support(actor).await? {
            return self.gateway.send_private(actor, "Support role required.").await;
        }

        match command {
            Command::Setup => unreachable!("handled above"),
            Command::Ban { target, reason } => {
                let reason = reason.unwrap_or_else(|| NO_REASON.to_string());
                self.moderation.ban(target, &reason).await?;
                self.gateway
                    .send_private(actor, &format!("Banned <@{target}>\n> {reason}"))
                    .await
            }
            Command::Kick { target, reason } => {
                let reason = reason.unwrap_or_else(|| NO_REASON.to_string());
                self.moderation.kick(target, &reason).await?;
                self.gateway
                    .send_private(actor, &format!("Kicked <@{target}>\n> {reason}"))
                    .await
            }
            Command::Warn { target, reason } => {
                let reason = reason.unwrap_or_else(|| NO_REASON.to_string());
                let total = self.moderation.warn(actor, target, &reason).await?;
                self.gateway
                    .send_private(
                        actor,
                        &format!(
                            "Warned <@{target}> ({total}/{})\n> {reason}",
                            self.moderation.warn_limit()
                        ),
                    )
                    .await
            }
            Command::Mute { target, minutes } => {
                let minutes = self.moderation.mute(target, minutes).await?;
                self.gateway
                    .send_private(actor, &format!("Muted <@{target}> for {minutes} min."))
                    .await
            }
            Command::Unmute { target } => {
                if self.moderation.unmute(target).await? {
                    self.gateway
                        .send_private(actor, &format!("Unmuted <@{target}>."))
                        .await?;
                }
                Ok(())
            }
            Command::Announce { title, body, color } => {
                let color = parse_color(color.as_deref());
                self.gateway
                    .post_announcement(channel, &title, &body, color)
                    .await?;
                self.gateway.send_private(actor, "Announcement posted.").await
            }
        }
    }
}
