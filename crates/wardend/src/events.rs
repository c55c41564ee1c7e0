//! Inbound gateway events and routing
//!
//! The connector POSTs one JSON event per platform occurrence; `EventRouter`
//! fans each out to the owning service. Handling is best-effort: a failed
//! event is logged by the server layer and the daemon keeps running.

use crate::automod::Automod;
use crate::commands::{Command, CommandDispatcher};
use crate::gateway::ChatGateway;
use crate::tickets::{TicketRegistry, CLOSE_BUTTON_ID, OPEN_BUTTON_ID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use warden_common::{ChannelId, MessageId, UserId, WardenError};

/// One platform event as delivered by the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    MessageCreated {
        channel: ChannelId,
        message: MessageId,
        author: UserId,
        #[serde(default)]
        author_is_bot: bool,
        content: String,
        timestamp: DateTime<Utc>,
    },
    MemberJoined {
        user: UserId,
        display_name: String,
    },
    ButtonPressed {
        channel: ChannelId,
        user: UserId,
        custom_id: String,
    },
    CommandInvoked {
        channel: ChannelId,
        actor: UserId,
        command: Command,
    },
}

pub struct EventRouter {
    gateway: Arc<dyn ChatGateway>,
    automod: Arc<Automod>,
    tickets: Arc<TicketRegistry>,
    dispatcher: Arc<CommandDispatcher>,
    welcome_channel: String,
}

impl EventRouter {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        automod: Arc<Automod>,
        tickets: Arc<TicketRegistry>,
        dispatcher: Arc<CommandDispatcher>,
        welcome_channel: &str,
    ) -> Self {
        Self {
            gateway,
            automod,
            tickets,
            dispatcher,
            welcome_channel: welcome_channel.to_string(),
        }
    }

    pub async fn handle(&self, event: GatewayEvent) -> anyhow::Result<()> {
        match event {
            GatewayEvent::MessageCreated {
                channel,
                message,
                author,
                author_is_bot,
                content,
                timestamp,
            } => {
                if author_is_bot {
                    return Ok(());
                }
                self.automod
                    .handle_message(channel, message, author, &content, timestamp)
                    .await?;
                Ok(())
            }
            GatewayEvent::MemberJoined { user, display_name } => {
                if let Some(channel) =
                    self.gateway.find_text_channel(&self.welcome_channel).await?
                {
                    self.gateway
                        .send_message(channel, &format!("Welcome {display_name} (<@{user}>)!"))
                        .await?;
                }
                Ok(())
            }
            GatewayEvent::ButtonPressed {
                channel,
                user,
                custom_id,
            } => match custom_id.as_str() {
                OPEN_BUTTON_ID => match self.tickets.open_ticket(user).await {
                    Ok(_) => Ok(()),
                    Err(WardenError::TicketAlreadyOpen) => {
                        self.gateway
                            .send_private(user, "You already have an open ticket.")
                            .await
                    }
                    Err(e) => Err(e.into()),
                },
                CLOSE_BUTTON_ID => match self.tickets.close_ticket(user, channel).await {
                    Ok(()) => Ok(()),
                    Err(WardenError::NotAuthorized) => {
                        self.gateway
                            .send_private(user, "Only support members can close tickets.")
                            .await
                    }
                    Err(e) => Err(e.into()),
                },
                other => {
                    debug!("ignoring unknown button '{other}'");
                    Ok(())
                }
            },
            GatewayEvent::CommandInvoked {
                channel,
                actor,
                command,
            } => self.dispatcher.dispatch(channel, actor, command).await,
        }
    }
}
