//! Automatic moderation of inbound messages
//!
//! Runs the content policy filter over every non-bot message. On a
//! violation: delete the message, append a system-attributed infraction,
//! surface a short-lived warning with the subject's cumulative count, and
//! escalate to a temporary restriction once the count reaches the limit.

use crate::gateway::ChatGateway;
use crate::moderation::RestrictionScheduler;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use warden_common::{
    ChannelId, ContentPolicyFilter, InfractionLedger, MessageId, Result, UserId, Verdict,
};

pub struct Automod {
    gateway: Arc<dyn ChatGateway>,
    filter: Mutex<ContentPolicyFilter>,
    ledger: Arc<InfractionLedger>,
    scheduler: Arc<RestrictionScheduler>,
    /// Issuer recorded on automatic infractions: the bot's own user id.
    system_issuer: UserId,
    warn_limit: usize,
    escalation_mute_minutes: u64,
}

impl Automod {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        filter: ContentPolicyFilter,
        ledger: Arc<InfractionLedger>,
        scheduler: Arc<RestrictionScheduler>,
        system_issuer: UserId,
        warn_limit: usize,
        escalation_mute_minutes: u64,
    ) -> Self {
        Self {
            gateway,
            filter: Mutex::new(filter),
            ledger,
            scheduler,
            system_issuer,
            warn_limit,
            escalation_mute_minutes,
        }
    }

    /// Evaluate one inbound message and apply the violation side effects.
    /// Returns the verdict so callers can observe what happened.
    pub async fn handle_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        author: UserId,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Verdict> {
        let verdict = {
            let mut filter = self.filter.lock().await;
            filter.evaluate(author, content, timestamp)
        };

        let reason = match verdict {
            Verdict::Allow => return Ok(Verdict::Allow),
            Verdict::ProhibitedTerm => "Prohibited language",
            Verdict::SpamBurst => "Spam",
        };

        self.gateway.delete_message(channel, message).await?;
        let total = self
            .ledger
            .add_infraction(author, self.system_issuer, reason)
            .await?;
        self.gateway
            .send_notice(
                channel,
                &format!("<@{author}> {reason}. Warning {total}/{}", self.warn_limit),
            )
            .await?;
        info!("{author} violated policy ({reason}), warning {total}/{}", self.warn_limit);

        if total >= self.warn_limit {
            self.scheduler
                .restrict(author, self.escalation_mute_minutes)
                .await?;
        }

        Ok(verdict)
    }
}
