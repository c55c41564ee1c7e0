//! Sanctions and temporary restrictions
//!
//! `RestrictionScheduler` owns the mute role lifecycle: grant now, revoke
//! after a delay. Each restriction gets an id recorded as the subject's
//! active one; the delayed task only revokes if its id is still current, so
//! a manual unmute (or a newer restriction) turns a pending revocation into
//! a provable no-op instead of a double removal.

use crate::gateway::ChatGateway;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use warden_common::{InfractionLedger, Result, RoleId, UserId};

/// Fallback duration for a manual mute with no explicit duration.
pub const DEFAULT_MUTE_MINUTES: u64 = 10;

pub struct RestrictionScheduler {
    gateway: Arc<dyn ChatGateway>,
    mute_role: String,
    active: Mutex<HashMap<UserId, u64>>,
    next_id: AtomicU64,
}

impl RestrictionScheduler {
    pub fn new(gateway: Arc<dyn ChatGateway>, mute_role: &str) -> Self {
        Self {
            gateway,
            mute_role: mute_role.to_string(),
            active: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Find the mute role, creating it (with send/speak denied everywhere)
    /// the first time it is needed.
    async fn ensure_mute_role(&self) -> anyhow::Result<RoleId> {
        if let Some(role) = self.gateway.find_role(&self.mute_role).await? {
            return Ok(role);
        }
        let role = self.gateway.create_role(&self.mute_role).await?;
        self.gateway.deny_role_everywhere(role).await?;
        info!("created mute role '{}' ({role})", self.mute_role);
        Ok(role)
    }

    /// Grant the mute role to `subject` and schedule its removal after
    /// `minutes`. A newer restriction or a manual lift supersedes the
    /// pending revocation.
    pub async fn restrict(self: &Arc<Self>, subject: UserId, minutes: u64) -> anyhow::Result<()> {
        let role = self.ensure_mute_role().await?;
        self.gateway.add_role(subject, role).await?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.active.lock().await.insert(subject, id);
        info!("{subject} restricted for {minutes} minute(s)");

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
            if let Err(e) = scheduler.expire(subject, id, role).await {
                warn!("delayed unmute for {subject} failed: {e:#}");
            }
        });

        Ok(())
    }

    /// Revocation path taken when a restriction's delay elapses. Does nothing
    /// unless this restriction is still the subject's active one and the
    /// role is still held.
    async fn expire(&self, subject: UserId, id: u64, role: RoleId) -> anyhow::Result<()> {
        {
            let mut active = self.active.lock().await;
            match active.get(&subject) {
                Some(current) if *current == id => {
                    active.remove(&subject);
                }
                _ => return Ok(()),
            }
        }

        if self.gateway.member_has_role(subject, role).await? {
            self.gateway.remove_role(subject, role).await?;
            info!("restriction on {subject} expired");
        }
        Ok(())
    }

    /// Manual unmute: deactivate any pending revocation and remove the role
    /// if held. Returns whether a role was actually removed.
    pub async fn lift(&self, subject: UserId) -> anyhow::Result<bool> {
        self.active.lock().await.remove(&subject);

        if let Some(role) = self.gateway.find_role(&self.mute_role).await? {
            if self.gateway.member_has_role(subject, role).await? {
                self.gateway.remove_role(subject, role).await?;
                info!("{subject} manually unmuted");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Moderator-facing sanctions: warn with escalation, ban, kick, mute, unmute.
pub struct ModerationService {
    gateway: Arc<dyn ChatGateway>,
    ledger: Arc<InfractionLedger>,
    scheduler: Arc<RestrictionScheduler>,
    support_role: String,
    warn_limit: usize,
    escalation_mute_minutes: u64,
}

impl ModerationService {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        ledger: Arc<InfractionLedger>,
        scheduler: Arc<RestrictionScheduler>,
        support_role: &str,
        warn_limit: usize,
        escalation_mute_minutes: u64,
    ) -> Self {
        Self {
            gateway,
            ledger,
            scheduler,
            support_role: support_role.to_string(),
            warn_limit,
            escalation_mute_minutes,
        }
    }

    pub fn warn_limit(&self) -> usize {
        self.warn_limit
    }

    /// Whether the actor holds the support role.
    pub async fn actor_is_support(&self, actor: UserId) -> anyhow::Result<bool> {
        match self.gateway.find_role(&self.support_role).await? {
            Some(role) => self.gateway.member_has_role(actor, role).await,
            None => Ok(false),
        }
    }

    /// Append an infraction and escalate to a temporary restriction whenever
    /// the cumulative count has reached the limit. Escalation fires on every
    /// warn from the threshold onward, not only on the first crossing.
    pub async fn warn(&self, issuer: UserId, target: UserId, reason: &str) -> Result<usize> {
        let total = self.ledger.add_infraction(target, issuer, reason).await?;
        if total >= self.warn_limit {
            self.scheduler
                .restrict(target, self.escalation_mute_minutes)
                .await?;
        }
        Ok(total)
    }

    pub async fn ban(&self, target: UserId, reason: &str) -> anyhow::Result<()> {
        self.gateway.ban(target, reason).await?;
        info!("{target} banned: {reason}");
        Ok(())
    }

    pub async fn kick(&self, target: UserId, reason: &str) -> anyhow::Result<()> {
        self.gateway.kick(target, reason).await?;
        info!("{target} kicked: {reason}");
        Ok(())
    }

    pub async fn mute(&self, target: UserId, minutes: Option<u64>) -> anyhow::Result<u64> {
        let minutes = minutes.unwrap_or(DEFAULT_MUTE_MINUTES);
        self.scheduler.restrict(target, minutes).await?;
        Ok(minutes)
    }

    pub async fn unmute(&self, target: UserId) -> anyhow::Result<bool> {
        self.scheduler.lift(target).await
    }
}
