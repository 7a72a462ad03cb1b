//! Fan-out of domain events to the collaborator gateways. Delivery is
//! best-effort: a failing gateway is logged and the event dropped, never
//! surfaced back to the engine or retried against its state.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::lifecycle::events::{LadderEvent, PlayerRef};

/// What kind of state changed; rendering the new state is the gateway's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Users,
    Challenges,
    Matches,
}

pub trait BroadcastGateway: Send + Sync {
    fn notify_state_changed(&self, topic: Topic) -> Result<()>;
}

pub trait NotificationGateway: Send + Sync {
    fn notify_email(
        &self,
        recipient: &str,
        challenger_name: &str,
        deadline: DateTime<Utc>,
    ) -> Result<()>;

    fn notify_chat(&self, message: &str) -> Result<()>;
}

/// Gateways that only log. Stand-ins for a real channel layer / mailer.
pub struct LogBroadcastGateway;

impl BroadcastGateway for LogBroadcastGateway {
    fn notify_state_changed(&self, topic: Topic) -> Result<()> {
        info!("broadcast: {topic:?} changed");
        Ok(())
    }
}

pub struct LogNotificationGateway;

impl NotificationGateway for LogNotificationGateway {
    fn notify_email(
        &self,
        recipient: &str,
        challenger_name: &str,
        deadline: DateTime<Utc>,
    ) -> Result<()> {
        info!("email to {recipient}: challenged by {challenger_name}, play by {deadline}");
        Ok(())
    }

    fn notify_chat(&self, message: &str) -> Result<()> {
        info!("chat: {message}");
        Ok(())
    }
}

pub struct Dispatcher {
    ladder_name: String,
    broadcast: Arc<dyn BroadcastGateway>,
    notifications: Arc<dyn NotificationGateway>,
}

impl Dispatcher {
    pub fn new(
        ladder_name: String,
        broadcast: Arc<dyn BroadcastGateway>,
        notifications: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self { ladder_name, broadcast, notifications }
    }

    /// Consume a channel of events until the senders hang up. Runs as a
    /// background task so gateway latency never blocks an engine operation.
    pub async fn run(self: Arc<Self>, mut rx: UnboundedReceiver<LadderEvent>) {
        while let Some(event) = rx.recv().await {
            self.deliver(&event);
        }
    }

    pub fn deliver_all(&self, events: &[LadderEvent]) {
        for event in events {
            self.deliver(event);
        }
    }

    pub fn deliver(&self, event: &LadderEvent) {
        match serde_json::to_string(event) {
            Ok(line) => debug!("event {line}"),
            Err(e) => warn!("unserializable event: {e}"),
        }

        match event {
            LadderEvent::ChallengeCreated { challenger, opponent, deadline, .. } => {
                self.broadcast_topic(Topic::Challenges);
                self.send_challenge_notifications(challenger, opponent, *deadline);
            }
            LadderEvent::DeadlineExtended { .. } => {
                // Broadcast only: the challenge notification is sent once,
                // at creation, never again for an extension.
                self.broadcast_topic(Topic::Challenges);
            }
            LadderEvent::MatchDeclined { .. } => {
                self.broadcast_topic(Topic::Challenges);
            }
            LadderEvent::MatchAdjudicated { winner, loser, fouled, forfeited, .. } => {
                self.broadcast_topic(Topic::Matches);
                self.broadcast_topic(Topic::Users);
                if *fouled {
                    self.chat(&format!(
                        "{} was balled and drops to the bottom of the {}",
                        mention(loser),
                        self.ladder_name
                    ));
                }
                let suffix = if *forfeited { " by forfeit" } else { "" };
                self.chat(&format!("{} has beaten {}{}", mention(winner), mention(loser), suffix));
            }
            LadderEvent::PlayerJoined { .. } => {
                self.broadcast_topic(Topic::Users);
            }
        }
    }

    fn send_challenge_notifications(
        &self,
        challenger: &PlayerRef,
        opponent: &PlayerRef,
        deadline: DateTime<Utc>,
    ) {
        if let Some(email) = &opponent.email {
            if let Err(e) = self.notifications.notify_email(email, &challenger.name, deadline) {
                warn!("email notification failed, dropping: {e:#}");
            }
        }

        self.chat(&format!(
            "{} You have been challenged to a {} match by {}.\n\
             You need to play the match by {} or you will forfeit",
            mention(opponent),
            self.ladder_name,
            mention(challenger),
            deadline.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    fn broadcast_topic(&self, topic: Topic) {
        if let Err(e) = self.broadcast.notify_state_changed(topic) {
            warn!("broadcast of {topic:?} failed, dropping: {e:#}");
        }
    }

    fn chat(&self, message: &str) {
        if let Err(e) = self.notifications.notify_chat(message) {
            warn!("chat notification failed, dropping: {e:#}");
        }
    }
}

fn mention(player: &PlayerRef) -> String {
    match &player.chat_handle {
        Some(handle) => format!("<@{handle}>"),
        None => player.name.clone(),
    }
}
