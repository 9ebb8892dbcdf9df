mod options;
mod poll_host;
mod powl;
mod roblin;
mod send;

use serenity::model::application::CommandInteraction;
use serenity::prelude::*;
use tracing::{error, info, warn};

use novilunio_core::{PollError, StoreError};
use novilunio_watch::WatchError;

use crate::messages;

pub use poll_host::DiscordPollHost;
pub use powl::PowlBot;
pub use roblin::{DiscordAnnouncer, DiscordWatcher, RoblinBot, SettingsTargets, SharedWatchSettings};

/// Build a serenity client for `handler`.
pub async fn build_client<H>(
    token: &str,
    intents: GatewayIntents,
    handler: H,
) -> Result<Client, DiscordError>
where
    H: EventHandler + 'static,
{
    info!("Starting Discord bot...");
    Client::builder(token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| DiscordError::ClientError(e.to_string()))
}

/// Discord-related errors
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("Failed to create Discord client: {0}")]
    ClientError(String),
}

/// Failure of a slash-command handler.
#[derive(Debug, thiserror::Error)]
pub(crate) enum HandlerError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("Discord API error: {0}")]
    Discord(#[from] serenity::Error),
}

impl HandlerError {
    /// Text for errors the user can act on; `None` means "log and apologise".
    fn user_message(&self) -> Option<String> {
        match self {
            Self::Poll(PollError::InvalidConfiguration(reason)) => {
                Some(messages::invalid_poll(reason))
            }
            Self::Poll(PollError::NotFound(id)) => Some(messages::history_missing(*id)),
            Self::Poll(PollError::PollDeleted(id)) => Some(messages::poll_deleted(*id)),
            Self::Poll(PollError::InvalidTransition { from, .. }) => Some(format!(
                "Operazione non consentita: la votazione è {}.",
                from.label()
            )),
            _ => None,
        }
    }
}

/// Defer, run `handler`, then deliver its reply (or an error text) ephemerally.
pub(crate) async fn respond<F>(ctx: &Context, command: &CommandInteraction, handler: F)
where
    F: std::future::Future<Output = Result<String, HandlerError>>,
{
    if let Err(e) = command.defer_ephemeral(&ctx.http).await {
        warn!(command = %command.data.name, error = %e, "failed to defer interaction");
        return;
    }

    let reply = match handler.await {
        Ok(reply) => reply,
        Err(e) => match e.user_message() {
            Some(text) => {
                info!(command = %command.data.name, error = %e, "command rejected");
                text
            }
            None => {
                error!(command = %command.data.name, error = %e, "command failed");
                messages::GENERIC_ERROR.to_string()
            }
        },
    };

    if let Err(e) = send::reply_chunks(ctx, command, &reply).await {
        warn!(command = %command.data.name, error = %e, "failed to deliver reply");
    }
}
