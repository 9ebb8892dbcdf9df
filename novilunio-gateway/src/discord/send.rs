use serenity::builder::{
    CreateInteractionResponseFollowup, CreateMessage, EditInteractionResponse,
};
use serenity::http::Http;
use serenity::model::application::CommandInteraction;
use serenity::model::channel::Message;
use serenity::model::id::ChannelId;
use serenity::prelude::*;

use novilunio_core::display::{self, MESSAGE_LIMIT};

/// Fill the deferred response with `content`, spilling extra chunks into
/// ephemeral follow-ups.
pub(super) async fn reply_chunks(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
) -> serenity::Result<()> {
    let mut chunks = display::split_message(content, MESSAGE_LIMIT).into_iter();
    let first = chunks.next().unwrap_or_default();
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(first))
        .await?;
    for chunk in chunks {
        command
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .content(chunk)
                    .ephemeral(true),
            )
            .await?;
    }
    Ok(())
}

/// Post each of `messages` to a channel, in order. Every message must
/// already fit the chat limit.
pub(super) async fn say_all(
    http: &Http,
    channel_id: ChannelId,
    messages: &[String],
) -> serenity::Result<Vec<Message>> {
    let mut sent = Vec::new();
    for content in messages {
        sent.push(
            channel_id
                .send_message(http, CreateMessage::new().content(content))
                .await?,
        );
    }
    Ok(sent)
}
