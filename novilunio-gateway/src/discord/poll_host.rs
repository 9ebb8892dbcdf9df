use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serenity::http::Http;
use serenity::model::id::{AnswerId, ChannelId, GuildId, MessageId, UserId};
use tracing::debug;

use novilunio_core::poll::OptionTally;
use novilunio_core::{PollError, PollHost, PollRecord, PollTally};

use super::options::{channel_ref, message_ref};

const MEMBERS_PAGE: u64 = 1000;
const VOTERS_PAGE: u8 = 100;

/// Live poll data read from one guild.
pub struct DiscordPollHost {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl DiscordPollHost {
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }

    async fn answer_voters(
        &self,
        channel: ChannelId,
        message: MessageId,
        answer: AnswerId,
    ) -> Result<Vec<u64>, PollError> {
        let mut voters = Vec::new();
        let mut after: Option<UserId> = None;
        loop {
            let page = self
                .http
                .get_poll_answer_voters(channel, message, answer, after, Some(VOTERS_PAGE))
                .await
                .map_err(host_error)?;
            let full = page.len() == usize::from(VOTERS_PAGE);
            after = page.last().map(|user| user.id);
            voters.extend(page.into_iter().map(|user| user.id.get()));
            if !full {
                return Ok(voters);
            }
        }
    }
}

fn host_error(e: serenity::Error) -> PollError {
    PollError::Host(e.to_string())
}

#[async_trait]
impl PollHost for DiscordPollHost {
    async fn eligible_voters(&self) -> Result<Vec<u64>, PollError> {
        let mut eligible = Vec::new();
        let mut after: Option<UserId> = None;
        loop {
            let page = self
                .guild_id
                .members(&self.http, Some(MEMBERS_PAGE), after)
                .await
                .map_err(host_error)?;
            let full = page.len() as u64 == MEMBERS_PAGE;
            after = page.last().map(|member| member.user.id);
            eligible.extend(
                page.iter()
                    .filter(|member| !member.user.bot)
                    .map(|member| member.user.id.get()),
            );
            if !full {
                break;
            }
        }
        debug!(guild = %self.guild_id, eligible = eligible.len(), "fetched guild members");
        Ok(eligible)
    }

    async fn tally(&self, record: &PollRecord) -> Result<PollTally, PollError> {
        let channel = channel_ref(record.channel)?;
        let message = channel
            .message(&self.http, message_ref(record.message)?)
            .await
            .map_err(host_error)?;
        let poll = message
            .poll
            .ok_or_else(|| PollError::Host(format!("message {} carries no poll", message.id)))?;

        let counts = poll
            .results
            .map(|results| results.answer_counts)
            .unwrap_or_default();
        let options = poll
            .answers
            .into_iter()
            .map(|answer| OptionTally {
                votes: counts
                    .iter()
                    .find(|count| count.id == answer.answer_id)
                    .map_or(0, |count| count.count),
                text: answer.poll_media.text.unwrap_or_default(),
            })
            .collect();

        Ok(PollTally::from_options(
            poll.question.text.unwrap_or_default(),
            options,
        ))
    }

    async fn voters(&self, record: &PollRecord) -> Result<Vec<u64>, PollError> {
        let channel = channel_ref(record.channel)?;
        let message_id = message_ref(record.message)?;
        let message = channel
            .message(&self.http, message_id)
            .await
            .map_err(host_error)?;
        let answers = message
            .poll
            .map(|poll| poll.answers)
            .unwrap_or_default()
            .into_iter()
            .map(|answer| answer.answer_id)
            .collect::<Vec<_>>();

        let per_answer = try_join_all(
            answers
                .into_iter()
                .map(|answer| self.answer_voters(channel, message_id, answer)),
        )
        .await?;
        Ok(per_answer.into_iter().flatten().collect())
    }
}
