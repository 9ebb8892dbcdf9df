//! Typed access to resolved slash-command options and platform ids.

use std::num::NonZeroU64;

use serenity::model::application::{ResolvedOption, ResolvedValue};
use serenity::model::id::{ChannelId, MessageId, RoleId};

use novilunio_core::{PlatformRef, PollError};

fn find<'a>(options: &'a [ResolvedOption<'a>], name: &str) -> Option<&'a ResolvedValue<'a>> {
    options
        .iter()
        .find(|option| option.name == name)
        .map(|option| &option.value)
}

pub(super) fn string<'a>(options: &'a [ResolvedOption<'a>], name: &str) -> Option<&'a str> {
    match find(options, name) {
        Some(ResolvedValue::String(value)) => Some(*value),
        _ => None,
    }
}

pub(super) fn integer(options: &[ResolvedOption<'_>], name: &str) -> Option<i64> {
    match find(options, name) {
        Some(ResolvedValue::Integer(value)) => Some(*value),
        _ => None,
    }
}

pub(super) fn boolean(options: &[ResolvedOption<'_>], name: &str) -> Option<bool> {
    match find(options, name) {
        Some(ResolvedValue::Boolean(value)) => Some(*value),
        _ => None,
    }
}

pub(super) fn channel(options: &[ResolvedOption<'_>], name: &str) -> Option<ChannelId> {
    match find(options, name) {
        Some(ResolvedValue::Channel(channel)) => Some(channel.id),
        _ => None,
    }
}

pub(super) fn role(options: &[ResolvedOption<'_>], name: &str) -> Option<RoleId> {
    match find(options, name) {
        Some(ResolvedValue::Role(role)) => Some(role.id),
        _ => None,
    }
}

/// Poll ids are positive integers; anything else is "no such poll".
pub(super) fn poll_id(options: &[ResolvedOption<'_>], name: &str) -> Result<u64, PollError> {
    let raw = integer(options, name).unwrap_or(0);
    u64::try_from(raw).map_err(|_| PollError::NotFound(0))
}

/// The first subcommand and its own options.
pub(super) fn subcommand<'a>(
    options: &'a [ResolvedOption<'a>],
) -> Option<(&'a str, &'a [ResolvedOption<'a>])> {
    options.iter().find_map(|option| match &option.value {
        ResolvedValue::SubCommand(inner) => Some((option.name, inner.as_slice())),
        _ => None,
    })
}

pub(super) fn channel_id(raw: u64) -> Option<ChannelId> {
    NonZeroU64::new(raw).map(ChannelId::from)
}

pub(super) fn role_id(raw: u64) -> Option<RoleId> {
    NonZeroU64::new(raw).map(RoleId::from)
}

/// Channel and message ids of a stored reference; zero means the record is
/// broken.
pub(super) fn channel_ref(reference: PlatformRef) -> Result<ChannelId, PollError> {
    channel_id(reference.get())
        .ok_or_else(|| PollError::Host(format!("invalid channel id {reference}")))
}

pub(super) fn message_ref(reference: PlatformRef) -> Result<MessageId, PollError> {
    NonZeroU64::new(reference.get())
        .map(MessageId::from)
        .ok_or_else(|| PollError::Host(format!("invalid message id {reference}")))
}
