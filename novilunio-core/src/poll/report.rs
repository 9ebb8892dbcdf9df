//! Verdicts for a poll given the live tally from the chat platform.

use super::PollError;
use super::engine;
use super::record::{PollId, PollRecord, PollStatus};

/// Votes collected by one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTally {
    pub text: String,
    pub votes: u64,
}

/// Live state of a poll as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollTally {
    pub question: String,
    pub options: Vec<OptionTally>,
    pub total_votes: u64,
}

impl PollTally {
    /// Build a tally whose total is the sum of the per-answer counts.
    pub fn from_options(question: impl Into<String>, options: Vec<OptionTally>) -> Self {
        let total_votes = options.iter().map(|o| o.votes).sum();
        Self {
            question: question.into(),
            options,
            total_votes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionVerdict {
    pub text: String,
    pub votes: u64,
    pub majority: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub id: PollId,
    pub question: String,
    pub status: PollStatus,
    /// Answers in poll order.
    pub options: Vec<OptionVerdict>,
    pub total_votes: u64,
    pub eligible: u64,
    pub majority_threshold: u8,
    pub quorum_threshold: u8,
    pub quorum_reached: bool,
}

impl PollReport {
    /// Evaluate majority per answer and the quorum. Deleted polls have no
    /// report.
    pub fn evaluate(
        id: PollId,
        record: &PollRecord,
        tally: &PollTally,
        eligible: u64,
    ) -> Result<Self, PollError> {
        if record.status == PollStatus::Deleted {
            return Err(PollError::PollDeleted(id));
        }

        let options = tally
            .options
            .iter()
            .map(|option| OptionVerdict {
                text: option.text.clone(),
                votes: option.votes,
                majority: engine::evaluate_option(option.votes, tally.total_votes, record.majority),
            })
            .collect();

        Ok(Self {
            id,
            question: tally.question.clone(),
            status: record.status,
            options,
            total_votes: tally.total_votes,
            eligible,
            majority_threshold: record.majority,
            quorum_threshold: record.quorum,
            quorum_reached: engine::evaluate_quorum(tally.total_votes, eligible, record.quorum),
        })
    }

    /// Answers by votes, highest first; ties keep poll order.
    pub fn ranked(&self) -> Vec<&OptionVerdict> {
        let mut ranked: Vec<&OptionVerdict> = self.options.iter().collect();
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
        ranked
    }
}
