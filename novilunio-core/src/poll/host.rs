//! Seam to the chat platform that owns the live votes.

use async_trait::async_trait;

use super::PollError;
use super::engine;
use super::record::{PollId, PollRecord, PollStatus};
use super::report::{PollReport, PollTally};

/// Read-only access to membership and votes.
///
/// Implementations map their own failures to [`PollError::Host`].
#[async_trait]
pub trait PollHost: Send + Sync {
    /// Members allowed to vote (bots excluded).
    async fn eligible_voters(&self) -> Result<Vec<u64>, PollError>;

    /// Current answers and counts of the poll behind `record`.
    async fn tally(&self, record: &PollRecord) -> Result<PollTally, PollError>;

    /// Members who voted for at least one answer.
    async fn voters(&self, record: &PollRecord) -> Result<Vec<u64>, PollError>;
}

/// Fetch the tally and eligible count, then evaluate.
pub async fn build_report<H>(
    host: &H,
    id: PollId,
    record: &PollRecord,
) -> Result<PollReport, PollError>
where
    H: PollHost + ?Sized,
{
    if record.status == PollStatus::Deleted {
        return Err(PollError::PollDeleted(id));
    }
    let tally = host.tally(record).await?;
    let eligible = host.eligible_voters().await?;
    PollReport::evaluate(id, record, &tally, eligible.len() as u64)
}

/// Eligible members that have not voted yet, in membership order.
pub async fn pending_voters<H>(
    host: &H,
    id: PollId,
    record: &PollRecord,
) -> Result<Vec<u64>, PollError>
where
    H: PollHost + ?Sized,
{
    if record.status == PollStatus::Deleted {
        return Err(PollError::PollDeleted(id));
    }
    let eligible = host.eligible_voters().await?;
    let voters = host.voters(record).await?;
    Ok(engine::non_voters(&eligible, &voters))
}
