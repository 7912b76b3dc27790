//! Search-job lifecycle: Submitted -> Polling -> Finished | Cancelled.

use crate::{JobId, JobStatus, Listing, OracleConfig, OracleError, PriceJobClient};
use tracing::{debug, info};

/// Where a search job is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    /// Accepted by the service, status not yet checked.
    Submitted(JobId),
    /// Reported as still running after `polls` status checks.
    Polling { job: JobId, polls: u32 },
    Finished(JobId),
    Cancelled(JobId),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished(_) | JobState::Cancelled(_))
    }

    fn after_status(job: JobId, status: JobStatus, polls: u32) -> Self {
        match status {
            JobStatus::Finished => JobState::Finished(job),
            JobStatus::Cancelled => JobState::Cancelled(job),
            JobStatus::Working => JobState::Polling { job, polls },
        }
    }

    /// Advance by one status check.
    ///
    /// `Polling` waits one poll interval first and fails once the poll budget
    /// is spent. Terminal states are returned unchanged.
    pub async fn step<C: PriceJobClient + ?Sized>(
        self,
        client: &C,
        config: &OracleConfig,
    ) -> Result<JobState, OracleError> {
        match self {
            JobState::Submitted(job) => {
                let status = client.status(&job).await?;
                Ok(Self::after_status(job, status, 1))
            }
            JobState::Polling { job, polls } => {
                if polls >= config.max_polls {
                    return Err(OracleError::PollLimit { job, polls });
                }
                tokio::time::sleep(config.poll_interval()).await;
                let status = client.status(&job).await?;
                debug!(job = %job, polls, ?status, "polled price job");
                Ok(Self::after_status(job, status, polls + 1))
            }
            terminal => Ok(terminal),
        }
    }
}

/// Run a search job for `category` to completion and download its listings.
pub async fn fetch_listings<C: PriceJobClient + ?Sized>(
    client: &C,
    category: &str,
    config: &OracleConfig,
) -> Result<Vec<Listing>, OracleError> {
    let job = client.submit(category).await?;
    info!(category, job = %job, "submitted price job");
    let mut state = JobState::Submitted(job);
    while !state.is_terminal() {
        state = state.step(client, config).await?;
    }
    match state {
        JobState::Finished(job) => client.download(&job).await,
        JobState::Cancelled(job) => Err(OracleError::Cancelled(job)),
        JobState::Submitted(job) | JobState::Polling { job, .. } => Err(OracleError::Transport(
            format!("job {job} stopped before reaching a terminal state"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ListingTable;
    use std::collections::BTreeMap;

    fn cfg(max_polls: u32) -> OracleConfig {
        OracleConfig {
            poll_interval_ms: 1,
            max_polls,
            cache_capacity: 10,
        }
    }

    fn client(latency: u32) -> ListingTable {
        let mut listings = BTreeMap::new();
        listings.insert(
            "Mouthwash".to_string(),
            vec![Listing {
                min_price: 2.0,
                max_price: 4.0,
            }],
        );
        ListingTable::new(listings).with_latency(latency)
    }

    #[tokio::test]
    async fn submitted_goes_straight_to_finished() {
        let c = client(0);
        let job = c.submit("Mouthwash").await.unwrap();
        let next = JobState::Submitted(job.clone()).step(&c, &cfg(3)).await.unwrap();
        assert_eq!(next, JobState::Finished(job));
        assert!(next.is_terminal());
    }

    #[tokio::test]
    async fn polling_counts_status_checks() {
        let c = client(1);
        let job = c.submit("Mouthwash").await.unwrap();
        let s1 = JobState::Submitted(job.clone()).step(&c, &cfg(5)).await.unwrap();
        assert_eq!(
            s1,
            JobState::Polling {
                job: job.clone(),
                polls: 1
            }
        );
        let s2 = s1.step(&c, &cfg(5)).await.unwrap();
        assert_eq!(s2, JobState::Finished(job));
    }

    #[tokio::test]
    async fn poll_budget_is_enforced() {
        let c = client(10);
        let job = c.submit("Mouthwash").await.unwrap();
        let state = JobState::Polling { job, polls: 2 };
        assert!(matches!(
            state.step(&c, &cfg(2)).await,
            Err(OracleError::PollLimit { polls: 2, .. })
        ));
    }

    #[tokio::test]
    async fn terminal_states_are_fixed_points() {
        let c = client(0);
        let done = JobState::Cancelled(JobId("x".to_string()));
        assert_eq!(done.clone().step(&c, &cfg(1)).await.unwrap(), done);
    }

    #[tokio::test]
    async fn fetch_runs_whole_lifecycle() {
        let c = client(1);
        let listings = fetch_listings(&c, "Mouthwash", &cfg(3)).await.unwrap();
        assert_eq!(listings.len(), 1);
        let cancelled = client(0).cancelling("Mouthwash");
        assert!(matches!(
            fetch_listings(&cancelled, "Mouthwash", &cfg(3)).await,
            Err(OracleError::Cancelled(_))
        ));
    }
}
