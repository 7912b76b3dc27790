//! In-process price job service answering from a configured listing table.

use crate::{JobId, JobStatus, Listing, OracleError, PriceJobClient};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
struct TableJob {
    category: String,
    checks: u32,
}

/// Job service backed by a category -> listings table.
///
/// Unknown categories finish with no listings. `latency` is the number of
/// status checks a job answers `Working` before it finishes.
#[derive(Debug, Default)]
pub struct ListingTable {
    listings: BTreeMap<String, Vec<Listing>>,
    latency: u32,
    cancelled: BTreeSet<String>,
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, TableJob>>,
}

impl ListingTable {
    pub fn new(listings: BTreeMap<String, Vec<Listing>>) -> Self {
        Self {
            listings,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: u32) -> Self {
        self.latency = latency;
        self
    }

    /// Jobs for `category` report `Cancelled` instead of finishing.
    pub fn cancelling(mut self, category: &str) -> Self {
        self.cancelled.insert(category.to_string());
        self
    }

    /// Number of jobs submitted so far.
    pub fn submitted(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    fn unknown(job: &JobId) -> OracleError {
        OracleError::Transport(format!("unknown job {job}"))
    }
}

#[async_trait]
impl PriceJobClient for ListingTable {
    async fn submit(&self, category: &str) -> Result<JobId, OracleError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let job = JobId(format!("job-{n}"));
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| OracleError::Transport("job table poisoned".to_string()))?;
        jobs.insert(
            job.clone(),
            TableJob {
                category: category.to_string(),
                checks: 0,
            },
        );
        Ok(job)
    }

    async fn status(&self, job: &JobId) -> Result<JobStatus, OracleError> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| OracleError::Transport("job table poisoned".to_string()))?;
        let entry = jobs.get_mut(job).ok_or_else(|| Self::unknown(job))?;
        entry.checks += 1;
        if entry.checks <= self.latency {
            Ok(JobStatus::Working)
        } else if self.cancelled.contains(&entry.category) {
            jobs.remove(job);
            Ok(JobStatus::Cancelled)
        } else {
            Ok(JobStatus::Finished)
        }
    }

    async fn download(&self, job: &JobId) -> Result<Vec<Listing>, OracleError> {
        let category = {
            let mut jobs = self
                .jobs
                .lock()
                .map_err(|_| OracleError::Transport("job table poisoned".to_string()))?;
            // a finished job is downloaded once
            jobs.remove(job)
                .map(|j| j.category)
                .ok_or_else(|| Self::unknown(job))?
        };
        Ok(self.listings.get(&category).cloned().unwrap_or_default())
    }
}
