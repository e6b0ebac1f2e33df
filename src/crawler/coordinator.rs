//! Crawl engine
//!
//! The `TreeNodeProcessor` drives the crawl one fragment at a time: it asks
//! the scheduler for the next fragment, fetches it, stores the relations and
//! members it finds, and hands out members one by one. The engine is not
//! meant for concurrent callers; wrap it in a single consumer.
//!
//! The last supplied member is only marked processed in the store at the
//! start of the next pull or on close. A crash in between can deliver that
//! one member again, so delivery across crashes is at-least-once.

use crate::crawler::fetcher::{LdesMetaData, TreeNodeFetcher};
use crate::crawler::scheduler::Scheduler;
use crate::output::CrawlStatistics;
use crate::storage::{FragmentRecord, MemberRecord, StatePersistence};
use crate::Result;
use chrono::{DateTime, Utc};
use oxrdf::Graph;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// A member handed to the caller
#[derive(Debug, Clone)]
pub struct SuppliedMember {
    pub id: String,
    pub model: Graph,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct StopState {
    running: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation for a running crawl
///
/// Stopping takes effect between fragment visits; an in-flight fetch is
/// allowed to complete. A pending revisit wait is cut short.
#[derive(Debug, Clone)]
pub struct StopHandle {
    state: Arc<StopState>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(StopState {
                running: AtomicBool::new(true),
                notify: Notify::new(),
            }),
        }
    }

    pub fn stop(&self) {
        if self.state.running.swap(false, Ordering::SeqCst) {
            tracing::info!("Stop requested");
        }
        self.state.notify.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    pub(crate) fn notified(&self) -> Notified<'_> {
        self.state.notify.notified()
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

enum Visit {
    Visited,
    Stopped,
    Exhausted,
}

/// Drives the crawl and supplies each member once
pub struct TreeNodeProcessor {
    metadata: LdesMetaData,
    persistence: Arc<StatePersistence>,
    fetcher: TreeNodeFetcher,
    scheduler: Scheduler,
    stop: StopHandle,
    keep_state: bool,
    pending: Option<MemberRecord>,
    statistics: CrawlStatistics,
    closed: bool,
}

impl TreeNodeProcessor {
    /// Creates the engine and seeds the starting URLs that are not yet known
    pub fn new(
        metadata: LdesMetaData,
        persistence: Arc<StatePersistence>,
        fetcher: TreeNodeFetcher,
        keep_state: bool,
    ) -> Result<Self> {
        seed_starting_urls(&metadata, &persistence)?;

        let stop = StopHandle::new();
        Ok(Self {
            metadata,
            persistence,
            fetcher,
            scheduler: Scheduler::new(stop.clone()),
            stop,
            keep_state,
            pending: None,
            statistics: CrawlStatistics::new(),
            closed: false,
        })
    }

    /// Returns the next unsupplied member, crawling as far as needed
    ///
    /// Returns `Ok(None)` at the end of the stream or after a stop request.
    pub async fn next_member(&mut self) -> Result<Option<SuppliedMember>> {
        self.flush_pending()?;

        loop {
            let next = self.persistence.members()?.next_unprocessed()?;
            if let Some(mut record) = next {
                let member = record.supply();
                self.pending = Some(record);
                self.statistics.members_supplied += 1;
                tracing::trace!("Supplying member {}", member.id);
                return Ok(Some(member));
            }

            if !self.stop.is_running() {
                tracing::info!("Crawl stopped");
                return Ok(None);
            }

            match self.visit_one_fragment().await? {
                Visit::Visited | Visit::Stopped => {}
                Visit::Exhausted => {
                    tracing::info!("End of stream reached, no fragments left to visit");
                    return Ok(None);
                }
            }
        }
    }

    async fn visit_one_fragment(&mut self) -> Result<Visit> {
        let next = {
            let fragments = self.persistence.fragments()?;
            self.scheduler.next_fragment(&**fragments)?
        };
        let Some(mut record) = next else {
            return Ok(Visit::Exhausted);
        };

        if !self.scheduler.wait_until_ready(&record).await {
            return Ok(Visit::Stopped);
        }

        tracing::debug!("Visiting {} ({})", record.url, record.status);
        let request = self.metadata.create_request(&record.url);
        let response = self.fetcher.fetch_tree_node(&request).await?;
        self.statistics.fragments_fetched += 1;

        record.update_status(&response.mutability);
        {
            let mut fragments = self.persistence.fragments()?;
            fragments.save(&record)?;
            for relation in &response.relations {
                if !fragments.exists_by_url(relation)? {
                    fragments.save(&FragmentRecord::new(relation.as_str()))?;
                    self.statistics.relations_discovered += 1;
                }
            }
        }

        let mut discovered = Vec::with_capacity(response.members.len());
        {
            let mut members = self.persistence.members()?;
            for member in response.members {
                if members.is_processed(&member.id)? {
                    tracing::trace!("Skipping already supplied member {}", member.id);
                    self.statistics.duplicates_skipped += 1;
                    continue;
                }
                discovered.push(MemberRecord::new(member.id, member.model, member.created_at));
            }
            members.save_all(&discovered)?;
        }
        self.statistics.members_discovered += discovered.len() as u64;

        tracing::debug!(
            "Visited {}: {} relations, {} new members, next status {}",
            record.url,
            response.relations.len(),
            discovered.len(),
            record.status
        );
        Ok(Visit::Visited)
    }

    fn flush_pending(&mut self) -> Result<()> {
        if let Some(record) = &self.pending {
            self.persistence.members()?.save(record)?;
            self.pending = None;
        }
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.statistics
    }

    pub fn persistence(&self) -> &Arc<StatePersistence> {
        &self.persistence
    }

    /// Flushes the pending member and resets state unless it is kept
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let flushed = self.flush_pending();
        let reset: Result<()> = if self.keep_state {
            Ok(())
        } else {
            self.persistence
                .destroy_state()
                .map(|_| ())
                .map_err(Into::into)
        };

        tracing::info!(
            "Crawl closed: {} fragments fetched, {} members supplied",
            self.statistics.fragments_fetched,
            self.statistics.members_supplied
        );
        flushed.and(reset)
    }
}

impl Drop for TreeNodeProcessor {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("Failed to close crawl state: {}", e);
        }
    }
}

fn seed_starting_urls(metadata: &LdesMetaData, persistence: &StatePersistence) -> Result<()> {
    let mut fragments = persistence.fragments()?;
    let mut seeded = 0;
    for url in metadata.starting_urls() {
        if !fragments.exists_by_url(url)? {
            fragments.save(&FragmentRecord::new(url.as_str()))?;
            seeded += 1;
        }
    }

    tracing::info!(
        "Seeded {} of {} starting urls",
        seeded,
        metadata.starting_urls().len()
    );
    Ok(())
}
