//! Member supplier
//!
//! The caller-facing entry point. Wraps the crawl engine and, when enabled,
//! drops member versions that are not newer than the last version supplied
//! for the same entity.

use crate::config::{resolve_rdf_format, Config};
use crate::crawler::coordinator::{StopHandle, SuppliedMember, TreeNodeProcessor};
use crate::crawler::fetcher::{LdesMetaData, TreeNodeFetcher};
use crate::crawler::parser::{subject_id, term_value};
use crate::crawler::timestamp::{CurrentTimeExtractor, PropertyPathExtractor, TimestampExtractor};
use crate::executor::build_request_executor;
use crate::output::CrawlStatistics;
use crate::storage::{MemberVersionRecord, MemberVersionStore, StatePersistence, StorageResult};
use crate::{ConfigError, Result};
use oxrdf::NamedNode;
use std::sync::Arc;
use std::time::Duration;

/// Keeps only the latest version of each versioned entity
#[derive(Debug, Clone)]
pub struct LatestStateFilter {
    version_of_path: NamedNode,
}

impl LatestStateFilter {
    pub fn new(version_of_path: NamedNode) -> Self {
        Self { version_of_path }
    }

    /// Returns the entity this member is a version of
    ///
    /// A triple on the member node itself wins over one elsewhere in its graph.
    pub fn version_of(&self, member: &SuppliedMember) -> Option<String> {
        let mut fallback = None;
        for triple in member.model.triples_for_predicate(&self.version_of_path) {
            if subject_id(triple.subject) == member.id {
                return Some(term_value(triple.object));
            }
            if fallback.is_none() {
                fallback = Some(term_value(triple.object));
            }
        }
        fallback
    }

    /// Returns true if the member should reach the caller, and records it
    ///
    /// Members without a version-of value always pass.
    pub fn allows(
        &self,
        member: &SuppliedMember,
        versions: &mut dyn MemberVersionStore,
    ) -> StorageResult<bool> {
        let Some(version_of) = self.version_of(member) else {
            return Ok(true);
        };

        let version = MemberVersionRecord::new(version_of, member.created_at);
        if versions.is_version_after_timestamp(&version)? {
            versions.add_member_version(&version)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Supplies the members of a stream, each at most once
pub struct MemberSupplier {
    processor: TreeNodeProcessor,
    filter: Option<LatestStateFilter>,
    outdated_skipped: u64,
}

impl MemberSupplier {
    pub fn new(processor: TreeNodeProcessor, filter: Option<LatestStateFilter>) -> Self {
        Self {
            processor,
            filter,
            outdated_skipped: 0,
        }
    }

    /// Wires executor, fetcher, persistence and engine from a configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = &config.client;
        let format = resolve_rdf_format(&client.source_format)?;

        let timestamps: Arc<dyn TimestampExtractor> = match &client.timestamp_path {
            Some(path) => Arc::new(PropertyPathExtractor::new(parse_iri(path)?)),
            None => Arc::new(CurrentTimeExtractor),
        };

        let fetcher = TreeNodeFetcher::new(
            build_request_executor(config)?,
            timestamps,
            Duration::from_secs(client.polling_interval),
        );
        let persistence = Arc::new(StatePersistence::from_config(&config.persistence)?);
        let processor = TreeNodeProcessor::new(
            LdesMetaData::new(client.urls.clone(), format),
            persistence,
            fetcher,
            config.persistence.keep_state,
        )?;

        let filter = match (&client.version_of_path, client.use_latest_state) {
            (Some(path), true) => Some(LatestStateFilter::new(parse_iri(path)?)),
            _ => None,
        };

        Ok(Self::new(processor, filter))
    }

    /// Returns the next member, or None at the end of the stream
    pub async fn get(&mut self) -> Result<Option<SuppliedMember>> {
        loop {
            let Some(member) = self.processor.next_member().await? else {
                return Ok(None);
            };
            let Some(filter) = &self.filter else {
                return Ok(Some(member));
            };

            let allowed = {
                let mut versions = self.processor.persistence().versions()?;
                filter.allows(&member, &mut **versions)?
            };
            if allowed {
                return Ok(Some(member));
            }

            tracing::debug!("Skipping outdated version {}", member.id);
            self.outdated_skipped += 1;
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.processor.stop_handle()
    }

    pub fn statistics(&self) -> CrawlStatistics {
        CrawlStatistics {
            outdated_versions_skipped: self.outdated_skipped,
            ..self.processor.statistics().clone()
        }
    }

    pub fn close(self) -> Result<()> {
        self.processor.close()
    }
}

fn parse_iri(value: &str) -> Result<NamedNode> {
    NamedNode::new(value)
        .map_err(|e| ConfigError::InvalidIri(format!("'{}': {}", value, e)).into())
}
