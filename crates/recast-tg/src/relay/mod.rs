//! The duplicate-avoiding relay loop: pick a source channel at random, fetch
//! its recent posts, drop already-published and link-bearing ones, publish a
//! single survivor to the destination and record it in the published set.

mod candidate;
mod link_filter;
mod sanitize;
mod store;

use crate::prelude::*;
use crate::util::DynError;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

pub(crate) use candidate::{Candidate, CandidateKind, RawPost};
pub(crate) use store::{JsonFileStore, PublishedSet, PublishedStore, StoreError};

#[derive(Deserialize, Clone)]
pub(crate) struct Config {
    /// Channels the relay draws candidates from, e.g. `@mychan,@otherchan`
    pub(crate) source_channels: Vec<String>,

    #[serde(default = "default_fetch_limit")]
    pub(crate) fetch_limit: u8,

    pub(crate) store_path: PathBuf,
}

fn default_fetch_limit() -> u8 {
    100
}

/// `@channel` and bare `channel` spellings are accepted interchangeably in
/// the config and in Telegram metadata.
pub(crate) fn channel_slug(channel: &str) -> &str {
    channel.trim_start_matches('@')
}

/// Failure of a single upstream fetch. It is recovered per-source: the
/// relay logs it and moves on to the next channel in the shuffled order.
#[derive(Debug, Error)]
#[error("Failed to fetch recent posts from {channel}")]
pub(crate) struct TransportError {
    pub(crate) channel: String,
    #[source]
    pub(crate) source: Box<DynError>,
}

#[derive(Debug, Error)]
#[error("The publisher rejected the post")]
pub(crate) struct PublishError {
    #[source]
    pub(crate) source: Box<DynError>,
}

#[derive(Debug, Error)]
pub(crate) enum RelayError {
    /// The "ran but found nothing" outcome, distinct from transport errors
    #[error("No eligible candidates in any of the {sources} configured sources")]
    NoCandidates { sources: usize },

    #[error("Failed to publish the selected candidate")]
    Publish {
        #[from]
        source: PublishError,
    },

    /// The publish itself stands (the message was already sent), so this is
    /// recoverable only by operator reconciliation: the next cycle may relay
    /// the same post again.
    #[error("The post was published, but flushing the published set failed")]
    Persist {
        #[from]
        source: StoreError,
    },
}

/// Upstream the candidates are drawn from.
#[async_trait]
pub(crate) trait Source: Send + Sync {
    async fn fetch_recent(&self, channel: &str, limit: u8) -> Result<Vec<RawPost>, TransportError>;
}

/// Downstream the selected candidate is republished to.
#[async_trait]
pub(crate) trait Publisher: Send + Sync {
    async fn send_text(&self, destination: &str, text: &str) -> Result<(), PublishError>;

    async fn send_photo(
        &self,
        destination: &str,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), PublishError>;

    async fn send_video(
        &self,
        destination: &str,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), PublishError>;

    async fn send_document(
        &self,
        destination: &str,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), PublishError>;
}

/// What a finished relay cycle did, for logging and the HTTP response.
#[derive(Debug)]
pub(crate) struct CycleReport {
    pub(crate) source_channel: String,
    pub(crate) eligible_candidates: usize,
    pub(crate) kind: CandidateKind,
    pub(crate) identity: String,
}

pub(crate) struct Relay<So, Pu, St> {
    cfg: Config,
    destination: String,
    source: So,
    publisher: Pu,
    store: St,
}

impl<So: Source, Pu: Publisher, St: PublishedStore> Relay<So, Pu, St> {
    pub(crate) fn new(
        cfg: Config,
        destination: String,
        source: So,
        publisher: Pu,
        store: St,
    ) -> Self {
        Self {
            cfg,
            destination,
            source,
            publisher,
            store,
        }
    }

    /// Runs one relay cycle, publishing at most one post.
    ///
    /// Sources are visited in a fresh random order; the first one that yields
    /// any eligible candidate wins and later sources are never consulted.
    /// Selection among that source's candidates is uniform-random, there is
    /// no ranking.
    #[instrument(skip_all)]
    pub(crate) async fn run_cycle(&self) -> Result<CycleReport> {
        metrics::increment_counter!("relay_cycles_total");

        let mut published = self.store.load().await?;

        // The configured list stays immutable; only a per-cycle copy is
        // shuffled.
        let mut order = self.cfg.source_channels.clone();
        order.shuffle(&mut rand::thread_rng());

        for channel in &order {
            let candidates = self.eligible_candidates(channel, &published).await;

            let Some(candidate) = candidates.choose(&mut rand::thread_rng()) else {
                debug!(%channel, "Source yielded no eligible candidates");
                continue;
            };

            self.send(candidate)
                .await
                .map_err(err_ctx!(RelayError::Publish))?;

            metrics::increment_counter!("relay_published_total", "source" => channel.clone());

            let identity = candidate.identity().to_owned();
            published.insert(identity.clone());

            self.store
                .flush(&published)
                .await
                .map_err(err_ctx!(RelayError::Persist))?;

            info!(
                %channel,
                kind = %candidate.kind,
                candidates = candidates.len(),
                published_total = published.len(),
                "Relayed a post"
            );

            return Ok(CycleReport {
                source_channel: candidate.source_channel.clone(),
                eligible_candidates: candidates.len(),
                kind: candidate.kind,
                identity,
            });
        }

        Err(err!(RelayError::NoCandidates {
            sources: order.len()
        }))
    }

    async fn eligible_candidates(
        &self,
        channel: &str,
        published: &PublishedSet,
    ) -> Vec<Candidate> {
        let fetched = self
            .source
            .fetch_recent(channel, self.cfg.fetch_limit)
            .with_duration_log("Fetched recent posts")
            .await;

        let raw_posts = match fetched {
            Ok(raw_posts) => raw_posts,
            Err(err) => {
                // A single source's failure must not abort the whole cycle
                metrics::increment_counter!("relay_source_fetch_errors_total");
                warn!(
                    %channel,
                    err = tracing_err(&err),
                    "Skipping source after a transport error"
                );
                return vec![];
            }
        };

        raw_posts
            .into_iter()
            .filter_map(|raw| Candidate::from_raw(raw, channel))
            .filter(|candidate| !published.contains(candidate.identity()))
            .collect()
    }

    async fn send(&self, candidate: &Candidate) -> Result<(), PublishError> {
        let destination = &self.destination;
        let caption = candidate.caption.as_deref();

        // `Candidate::from_raw` guarantees the fields for the respective kind
        let file_id = candidate.file_id.as_deref().unwrap_or_default();

        match candidate.kind {
            CandidateKind::Text => {
                let text = candidate.text.as_deref().unwrap_or_default();
                self.publisher.send_text(destination, text).await
            }
            CandidateKind::Photo => self.publisher.send_photo(destination, file_id, caption).await,
            CandidateKind::Video => self.publisher.send_video(destination, file_id, caption).await,
            CandidateKind::Document => {
                self.publisher
                    .send_document(destination, file_id, caption)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use assert_matches::assert_matches;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockSource {
        posts: HashMap<String, Vec<RawPost>>,
        failing: Vec<String>,
        fetched: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn with_text_posts(mut self, channel: &str, texts: &[&str]) -> Self {
            let posts = texts
                .iter()
                .map(|text| RawPost {
                    text: Some((*text).to_owned()),
                    ..Default::default()
                })
                .collect();
            self.posts.insert(channel.to_owned(), posts);
            self
        }

        fn with_failing(mut self, channel: &str) -> Self {
            self.failing.push(channel.to_owned());
            self
        }
    }

    #[async_trait]
    impl Source for MockSource {
        async fn fetch_recent(
            &self,
            channel: &str,
            _limit: u8,
        ) -> Result<Vec<RawPost>, TransportError> {
            self.fetched.lock().push(channel.to_owned());

            if self.failing.iter().any(|failing| failing == channel) {
                return Err(TransportError {
                    channel: channel.to_owned(),
                    source: "connection reset by peer".into(),
                });
            }

            Ok(self.posts.get(channel).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct MockPublisher {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Publisher for MockPublisher {
        async fn send_text(&self, _destination: &str, text: &str) -> Result<(), PublishError> {
            if self.fail {
                return Err(PublishError {
                    source: "the bot was kicked from the channel".into(),
                });
            }
            self.sent.lock().push(text.to_owned());
            Ok(())
        }

        async fn send_photo(
            &self,
            destination: &str,
            file_id: &str,
            _caption: Option<&str>,
        ) -> Result<(), PublishError> {
            self.send_text(destination, file_id).await
        }

        async fn send_video(
            &self,
            destination: &str,
            file_id: &str,
            _caption: Option<&str>,
        ) -> Result<(), PublishError> {
            self.send_text(destination, file_id).await
        }

        async fn send_document(
            &self,
            destination: &str,
            file_id: &str,
            _caption: Option<&str>,
        ) -> Result<(), PublishError> {
            self.send_text(destination, file_id).await
        }
    }

    #[derive(Default)]
    struct MemStore {
        ids: Mutex<Vec<String>>,
        flushes: Mutex<usize>,
        fail_flush: bool,
    }

    impl MemStore {
        fn with_published(self, ids: &[&str]) -> Self {
            *self.ids.lock() = ids.iter().map(|id| (*id).to_owned()).collect();
            self
        }
    }

    #[async_trait]
    impl PublishedStore for MemStore {
        async fn load(&self) -> Result<PublishedSet, StoreError> {
            let mut set = PublishedSet::default();
            for id in self.ids.lock().iter() {
                set.insert(id.clone());
            }
            Ok(set)
        }

        async fn flush(&self, set: &PublishedSet) -> Result<(), StoreError> {
            if self.fail_flush {
                return Err(StoreError::Write {
                    path: "mem".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            *self.flushes.lock() += 1;
            *self.ids.lock() = set.ids().to_vec();
            Ok(())
        }
    }

    fn relay(
        sources: &[&str],
        source: MockSource,
        publisher: MockPublisher,
        store: MemStore,
    ) -> Relay<MockSource, MockPublisher, MemStore> {
        let cfg = Config {
            source_channels: sources.iter().map(|chan| (*chan).to_owned()).collect(),
            fetch_limit: 100,
            store_path: "unused".into(),
        };
        Relay::new(cfg, "@destination".to_owned(), source, publisher, store)
    }

    #[test_log::test(tokio::test)]
    async fn successful_cycle_publishes_exactly_once() {
        let source = MockSource::default().with_text_posts("@a", &["one", "two", "three"]);
        let relay = relay(&["@a"], source, MockPublisher::default(), MemStore::default());

        let report = relay.run_cycle().await.unwrap();

        assert_eq!(relay.publisher.sent.lock().len(), 1);
        assert_eq!(report.source_channel, "@a");
        assert_eq!(report.eligible_candidates, 3);
        assert_eq!(*relay.store.flushes.lock(), 1);
        assert!(relay.store.ids.lock().contains(&report.identity));
    }

    #[test_log::test(tokio::test)]
    async fn stops_at_the_first_source_that_yields() {
        let source = MockSource::default()
            .with_text_posts("@a", &["from a"])
            .with_text_posts("@b", &["from b"]);
        let relay = relay(
            &["@a", "@b"],
            source,
            MockPublisher::default(),
            MemStore::default(),
        );

        relay.run_cycle().await.unwrap();

        // Whatever the shuffled order was, the second source is never fetched
        assert_eq!(relay.source.fetched.lock().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn already_published_identities_are_never_candidates() {
        let source = MockSource::default().with_text_posts("@a", &["seen before"]);
        let store = MemStore::default().with_published(&["seen before"]);
        let relay = relay(&["@a"], source, MockPublisher::default(), store);

        let err = relay.run_cycle().await.unwrap_err();

        assert!(err.is_no_candidates());
        assert!(relay.publisher.sent.lock().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn exhausted_sources_leave_the_store_unmodified() {
        let source = MockSource::default()
            .with_text_posts("@a", &["dup"])
            .with_text_posts("@b", &["dup"]);
        let store = MemStore::default().with_published(&["dup"]);
        let relay = relay(&["@a", "@b"], source, MockPublisher::default(), store);

        let err = relay.run_cycle().await.unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::Relay {
                source: RelayError::NoCandidates { sources: 2 }
            }
        );
        assert_eq!(*relay.store.flushes.lock(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn transport_error_skips_to_the_next_source() {
        let source = MockSource::default()
            .with_failing("@flaky")
            .with_text_posts("@solid", &["still relayed"]);
        let relay = relay(
            &["@flaky", "@solid"],
            source,
            MockPublisher::default(),
            MemStore::default(),
        );

        let report = relay.run_cycle().await.unwrap();

        assert_eq!(report.source_channel, "@solid");
        assert_eq!(*relay.publisher.sent.lock(), ["still relayed"]);
    }

    #[test_log::test(tokio::test)]
    async fn publish_failure_persists_nothing() {
        let source = MockSource::default().with_text_posts("@a", &["doomed"]);
        let publisher = MockPublisher {
            fail: true,
            ..Default::default()
        };
        let relay = relay(&["@a"], source, publisher, MemStore::default());

        let err = relay.run_cycle().await.unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::Relay {
                source: RelayError::Publish { .. }
            }
        );
        assert_eq!(*relay.store.flushes.lock(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn persist_failure_is_reported_but_the_publish_stands() {
        let source = MockSource::default().with_text_posts("@a", &["sent anyway"]);
        let store = MemStore {
            fail_flush: true,
            ..Default::default()
        };
        let relay = relay(&["@a"], source, MockPublisher::default(), store);

        let err = relay.run_cycle().await.unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::Relay {
                source: RelayError::Persist { .. }
            }
        );
        assert_eq!(*relay.publisher.sent.lock(), ["sent anyway"]);
    }

    #[test_log::test(tokio::test)]
    async fn link_bearing_posts_are_filtered_out() {
        let source = MockSource::default().with_text_posts(
            "@a",
            &["Check this out https://example.com/x", "clean post"],
        );
        let relay = relay(&["@a"], source, MockPublisher::default(), MemStore::default());

        let report = relay.run_cycle().await.unwrap();

        assert_eq!(report.eligible_candidates, 1);
        assert_eq!(*relay.publisher.sent.lock(), ["clean post"]);
    }
}
