use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::json;
use shopimg_contracts::config::FetchConfig;
use shopimg_contracts::errors::{FailureKind, ImageFailure};
use shopimg_contracts::events::{payload, EventWriter};

use crate::{emit_logged, error_chain_text, failure_kind_of, truncate_text};

/// Blocking byte source. The reqwest implementation is the only production
/// one; tests script their own.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct ReqwestTransport {
    http: HttpClient,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs_f64(config.timeout_s))
            .user_agent(config.user_agent.as_str())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("image request failed ({url})"))?;
        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = response.text().unwrap_or_default();
            bail!(
                "image download failed ({code}): {}",
                truncate_text(body.trim(), 200)
            );
        }
        let bytes = response
            .bytes()
            .with_context(|| format!("failed reading image bytes ({url})"))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub url: String,
    pub attempts: u32,
    pub alternate: bool,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate<'s> {
    url: &'s str,
    tries: u32,
    alternate: bool,
}

/// Primary source gets `max_retries` tries, each alternate exactly one.
fn candidates(sources: &[String], max_retries: u32) -> Vec<Candidate<'_>> {
    sources
        .iter()
        .enumerate()
        .map(|(idx, url)| Candidate {
            url: url.as_str(),
            tries: if idx == 0 { max_retries.max(1) } else { 1 },
            alternate: idx > 0,
        })
        .collect()
}

pub struct Fetcher<'a> {
    transport: &'a dyn HttpTransport,
    max_retries: u32,
    retry_delay: Duration,
    events: EventWriter,
}

impl<'a> Fetcher<'a> {
    pub fn new(
        transport: &'a dyn HttpTransport,
        config: &FetchConfig,
        events: EventWriter,
    ) -> Self {
        Self {
            transport,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            events,
        }
    }

    pub fn fetch(&self, sources: &[String]) -> Result<Fetched<Vec<u8>>, ImageFailure> {
        self.fetch_with(sources, |bytes| Ok(bytes.to_vec()))
    }

    /// Walks the candidate list until `accept` takes a body. A body that
    /// `accept` rejects counts as a failed attempt of that source.
    pub fn fetch_with<T, F>(
        &self,
        sources: &[String],
        mut accept: F,
    ) -> Result<Fetched<T>, ImageFailure>
    where
        F: FnMut(&[u8]) -> Result<T>,
    {
        let plan = candidates(sources, self.max_retries);
        if plan.is_empty() {
            return Err(ImageFailure::transport("no remote source configured"));
        }

        let mut attempts: u32 = 0;
        let mut last_failure: Option<(FailureKind, String)> = None;
        for candidate in &plan {
            for try_idx in 1..=candidate.tries {
                if attempts > 0 && !self.retry_delay.is_zero() {
                    thread::sleep(self.retry_delay);
                }
                attempts += 1;
                let outcome = self
                    .transport
                    .get(candidate.url)
                    .and_then(|bytes| accept(&bytes));
                match outcome {
                    Ok(value) => {
                        if candidate.alternate {
                            println!("Alternative URL worked: {}", candidate.url);
                            emit_logged(
                                &self.events,
                                "fetch_alternate_succeeded",
                                payload(json!({ "url": candidate.url, "attempts": attempts })),
                            );
                        }
                        return Ok(Fetched {
                            url: candidate.url.to_string(),
                            attempts,
                            alternate: candidate.alternate,
                            value,
                        });
                    }
                    Err(err) => {
                        let message = error_chain_text(&err, 240);
                        if candidate.alternate {
                            println!("Alternative URL failed: {message}");
                        } else {
                            println!("Attempt {try_idx} failed: {message}");
                        }
                        let kind = failure_kind_of(&err);
                        let event_type = match kind {
                            FailureKind::Decode => "decode_failed",
                            _ => "fetch_attempt_failed",
                        };
                        emit_logged(
                            &self.events,
                            event_type,
                            payload(json!({
                                "url": candidate.url,
                                "attempt": try_idx,
                                "of": candidate.tries,
                                "alternate": candidate.alternate,
                                "kind": kind.as_str(),
                                "error": message,
                            })),
                        );
                        last_failure = Some((kind, message));
                    }
                }
            }
        }

        let (kind, message) =
            last_failure.unwrap_or((FailureKind::Transport, "no attempt made".to_string()));
        emit_logged(
            &self.events,
            "fetch_exhausted",
            payload(json!({
                "sources": plan.len(),
                "attempts": attempts,
                "kind": kind.as_str(),
                "error": message,
            })),
        );
        Err(ImageFailure::new(
            kind,
            format!(
                "all {attempts} attempts across {} source(s) failed; last error: {message}",
                plan.len()
            ),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use anyhow::{anyhow, bail, Result};
    use shopimg_contracts::config::FetchConfig;
    use shopimg_contracts::errors::FailureKind;
    use shopimg_contracts::events::EventWriter;

    use super::{candidates, Fetcher, HttpTransport};

    /// Serves canned bodies per URL and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        bodies: HashMap<String, Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn serve(mut self, url: &str, body: Vec<u8>) -> Self {
            self.bodies.insert(url.to_string(), body);
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn get(&self, url: &str) -> Result<Vec<u8>> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(url.to_string());
            }
            match self.bodies.get(url) {
                Some(body) => Ok(body.clone()),
                None => Err(anyhow!("image download failed (404): not found")),
            }
        }
    }

    fn urls(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|url| url.to_string()).collect()
    }

    fn config(max_retries: u32) -> FetchConfig {
        FetchConfig {
            max_retries,
            ..FetchConfig::default()
        }
    }

    #[test]
    fn candidate_plan_retries_only_the_primary() {
        let sources = urls(&["p", "a1", "a2"]);
        let plan = candidates(&sources, 3);
        let tries = plan.iter().map(|c| c.tries).collect::<Vec<u32>>();
        assert_eq!(tries, vec![3, 1, 1]);
        assert!(!plan[0].alternate);
        assert!(plan[2].alternate);
    }

    #[test]
    fn always_failing_primary_is_tried_exactly_max_retries_times() {
        let transport = ScriptedTransport::new();
        let fetcher = Fetcher::new(&transport, &config(3), EventWriter::disabled("t"));
        let failure = fetcher.fetch(&urls(&["https://x/p"])).err();
        assert_eq!(transport.calls().len(), 3);
        assert_eq!(failure.map(|f| f.kind()), Some(FailureKind::Transport));
    }

    #[test]
    fn alternates_are_tried_once_each_in_declared_order() {
        let transport = ScriptedTransport::new();
        let fetcher = Fetcher::new(&transport, &config(3), EventWriter::disabled("t"));
        let result = fetcher.fetch(&urls(&["https://x/p", "https://x/a1", "https://x/a2"]));
        assert!(result.is_err());
        assert_eq!(
            transport.calls(),
            vec![
                "https://x/p",
                "https://x/p",
                "https://x/p",
                "https://x/a1",
                "https://x/a2"
            ]
        );
    }

    #[test]
    fn first_successful_alternate_wins() -> Result<()> {
        let transport = ScriptedTransport::new()
            .serve("https://x/a2", b"second".to_vec())
            .serve("https://x/a3", b"third".to_vec());
        let fetcher = Fetcher::new(&transport, &config(2), EventWriter::disabled("t"));
        let fetched = fetcher
            .fetch(&urls(&["https://x/p", "https://x/a1", "https://x/a2", "https://x/a3"]))
            .map_err(|failure| anyhow!(failure))?;
        assert_eq!(fetched.value, b"second".to_vec());
        assert_eq!(fetched.url, "https://x/a2");
        assert_eq!(fetched.attempts, 4);
        assert!(fetched.alternate);
        assert_eq!(transport.calls().len(), 4);
        Ok(())
    }

    #[test]
    fn primary_success_stops_immediately() -> Result<()> {
        let transport = ScriptedTransport::new().serve("https://x/p", b"ok".to_vec());
        let fetcher = Fetcher::new(&transport, &config(3), EventWriter::disabled("t"));
        let fetched = fetcher
            .fetch(&urls(&["https://x/p", "https://x/a1"]))
            .map_err(|failure| anyhow!(failure))?;
        assert_eq!(fetched.attempts, 1);
        assert!(!fetched.alternate);
        assert_eq!(transport.calls(), vec!["https://x/p"]);
        Ok(())
    }

    #[test]
    fn rejected_body_counts_as_failed_attempt() {
        let transport = ScriptedTransport::new().serve("https://x/p", b"<html>".to_vec());
        let fetcher = Fetcher::new(&transport, &config(2), EventWriter::disabled("t"));
        let result = fetcher.fetch_with(&urls(&["https://x/p"]), |_bytes| -> Result<()> {
            bail!("not an image")
        });
        assert!(result.is_err());
        assert_eq!(transport.calls().len(), 2);
    }

    #[test]
    fn empty_source_list_makes_no_request() {
        let transport = ScriptedTransport::new();
        let fetcher = Fetcher::new(&transport, &config(3), EventWriter::disabled("t"));
        assert!(fetcher.fetch(&[]).is_err());
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn attempts_are_logged_to_the_event_stream() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let transport = ScriptedTransport::new().serve("https://x/a1", b"ok".to_vec());
        let fetcher = Fetcher::new(&transport, &config(2), EventWriter::new(&path, "t"));
        fetcher
            .fetch(&urls(&["https://x/p", "https://x/a1"]))
            .map_err(|failure| anyhow!(failure))?;
        let raw = std::fs::read_to_string(path)?;
        let types = raw
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter_map(|row| row["type"].as_str().map(str::to_string))
            .collect::<Vec<String>>();
        assert_eq!(
            types,
            vec![
                "fetch_attempt_failed",
                "fetch_attempt_failed",
                "fetch_alternate_succeeded"
            ]
        );
        Ok(())
    }

    #[test]
    fn undecodable_body_is_logged_as_decode_failure() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let transport = ScriptedTransport::new().serve("https://x/p", b"<html>".to_vec());
        let fetcher = Fetcher::new(&transport, &config(1), EventWriter::new(&path, "t"));
        let failure = fetcher
            .fetch_with(&urls(&["https://x/p"]), |bytes| {
                crate::normalize::decode_and_normalize(bytes, 90)
            })
            .err();
        assert_eq!(failure.map(|f| f.kind()), Some(FailureKind::Decode));
        let raw = std::fs::read_to_string(path)?;
        assert!(raw.lines().any(|line| line.contains("\"type\":\"decode_failed\"")));
        Ok(())
    }
}
