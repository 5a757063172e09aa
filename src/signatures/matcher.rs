//! Streaming multi-pattern matching over an Aho-Corasick automaton.

use crate::core::{PerformanceMonitor, Signature};

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

/// Read granularity for the scan stream.
const CHUNK_SIZE: usize = 8192;

/// Deadline check cadence, in chunks. At 8 KiB chunks this checks at
/// least once per 128 KiB of input.
const DEADLINE_CHECK_INTERVAL: usize = 16;

/// One automaton state: goto transitions, failure link, and the ids of
/// every pattern terminating here (own or inherited via failure links).
#[derive(Debug, Default)]
struct Node {
    transitions: HashMap<u8, usize>,
    failure_link: usize,
    outputs: Vec<usize>,
}

/// Result of a single streaming scan.
#[derive(Debug)]
pub enum MatchOutcome<'a> {
    /// The deadline fired; no partial matches are reported.
    TimedOut,
    /// The stream was exhausted; contains each matched signature once.
    Complete(Vec<&'a Signature>),
}

/// A keyword-tree automaton built over the byte patterns of a signature
/// set, supporting linear-time multi-pattern matching on a stream.
///
/// Construction walks each pattern into a goto trie, computes failure
/// links in breadth-first order, and propagates output lists along
/// failure links. Memory is proportional to total pattern length; a scan
/// allocates only the read chunk and a per-pattern seen set.
///
/// When two signatures share a byte pattern, the signature added last
/// owns the pattern in the results.
#[derive(Debug)]
pub struct AhoCorasickMatcher<'a> {
    nodes: Vec<Node>,
    /// Pattern id to owning signature. Ids are assigned in build order.
    patterns: Vec<&'a Signature>,
}

impl<'a> AhoCorasickMatcher<'a> {
    /// Builds the automaton over the given signatures.
    ///
    /// Signatures with empty patterns contribute nothing; the store drops
    /// them at load time.
    pub fn build(signatures: &[&'a Signature]) -> Self {
        let mut matcher = Self {
            nodes: vec![Node::default()],
            patterns: Vec::new(),
        };

        let mut pattern_ids: HashMap<&[u8], usize> = HashMap::new();
        for &signature in signatures {
            let pattern = signature.pattern.as_bytes();
            if pattern.is_empty() {
                continue;
            }
            match pattern_ids.get(pattern) {
                Some(&id) => {
                    // Shared pattern: the later signature takes ownership.
                    matcher.patterns[id] = signature;
                }
                None => {
                    let id = matcher.patterns.len();
                    pattern_ids.insert(pattern, id);
                    matcher.patterns.push(signature);
                    matcher.add_pattern(pattern, id);
                }
            }
        }

        matcher.compute_failure_links();
        tracing::debug!(
            nodes = matcher.nodes.len(),
            patterns = matcher.patterns.len(),
            "automaton built"
        );
        matcher
    }

    fn add_pattern(&mut self, pattern: &[u8], id: usize) {
        let mut current = 0;
        for &byte in pattern {
            current = match self.nodes[current].transitions.get(&byte) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[current].transitions.insert(byte, next);
                    next
                }
            };
        }
        self.nodes[current].outputs.push(id);
    }

    /// Computes failure links breadth-first and propagates output lists,
    /// so every node carries the patterns of its entire failure chain.
    fn compute_failure_links(&mut self) {
        let mut queue: std::collections::VecDeque<usize> =
            self.nodes[0].transitions.values().copied().collect();

        while let Some(current) = queue.pop_front() {
            let transitions: Vec<(u8, usize)> = self.nodes[current]
                .transitions
                .iter()
                .map(|(&byte, &next)| (byte, next))
                .collect();

            for (byte, next) in transitions {
                queue.push_back(next);

                let mut failure = self.nodes[current].failure_link;
                while failure != 0 && !self.nodes[failure].transitions.contains_key(&byte) {
                    failure = self.nodes[failure].failure_link;
                }
                let link = self.nodes[failure]
                    .transitions
                    .get(&byte)
                    .copied()
                    .unwrap_or(0);
                self.nodes[next].failure_link = link;

                let inherited = self.nodes[link].outputs.clone();
                self.nodes[next].outputs.extend(inherited);
            }
        }
    }

    fn next_state(&self, mut current: usize, byte: u8) -> usize {
        while current != 0 && !self.nodes[current].transitions.contains_key(&byte) {
            current = self.nodes[current].failure_link;
        }
        self.nodes[current]
            .transitions
            .get(&byte)
            .copied()
            .unwrap_or(0)
    }

    /// Scans a stream, reporting every signature whose pattern occurs.
    ///
    /// Reads in 8 KiB chunks, carrying automaton state across chunk
    /// boundaries so patterns straddling a boundary are still found. The
    /// monitor is consulted every sixteenth chunk; once the deadline has
    /// fired the scan stops reading and reports [`MatchOutcome::TimedOut`]
    /// with no partial matches.
    ///
    /// # Errors
    ///
    /// Propagates read errors from the underlying stream.
    pub fn scan<R: Read>(
        &self,
        mut reader: R,
        monitor: &PerformanceMonitor,
        timeout: Duration,
    ) -> std::io::Result<MatchOutcome<'a>> {
        let mut detected = vec![false; self.patterns.len()];
        let mut state = 0;
        let mut buffer = [0u8; CHUNK_SIZE];
        let mut chunk_count = 0usize;

        loop {
            chunk_count += 1;
            if chunk_count % DEADLINE_CHECK_INTERVAL == 0 && monitor.has_timed_out(timeout) {
                return Ok(MatchOutcome::TimedOut);
            }

            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }

            for &byte in &buffer[..bytes_read] {
                state = self.next_state(state, byte);
                let mut node = state;
                while node != 0 {
                    for &id in &self.nodes[node].outputs {
                        detected[id] = true;
                    }
                    node = self.nodes[node].failure_link;
                }
            }
        }

        let matched = detected
            .iter()
            .zip(&self.patterns)
            .filter_map(|(&hit, &signature)| hit.then_some(signature))
            .collect();
        Ok(MatchOutcome::Complete(matched))
    }
}
