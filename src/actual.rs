// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Actual coordination graph from observed events

use crate::error::{CongruenceError, Result};
use crate::graph::CollaborationGraph;
use crate::requirement::ContributionMatrix;
use crate::types::{CoordinationEvent, EventKind};
use tracing::{info, warn};

/// Turns coordination events into a graph aligned with the requirement graph
#[derive(Debug, Clone, Copy, Default)]
pub struct ActualCoordinationExtractor {
    ignore_unknown: bool,
}

impl ActualCoordinationExtractor {
    /// Extractor that rejects events naming unknown contributors
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip (with a warning) events naming contributors outside the requirement graph
    #[must_use]
    pub fn ignore_unknown_contributors(mut self, ignore: bool) -> Self {
        self.ignore_unknown = ignore;
        self
    }

    /// Build the actual graph over exactly the node set of `requirement`.
    /// Repeated events on a pair accumulate; self-events are dropped.
    pub fn extract(
        &self,
        requirement: &CollaborationGraph,
        events: &[CoordinationEvent],
    ) -> Result<CollaborationGraph> {
        let mut actual = CollaborationGraph::with_nodes_of(requirement);
        let mut skipped = 0usize;

        for (i, event) in events.iter().enumerate() {
            if !event.weight.is_finite() || event.weight < 0.0 {
                return Err(CongruenceError::InvalidData(format!(
                    "event {i} ({} - {}) has invalid weight {}",
                    event.a, event.b, event.weight
                )));
            }
            let (Some(u), Some(v)) = (requirement.index_of(&event.a), requirement.index_of(&event.b))
            else {
                if self.ignore_unknown {
                    skipped += 1;
                    continue;
                }
                return Err(CongruenceError::InvalidData(format!(
                    "event {i} names a contributor outside the analysis: {} - {}",
                    event.a, event.b
                )));
            };
            actual.add_weight(u, v, event.weight)?;
        }

        if skipped > 0 {
            warn!(skipped, "ignored events for unknown contributors");
        }
        info!(
            events = events.len(),
            edges = actual.edge_count(),
            "actual coordination graph built"
        );
        Ok(actual)
    }
}

/// Co-commit events: every pair of contributors who modified the same file
/// coordinates once per shared file.
#[must_use]
pub fn co_commit_events(matrix: &ContributionMatrix) -> Vec<CoordinationEvent> {
    let mut events = Vec::new();
    for (f, file) in matrix.files().iter().enumerate() {
        let modifiers = matrix.modifiers_of(f);
        for (k, &u) in modifiers.iter().enumerate() {
            for &v in &modifiers[k + 1..] {
                events.push(CoordinationEvent {
                    a: matrix.contributors()[u].clone(),
                    b: matrix.contributors()[v].clone(),
                    weight: 1.0,
                    file: Some(file.clone()),
                    kind: EventKind::CoCommit,
                });
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement() -> CollaborationGraph {
        let mut g = CollaborationGraph::new(["alice", "bob", "carol"]).unwrap();
        g.add_weight(0, 1, 1.0).unwrap();
        g
    }

    #[test]
    fn test_same_node_set_and_absent_contributors_have_zero_weight() {
        let events = vec![CoordinationEvent::new("bob", "alice", 2.0)];
        let actual = ActualCoordinationExtractor::new()
            .extract(&requirement(), &events)
            .unwrap();

        assert!(actual.same_nodes(&requirement()));
        assert_eq!(actual.weight_between("alice", "bob"), 2.0);
        assert_eq!(actual.weight_between("carol", "alice"), 0.0);
        assert_eq!(actual.weight_between("carol", "bob"), 0.0);
    }

    #[test]
    fn test_repeated_events_accumulate() {
        let events = vec![
            CoordinationEvent::new("alice", "carol", 1.0),
            CoordinationEvent::new("carol", "alice", 0.5),
            CoordinationEvent::new("alice", "alice", 9.0),
        ];
        let actual = ActualCoordinationExtractor::new()
            .extract(&requirement(), &events)
            .unwrap();

        assert_eq!(actual.weight_between("alice", "carol"), 1.5);
        assert_eq!(actual.edge_count(), 1);
    }

    #[test]
    fn test_unknown_contributor_handling() {
        let events = vec![CoordinationEvent::new("alice", "mallory", 1.0)];

        let strict = ActualCoordinationExtractor::new().extract(&requirement(), &events);
        assert!(matches!(strict, Err(CongruenceError::InvalidData(_))));

        let lenient = ActualCoordinationExtractor::new()
            .ignore_unknown_contributors(true)
            .extract(&requirement(), &events)
            .unwrap();
        assert_eq!(lenient.edge_count(), 0);
    }

    #[test]
    fn test_negative_event_weight_rejected() {
        let events = vec![CoordinationEvent::new("alice", "bob", -1.0)];
        let err = ActualCoordinationExtractor::new()
            .extract(&requirement(), &events)
            .unwrap_err();
        assert!(matches!(err, CongruenceError::InvalidData(_)));
    }

    #[test]
    fn test_co_commit_events_from_matrix() {
        let matrix = ContributionMatrix::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec!["f1".into(), "f2".into()],
            &[vec![1.0, 1.0], vec![2.0, 0.0], vec![0.0, 4.0]],
        )
        .unwrap();
        let events = co_commit_events(&matrix);

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == EventKind::CoCommit));
        assert_eq!(events[0].file.as_deref(), Some("f1"));
        assert_eq!((events[1].a.as_str(), events[1].b.as_str()), ("a", "c"));
    }
}
