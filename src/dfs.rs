//! Depth-first search scratch state, per §3 and §4.5.
//!
//! A single instance is reused across searches and across the lifetime of
//! the node, matching the source's one-struct-per-node assumption (see
//! SPEC_FULL.md §9): at most one depth-first probe is in flight through this
//! node at a time.

use rand::Rng;

use crate::wire::Endpoint;

#[derive(Debug, Default)]
pub struct DfsState {
    pub parent: Option<Endpoint>,
    pub active_child: Option<Endpoint>,
    pub candidates: Vec<Endpoint>,
}

/// What the search engine should do with an inbound BP probe after the
/// state machine has updated `DfsState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Root exhausted every candidate without a hit.
    NotFound,
    /// Cycle detected: bounce the probe back the way it came.
    Bounce(Endpoint),
    /// Candidates exhausted here: back-track to parent.
    BackTrack(Endpoint),
    /// Advance the probe to a freshly chosen candidate.
    Advance(Endpoint),
}

impl DfsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset state for a depth-first search this node is initiating.
    /// Returns the randomly chosen first hop, or `None` if there are no
    /// peers to probe.
    pub fn reset_for_initiate(&mut self, self_endpoint: &Endpoint, peers: Vec<Endpoint>) -> Option<Endpoint> {
        self.parent = Some(self_endpoint.clone());
        self.candidates = peers;
        let chosen = pick_random(&mut self.candidates)?;
        self.active_child = Some(chosen.clone());
        Some(chosen)
    }

    /// Apply §4.5's BP transition rules for a probe arriving from
    /// `previous_peer`. `already_seen` must be computed by the caller via
    /// the node's [`crate::seen::SeenFilter`] *before* calling this, since
    /// only the search engine has access to that shared state.
    /// `current_peers` is the full live neighbor set, consulted only when
    /// this is a fresh (origin, seqno) — i.e. when `!already_seen`.
    pub fn on_probe(
        &mut self,
        self_endpoint: &Endpoint,
        previous_peer: &Endpoint,
        already_seen: bool,
        current_peers: Vec<Endpoint>,
    ) -> ProbeOutcome {
        if !already_seen {
            self.parent = Some(previous_peer.clone());
            self.candidates = current_peers;
        }
        self.candidates.retain(|ep| ep != previous_peer);

        let is_root = self.parent.as_ref() == Some(self_endpoint);
        let active_is_previous = self.active_child.as_ref() == Some(previous_peer);

        if is_root && active_is_previous && self.candidates.is_empty() {
            return ProbeOutcome::NotFound;
        }

        if let Some(active) = self.active_child.clone() {
            if active != *previous_peer {
                return ProbeOutcome::Bounce(previous_peer.clone());
            }
        }

        if self.candidates.is_empty() {
            let parent = self
                .parent
                .clone()
                .expect("parent is always set once a probe has been seen");
            return ProbeOutcome::BackTrack(parent);
        }

        let next = pick_random(&mut self.candidates).expect("checked non-empty above");
        self.active_child = Some(next.clone());
        ProbeOutcome::Advance(next)
    }
}

fn pick_random(candidates: &mut Vec<Endpoint>) -> Option<Endpoint> {
    if candidates.is_empty() {
        return None;
    }
    let idx = rand::thread_rng().gen_range(0..candidates.len());
    Some(candidates.remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(port: u16) -> Endpoint {
        Endpoint::new("127.0.0.1", port)
    }

    #[test]
    fn initiate_picks_one_child_and_removes_it_from_candidates() {
        let mut state = DfsState::new();
        let self_ep = ep(5000);
        let peers = vec![ep(5001), ep(5002)];
        let chosen = state.reset_for_initiate(&self_ep, peers).unwrap();
        assert_eq!(state.active_child, Some(chosen.clone()));
        assert!(!state.candidates.contains(&chosen));
        assert_eq!(state.candidates.len(), 1);
    }

    #[test]
    fn leaf_backtracks_when_candidates_exhausted() {
        // B has only A as a neighbor; probe arrives from A.
        let mut state = DfsState::new();
        let a = ep(5000);
        let outcome = state.on_probe(&ep(5001), &a, false, vec![a.clone()]);
        assert_eq!(outcome, ProbeOutcome::BackTrack(a));
    }

    #[test]
    fn root_terminates_when_active_child_returns_with_no_candidates() {
        let mut state = DfsState::new();
        let root = ep(5000);
        let only_child = ep(5001);
        state.parent = Some(root.clone());
        state.active_child = Some(only_child.clone());
        state.candidates = vec![];
        let outcome = state.on_probe(&root, &only_child, true, vec![]);
        assert_eq!(outcome, ProbeOutcome::NotFound);
    }

    #[test]
    fn root_advances_to_next_candidate_after_first_child_backtracks() {
        let mut state = DfsState::new();
        let root = ep(5000);
        let b = ep(5001);
        let c = ep(5002);
        state.parent = Some(root.clone());
        state.active_child = Some(b.clone());
        state.candidates = vec![c.clone()];
        let outcome = state.on_probe(&root, &b, true, vec![]);
        assert_eq!(outcome, ProbeOutcome::Advance(c.clone()));
        assert_eq!(state.active_child, Some(c));
    }

    #[test]
    fn cycle_bounces_without_changing_active_child() {
        let mut state = DfsState::new();
        let middle = ep(6000);
        let active = ep(6001);
        let stranger = ep(6002);
        state.parent = Some(ep(5999));
        state.active_child = Some(active.clone());
        state.candidates = vec![];
        let outcome = state.on_probe(&middle, &stranger, true, vec![]);
        assert_eq!(outcome, ProbeOutcome::Bounce(stranger));
        assert_eq!(state.active_child, Some(active));
    }
}
