use crate::error::AlignmentError;
use crate::types::MusicalEvent;

/// Quarter-note durations are scaled by this factor when converted to
/// seconds, mirroring the duration convention of the score format.
const DURATION_SCALE: f64 = 4.0;

/// Target standard deviation of an event's sojourn time, as a fraction of
/// its notated length in frames.
const SOJOURN_CV: f64 = 0.25;

/// Where a hidden state sits relative to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    /// Waiting state before the first event sounds.
    Start,
    /// Micro-state `micro` inside score event `event`.
    Mid { event: usize, micro: usize },
    /// Absorbing state after the last event has finished.
    End,
}

#[derive(Debug, Clone, Copy)]
struct StateNode {
    kind: StateKind,
    self_loop: f64,
    /// Probability of advancing to the next state id; `None` only for the
    /// end sentinel.
    advance: Option<f64>,
}

/// The left-to-right state chain: a dense array of states whose index is
/// the state id. Id 0 is the start sentinel, the last id the end sentinel,
/// and every event's micro-states sit between them in score order.
#[derive(Debug, Clone)]
pub struct StateChain {
    nodes: Vec<StateNode>,
    entries: Vec<usize>,
}

impl StateChain {
    /// Materialise the chain for an event list at the given frame rate.
    ///
    /// Each event becomes `M_e` micro-states sharing a self-loop `p_e`,
    /// chosen so the chain's sojourn mean matches the event's notated
    /// length in frames with a standard deviation of [`SOJOURN_CV`] times
    /// the mean.
    pub fn build(
        events: &[MusicalEvent],
        sample_rate_hz: f32,
        hop_size: usize,
        start_self_loop: f64,
    ) -> Result<Self, AlignmentError> {
        if hop_size == 0 {
            return Err(AlignmentError::InvalidHopSize);
        }
        if events.is_empty() {
            return Err(AlignmentError::invalid_input("score has no events"));
        }

        let mut nodes = vec![StateNode {
            kind: StateKind::Start,
            self_loop: start_self_loop,
            advance: Some(1.0 - start_self_loop),
        }];
        let mut entries = Vec::with_capacity(events.len());

        for (event, e) in events.iter().enumerate() {
            let (micro_states, self_loop) =
                sojourn_chain(event, e.duration, e.tempo, sample_rate_hz, hop_size)?;
            tracing::debug!(event, micro_states, self_loop, "event sojourn chain");
            entries.push(nodes.len());
            for micro in 0..micro_states {
                nodes.push(StateNode {
                    kind: StateKind::Mid { event, micro },
                    self_loop,
                    advance: Some(1.0 - self_loop),
                });
            }
        }

        nodes.push(StateNode {
            kind: StateKind::End,
            self_loop: 1.0,
            advance: None,
        });

        Ok(Self { nodes, entries })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn num_events(&self) -> usize {
        self.entries.len()
    }

    pub fn start_id(&self) -> usize {
        0
    }

    pub fn end_id(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn kind(&self, id: usize) -> StateKind {
        self.nodes[id].kind
    }

    /// State id of `(event, 0)`, the micro-state whose posterior marks the
    /// event's onset.
    pub fn entry_state(&self, event: usize) -> usize {
        self.entries[event]
    }

    /// Score event a state observes, or `None` for the sentinels.
    pub fn event_of(&self, id: usize) -> Option<usize> {
        match self.nodes[id].kind {
            StateKind::Mid { event, .. } => Some(event),
            StateKind::Start | StateKind::End => None,
        }
    }

    /// Outgoing edges of `id`: the self-loop, then the advance edge.
    pub fn successors(&self, id: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let node = &self.nodes[id];
        std::iter::once((id, node.self_loop))
            .chain(node.advance.map(|p| (id + 1, p)))
    }

    /// Incoming edges of `id`: the self-loop, then the previous state's
    /// advance edge.
    pub fn predecessors(&self, id: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let node = &self.nodes[id];
        let upstream = id
            .checked_sub(1)
            .and_then(|prev| self.nodes[prev].advance.map(|p| (prev, p)));
        std::iter::once((id, node.self_loop)).chain(upstream)
    }
}

/// Micro-state count and common self-loop probability for one event.
fn sojourn_chain(
    event: usize,
    duration: f64,
    tempo: f64,
    sample_rate_hz: f32,
    hop_size: usize,
) -> Result<(usize, f64), AlignmentError> {
    if !(tempo > 0.0) {
        return Err(AlignmentError::InvalidTempo { event, tempo });
    }
    let seconds = duration * DURATION_SCALE * 60.0 / tempo;
    let frames = seconds * f64::from(sample_rate_hz) / hop_size as f64;
    if !frames.is_finite() || frames <= 0.0 {
        return Err(AlignmentError::invalid_input(format!(
            "event {event} spans {frames} frames"
        )));
    }
    let variance = (SOJOURN_CV * SOJOURN_CV) * frames * frames;
    let micro_states = (frames * frames / (variance + frames)).round().max(1.0) as usize;
    let self_loop = (1.0 - micro_states as f64 / frames).max(0.0);
    Ok((micro_states, self_loop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Template;

    fn event(duration: f64, tempo: f64) -> MusicalEvent {
        MusicalEvent {
            duration,
            tempo,
            pitches: vec![60],
            template: Template::new(),
        }
    }

    #[test]
    fn sojourn_chain_matches_hand_computed_values() {
        // 0.5 qn at 120 qpm, 48 kHz / 768 hop: 62.5 frames.
        let (m, p) = sojourn_chain(0, 0.5, 120.0, 48_000.0, 768).unwrap();
        assert_eq!(m, 13);
        assert!((p - (1.0 - 13.0 / 62.5)).abs() < 1e-12);
    }

    #[test]
    fn sojourn_chain_degenerates_to_pass_through_states() {
        // 2 frames: the rounded count exceeds what a geometric fit allows,
        // so the self-loop clamps to zero.
        let (m, p) = sojourn_chain(0, 0.5, 60.0, 1_000.0, 1_000).unwrap();
        assert_eq!(m, 2);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn sojourn_chain_clamps_sub_frame_events() {
        let (m, p) = sojourn_chain(0, 0.001, 240.0, 48_000.0, 48_000).unwrap();
        assert_eq!(m, 1);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn zero_tempo_is_rejected() {
        let err = StateChain::build(&[event(1.0, 0.0)], 48_000.0, 768, 0.975).unwrap_err();
        assert!(matches!(err, AlignmentError::InvalidTempo { event: 0, .. }));
    }

    #[test]
    fn zero_hop_size_is_rejected() {
        let err = StateChain::build(&[event(1.0, 120.0)], 48_000.0, 0, 0.975).unwrap_err();
        assert!(matches!(err, AlignmentError::InvalidHopSize));
    }

    #[test]
    fn chain_layout_and_sentinels() {
        let events = vec![event(0.5, 120.0), event(0.25, 120.0)];
        let chain = StateChain::build(&events, 48_000.0, 768, 0.975).unwrap();

        assert_eq!(chain.kind(chain.start_id()), StateKind::Start);
        assert_eq!(chain.kind(chain.end_id()), StateKind::End);
        assert_eq!(chain.num_events(), 2);
        assert_eq!(chain.entry_state(0), 1);
        assert_eq!(
            chain.kind(chain.entry_state(1)),
            StateKind::Mid { event: 1, micro: 0 }
        );
        // Every interior id is a micro-state in non-decreasing event order.
        let mut last_event = 0;
        for id in 1..chain.end_id() {
            match chain.kind(id) {
                StateKind::Mid { event, .. } => {
                    assert!(event >= last_event);
                    last_event = event;
                }
                other => panic!("unexpected kind {other:?} at id {id}"),
            }
        }
    }

    #[test]
    fn outgoing_probabilities_sum_to_one() {
        let events = vec![event(1.0, 90.0), event(0.5, 140.0), event(2.0, 60.0)];
        let chain = StateChain::build(&events, 44_100.0, 512, 0.975).unwrap();
        for id in 0..chain.len() {
            let total: f64 = chain.successors(id).map(|(_, p)| p).sum();
            assert!(
                (total - 1.0).abs() < 1e-9,
                "state {id} outgoing mass {total}"
            );
        }
    }

    #[test]
    fn successor_and_predecessor_views_are_consistent() {
        let events = vec![event(1.0, 90.0), event(0.5, 140.0)];
        let chain = StateChain::build(&events, 44_100.0, 512, 0.975).unwrap();
        for id in 0..chain.len() {
            for (dest, p) in chain.successors(id) {
                let back: Vec<_> = chain
                    .predecessors(dest)
                    .filter(|&(src, q)| src == id && q == p)
                    .collect();
                assert_eq!(back.len(), 1, "edge {id}->{dest} missing from predecessors");
            }
            for (src, p) in chain.predecessors(id) {
                let fwd: Vec<_> = chain
                    .successors(src)
                    .filter(|&(dest, q)| dest == id && q == p)
                    .collect();
                assert_eq!(fwd.len(), 1, "edge {src}->{id} missing from successors");
            }
        }
    }

    #[test]
    fn chain_is_strictly_left_to_right() {
        let events = vec![event(1.0, 90.0), event(0.5, 140.0)];
        let chain = StateChain::build(&events, 44_100.0, 512, 0.975).unwrap();
        for id in 0..chain.len() {
            for (dest, _) in chain.successors(id) {
                if let (StateKind::Mid { event: e0, micro: m0 }, StateKind::Mid { event: e1, micro: m1 }) =
                    (chain.kind(id), chain.kind(dest))
                {
                    assert!(e1 >= e0);
                    if e1 == e0 {
                        assert!(m1 == m0 || m1 == m0 + 1);
                    }
                }
            }
        }
        // Sentinels: start has no predecessor but itself, end no successor
        // but itself.
        assert_eq!(chain.predecessors(chain.start_id()).count(), 1);
        assert_eq!(chain.successors(chain.end_id()).count(), 1);
    }
}
