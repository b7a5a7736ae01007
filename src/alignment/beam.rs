use std::cmp::Ordering;

use crate::alignment::hmm::StateChain;
use crate::alignment::observation::ObservationModel;
use crate::error::AlignmentError;

/// One surviving (state, probability) pair in a beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypothesis {
    pub state: usize,
    pub prob: f64,
}

/// Reusable accumulation buffers for one frame of proposals.
///
/// Proposals are summed per destination state in arrival order, then the
/// coalesced hypotheses are sorted by probability (state id breaking
/// ties), truncated to the beam width, and renormalised. Keeping the
/// merge in a dense column avoids keyed maps on the hot path while
/// preserving a fixed summation order.
struct ProposalScratch {
    mass: Vec<f64>,
    seen: Vec<bool>,
    touched: Vec<usize>,
}

impl ProposalScratch {
    fn new(num_states: usize) -> Self {
        Self {
            mass: vec![0.0; num_states],
            seen: vec![false; num_states],
            touched: Vec::with_capacity(num_states),
        }
    }

    fn add(&mut self, state: usize, amount: f64) {
        if !self.seen[state] {
            self.seen[state] = true;
            self.touched.push(state);
        }
        self.mass[state] += amount;
    }

    fn finish_frame(
        &mut self,
        beam_width: usize,
        pass: &'static str,
        frame: usize,
    ) -> Result<Vec<Hypothesis>, AlignmentError> {
        self.touched.sort_unstable();
        let mut beam: Vec<Hypothesis> = self
            .touched
            .iter()
            .map(|&state| Hypothesis {
                state,
                prob: self.mass[state],
            })
            .collect();
        for &state in &self.touched {
            self.mass[state] = 0.0;
            self.seen[state] = false;
        }
        self.touched.clear();

        beam.sort_by(|a, b| {
            b.prob
                .partial_cmp(&a.prob)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.state.cmp(&b.state))
        });
        beam.truncate(beam_width);

        let total: f64 = beam.iter().map(|h| h.prob).sum();
        if total == 0.0 {
            return Err(AlignmentError::InferenceDegenerate { pass, frame });
        }
        for hypothesis in &mut beam {
            hypothesis.prob /= total;
        }
        Ok(beam)
    }
}

/// Beam-pruned forward probabilities, one normalised beam per frame.
pub fn forward_pass(
    chain: &StateChain,
    observations: &mut ObservationModel<'_>,
    beam_width: usize,
) -> Result<Vec<Vec<Hypothesis>>, AlignmentError> {
    let num_frames = observations.num_frames();
    let mut beams = Vec::with_capacity(num_frames);
    beams.push(vec![Hypothesis {
        state: chain.start_id(),
        prob: 1.0,
    }]);

    let mut scratch = ProposalScratch::new(chain.len());
    for frame in 1..num_frames {
        for hypothesis in &beams[frame - 1] {
            for (dest, trans) in chain.successors(hypothesis.state) {
                let like = observations.likelihood(frame, chain.event_of(dest))?;
                scratch.add(dest, hypothesis.prob * trans * like);
            }
        }
        beams.push(scratch.finish_frame(beam_width, "forward", frame)?);
    }
    Ok(beams)
}

/// Beam-pruned backward probabilities, symmetric to [`forward_pass`].
///
/// The likelihood is taken at the destination frame `t + 1`, matching the
/// factorisation `P(x_{t+1..} | s_t) = Σ_{s'} P(s'|s_t) L(t+1, s')
/// β_{t+1}(s')`.
pub fn backward_pass(
    chain: &StateChain,
    observations: &mut ObservationModel<'_>,
    beam_width: usize,
) -> Result<Vec<Vec<Hypothesis>>, AlignmentError> {
    let num_frames = observations.num_frames();
    let mut beams = vec![Vec::new(); num_frames];
    beams[num_frames - 1] = vec![Hypothesis {
        state: chain.end_id(),
        prob: 1.0,
    }];

    let mut scratch = ProposalScratch::new(chain.len());
    for frame in (0..num_frames - 1).rev() {
        for hypothesis in &beams[frame + 1] {
            let like = observations.likelihood(frame + 1, chain.event_of(hypothesis.state))?;
            for (src, trans) in chain.predecessors(hypothesis.state) {
                scratch.add(src, hypothesis.prob * trans * like);
            }
        }
        beams[frame] = scratch.finish_frame(beam_width, "backward", frame)?;
    }
    Ok(beams)
}
