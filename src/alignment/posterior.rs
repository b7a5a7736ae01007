use std::collections::HashMap;

use crate::alignment::beam::Hypothesis;
use crate::alignment::hmm::StateChain;
use crate::types::AlignmentResult;

/// Per-frame posterior mass `γ_t(s) = α_t(s) · β_t(s)` over the states
/// present in both beams at `t`. States pruned from either beam contribute
/// nothing. The products are deliberately not renormalised: the windowed
/// vote compares sums across frames, so the per-frame scale must be left
/// alone.
pub fn frame_posteriors(
    forward: &[Vec<Hypothesis>],
    backward: &[Vec<Hypothesis>],
) -> Vec<Vec<Hypothesis>> {
    forward
        .iter()
        .zip(backward)
        .map(|(fwd, bwd)| {
            let bwd_by_state: HashMap<usize, f64> =
                bwd.iter().map(|h| (h.state, h.prob)).collect();
            fwd.iter()
                .filter_map(|h| {
                    bwd_by_state.get(&h.state).map(|&b| Hypothesis {
                        state: h.state,
                        prob: h.prob * b,
                    })
                })
                .collect()
        })
        .collect()
}

/// Pick one onset frame per event by sliding a `window_size`-wide window
/// over the posterior mass of the event's entry micro-state.
///
/// The candidate range for event `e` starts just before the previous
/// event's onset, which keeps the result weakly monotone without
/// forbidding shared frames. A window with no positive mass anywhere makes
/// the event inherit the previous onset (frame 0 for the first event).
pub fn select_onsets(
    posteriors: &[Vec<Hypothesis>],
    chain: &StateChain,
    window_size: usize,
) -> AlignmentResult {
    let num_frames = posteriors.len();
    let num_events = chain.num_events();
    let half = window_size / 2;

    let mut entry_event = vec![None; chain.len()];
    for event in 0..num_events {
        entry_event[chain.entry_state(event)] = Some(event);
    }
    let mut entry_mass = vec![vec![0.0f64; num_frames]; num_events];
    for (frame, hypotheses) in posteriors.iter().enumerate() {
        for h in hypotheses {
            if let Some(event) = entry_event[h.state] {
                entry_mass[event][frame] += h.prob;
            }
        }
    }

    let mut results = Vec::with_capacity(num_events);
    for event in 0..num_events {
        let start = match results.last() {
            None => 0,
            Some(&previous) => (previous as usize + 1).saturating_sub(half),
        };
        let mut best_score = 0.0;
        let mut best = None;
        if let Some(last) = num_frames.checked_sub(window_size) {
            for candidate in start..=last {
                let score: f64 = entry_mass[event][candidate..candidate + window_size]
                    .iter()
                    .sum();
                if score > best_score {
                    best_score = score;
                    best = Some(candidate + half);
                }
            }
        }
        results.push(best.unwrap_or_else(|| results.last().copied().unwrap_or(0)));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MusicalEvent, Template};

    fn chain_for(num_events: usize) -> StateChain {
        let events: Vec<MusicalEvent> = (0..num_events)
            .map(|_| MusicalEvent {
                duration: 0.5,
                tempo: 60.0,
                pitches: vec![60],
                template: Template::new(),
            })
            .collect();
        // 2 pass-through micro-states per event at this frame rate.
        StateChain::build(&events, 1_000.0, 1_000, 0.975).unwrap()
    }

    fn hyp(state: usize, prob: f64) -> Hypothesis {
        Hypothesis { state, prob }
    }

    #[test]
    fn posterior_is_the_product_over_the_beam_intersection() {
        let forward = vec![vec![hyp(0, 0.6), hyp(1, 0.4)]];
        let backward = vec![vec![hyp(1, 0.5), hyp(2, 0.5)]];
        let post = frame_posteriors(&forward, &backward);
        assert_eq!(post.len(), 1);
        assert_eq!(post[0], vec![hyp(1, 0.2)]);
    }

    #[test]
    fn vote_picks_the_window_with_the_most_entry_mass() {
        let chain = chain_for(1);
        let entry = chain.entry_state(0);
        // Entry mass 0, 0.1, 0.7, 0.1, 0, 0: the best 3-wide window starts
        // at frame 1, so the reported onset is its centre, frame 2.
        let mass = [0.0, 0.1, 0.7, 0.1, 0.0, 0.0];
        let posteriors: Vec<Vec<Hypothesis>> =
            mass.iter().map(|&m| vec![hyp(entry, m)]).collect();
        assert_eq!(select_onsets(&posteriors, &chain, 3), vec![2]);
    }

    #[test]
    fn ties_break_toward_the_earliest_window() {
        let chain = chain_for(1);
        let entry = chain.entry_state(0);
        let posteriors: Vec<Vec<Hypothesis>> =
            [0.5, 0.5, 0.5, 0.5, 0.5].iter().map(|&m| vec![hyp(entry, m)]).collect();
        // All windows score 1.5; the first (starting at 0) wins.
        assert_eq!(select_onsets(&posteriors, &chain, 3), vec![1]);
    }

    #[test]
    fn events_without_mass_inherit_the_previous_onset() {
        let chain = chain_for(2);
        let entry0 = chain.entry_state(0);
        let posteriors: Vec<Vec<Hypothesis>> = (0..6)
            .map(|frame| {
                if frame == 3 {
                    vec![hyp(entry0, 0.9)]
                } else {
                    Vec::new()
                }
            })
            .collect();
        // Every window containing the lone spike at frame 3 ties, so the
        // earliest (starting at frame 1) wins and reports its centre.
        // Event 1's entry state never appears, so it rides along with
        // event 0.
        assert_eq!(select_onsets(&posteriors, &chain, 3), vec![2, 2]);
    }

    #[test]
    fn first_event_without_mass_falls_back_to_frame_zero() {
        let chain = chain_for(1);
        let posteriors: Vec<Vec<Hypothesis>> = (0..4).map(|_| Vec::new()).collect();
        assert_eq!(select_onsets(&posteriors, &chain, 3), vec![0]);
    }

    #[test]
    fn too_few_frames_for_any_window_inherits() {
        let chain = chain_for(2);
        let posteriors = vec![Vec::new(), Vec::new()];
        assert_eq!(select_onsets(&posteriors, &chain, 3), vec![0, 0]);
    }

    #[test]
    fn candidate_range_is_anchored_just_before_the_previous_onset() {
        let chain = chain_for(2);
        let entry0 = chain.entry_state(0);
        let entry1 = chain.entry_state(1);
        // Event 1 has a big early peak that lies before event 0's onset;
        // the anchored candidate range excludes it, so event 1 settles on
        // the later, smaller peak at frame 6.
        let mut posteriors: Vec<Vec<Hypothesis>> = (0..10).map(|_| Vec::new()).collect();
        posteriors[4] = vec![hyp(entry0, 0.8), hyp(entry1, 0.0)];
        posteriors[1] = vec![hyp(entry1, 0.9)];
        posteriors[6] = vec![hyp(entry1, 0.3)];
        let results = select_onsets(&posteriors, &chain, 3);
        assert_eq!(results, vec![3, 5]);
    }
}
