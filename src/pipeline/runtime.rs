use crate::alignment::beam::{backward_pass, forward_pass};
use crate::alignment::hmm::StateChain;
use crate::alignment::observation::ObservationModel;
use crate::alignment::posterior::frame_posteriors;
use crate::config::AlignerConfig;
use crate::error::AlignmentError;
use crate::pipeline::traits::OnsetSelector;
use crate::score::Score;
use crate::types::AlignmentResult;

/// The assembled aligner: a score with templates attached, the run
/// configuration, and the feature frames supplied so far.
pub struct SoloAligner {
    config: AlignerConfig,
    score: Score,
    features: Vec<Vec<f32>>,
    onset_selector: Box<dyn OnsetSelector>,
}

impl std::fmt::Debug for SoloAligner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoloAligner")
            .field("config", &self.config)
            .field("score", &self.score)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

pub(crate) struct SoloAlignerParts {
    pub config: AlignerConfig,
    pub score: Score,
    pub onset_selector: Box<dyn OnsetSelector>,
}

impl SoloAligner {
    pub(crate) fn from_parts(parts: SoloAlignerParts) -> Self {
        Self {
            config: parts.config,
            score: parts.score,
            features: Vec::new(),
            onset_selector: parts.onset_selector,
        }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn num_frames(&self) -> usize {
        self.features.len()
    }

    /// Append one spectral feature frame. Frames must arrive in time
    /// order, all with the same bin count, every bin finite and
    /// non-negative.
    pub fn supply_feature(&mut self, frame: Vec<f32>) -> Result<(), AlignmentError> {
        if frame.is_empty() {
            return Err(AlignmentError::invalid_input("feature frame is empty"));
        }
        if let Some(first) = self.features.first() {
            if frame.len() != first.len() {
                return Err(AlignmentError::invalid_input(format!(
                    "feature frame {} has {} bins, previous frames have {}",
                    self.features.len(),
                    frame.len(),
                    first.len()
                )));
            }
        }
        if frame.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(AlignmentError::invalid_input(format!(
                "feature frame {} contains negative or non-finite bins",
                self.features.len()
            )));
        }
        self.features.push(frame);
        Ok(())
    }

    /// Align the supplied feature sequence against the score: build the
    /// state chain, run the beam-pruned forward and backward passes, and
    /// vote each event's onset frame out of the combined posteriors.
    pub fn align(&self) -> Result<AlignmentResult, AlignmentError> {
        if self.features.is_empty() {
            return Err(AlignmentError::FeaturesUnavailable);
        }

        let chain = StateChain::build(
            self.score.events(),
            self.config.sample_rate_hz,
            self.config.hop_size,
            self.config.start_self_loop,
        )?;
        if self.features.len() + 1 < chain.len() {
            tracing::warn!(
                frames = self.features.len(),
                states = chain.len(),
                "feature sequence is shorter than the state chain; early events may get no posterior mass"
            );
        }

        let mut observations = ObservationModel::new(&self.features, self.score.events())?;
        let forward = forward_pass(&chain, &mut observations, self.config.beam_width)?;
        let backward = backward_pass(&chain, &mut observations, self.config.beam_width)?;
        let posteriors = frame_posteriors(&forward, &backward);
        let results =
            self.onset_selector
                .select_onsets(&posteriors, &chain, self.config.window_size);

        debug_assert_eq!(results.len(), self.score.events().len());
        tracing::debug!(
            frames = self.features.len(),
            events = results.len(),
            "alignment finished"
        );
        Ok(results)
    }
}
