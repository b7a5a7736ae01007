use crate::alignment::beam::Hypothesis;
use crate::alignment::hmm::StateChain;
use crate::error::AlignmentError;
use crate::types::{AlignmentResult, NoteTemplates};

/// Source of per-pitch spectral templates.
///
/// The default implementation synthesises harmonic templates; hosts with
/// measured piano templates substitute their own provider.
pub trait TemplateProvider: Send + Sync {
    fn note_templates(
        &self,
        sample_rate_hz: f32,
        block_size: usize,
    ) -> Result<NoteTemplates, AlignmentError>;
}

/// Reduction of per-frame posteriors to one onset frame per score event.
pub trait OnsetSelector: Send + Sync {
    fn select_onsets(
        &self,
        posteriors: &[Vec<Hypothesis>],
        chain: &StateChain,
        window_size: usize,
    ) -> AlignmentResult;
}
