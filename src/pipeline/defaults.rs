use crate::alignment::beam::Hypothesis;
use crate::alignment::hmm::StateChain;
use crate::alignment::posterior::select_onsets;
use crate::error::AlignmentError;
use crate::pipeline::traits::{OnsetSelector, TemplateProvider};
use crate::score::TEMPLATE_FLOOR;
use crate::types::{AlignmentResult, NoteTemplates, HIGH_MIDI, LOW_MIDI};

/// Number of harmonic partials synthesised per pitch.
const PARTIALS: usize = 12;
/// Amplitude ratio between consecutive partials.
const ROLLOFF: f64 = 0.8;

/// Synthesises one template per piano pitch from a harmonic series:
/// partials at integer multiples of the fundamental, geometrically
/// decaying, each placed in the nearest spectrum bin.
pub struct HarmonicTemplateProvider;

impl TemplateProvider for HarmonicTemplateProvider {
    fn note_templates(
        &self,
        sample_rate_hz: f32,
        block_size: usize,
    ) -> Result<NoteTemplates, AlignmentError> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(AlignmentError::invalid_input(format!(
                "sample rate must be positive, got {sample_rate_hz}"
            )));
        }
        if block_size == 0 {
            return Err(AlignmentError::invalid_input("block size must be positive"));
        }

        let bins = block_size / 2 + 1;
        let sample_rate = f64::from(sample_rate_hz);
        let nyquist = sample_rate / 2.0;
        let mut templates = NoteTemplates::new();
        for midi in LOW_MIDI..=HIGH_MIDI {
            let fundamental = 440.0 * 2f64.powf(f64::from(i32::from(midi) - 69) / 12.0);
            let mut template = vec![0.0f64; bins];
            let mut amplitude = 1.0;
            for partial in 1..=PARTIALS {
                let frequency = partial as f64 * fundamental;
                if frequency >= nyquist {
                    break;
                }
                let bin = (frequency * block_size as f64 / sample_rate).round() as usize;
                template[bin] += amplitude;
                amplitude *= ROLLOFF;
            }
            for value in &mut template {
                *value = value.max(TEMPLATE_FLOOR);
            }
            let total: f64 = template.iter().sum();
            templates.insert(midi, template.iter().map(|v| (v / total) as f32).collect());
        }
        Ok(templates)
    }
}

/// Default onset selection: the sliding-window posterior vote.
pub struct WindowedOnsetSelector;

impl OnsetSelector for WindowedOnsetSelector {
    fn select_onsets(
        &self,
        posteriors: &[Vec<Hypothesis>],
        chain: &StateChain,
        window_size: usize,
    ) -> AlignmentResult {
        select_onsets(posteriors, chain, window_size)
    }
}
