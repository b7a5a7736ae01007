//! Score model: the ordered event list plus per-event spectral templates.

mod parser;

use std::path::Path;

use crate::error::AlignmentError;
use crate::types::{MusicalEvent, NoteTemplates, Template};

/// Floor applied to every composite template bin so the observation model
/// never takes `ln 0`.
pub(crate) const TEMPLATE_FLOOR: f64 = 1e-6;

/// A parsed score: immutable event sequence, each event carrying a
/// composite spectral template once `attach_templates` has run.
#[derive(Debug, Clone)]
pub struct Score {
    events: Vec<MusicalEvent>,
}

impl Score {
    /// Load a `.solo` file from disk.
    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AlignmentError::score_load(format!("reading {}: {e}", path.display()))
        })?;
        let score = Self::from_text(&text)?;
        tracing::debug!(
            path = %path.display(),
            events = score.events.len(),
            "loaded score"
        );
        Ok(score)
    }

    /// Parse score text directly; the file-based `load` delegates here.
    pub fn from_text(text: &str) -> Result<Self, AlignmentError> {
        Ok(Self {
            events: parser::parse_solo_text(text)?,
        })
    }

    /// Synthesise one composite template per event from the per-pitch note
    /// templates: bin-wise mean over the event's pitch set (uniform for a
    /// rest), floored and renormalised so every bin is strictly positive
    /// and the bins sum to 1.
    pub fn attach_templates(
        &mut self,
        note_templates: &NoteTemplates,
    ) -> Result<(), AlignmentError> {
        let bins = note_templates
            .values()
            .next()
            .map(Vec::len)
            .ok_or_else(|| AlignmentError::invalid_input("note template map is empty"))?;
        for (pitch, template) in note_templates {
            if template.len() != bins {
                return Err(AlignmentError::invalid_input(format!(
                    "note template for pitch {pitch} has {} bins, expected {bins}",
                    template.len()
                )));
            }
        }

        for (index, event) in self.events.iter_mut().enumerate() {
            event.template = compose_event_template(index, &event.pitches, note_templates, bins)?;
        }
        tracing::debug!(events = self.events.len(), bins, "attached event templates");
        Ok(())
    }

    pub fn events(&self) -> &[MusicalEvent] {
        &self.events
    }
}

fn compose_event_template(
    event: usize,
    pitches: &[u8],
    note_templates: &NoteTemplates,
    bins: usize,
) -> Result<Template, AlignmentError> {
    let mut mix = vec![0.0f64; bins];
    if pitches.is_empty() {
        // A rest has no spectral expectation; use a flat template.
        mix.fill(1.0);
    } else {
        for pitch in pitches {
            let template = note_templates.get(pitch).ok_or_else(|| {
                AlignmentError::invalid_input(format!(
                    "event {event}: no note template for pitch {pitch}"
                ))
            })?;
            for (acc, value) in mix.iter_mut().zip(template) {
                *acc += f64::from(*value);
            }
        }
        let count = pitches.len() as f64;
        for value in &mut mix {
            *value /= count;
        }
    }

    for value in &mut mix {
        *value = value.max(TEMPLATE_FLOOR);
    }
    let total: f64 = mix.iter().sum();
    Ok(mix.iter().map(|v| (v / total) as f32).collect())
}
