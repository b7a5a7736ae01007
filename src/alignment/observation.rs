use crate::error::AlignmentError;
use crate::types::MusicalEvent;

/// Lazily filled observation-likelihood table over (frame, event) pairs.
///
/// Cells are write-once: the first lookup computes
/// `exp(Σ_b x[b] · ln τ[b])` from the frame spectrum `x` and the event
/// template `τ`, later lookups return the cached value. Sentinel states
/// carry no template and observe every frame with likelihood 1.
#[derive(Debug)]
pub struct ObservationModel<'a> {
    frames: &'a [Vec<f32>],
    events: &'a [MusicalEvent],
    values: Vec<f64>,
    computed: Vec<u64>,
}

impl<'a> ObservationModel<'a> {
    pub fn new(
        frames: &'a [Vec<f32>],
        events: &'a [MusicalEvent],
    ) -> Result<Self, AlignmentError> {
        if frames.is_empty() {
            return Err(AlignmentError::FeaturesUnavailable);
        }
        let cells = frames.len() * events.len();
        Ok(Self {
            frames,
            events,
            values: vec![0.0; cells],
            computed: vec![0; cells.div_ceil(64)],
        })
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Likelihood of `frame` under the template of `event`; `None` denotes
    /// a sentinel state and yields 1.
    pub fn likelihood(
        &mut self,
        frame: usize,
        event: Option<usize>,
    ) -> Result<f64, AlignmentError> {
        let Some(event) = event else {
            return Ok(1.0);
        };
        let cell = frame * self.events.len() + event;
        if self.computed[cell / 64] & (1 << (cell % 64)) == 0 {
            self.values[cell] = template_likelihood(
                &self.frames[frame],
                event,
                &self.events[event].template,
            )?;
            self.computed[cell / 64] |= 1 << (cell % 64);
        }
        Ok(self.values[cell])
    }
}

/// Direct (uncached) likelihood computation.
///
/// Log-space sums with a single final exponentiation keep small products
/// from underflowing; `0 · ln 0` counts as 0 and any positive-weight bin
/// over a zero template bin collapses the whole likelihood to 0, never NaN.
pub(crate) fn template_likelihood(
    frame: &[f32],
    event: usize,
    template: &[f32],
) -> Result<f64, AlignmentError> {
    if template.len() != frame.len() {
        return Err(AlignmentError::TemplateLengthMismatch {
            event,
            template_bins: template.len(),
            feature_bins: frame.len(),
        });
    }
    let mut acc = 0.0f64;
    for (x, tau) in frame.iter().zip(template) {
        if *x == 0.0 {
            continue;
        }
        if *tau <= 0.0 {
            return Ok(0.0);
        }
        acc += f64::from(*x) * f64::from(*tau).ln();
    }
    Ok(acc.exp())
}
