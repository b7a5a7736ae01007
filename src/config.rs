use crate::error::AlignmentError;

#[derive(Debug, Clone)]
pub struct AlignerConfig {
    /// Sample rate of the analysed audio in Hz.
    pub sample_rate_hz: f32,
    /// Hop size between consecutive feature frames, in samples.
    pub hop_size: usize,
    /// Analysis block size in samples; feature frames and note templates
    /// carry `block_size / 2 + 1` spectrum bins.
    pub block_size: usize,
    /// Maximum surviving hypotheses per frame in each inference pass.
    pub beam_width: usize,
    /// Width of the posterior averaging window when picking event onsets.
    /// Must be odd.
    pub window_size: usize,
    /// Self-loop probability of the pre-score waiting state.
    pub start_self_loop: f64,
}

impl AlignerConfig {
    pub const DEFAULT_SAMPLE_RATE_HZ: f32 = 48_000.0;
    pub const DEFAULT_HOP_SIZE: usize = 768;
    pub const DEFAULT_BLOCK_SIZE: usize = 1024;
    pub const DEFAULT_BEAM_WIDTH: usize = 200;
    pub const DEFAULT_WINDOW_SIZE: usize = 3;
    pub const DEFAULT_START_SELF_LOOP: f64 = 0.975;

    pub fn new(sample_rate_hz: f32, hop_size: usize, block_size: usize) -> Self {
        Self {
            sample_rate_hz,
            hop_size,
            block_size,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), AlignmentError> {
        if self.hop_size == 0 {
            return Err(AlignmentError::InvalidHopSize);
        }
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(AlignmentError::invalid_input(format!(
                "sample rate must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if self.block_size == 0 {
            return Err(AlignmentError::invalid_input("block size must be positive"));
        }
        if self.beam_width == 0 {
            return Err(AlignmentError::invalid_input("beam width must be positive"));
        }
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(AlignmentError::invalid_input(format!(
                "window size must be odd and positive, got {}",
                self.window_size
            )));
        }
        if !(self.start_self_loop > 0.0 && self.start_self_loop < 1.0) {
            return Err(AlignmentError::invalid_input(format!(
                "start self-loop must lie in (0, 1), got {}",
                self.start_self_loop
            )));
        }
        Ok(())
    }
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: Self::DEFAULT_SAMPLE_RATE_HZ,
            hop_size: Self::DEFAULT_HOP_SIZE,
            block_size: Self::DEFAULT_BLOCK_SIZE,
            beam_width: Self::DEFAULT_BEAM_WIDTH,
            window_size: Self::DEFAULT_WINDOW_SIZE,
            start_self_loop: Self::DEFAULT_START_SELF_LOOP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligner_config_default() {
        let config = AlignerConfig::default();
        assert_eq!(config.beam_width, 200);
        assert_eq!(config.window_size, 3);
        assert!((config.start_self_loop - 0.975).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_hop_size_is_rejected() {
        let config = AlignerConfig::new(48_000.0, 0, 1024);
        assert!(matches!(
            config.validate(),
            Err(AlignmentError::InvalidHopSize)
        ));
    }

    #[test]
    fn even_window_size_is_rejected() {
        let mut config = AlignerConfig::default();
        config.window_size = 4;
        assert!(matches!(
            config.validate(),
            Err(AlignmentError::InvalidInput { .. })
        ));
    }

    #[test]
    fn start_self_loop_must_be_a_probability() {
        let mut config = AlignerConfig::default();
        config.start_self_loop = 1.0;
        assert!(config.validate().is_err());
        config.start_self_loop = 0.0;
        assert!(config.validate().is_err());
        config.start_self_loop = 0.5;
        assert!(config.validate().is_ok());
    }
}
