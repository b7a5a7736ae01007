use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("score load failed: {message}")]
    ScoreLoad { message: String },
    #[error("features are not supplied; feed feature frames before aligning")]
    FeaturesUnavailable,
    #[error("hop size must be a positive number of samples")]
    InvalidHopSize,
    #[error("event {event} has non-positive tempo {tempo}")]
    InvalidTempo { event: usize, tempo: f64 },
    #[error(
        "template for event {event} has {template_bins} bins but feature frames carry {feature_bins}"
    )]
    TemplateLengthMismatch {
        event: usize,
        template_bins: usize,
        feature_bins: usize,
    },
    #[error("{pass} pass lost all probability mass at frame {frame}")]
    InferenceDegenerate { pass: &'static str, frame: usize },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl AlignmentError {
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn score_load(message: impl Into<String>) -> Self {
        Self::ScoreLoad {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}
