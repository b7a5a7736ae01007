use std::path::PathBuf;

use crate::config::AlignerConfig;
use crate::error::AlignmentError;
use crate::pipeline::defaults::{HarmonicTemplateProvider, WindowedOnsetSelector};
use crate::pipeline::runtime::{SoloAligner, SoloAlignerParts};
use crate::pipeline::traits::{OnsetSelector, TemplateProvider};
use crate::score::Score;

pub struct SoloAlignerBuilder {
    config: AlignerConfig,
    score_path: Option<PathBuf>,
    score: Option<Score>,
    template_provider: Option<Box<dyn TemplateProvider>>,
    onset_selector: Option<Box<dyn OnsetSelector>>,
}

impl SoloAlignerBuilder {
    pub fn new(config: AlignerConfig) -> Self {
        Self {
            config,
            score_path: None,
            score: None,
            template_provider: None,
            onset_selector: None,
        }
    }

    pub fn with_score_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.score_path = Some(path.into());
        self
    }

    /// Use an already parsed score instead of loading one from disk.
    pub fn with_score(mut self, score: Score) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_template_provider(mut self, provider: Box<dyn TemplateProvider>) -> Self {
        self.template_provider = Some(provider);
        self
    }

    pub fn with_onset_selector(mut self, selector: Box<dyn OnsetSelector>) -> Self {
        self.onset_selector = Some(selector);
        self
    }

    pub fn build(self) -> Result<SoloAligner, AlignmentError> {
        self.config.validate()?;

        let mut score = match (self.score, self.score_path) {
            (Some(score), _) => score,
            (None, Some(path)) => Score::load(&path)?,
            (None, None) => {
                return Err(AlignmentError::invalid_input(
                    "builder needs a score or a score path",
                ))
            }
        };

        let template_provider = self
            .template_provider
            .unwrap_or_else(|| Box::new(HarmonicTemplateProvider));
        let note_templates =
            template_provider.note_templates(self.config.sample_rate_hz, self.config.block_size)?;
        score.attach_templates(&note_templates)?;

        Ok(SoloAligner::from_parts(SoloAlignerParts {
            config: self.config,
            score,
            onset_selector: self
                .onset_selector
                .unwrap_or_else(|| Box::new(WindowedOnsetSelector)),
        }))
    }
}
