use crate::config::ConfigError;
use crate::feedback::FeedbackUnavailableError;
use crate::models::SelectionError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ConfigurationError: {0}")]
    ConfigurationError(#[from] ConfigError),
    #[error("SelectionError: {0}")]
    SelectionError(#[from] SelectionError),
    #[error("ChannelError: {0}")]
    ChannelError(#[from] FeedbackUnavailableError),
    #[error("EmptyMorphology: at least one gene is required")]
    EmptyMorphology,
    #[error("NoEvaluatedIndividuals")]
    NoEvaluatedIndividuals,
}
