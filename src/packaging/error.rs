use thiserror::Error;

/// Reasons an image description cannot be rendered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackagingError {
    #[error("Image has no build stages")]
    NoStages,

    #[error("Base image '{image}' must pin major.minor with a floating patch (e.g. 1.85-slim)")]
    UnpinnedTag { image: String },

    #[error("Stage '{stage}' exposes port 0")]
    InvalidPort { stage: String },

    #[error("Stage '{stage}' has a CMD with no arguments")]
    EmptyCommand { stage: String },

    #[error("Launch command needs at least one worker")]
    InvalidWorkers,

    #[error("Final stage '{stage}' must declare {instruction}")]
    MissingInstruction {
        stage: String,
        instruction: &'static str,
    },

    #[error("Final stage '{stage}' declares {instruction} more than once")]
    DuplicateInstruction {
        stage: String,
        instruction: &'static str,
    },

    #[error("Stage '{stage}' copies the source tree before the dependency manifest")]
    LayerOrder { stage: String },

    #[error("Stage '{stage}' copies from unknown stage '{from}'")]
    UnknownStage { stage: String, from: String },
}

impl PackagingError {
    pub fn unpinned_tag(image: impl Into<String>) -> Self {
        Self::UnpinnedTag {
            image: image.into(),
        }
    }

    pub fn missing(stage: impl Into<String>, instruction: &'static str) -> Self {
        Self::MissingInstruction {
            stage: stage.into(),
            instruction,
        }
    }

    pub fn duplicate(stage: impl Into<String>, instruction: &'static str) -> Self {
        Self::DuplicateInstruction {
            stage: stage.into(),
            instruction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PackagingError::unpinned_tag("rust:latest");
        assert!(err.to_string().contains("rust:latest"));

        let err = PackagingError::missing("runtime", "CMD");
        assert_eq!(err.to_string(), "Final stage 'runtime' must declare CMD");
    }
}
