//! Setup and frame errors.

/// Stage at which the viewer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPhase {
    Config,
    Window,
    Adapter,
    Device,
    Surface,
    ShaderBuild,
    FrameRender,
    FrameSave,
}

impl std::fmt::Display for SetupPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupPhase::Config => write!(f, "Config"),
            SetupPhase::Window => write!(f, "Window"),
            SetupPhase::Adapter => write!(f, "Adapter"),
            SetupPhase::Device => write!(f, "Device"),
            SetupPhase::Surface => write!(f, "Surface"),
            SetupPhase::ShaderBuild => write!(f, "Shader Build"),
            SetupPhase::FrameRender => write!(f, "Frame Render"),
            SetupPhase::FrameSave => write!(f, "Frame Save"),
        }
    }
}

/// Structured viewer error. Everything before the first frame is fatal.
#[derive(Debug)]
pub struct ViewerError {
    pub phase: SetupPhase,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ViewerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.phase, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl ViewerError {
    pub fn new(phase: SetupPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        phase: SetupPhase,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            phase,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

pub type ViewerResult<T> = Result<T, ViewerError>;
