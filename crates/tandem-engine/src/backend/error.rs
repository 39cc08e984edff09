use std::fmt;

use super::{BackendKind, LifecycleState};

/// Initialization step that failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InitStage {
    /// Native API interface or window device context.
    Surface,
    /// Rendering device or rendering context.
    Device,
    /// Loading API extensions.
    Extensions,
    /// One-time render-state configuration.
    RenderState,
    /// Initialize called while the renderer is not uninitialized.
    AlreadyInitialized,
}

/// Backend initialization failure. Resources were already rolled back.
///
/// `message` is the human-readable text shown to the user.
/// `rollback_failures` lists resources the rollback could not release; empty
/// after a clean rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct InitError {
    pub backend: BackendKind,
    pub stage: InitStage,
    pub message: String,
    pub rollback_failures: Vec<String>,
}

impl InitError {
    pub fn new(backend: BackendKind, stage: InitStage, message: impl Into<String>) -> Self {
        Self {
            backend,
            stage,
            message: message.into(),
            rollback_failures: Vec::new(),
        }
    }

    /// True when every acquired resource was released.
    pub fn rolled_back_cleanly(&self) -> bool {
        self.rollback_failures.is_empty()
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for InitError {}

/// Frame-level device operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStage {
    Clear,
    BeginFrame,
    EndFrame,
    Present,
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameStage::Clear => "clear",
            FrameStage::BeginFrame => "begin frame",
            FrameStage::EndFrame => "end frame",
            FrameStage::Present => "present",
        })
    }
}

/// Classified device failure.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceFault {
    /// The device (or its surface) was lost and must be recreated.
    Lost,
    /// Video or system memory exhausted.
    OutOfMemory,
    /// Any other failure reported by the device call.
    Failed,
}

/// Per-renderable binding step, in submission order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindStep {
    Effect,
    MaterialUniforms,
    MaterialTextures,
    DrawCallUniforms,
    Mesh,
}

impl BindStep {
    /// Steps in the order they are issued for each renderable.
    pub const ORDER: [BindStep; 5] = [
        BindStep::Effect,
        BindStep::MaterialUniforms,
        BindStep::MaterialTextures,
        BindStep::DrawCallUniforms,
        BindStep::Mesh,
    ];
}

impl fmt::Display for BindStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindStep::Effect => "bind effect",
            BindStep::MaterialUniforms => "set material uniforms",
            BindStep::MaterialTextures => "set material textures",
            BindStep::DrawCallUniforms => "set draw-call uniforms",
            BindStep::Mesh => "draw mesh",
        })
    }
}

/// What the caller should do after a frame reported an error.
///
/// Ordered by severity, so the worst action of a frame is the maximum.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum RecoveryAction {
    /// Nothing to do; at most a single renderable was skipped.
    Continue,
    /// Transient failure; the next frame may proceed normally.
    SkipFrame,
    /// Device lost or out of memory: shut down and initialize again.
    RecreateDevice,
}

/// A failure recorded while rendering one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// Render was called outside the `Ready` state.
    NotReady(LifecycleState),

    /// A frame-level device operation failed; the rest of the frame was aborted.
    Device {
        stage: FrameStage,
        fault: DeviceFault,
        detail: String,
    },

    /// The source reported a size but returned nothing for this index.
    MissingRenderable { index: usize },

    /// A binding step failed; the renderable was not drawn.
    Renderable {
        index: usize,
        step: BindStep,
        detail: String,
    },
}

impl FrameError {
    pub fn device(stage: FrameStage, fault: DeviceFault, detail: impl Into<String>) -> Self {
        FrameError::Device {
            stage,
            fault,
            detail: detail.into(),
        }
    }

    pub fn action(&self) -> RecoveryAction {
        match self {
            FrameError::NotReady(_) => RecoveryAction::SkipFrame,
            FrameError::Device { fault, .. } => match fault {
                DeviceFault::Lost | DeviceFault::OutOfMemory => RecoveryAction::RecreateDevice,
                DeviceFault::Failed => RecoveryAction::SkipFrame,
            },
            FrameError::MissingRenderable { .. } | FrameError::Renderable { .. } => {
                RecoveryAction::Continue
            }
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::NotReady(state) => write!(f, "render called while renderer is {state}"),
            FrameError::Device {
                stage,
                fault,
                detail,
            } => {
                let what = match fault {
                    DeviceFault::Lost => "device lost",
                    DeviceFault::OutOfMemory => "out of memory",
                    DeviceFault::Failed => "failed",
                };
                write!(f, "{stage} {what}: {detail}")
            }
            FrameError::MissingRenderable { index } => {
                write!(f, "renderable {index} missing from source")
            }
            FrameError::Renderable {
                index,
                step,
                detail,
            } => write!(f, "renderable {index}: {step} failed: {detail}"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Release failures collected during a best-effort shutdown. Advisory only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownError {
    pub failures: Vec<String>,
}

impl ShutdownError {
    /// Converts a failure list into a result; empty means success.
    pub fn check(failures: Vec<String>) -> Result<(), ShutdownError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError { failures })
        }
    }
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shutdown finished with {} release failure(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ShutdownError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_loss_requires_recreation() {
        let lost = FrameError::device(FrameStage::Present, DeviceFault::Lost, "gone");
        assert_eq!(lost.action(), RecoveryAction::RecreateDevice);
        let oom = FrameError::device(FrameStage::Clear, DeviceFault::OutOfMemory, "full");
        assert_eq!(oom.action(), RecoveryAction::RecreateDevice);
    }

    #[test]
    fn renderable_failure_continues() {
        let e = FrameError::Renderable {
            index: 1,
            step: BindStep::MaterialTextures,
            detail: "sampler 0".into(),
        };
        assert_eq!(e.action(), RecoveryAction::Continue);
        assert_eq!(
            e.to_string(),
            "renderable 1: set material textures failed: sampler 0"
        );
    }

    #[test]
    fn recovery_actions_order_by_severity() {
        assert!(RecoveryAction::Continue < RecoveryAction::SkipFrame);
        assert!(RecoveryAction::SkipFrame < RecoveryAction::RecreateDevice);
    }

    #[test]
    fn shutdown_check_empty_is_ok() {
        assert!(ShutdownError::check(Vec::new()).is_ok());
        let err = ShutdownError::check(vec!["a".into(), "b".into()]).unwrap_err();
        assert_eq!(err.failures.len(), 2);
    }
}
