use crate::backend::{FrameError, RecoveryAction};

/// Outcome of one [`Renderer::render`](super::Renderer::render) call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Index of the frame; increments on every render call made while ready.
    pub frame_index: u64,

    /// Renderables the source held when the frame started.
    pub submitted: usize,

    /// Renderables whose mesh was drawn.
    pub drawn: usize,

    pub presented: bool,

    /// Failures in the order they happened. Each was reported once.
    pub errors: Vec<FrameError>,
}

impl FrameReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// The most severe action any error of this frame calls for.
    pub fn action(&self) -> RecoveryAction {
        self.errors
            .iter()
            .map(FrameError::action)
            .max()
            .unwrap_or(RecoveryAction::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BindStep, DeviceFault, FrameStage};

    #[test]
    fn worst_action_wins() {
        let mut report = FrameReport::default();
        assert_eq!(report.action(), RecoveryAction::Continue);

        report.errors.push(FrameError::Renderable {
            index: 0,
            step: BindStep::Mesh,
            detail: "bad buffer".into(),
        });
        assert_eq!(report.action(), RecoveryAction::Continue);

        report
            .errors
            .push(FrameError::device(FrameStage::Present, DeviceFault::Lost, "lost"));
        assert_eq!(report.action(), RecoveryAction::RecreateDevice);
        assert!(!report.is_clean());
    }
}
