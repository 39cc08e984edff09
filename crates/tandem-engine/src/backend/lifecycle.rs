use std::fmt;

/// Renderer lifecycle.
///
/// ```text
/// Uninitialized --initialize ok--> Ready --shutdown--> ShuttingDown --> Uninitialized
///       ^                                                                 |
///       +-------------------------- initialize failed (rolled back) -----+
/// ```
///
/// Per-frame device calls are only valid in `Ready`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Ready,
    ShuttingDown,
}

impl LifecycleState {
    #[inline]
    pub fn is_ready(self) -> bool {
        self == LifecycleState::Ready
    }

    /// Returns the state after `event`, or `None` if the transition is not
    /// allowed from `self`.
    pub fn next(self, event: LifecycleEvent) -> Option<LifecycleState> {
        use LifecycleEvent::*;
        use LifecycleState::*;

        match (self, event) {
            (Uninitialized, Initialized) => Some(Ready),
            (Uninitialized, InitializeFailed) => Some(Uninitialized),
            (Ready, ShutdownStarted) => Some(ShuttingDown),
            (ShuttingDown, ShutdownFinished) => Some(Uninitialized),
            // Shutdown on an uninitialized renderer is a no-op.
            (Uninitialized, ShutdownStarted) | (Uninitialized, ShutdownFinished) => {
                Some(Uninitialized)
            }
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Ready => "ready",
            LifecycleState::ShuttingDown => "shutting down",
        };
        f.write_str(name)
    }
}

/// Events driving [`LifecycleState::next`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LifecycleEvent {
    Initialized,
    InitializeFailed,
    ShutdownStarted,
    ShutdownFinished,
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleEvent::*;
    use LifecycleState::*;

    #[test]
    fn full_cycle() {
        let s = Uninitialized.next(Initialized).unwrap();
        assert_eq!(s, Ready);
        let s = s.next(ShutdownStarted).unwrap();
        assert_eq!(s, ShuttingDown);
        assert_eq!(s.next(ShutdownFinished), Some(Uninitialized));
    }

    #[test]
    fn failed_initialize_stays_uninitialized() {
        assert_eq!(Uninitialized.next(InitializeFailed), Some(Uninitialized));
    }

    #[test]
    fn rejects_double_initialize() {
        assert_eq!(Ready.next(Initialized), None);
        assert_eq!(ShuttingDown.next(Initialized), None);
    }

    #[test]
    fn shutdown_when_uninitialized_is_noop() {
        assert_eq!(Uninitialized.next(ShutdownStarted), Some(Uninitialized));
    }
}
