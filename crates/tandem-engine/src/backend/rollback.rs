use super::InitError;

/// Undo stack for partially completed initialization.
///
/// The stack borrows the native API for its whole lifetime; steps between
/// acquisitions reach it through [`Rollback::api`]. Each acquired resource
/// pushes a closure that releases it. Unless [`Rollback::commit`] is called,
/// every pending closure runs newest first when the stack is dropped, so an
/// early `?`, a plain `return` or a panic all release what was acquired.
pub struct Rollback<'a, A> {
    api: &'a mut A,
    undo: Vec<Undo<'a, A>>,
}

struct Undo<'a, A> {
    label: &'static str,
    action: Box<dyn FnOnce(&mut A) -> Result<(), String> + 'a>,
}

impl<'a, A> Rollback<'a, A> {
    pub fn new(api: &'a mut A) -> Self {
        Self {
            api,
            undo: Vec::new(),
        }
    }

    /// The borrowed API, for the next initialization step.
    #[inline]
    pub fn api(&mut self) -> &mut A {
        &mut *self.api
    }

    /// Registers the release action for a resource that was just acquired.
    pub fn push<F>(&mut self, label: &'static str, action: F)
    where
        F: FnOnce(&mut A) -> Result<(), String> + 'a,
    {
        self.undo.push(Undo {
            label,
            action: Box::new(action),
        });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    /// Passes `result` through. On `Err` everything acquired so far is
    /// released now and release failures are attached to the error.
    pub fn guard<T>(&mut self, result: Result<T, InitError>) -> Result<T, InitError> {
        result.map_err(|mut err| {
            err.rollback_failures.extend(self.unwind());
            err
        })
    }

    /// Releases every pending resource, newest first.
    ///
    /// All actions run even if some fail; failure messages are returned.
    pub fn unwind(&mut self) -> Vec<String> {
        let mut failures = Vec::new();
        while let Some(undo) = self.undo.pop() {
            log::debug!("rollback: releasing {}", undo.label);
            if let Err(e) = (undo.action)(&mut *self.api) {
                log::warn!("rollback: failed to release {}: {e}", undo.label);
                failures.push(format!("{}: {e}", undo.label));
            }
        }
        failures
    }

    /// Keeps every acquired resource; the caller now owns them.
    pub fn commit(mut self) {
        self.undo.clear();
    }
}

impl<A> Drop for Rollback<'_, A> {
    fn drop(&mut self) {
        if !self.undo.is_empty() {
            log::debug!("rollback: {} resource(s) pending at drop", self.undo.len());
            self.unwind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendKind, InitStage};

    #[derive(Default)]
    struct Api {
        released: Vec<&'static str>,
    }

    fn fail(stage: InitStage) -> InitError {
        InitError::new(BackendKind::Direct3D9, stage, "step failed")
    }

    fn release(label: &'static str) -> impl FnOnce(&mut Api) -> Result<(), String> {
        move |a: &mut Api| {
            a.released.push(label);
            Ok(())
        }
    }

    #[test]
    fn unwinds_in_reverse_acquisition_order() {
        let mut api = Api::default();
        let mut rb = Rollback::new(&mut api);
        rb.push("interface", release("interface"));
        rb.push("device", release("device"));

        let err = rb.guard::<()>(Err(fail(InitStage::RenderState))).unwrap_err();
        assert!(err.rolled_back_cleanly());
        assert!(rb.is_empty());
        drop(rb);
        assert_eq!(api.released, vec!["device", "interface"]);
    }

    #[test]
    fn guard_ok_leaves_stack_armed() {
        let mut api = Api::default();
        let mut rb = Rollback::new(&mut api);
        rb.push("dc", release("dc"));
        assert_eq!(rb.guard(Ok(7)), Ok(7));
        assert_eq!(rb.len(), 1);
        rb.commit();
        assert!(api.released.is_empty());
    }

    #[test]
    fn dropping_uncommitted_stack_releases_newest_first() {
        fn init(api: &mut Api) -> Result<(), InitError> {
            let mut rb = Rollback::new(api);
            rb.push("interface", release("interface"));
            rb.push("device", release("device"));
            rb.api().released.push("render state attempted");
            // No guard: the error leaves through `?` alone.
            Err::<(), _>(fail(InitStage::RenderState))?;
            rb.commit();
            Ok(())
        }

        let mut api = Api::default();
        assert!(init(&mut api).is_err());
        assert_eq!(api.released, vec!["render state attempted", "device", "interface"]);
    }

    #[test]
    fn panic_between_steps_still_releases() {
        let mut api = Api::default();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut rb = Rollback::new(&mut api);
            rb.push("context", release("context"));
            panic!("driver panicked");
        }));
        assert!(outcome.is_err());
        assert_eq!(api.released, vec!["context"]);
    }

    #[test]
    fn release_failures_reach_the_error() {
        let mut api = Api::default();
        let mut rb = Rollback::new(&mut api);
        rb.push("first", release("first"));
        rb.push("second", |_: &mut Api| Err("busy".to_string()));

        let err = rb.guard::<()>(Err(fail(InitStage::Device))).unwrap_err();
        assert_eq!(err.rollback_failures, vec!["second: busy".to_string()]);
        assert!(!err.rolled_back_cleanly());
        drop(rb);
        assert_eq!(api.released, vec!["first"]);
    }
}
