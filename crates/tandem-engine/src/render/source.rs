use super::binder::Renderable;

/// The scene container the render loop draws from.
///
/// Entries are frame-transient: the renderer calls [`discard_all`] after the
/// draw pass of every frame, whether or not the frame completed.
///
/// [`discard_all`]: RenderableSource::discard_all
pub trait RenderableSource {
    fn len(&self) -> usize;

    /// Entry at `index`, or `None` if the source cannot produce it.
    fn entry_at(&self, index: usize) -> Option<Renderable>;

    fn discard_all(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insertion-ordered [`RenderableSource`].
#[derive(Debug, Clone, Default)]
pub struct RenderQueue {
    entries: Vec<Renderable>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Queues a renderable for the next frame.
    pub fn submit(&mut self, renderable: Renderable) {
        self.entries.push(renderable);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Renderable> {
        self.entries.iter()
    }
}

impl Extend<Renderable> for RenderQueue {
    fn extend<I: IntoIterator<Item = Renderable>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl RenderableSource for RenderQueue {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entry_at(&self, index: usize) -> Option<Renderable> {
        self.entries.get(index).copied()
    }

    fn discard_all(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{EffectHandle, MaterialHandle, MeshHandle};

    fn renderable(n: u32) -> Renderable {
        Renderable::new(MeshHandle(n), MaterialHandle::new(n, EffectHandle(0)))
    }

    #[test]
    fn keeps_submission_order() {
        let mut q = RenderQueue::new();
        q.extend([renderable(3), renderable(1)]);
        q.submit(renderable(2));

        assert_eq!(q.len(), 3);
        assert_eq!(q.entry_at(0), Some(renderable(3)));
        assert_eq!(q.entry_at(2), Some(renderable(2)));
        assert_eq!(q.entry_at(3), None);
    }

    #[test]
    fn discard_empties_queue() {
        let mut q = RenderQueue::new();
        q.submit(renderable(1));
        q.discard_all();
        assert!(q.is_empty());
    }
}
