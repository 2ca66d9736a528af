use std::{cell::RefCell, sync::Arc};

/// Shared single-threaded handle: an [Arc] around a [RefCell] without the
/// nested-generics noise at every use site.
///
/// Borrow rules are the usual [RefCell] ones; all holders must live on the
/// same thread.
pub struct ArcRef<T> {
    inner: Arc<RefCell<T>>,
}

impl<T> ArcRef<T> {
    pub fn new(value: T) -> ArcRef<T> {
        ArcRef {
            inner: Arc::new(RefCell::new(value)),
        }
    }

    /// Borrow the value immutably. Panics if a mutable borrow is live.
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.inner.borrow()
    }

    /// Borrow the value mutably. Panics if any borrow is live.
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Borrow mutably, returning [None] instead of panicking when a borrow
    /// is already live.
    pub fn try_borrow_mut(&self) -> Option<std::cell::RefMut<'_, T>> {
        self.inner.try_borrow_mut().ok()
    }

    /// Whether two handles refer to the same allocation.
    pub fn ptr_eq(&self, other: &ArcRef<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for ArcRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
