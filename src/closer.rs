use std::{fmt, sync::Arc};

use crate::{ErrorList, StreamError};

/// Resource released explicitly when its owning stream closes.
#[async_trait::async_trait]
pub trait Closer: Send + Sync + fmt::Debug {
    /// Releases the resource.
    async fn close(&self) -> Result<(), StreamError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T> Closer for Arc<T>
where
    T: Closer + ?Sized,
{
    async fn close(&self) -> Result<(), StreamError> {
        (**self).close().await
    }
}

/// Ordered set of resources owned for closing.
#[derive(Debug, Default)]
pub struct Closers {
    closers: Vec<Box<dyn Closer>>,
}

impl Closers {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `closer` for closing.
    pub fn add(&mut self, closer: impl Closer + 'static) {
        self.closers.push(Box::new(closer));
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.closers.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.closers.is_empty()
    }

    /// Closes every resource in registration order and empties the set.
    ///
    /// A failing resource does not stop the rest from closing; all failures
    /// are returned together.
    pub async fn close(&mut self) -> Result<(), StreamError> {
        let mut errors = ErrorList::new();
        for closer in self.closers.drain(..) {
            errors.push_result(closer.close().await);
        }
        errors.into_result()
    }
}
