//! Composition of middlewares around a terminal round-tripper.
//!
//! The first middleware of a [`Chain`] is the outermost layer: it sees the
//! request first and the response last.

use core::fmt::Debug;

use crate::roundtrip::BoxRoundTripper;

/// A transformation of one round-tripper into another.
///
/// A middleware is consumed when it wraps its successor; the resulting
/// round-tripper owns the successor exclusively.
pub trait Middleware: Debug + Send {
    /// Wrap `next`, returning the decorated round-tripper
    fn wrap(self: Box<Self>, next: BoxRoundTripper) -> BoxRoundTripper;
}

/// An ordered list of middlewares.
///
/// Declaration order is request-side execution order.
#[derive(Debug, Default)]
pub struct Chain(Vec<Box<dyn Middleware>>);

impl Chain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `middleware` as the new innermost layer
    #[must_use]
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.push(Box::new(middleware));
        self
    }

    /// Append an already boxed middleware as the new innermost layer
    pub fn push(&mut self, middleware: Box<dyn Middleware>) {
        self.0.push(middleware);
    }

    /// Number of middlewares in the chain
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the chain has no middlewares
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold the chain around `base`.
    ///
    /// The last middleware wraps `base` first and the first middleware wraps
    /// last, so it receives the fully wrapped inner round-tripper.
    #[must_use]
    pub fn wrap(self, base: BoxRoundTripper) -> BoxRoundTripper {
        self.0
            .into_iter()
            .rev()
            .fold(base, |next, middleware| middleware.wrap(next))
    }
}

impl From<Vec<Box<dyn Middleware>>> for Chain {
    fn from(middlewares: Vec<Box<dyn Middleware>>) -> Self {
        Self(middlewares)
    }
}
