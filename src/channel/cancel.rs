/*
    FluxTape

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/channel/cancel.rs

    Cooperative cancellation of a running read.

*/

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::BitSource;

/// A cancellation flag shared between the controlling session and the reader thread.
/// Cloning the token shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the read stop at the next sample.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Wraps a [BitSource], ending it as soon as the token is cancelled.
pub struct CancellableSource<S> {
    inner: S,
    token: CancelToken,
}

impl<S: BitSource> CancellableSource<S> {
    pub fn new(inner: S, token: CancelToken) -> Self {
        Self { inner, token }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: BitSource> BitSource for CancellableSource<S> {
    #[inline]
    fn next_bit(&mut self) -> Option<bool> {
        if self.token.is_cancelled() {
            return None;
        }
        self.inner.next_bit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ones;

    impl BitSource for Ones {
        fn next_bit(&mut self) -> Option<bool> {
            Some(true)
        }
    }

    #[test]
    fn cancel_ends_source() {
        let token = CancelToken::new();
        let mut source = CancellableSource::new(Ones, token.clone());
        assert_eq!(source.next_bit(), Some(true));

        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(source.next_bit(), None);

        let mut inner = source.into_inner();
        assert_eq!(inner.next_bit(), Some(true));
    }
}
