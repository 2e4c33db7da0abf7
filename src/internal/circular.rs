//! Circular dependency detection for async resolution.
//!
//! Resolution hops between tasks and threads, so the construction stack is an
//! explicit value threaded through every nested lookup instead of thread-local
//! state. Each frame records the injector that builds a value and the
//! identifier being built; revisiting a frame is a cycle.

use crate::error::{DiError, DiResult};
use crate::key::Key;

pub(crate) const MAX_DEPTH: usize = 1024;

#[derive(Clone, Debug)]
struct Frame {
    node: u64,
    key: Key,
}

/// Construction frames of one resolution chain, outermost first.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResolutionStack {
    frames: Vec<Frame>,
}

impl ResolutionStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns the stack extended with a frame for building `key` on `node`.
    ///
    /// Fails with `Circular` when that frame is already being built further up
    /// the chain, and with `DepthExceeded` past `max_depth` frames.
    pub(crate) fn enter(&self, node: u64, key: &Key, max_depth: usize) -> DiResult<ResolutionStack> {
        if let Some(start) = self
            .frames
            .iter()
            .position(|frame| frame.node == node && &frame.key == key)
        {
            let mut path: Vec<String> = self.frames[start..].iter().map(|f| f.key.to_string()).collect();
            path.push(key.to_string());
            return Err(DiError::Circular(path));
        }

        if self.frames.len() >= max_depth {
            return Err(DiError::DepthExceeded(self.frames.len()));
        }

        let mut frames = Vec::with_capacity(self.frames.len() + 1);
        frames.extend(self.frames.iter().cloned());
        frames.push(Frame { node, key: key.clone() });
        Ok(ResolutionStack { frames })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    struct A;
    struct B;

    #[test]
    fn revisiting_a_frame_is_circular() {
        let stack = ResolutionStack::new();
        let a = stack.enter(1, &key_of_type::<A>(), MAX_DEPTH).unwrap();
        let ab = a.enter(1, &key_of_type::<B>(), MAX_DEPTH).unwrap();
        assert_eq!(ab.depth(), 2);

        match ab.enter(1, &key_of_type::<A>(), MAX_DEPTH) {
            Err(DiError::Circular(path)) => {
                assert_eq!(path.len(), 3);
                assert_eq!(path.first(), path.last());
            }
            other => panic!("expected cycle, got {:?}", other.map(|s| s.depth())),
        }
    }

    #[test]
    fn same_key_on_another_node_is_not_a_cycle() {
        let stack = ResolutionStack::new()
            .enter(1, &key_of_type::<A>(), MAX_DEPTH)
            .unwrap();
        assert!(stack.enter(2, &key_of_type::<A>(), MAX_DEPTH).is_ok());
    }

    #[test]
    fn depth_limit() {
        let stack = ResolutionStack::new().enter(1, &key_of_type::<A>(), 1).unwrap();
        assert!(matches!(
            stack.enter(1, &key_of_type::<B>(), 1),
            Err(DiError::DepthExceeded(1))
        ));
    }
}
