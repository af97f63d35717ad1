//! Environment frames for the tree-walking interpreter.
//!
//! An [`Environment`] is the per-call variable store: an arena of frames
//! where each frame maps names to values and optionally points at a parent
//! frame *by index*. Frame indices never dangle the way raw back-pointers
//! could, and dropping the arena at the end of a call releases every value
//! the call still holds, which is what decrements the strong counts of any
//! containers bound here.
//!
//! The language gives every function call a fresh root frame (callees
//! never see caller locals) and does not open scopes for blocks, so the
//! interpreter itself works in a single frame per call; the parent chain
//! is the lookup rule for any frame that does have ancestors.

use indexmap::IndexMap;

use crate::value::Value;

/// Index of a frame inside its [`Environment`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(usize);

impl FrameId {
    /// The root frame every environment starts with.
    pub const ROOT: FrameId = FrameId(0);
}

#[derive(Debug, Default)]
struct Frame {
    variables: IndexMap<String, Value>,
    parent: Option<FrameId>,
}

/// A per-call arena of scope frames.
#[derive(Debug)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Creates an environment holding only the root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Adds a child frame whose lookups fall through to `parent`.
    pub fn push_child(&mut self, parent: FrameId) -> FrameId {
        self.frames.push(Frame {
            variables: IndexMap::new(),
            parent: Some(parent),
        });
        FrameId(self.frames.len() - 1)
    }

    /// Binds or rebinds `name`. When an enclosing frame already holds the
    /// name, that binding is replaced (dropping the previous value);
    /// otherwise the name is defined in `frame` itself.
    pub fn assign(&mut self, frame: FrameId, name: &str, value: Value) {
        let mut current = frame;
        loop {
            if self.frames[current.0].variables.contains_key(name) {
                self.frames[current.0].variables.insert(name.to_string(), value);
                return;
            }
            match self.frames[current.0].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        self.frames[frame.0].variables.insert(name.to_string(), value);
    }

    /// Looks `name` up along the parent chain.
    pub fn get(&self, frame: FrameId, name: &str) -> Option<&Value> {
        let mut current = frame;
        loop {
            if let Some(value) = self.frames[current.0].variables.get(name) {
                return Some(value);
            }
            current = self.frames[current.0].parent?;
        }
    }

    /// Number of bindings held directly by `frame`.
    pub fn binding_count(&self, frame: FrameId) -> usize {
        self.frames[frame.0].variables.len()
    }
}
