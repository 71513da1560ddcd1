use cascata_parser::ast::Expression;
use std::collections::HashMap;

/// What pushed a frame onto the chain. Parameter frames are tracked
/// separately so callers can tell how deep the current class expansion is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A declaration block being evaluated
    Block,
    /// Bound class parameters for one class expansion
    Params,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    bindings: HashMap<String, Expression>,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            bindings: HashMap::new(),
        }
    }
}

/// Stack of variable frames. The bottom frame is the global scope and is
/// never popped; lookups walk from the innermost frame outward.
#[derive(Debug)]
pub struct ScopeChain {
    frames: Vec<Frame>,
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeChain {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(FrameKind::Block)],
        }
    }

    pub fn push(&mut self, kind: FrameKind) {
        self.frames.push(Frame::new(kind));
    }

    pub fn pop(&mut self) {
        // the global frame always survives
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Number of parameter frames currently live, i.e. how many class
    /// expansions are stacked up.
    pub fn param_depth(&self) -> usize {
        self.frames
            .iter()
            .filter(|f| f.kind == FrameKind::Params)
            .count()
    }

    /// Bind a variable in the innermost frame, shadowing any outer
    /// binding of the same name.
    pub fn declare(&mut self, name: impl Into<String>, value: Expression) {
        self.frames
            .last_mut()
            .unwrap()
            .bindings
            .insert(name.into(), value);
    }

    /// Bind a variable in the global frame, visible everywhere unless
    /// shadowed.
    pub fn declare_global(&mut self, name: impl Into<String>, value: Expression) {
        self.frames
            .first_mut()
            .unwrap()
            .bindings
            .insert(name.into(), value);
    }

    /// Innermost binding for `name`, walking outward through the chain.
    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name))
    }

    /// Whether any frame binds `name`
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether the innermost frame itself binds `name`
    pub fn declares_key(&self, name: &str) -> bool {
        self.frames.last().unwrap().bindings.contains_key(name)
    }
}
