use std::sync::Arc;

use crate::{Client, Scope};

/// A single layer of the scope stack, binding a scope to the client
/// that was active when the layer was pushed.
#[derive(Debug, Clone)]
pub struct StackLayer {
    pub client: Option<Arc<Client>>,
    pub scope: Arc<Scope>,
}

/// The scope stack of a hub.
///
/// The top layer is kept out of the vector so that reading it never
/// needs a bounds check and the stack is never empty.
#[derive(Debug)]
pub struct Stack {
    top: StackLayer,
    layers: Vec<StackLayer>,
}

impl Stack {
    pub fn from_client_and_scope(client: Option<Arc<Client>>, scope: Arc<Scope>) -> Stack {
        Stack {
            top: StackLayer { client, scope },
            layers: vec![],
        }
    }

    pub fn push(&mut self) {
        let layer = self.top.clone();
        self.layers.push(std::mem::replace(&mut self.top, layer));
    }

    /// Pops the top layer if the stack is at the given depth.
    ///
    /// Returns `false` when the depths do not line up, which means
    /// guards were dropped out of order; the stack is left alone in
    /// that case.
    pub fn pop_if_depth(&mut self, depth: usize) -> bool {
        if self.depth() != depth {
            return false;
        }
        match self.layers.pop() {
            Some(layer) => {
                self.top = layer;
                true
            }
            None => false,
        }
    }

    pub fn top(&self) -> &StackLayer {
        &self.top
    }

    pub fn top_mut(&mut self) -> &mut StackLayer {
        &mut self.top
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}
