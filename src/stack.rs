pub const STACK_DEPTH: usize = 16;

/// Return addresses of the active subroutine calls.
///
/// `top` is the index of the most recent entry. An empty stack is `None`, so it can never
/// be mistaken for a stack holding a single entry at index 0.
#[derive(Debug, Default)]
pub(crate) struct CallStack {
    entries: [u16; STACK_DEPTH],
    top: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StackFault {
    Overflow,
    Underflow,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries = [0; STACK_DEPTH];
        self.top = None;
    }

    pub fn push(&mut self, address: u16) -> Result<(), StackFault> {
        let next = match self.top {
            None => 0,
            Some(top) if top + 1 < STACK_DEPTH => top + 1,
            Some(_) => return Err(StackFault::Overflow),
        };

        self.entries[next] = address;
        self.top = Some(next);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, StackFault> {
        let top = self.top.ok_or(StackFault::Underflow)?;
        self.top = top.checked_sub(1);
        Ok(self.entries[top])
    }

    pub fn depth(&self) -> usize {
        self.top.map_or(0, |top| top + 1)
    }
}
