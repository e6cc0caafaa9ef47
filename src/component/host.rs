use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Receives the output description of every committed render.
///
/// The engine never interprets the output; turning it into something visible
/// is the host's job.
pub trait Host<O> {
    fn commit(&mut self, output: O);
}

impl<O, F> Host<O> for F
where
    F: FnMut(O),
{
    fn commit(&mut self, output: O) {
        self(output)
    }
}

/// A host that records every committed output in order.
///
/// Clones share the same log, so one clone can be mounted while another is
/// inspected.
pub struct CommitLog<O> {
    outputs: Rc<RefCell<Vec<O>>>,
}

impl<O> CommitLog<O> {
    pub fn new() -> Self {
        Self {
            outputs: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Number of commits so far.
    pub fn len(&self) -> usize {
        self.outputs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.borrow().is_empty()
    }
}

impl<O: Clone> CommitLog<O> {
    pub fn outputs(&self) -> Vec<O> {
        self.outputs.borrow().clone()
    }

    pub fn last(&self) -> Option<O> {
        self.outputs.borrow().last().cloned()
    }
}

impl<O> Default for CommitLog<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Clone for CommitLog<O> {
    fn clone(&self) -> Self {
        Self {
            outputs: Rc::clone(&self.outputs),
        }
    }
}

impl<O: fmt::Debug> fmt::Debug for CommitLog<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.outputs.borrow().iter()).finish()
    }
}

impl<O> Host<O> for CommitLog<O> {
    fn commit(&mut self, output: O) {
        self.outputs.borrow_mut().push(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_log() {
        let log = CommitLog::new();
        let mut host = log.clone();
        host.commit("a");
        host.commit("b");
        assert_eq!(log.outputs(), vec!["a", "b"]);
        assert_eq!(log.last(), Some("b"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn closures_are_hosts() {
        let mut seen = Vec::new();
        {
            let mut host = |output: u32| seen.push(output);
            host.commit(1);
            host.commit(2);
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
