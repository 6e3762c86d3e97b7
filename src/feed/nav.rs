use crate::models::{MediaItemId, NavFrame};

/// Drill-down path. Empty means the library root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavStack {
    frames: Vec<NavFrame>,
}

impl NavStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: NavFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<NavFrame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&NavFrame> {
        self.frames.last()
    }

    /// Parent id for the next listing, `None` at the root.
    pub fn parent_id(&self) -> Option<&MediaItemId> {
        self.top().map(|frame| &frame.parent_id)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn is_root(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[NavFrame] {
        &self.frames
    }

    /// Titles from the outermost frame inwards.
    pub fn breadcrumbs(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.title.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_restores_parent() {
        let mut stack = NavStack::new();
        assert!(stack.is_root());
        assert_eq!(stack.parent_id(), None);

        stack.push(NavFrame::new("series-42", "My Show"));
        stack.push(NavFrame::new("season-1", "Season 1"));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.parent_id().map(|id| id.as_str()), Some("season-1"));
        assert_eq!(stack.breadcrumbs(), vec!["My Show", "Season 1"]);

        let popped = stack.pop().unwrap();
        assert_eq!(popped.title, "Season 1");
        assert_eq!(stack.parent_id().map(|id| id.as_str()), Some("series-42"));

        stack.pop();
        assert!(stack.is_root());
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_clear_returns_to_root() {
        let mut stack = NavStack::new();
        stack.push(NavFrame::new("a", "A"));
        stack.clear();
        assert!(stack.is_root());
        assert!(stack.frames().is_empty());
    }
}
