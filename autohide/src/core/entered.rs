use autohide_ipc::TrackingId;

/// Tracking ids currently believed to have the pointer inside them.
///
/// Used where the OS only reports pointer positions: leave events are
/// synthesized by diffing consecutive samples.
#[derive(Debug, Default)]
pub struct EnteredSet {
    ids: Vec<TrackingId>,
}

impl EnteredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the window under the pointer for this sample and return the ids
    /// that were entered before but are not anymore, in entry order.
    pub fn advance(&mut self, current: Option<TrackingId>) -> Vec<TrackingId> {
        let mut left = Vec::new();
        self.ids.retain(|&id| {
            if Some(id) == current {
                true
            } else {
                left.push(id);
                false
            }
        });
        if let Some(id) = current {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
        left
    }

    pub fn contains(&self, id: TrackingId) -> bool {
        self.ids.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entering_reports_nothing() {
        let mut entered = EnteredSet::new();
        assert!(entered.advance(Some(1)).is_empty());
        assert!(entered.contains(1));
    }

    #[test]
    fn test_staying_inside_reports_nothing() {
        let mut entered = EnteredSet::new();
        entered.advance(Some(1));
        assert!(entered.advance(Some(1)).is_empty());
        assert!(entered.contains(1));
    }

    #[test]
    fn test_switching_windows_leaves_previous() {
        let mut entered = EnteredSet::new();
        entered.advance(Some(1));
        assert_eq!(entered.advance(Some(2)), vec![1]);
        assert!(!entered.contains(1));
        assert!(entered.contains(2));
    }

    #[test]
    fn test_moving_to_desktop_leaves_once() {
        let mut entered = EnteredSet::new();
        entered.advance(Some(4));
        assert_eq!(entered.advance(None), vec![4]);
        assert!(entered.advance(None).is_empty());
        assert!(!entered.contains(4));
    }
}
