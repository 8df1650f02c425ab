use indexmap::IndexSet;

use crate::statement::identity::InstanceId;

/// The skeleton selection: selected identities in the order they were selected.
///
/// Order is selection order, not block order.
#[derive(Debug, Clone, Default)]
pub struct SkeletonSelection {
    selected: IndexSet<InstanceId>,
}

impl SkeletonSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identity: InstanceId) -> bool {
        self.selected.contains(&identity)
    }

    /// Append `identity`. Returns false if it was already selected.
    pub fn insert(&mut self, identity: InstanceId) -> bool {
        self.selected.insert(identity)
    }

    /// Returns false if `identity` was not selected. Keeps the order of the rest.
    pub fn remove(&mut self, identity: InstanceId) -> bool {
        self.selected.shift_remove(&identity)
    }

    /// Drop every selected identity matching `pruned`, returning them in selection order.
    pub fn remove_where(&mut self, mut pruned: impl FnMut(InstanceId) -> bool) -> Vec<InstanceId> {
        let removed: Vec<InstanceId> = self.iter().filter(|id| pruned(*id)).collect();
        self.selected.retain(|id| !removed.contains(id));
        removed
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn to_vec(&self) -> Vec<InstanceId> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.selected.iter().copied()
    }
}

/// Equal when the same identities were selected in the same order.
impl PartialEq for SkeletonSelection {
    fn eq(&self, other: &Self) -> bool {
        self.selected.iter().eq(other.selected.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_append_order() {
        let (a, b, c) = (InstanceId::new(), InstanceId::new(), InstanceId::new());
        let mut selection = SkeletonSelection::new();
        assert!(selection.insert(c));
        assert!(selection.insert(a));
        assert!(!selection.insert(c));
        assert!(selection.insert(b));
        assert_eq!(selection.to_vec(), &[c, a, b]);

        assert!(selection.remove(a));
        assert!(!selection.remove(a));
        assert_eq!(selection.to_vec(), &[c, b]);
        assert!(!selection.contains(a));
    }

    #[test]
    fn remove_where_reports_in_selection_order() {
        let (a, b, c) = (InstanceId::new(), InstanceId::new(), InstanceId::new());
        let mut selection = SkeletonSelection::new();
        for id in [b, a, c] {
            selection.insert(id);
        }
        assert_eq!(selection.remove_where(|id| id != a), vec![b, c]);
        assert_eq!(selection.to_vec(), &[a]);
    }

    #[test]
    fn equality_follows_selection_order() {
        let (a, b) = (InstanceId::new(), InstanceId::new());
        let mut first = SkeletonSelection::new();
        let mut second = SkeletonSelection::new();
        first.insert(a);
        first.insert(b);
        second.insert(b);
        second.insert(a);
        assert_ne!(first, second);
        second.remove(b);
        second.insert(b);
        assert_eq!(first, second);
    }
}
