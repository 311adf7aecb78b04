use crate::core::{IdEquality, ItemId, WishlistItem};
use std::ops::Deref;
use std::sync::Arc;

/// Immutable view of the collection at one revision.
///
/// Cloning is cheap; the items are shared, never copied.
#[derive(Debug, Clone)]
pub struct WishlistSnapshot {
    revision: u64,
    items: Arc<[WishlistItem]>,
}

impl WishlistSnapshot {
    pub(crate) fn new(revision: u64, items: Vec<WishlistItem>) -> Self {
        Self {
            revision,
            items: items.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    /// Bumped once per effective mutation. The loaded state is revision 0.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    pub fn position(&self, id: &ItemId, equality: IdEquality) -> Option<usize> {
        self.items.iter().position(|item| item.has_id(id, equality))
    }

    pub fn contains(&self, id: &ItemId, equality: IdEquality) -> bool {
        self.position(id, equality).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter().filter_map(|item| item.id.as_ref())
    }
}

impl Deref for WishlistSnapshot {
    type Target = [WishlistItem];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl Default for WishlistSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// What consumers observe: nothing until the durable state has been read.
#[derive(Debug, Clone, Default)]
pub enum WishlistView {
    #[default]
    Loading,
    Ready(WishlistSnapshot),
}

impl WishlistView {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn snapshot(&self) -> Option<&WishlistSnapshot> {
        match self {
            Self::Ready(snapshot) => Some(snapshot),
            Self::Loading => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_queries() {
        let snapshot = WishlistSnapshot::new(
            4,
            vec![WishlistItem::new(101, "Cá hồi", 50000.0), WishlistItem::new("202", "Tôm", 0.0)],
        );

        assert_eq!(snapshot.revision(), 4);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.position(&ItemId::from("202"), IdEquality::Strict), Some(1));
        assert!(snapshot.contains(&ItemId::from(101), IdEquality::Strict));
        assert!(!snapshot.contains(&ItemId::from("101"), IdEquality::Strict));
        assert!(snapshot.contains(&ItemId::from("101"), IdEquality::Canonical));

        let ids: Vec<_> = snapshot.ids().cloned().collect();
        assert_eq!(ids, vec![ItemId::from(101), ItemId::from("202")]);
    }

    #[test]
    fn test_view_states() {
        assert!(!WishlistView::Loading.is_ready());
        assert!(WishlistView::Loading.snapshot().is_none());

        let view = WishlistView::Ready(WishlistSnapshot::empty());
        assert!(view.is_ready());
        assert_eq!(view.snapshot().map(|s| s.len()), Some(0));
    }
}
