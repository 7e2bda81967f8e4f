use serde::Serialize;
use uuid::Uuid;

use super::repo_types::Item;

/// Working set of selected item IDs, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selection(Vec<Uuid>);

impl Selection {
    pub fn ids(&self) -> &[Uuid] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.0.contains(&id)
    }

    /// Flips membership of `id`; returns whether it is now selected.
    pub fn toggle(&mut self, id: Uuid) -> bool {
        if self.remove(id) {
            false
        } else {
            self.0.push(id);
            true
        }
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.0.len();
        self.0.retain(|x| *x != id);
        self.0.len() != before
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Drops every ID that is not in `items`.
    pub fn retain_present(&mut self, items: &[Item]) {
        self.0.retain(|id| items.iter().any(|i| i.id == *id));
    }

    /// True when the selection is exactly the ID set of `items`.
    pub fn covers(&self, items: &[Item]) -> bool {
        self.0.len() == items.len() && items.iter().all(|i| self.contains(i.id))
    }

    /// Clears when everything is already selected, otherwise selects every item.
    /// Returns whether everything is now selected.
    pub fn toggle_all(&mut self, items: &[Item]) -> bool {
        if self.covers(items) {
            self.clear();
            false
        } else {
            self.0 = items.iter().map(|i| i.id).collect();
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<Item> {
        let pantry_id = Uuid::new_v4();
        (0..n)
            .map(|i| Item {
                id: Uuid::new_v4(),
                pantry_id,
                name: format!("item {}", i),
                quantity: 1,
                image_url: None,
            })
            .collect()
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut sel = Selection::default();
        let id = Uuid::new_v4();
        assert!(sel.toggle(id));
        assert!(sel.contains(id));
        assert!(!sel.toggle(id));
        assert!(sel.is_empty());
    }

    #[test]
    fn toggle_all_twice_restores_empty_selection() {
        let list = items(3);
        let mut sel = Selection::default();
        assert!(sel.toggle_all(&list));
        assert_eq!(sel.len(), 3);
        assert!(!sel.toggle_all(&list));
        assert_eq!(sel, Selection::default());
    }

    #[test]
    fn toggle_all_twice_restores_full_selection() {
        let list = items(2);
        let mut sel = Selection::default();
        sel.toggle_all(&list);
        let full = sel.clone();
        sel.toggle_all(&list);
        sel.toggle_all(&list);
        assert_eq!(sel, full);
    }

    #[test]
    fn partial_selection_becomes_full() {
        let list = items(3);
        let mut sel = Selection::default();
        sel.toggle(list[1].id);
        assert!(sel.toggle_all(&list));
        assert!(sel.covers(&list));
    }

    #[test]
    fn covers_ignores_order() {
        let list = items(2);
        let mut sel = Selection::default();
        sel.toggle(list[1].id);
        sel.toggle(list[0].id);
        assert!(sel.covers(&list));
    }

    #[test]
    fn retain_present_drops_vanished_ids() {
        let list = items(3);
        let mut sel = Selection::default();
        sel.toggle(list[0].id);
        sel.toggle(list[2].id);
        sel.retain_present(&list[..2]);
        assert_eq!(sel.ids(), &[list[0].id]);
    }
}
