//! List state for optimistic CRUD.
//!
//! Each entry carries a status tag. A local change is applied at once and
//! tagged pending; the server outcome then either confirms it or rolls it
//! back to the value the entry had before the change.

use std::fmt;

/// Stable handle for an entry, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(u64);

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Change<T> {
    Insert,
    Update { previous: T },
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryStatus {
    Confirmed,
    Pending,
    /// The last change was rejected and rolled back.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Entry<T> {
    key: EntryKey,
    value: T,
    status: EntryStatus,
    change: Option<Change<T>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingList<T> {
    entries: Vec<Entry<T>>,
    next_key: u64,
}

impl<T> Default for PendingList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_key: 0,
        }
    }
}

impl<T: Clone> PendingList<T> {
    /// A list of server-confirmed items.
    pub fn from_confirmed(items: impl IntoIterator<Item = T>) -> Self {
        let mut list = Self::default();
        for item in items {
            list.push(item, EntryStatus::Confirmed, None);
        }
        list
    }

    /// Replace settled entries with a fresh server listing.
    ///
    /// Entries with a change in flight keep their key and local value so the
    /// later `confirm` or `fail` still finds them. A listed item that
    /// `same_item` matches to one of them is taken over by that entry; for a
    /// pending update the listed item becomes the rollback value.
    pub fn reset(&mut self, items: impl IntoIterator<Item = T>, same_item: impl Fn(&T, &T) -> bool) {
        let mut in_flight: Vec<Entry<T>> = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(|entry| entry.change.is_some())
            .collect();
        for item in items {
            let matched = in_flight.iter().position(|entry| {
                same_item(&entry.value, &item) || matches!(&entry.change, Some(Change::Update { previous }) if same_item(previous, &item))
            });
            match matched {
                Some(index) => {
                    let mut entry = in_flight.remove(index);
                    if let Some(Change::Update { previous }) = &mut entry.change {
                        *previous = item;
                    }
                    self.entries.push(entry);
                }
                None => {
                    self.push(item, EntryStatus::Confirmed, None);
                }
            }
        }
        self.entries.extend(in_flight);
    }

    fn push(&mut self, value: T, status: EntryStatus, change: Option<Change<T>>) -> EntryKey {
        let key = EntryKey(self.next_key);
        self.next_key += 1;
        self.entries.push(Entry { key, value, status, change });
        key
    }

    fn entry_mut(&mut self, key: EntryKey) -> Option<&mut Entry<T>> {
        self.entries.iter_mut().find(|entry| entry.key == key)
    }

    /// Entries to show: everything except pending removals.
    pub fn visible(&self) -> impl Iterator<Item = (EntryKey, &T, &EntryStatus)> {
        self.entries
            .iter()
            .filter(|entry| !matches!(entry.change, Some(Change::Remove)))
            .map(|entry| (entry.key, &entry.value, &entry.status))
    }

    pub fn get(&self, key: EntryKey) -> Option<&T> {
        self.entries.iter().find(|entry| entry.key == key).map(|entry| &entry.value)
    }

    pub fn status(&self, key: EntryKey) -> Option<&EntryStatus> {
        self.entries.iter().find(|entry| entry.key == key).map(|entry| &entry.status)
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<EntryKey> {
        self.entries.iter().find(|entry| predicate(&entry.value)).map(|entry| entry.key)
    }

    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(|entry| entry.status == EntryStatus::Pending)
    }

    pub fn insert_pending(&mut self, value: T) -> EntryKey {
        self.push(value, EntryStatus::Pending, Some(Change::Insert))
    }

    /// Replace an entry's value. Returns false while another change is in flight.
    pub fn update_pending(&mut self, key: EntryKey, value: T) -> bool {
        let Some(entry) = self.entry_mut(key) else {
            return false;
        };
        if entry.change.is_some() {
            return false;
        }
        let previous = std::mem::replace(&mut entry.value, value);
        entry.change = Some(Change::Update { previous });
        entry.status = EntryStatus::Pending;
        true
    }

    /// Hide an entry until the removal is confirmed or rolled back.
    pub fn remove_pending(&mut self, key: EntryKey) -> bool {
        let Some(entry) = self.entry_mut(key) else {
            return false;
        };
        if entry.change.is_some() {
            return false;
        }
        entry.change = Some(Change::Remove);
        entry.status = EntryStatus::Pending;
        true
    }

    /// Accept the pending change. `server_value` replaces the local value
    /// for inserts and updates when the server echoes the stored record.
    pub fn confirm(&mut self, key: EntryKey, server_value: Option<T>) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.key == key) else {
            return false;
        };
        let entry = &mut self.entries[index];
        match entry.change.take() {
            Some(Change::Remove) => {
                self.entries.remove(index);
            }
            Some(_) => {
                if let Some(value) = server_value {
                    entry.value = value;
                }
                entry.status = EntryStatus::Confirmed;
            }
            None => return false,
        }
        true
    }

    /// Roll back the pending change. A failed insert disappears; updates and
    /// removals restore the previous value and carry the failure message.
    pub fn fail(&mut self, key: EntryKey, message: impl Into<String>) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.key == key) else {
            return false;
        };
        let entry = &mut self.entries[index];
        match entry.change.take() {
            Some(Change::Insert) => {
                self.entries.remove(index);
            }
            Some(Change::Update { previous }) => {
                entry.value = previous;
                entry.status = EntryStatus::Failed(message.into());
            }
            Some(Change::Remove) => {
                entry.status = EntryStatus::Failed(message.into());
            }
            None => return false,
        }
        true
    }

    /// Forget failure messages once they have been shown.
    pub fn clear_failures(&mut self) {
        for entry in &mut self.entries {
            if matches!(entry.status, EntryStatus::Failed(_)) {
                entry.status = EntryStatus::Confirmed;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.visible().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &PendingList<String>) -> Vec<String> {
        list.visible().map(|(_, value, _)| value.clone()).collect()
    }

    #[test]
    fn failed_removal_restores_the_entry() {
        let mut list = PendingList::from_confirmed(["a".to_string(), "b".to_string()]);
        let key = list.find(|name| name == "a").expect("a");

        assert!(list.remove_pending(key));
        assert_eq!(names(&list), vec!["b"]);
        assert!(list.has_pending());

        assert!(list.fail(key, "Failed to delete template"));
        assert_eq!(names(&list), vec!["a", "b"]);
        assert_eq!(list.status(key), Some(&EntryStatus::Failed("Failed to delete template".into())));

        list.clear_failures();
        assert_eq!(list.status(key), Some(&EntryStatus::Confirmed));
    }

    #[test]
    fn confirmed_removal_drops_the_entry() {
        let mut list = PendingList::from_confirmed(["a".to_string()]);
        let key = list.find(|name| name == "a").expect("a");
        list.remove_pending(key);
        assert!(list.confirm(key, None));
        assert!(list.is_empty());
        assert!(list.get(key).is_none());
    }

    #[test]
    fn inserts_and_updates_follow_the_server() {
        let mut list: PendingList<String> = PendingList::default();
        let inserted = list.insert_pending("draft".into());
        assert_eq!(list.status(inserted), Some(&EntryStatus::Pending));
        assert!(list.confirm(inserted, Some("stored".into())));
        assert_eq!(list.get(inserted).map(String::as_str), Some("stored"));

        assert!(list.update_pending(inserted, "renamed".into()));
        assert!(!list.update_pending(inserted, "again".into()));
        assert!(list.fail(inserted, "conflict"));
        assert_eq!(list.get(inserted).map(String::as_str), Some("stored"));

        let doomed = list.insert_pending("doomed".into());
        assert!(list.fail(doomed, "rejected"));
        assert_eq!(names(&list), vec!["stored"]);
        assert!(!list.confirm(doomed, None));
    }

    #[test]
    fn reload_keeps_changes_that_are_still_in_flight() {
        let mut list = PendingList::from_confirmed(["a".to_string(), "b".to_string()]);
        let removed = list.find(|name| name == "b").expect("b");
        assert!(list.remove_pending(removed));
        let inserted = list.insert_pending("draft".into());

        list.reset(["a".to_string(), "b".to_string()], |left, right| left == right);
        assert_eq!(names(&list), vec!["a", "draft"]);
        assert!(list.has_pending());

        assert!(list.confirm(removed, None));
        assert!(list.fail(inserted, "rejected"));
        assert_eq!(names(&list), vec!["a"]);
        assert!(!list.has_pending());
    }

    #[test]
    fn reload_refreshes_the_rollback_value_of_an_update() {
        #[derive(Debug, Clone, PartialEq)]
        struct Row {
            id: u8,
            name: &'static str,
        }
        let same = |left: &Row, right: &Row| left.id == right.id;

        let mut list = PendingList::from_confirmed([Row { id: 1, name: "old" }]);
        let key = list.find(|row| row.id == 1).expect("row");
        assert!(list.update_pending(key, Row { id: 1, name: "mine" }));

        list.reset([Row { id: 1, name: "theirs" }, Row { id: 2, name: "new" }], same);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(key).map(|row| row.name), Some("mine"));

        assert!(list.fail(key, "conflict"));
        assert_eq!(list.get(key).map(|row| row.name), Some("theirs"));
    }
}
