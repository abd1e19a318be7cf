//! Single-writer in-memory model of threads, thread items and branch
//! selections. Every mutation re-normalizes branch roots and prunes the
//! selection map, so readers never observe an inconsistent branch
//! state.

use std::collections::HashMap;

use braid_types::{Thread, ThreadItem};

use crate::error::{Result, StoreError};

/// Result of deleting a thread item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// The deleted item was the thread's last one, so the thread itself
    /// was removed and the caller must navigate away from it.
    pub thread_removed: bool,
}

#[derive(Debug, Default)]
pub struct ChatStore {
    threads: HashMap<String, Thread>,
    items: HashMap<String, ThreadItem>,
    branch_selections: HashMap<String, String>,
    active_thread_id: Option<String>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- threads ----

    pub fn upsert_thread(&mut self, thread: Thread) {
        self.threads.insert(thread.id.clone(), thread);
    }

    pub fn get_thread(&self, id: &str) -> Option<&Thread> {
        self.threads.get(id)
    }

    pub fn get_thread_mut(&mut self, id: &str) -> Option<&mut Thread> {
        self.threads.get_mut(id)
    }

    /// Threads ordered for the sidebar: pinned first (most recently
    /// pinned on top), then by creation time, newest first.
    pub fn list_threads(&self) -> Vec<&Thread> {
        let mut threads: Vec<&Thread> = self.threads.values().collect();
        threads.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.pinned_at.cmp(&a.pinned_at))
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        threads
    }

    /// Delete a thread and cascade to its items.
    pub fn delete_thread(&mut self, id: &str) -> Result<()> {
        if self.threads.remove(id).is_none() {
            return Err(StoreError::ThreadNotFound(id.to_string()));
        }
        self.items.retain(|_, item| item.thread_id != id);
        if self.active_thread_id.as_deref() == Some(id) {
            self.active_thread_id = None;
        }
        self.prune_branch_selections();
        Ok(())
    }

    pub fn switch_thread(&mut self, id: Option<String>) {
        self.active_thread_id = id;
    }

    pub fn active_thread_id(&self) -> Option<&str> {
        self.active_thread_id.as_deref()
    }

    // ---- thread items ----

    /// Insert or replace an item. The branch root is normalized before
    /// storage so grouped reads never have to special-case legacy rows.
    pub fn upsert_item(&mut self, mut item: ThreadItem) {
        item.branch_root_id = Some(item.effective_branch_root().to_string());
        self.items.insert(item.id.clone(), item);
        self.prune_branch_selections();
    }

    pub fn get_item(&self, id: &str) -> Option<&ThreadItem> {
        self.items.get(id)
    }

    /// Items of one thread, oldest first.
    pub fn thread_items(&self, thread_id: &str) -> Vec<&ThreadItem> {
        let mut items: Vec<&ThreadItem> = self
            .items
            .values()
            .filter(|item| item.thread_id == thread_id)
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        items
    }

    /// Delete one item, repairing the branch selection of its group and
    /// removing the owning thread when it was the last item.
    pub fn delete_item(&mut self, id: &str) -> Result<DeleteOutcome> {
        let item = self
            .items
            .remove(id)
            .ok_or_else(|| StoreError::ItemNotFound(id.to_string()))?;

        let thread_id = item.thread_id.clone();
        let thread_empty = !self.items.values().any(|i| i.thread_id == thread_id);
        if thread_empty {
            self.threads.remove(&thread_id);
            if self.active_thread_id.as_deref() == Some(thread_id.as_str()) {
                self.active_thread_id = None;
            }
        }

        self.prune_branch_selections();
        Ok(DeleteOutcome {
            thread_removed: thread_empty,
        })
    }

    /// Bulk deletion of every item created after `item_id` within the
    /// same thread. Used by retry/regenerate flows.
    pub fn delete_followups(&mut self, item_id: &str) -> Result<usize> {
        let anchor = self
            .items
            .get(item_id)
            .ok_or_else(|| StoreError::ItemNotFound(item_id.to_string()))?;
        let thread_id = anchor.thread_id.clone();
        let cutoff = anchor.created_at;

        let before = self.items.len();
        self.items
            .retain(|_, item| item.thread_id != thread_id || item.created_at <= cutoff);
        let removed = before - self.items.len();

        if removed > 0 {
            self.prune_branch_selections();
        }
        Ok(removed)
    }

    // ---- branches ----

    /// Items grouped by normalized branch root, each group ordered by
    /// creation time.
    pub fn branch_groups(&self) -> HashMap<String, Vec<&ThreadItem>> {
        let mut groups: HashMap<String, Vec<&ThreadItem>> = HashMap::new();
        for item in self.items.values() {
            groups
                .entry(item.effective_branch_root().to_string())
                .or_default()
                .push(item);
        }
        for members in groups.values_mut() {
            members.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        }
        groups
    }

    pub fn branch_group(&self, root_id: &str) -> Vec<&ThreadItem> {
        let mut members: Vec<&ThreadItem> = self
            .items
            .values()
            .filter(|item| item.effective_branch_root() == root_id)
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        members
    }

    /// Change which sibling of a branch group is displayed.
    pub fn select_branch(&mut self, root_id: &str, item_id: &str) -> Result<()> {
        let belongs = self
            .items
            .get(item_id)
            .is_some_and(|item| item.effective_branch_root() == root_id);
        if !belongs {
            return Err(StoreError::NotInBranchGroup {
                root_id: root_id.to_string(),
                item_id: item_id.to_string(),
            });
        }
        self.branch_selections
            .insert(root_id.to_string(), item_id.to_string());
        Ok(())
    }

    pub fn selected_in_branch(&self, root_id: &str) -> Option<&str> {
        self.branch_selections.get(root_id).map(String::as_str)
    }

    pub fn branch_selections(&self) -> &HashMap<String, String> {
        &self.branch_selections
    }

    /// Repair the selection map after any item mutation:
    /// - every key must map to a live member of its group, else it is
    ///   re-pointed at the most recently created member;
    /// - keys whose group vanished are removed;
    /// - every non-empty group gets a selection (default: newest).
    pub fn prune_branch_selections(&mut self) {
        let groups = self.branch_groups();
        let mut selections = HashMap::with_capacity(groups.len());

        for (root_id, members) in &groups {
            let newest = members
                .last()
                .map(|item| item.id.clone())
                .expect("group is non-empty");
            let keep = self
                .branch_selections
                .get(root_id)
                .filter(|selected| members.iter().any(|item| &item.id == *selected))
                .cloned();
            selections.insert(root_id.clone(), keep.unwrap_or(newest));
        }

        self.branch_selections = selections;
    }

    // ---- materialization ----

    /// Materialize the single linear path from the thread root to the
    /// active leaf, following parent links and the selected sibling at
    /// every branch point. This is what generation tasks receive as
    /// prior context, and what is rendered.
    pub fn build_conversation_view(&self, thread_id: &str) -> Vec<&ThreadItem> {
        let items = self.thread_items(thread_id);
        let mut view = Vec::new();

        // Start at a parentless item. The root's branch group can also
        // contain its first reply (parent-id normalization), so a group
        // selection only counts here when it points at another root.
        let mut roots: Vec<&ThreadItem> = items
            .iter()
            .copied()
            .filter(|item| item.parent_id.is_none())
            .collect();
        if roots.is_empty() {
            return view;
        }
        roots.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let selected_root = roots
            .first()
            .and_then(|first| self.selected_member(first.effective_branch_root()))
            .filter(|item| item.parent_id.is_none());
        let mut current = selected_root.unwrap_or_else(|| {
            roots.last().copied().expect("roots is non-empty")
        });

        loop {
            view.push(current);

            let mut children: Vec<&ThreadItem> = items
                .iter()
                .copied()
                .filter(|item| item.parent_id.as_deref() == Some(current.id.as_str()))
                .collect();
            if children.is_empty() {
                break;
            }
            children.sort_by(|a, b| a.created_at.cmp(&b.created_at));

            let selected = self
                .selected_in_branch(&current.id)
                .and_then(|id| children.iter().find(|item| item.id == id).copied());
            current = selected.unwrap_or_else(|| {
                children.last().copied().expect("children is non-empty")
            });
        }

        view
    }

    fn selected_member(&self, root_id: &str) -> Option<&ThreadItem> {
        let selected = self.selected_in_branch(root_id)?;
        self.items.get(selected)
    }
}
