use braid_store::{ChatStore, StoreError};
use braid_types::{ChatMode, Thread, ThreadItem};
use chrono::Duration;

/// Build an item whose creation time is offset so ordering is
/// deterministic regardless of clock resolution.
fn item_at(thread_id: &str, query: &str, offset_secs: i64) -> ThreadItem {
    let mut item = ThreadItem::new(thread_id, query, ChatMode::Auto);
    item.created_at += Duration::seconds(offset_secs);
    item.updated_at = item.created_at;
    item
}

#[test]
fn selections_only_reference_live_items() {
    let mut store = ChatStore::new();
    store.upsert_thread(Thread::new("t"));
    let thread_id = store.list_threads()[0].id.clone();

    let root = item_at(&thread_id, "q", 0);
    let root_id = root.id.clone();
    let alt_a = item_at(&thread_id, "q", 1).with_branch_root(root_id.clone());
    let alt_b = item_at(&thread_id, "q", 2).with_branch_root(root_id.clone());
    let a_id = alt_a.id.clone();
    let b_id = alt_b.id.clone();

    store.upsert_item(root);
    store.upsert_item(alt_a);
    store.upsert_item(alt_b);

    // Default selection is the newest member.
    assert_eq!(store.selected_in_branch(&root_id), Some(b_id.as_str()));

    store.select_branch(&root_id, &a_id).unwrap();
    assert_eq!(store.selected_in_branch(&root_id), Some(a_id.as_str()));

    // Deleting the selected sibling falls back to the newest survivor.
    store.delete_item(&a_id).unwrap();
    assert_eq!(store.selected_in_branch(&root_id), Some(b_id.as_str()));

    // After any sequence of mutations, every selection points at a
    // live item.
    for (root, selected) in store.branch_selections() {
        let members = store.branch_group(root);
        assert!(members.iter().any(|m| &m.id == selected));
    }
}

#[test]
fn selecting_outside_the_group_is_rejected() {
    let mut store = ChatStore::new();
    store.upsert_thread(Thread::new("t"));
    let thread_id = store.list_threads()[0].id.clone();

    let root = item_at(&thread_id, "q", 0);
    let root_id = root.id.clone();
    let stranger = item_at(&thread_id, "other", 1);
    let stranger_id = stranger.id.clone();

    store.upsert_item(root);
    store.upsert_item(stranger);

    let err = store.select_branch(&root_id, &stranger_id).unwrap_err();
    assert!(matches!(err, StoreError::NotInBranchGroup { .. }));
}

#[test]
fn deleting_last_item_removes_thread_and_selections() {
    let mut store = ChatStore::new();
    let thread = Thread::new("t");
    let thread_id = thread.id.clone();
    store.upsert_thread(thread);
    store.switch_thread(Some(thread_id.clone()));

    let only = item_at(&thread_id, "q", 0);
    let only_id = only.id.clone();
    store.upsert_item(only);
    assert!(!store.branch_selections().is_empty());

    let outcome = store.delete_item(&only_id).unwrap();
    assert!(outcome.thread_removed);
    assert!(store.get_thread(&thread_id).is_none());
    assert_eq!(store.active_thread_id(), None);
    assert!(store.branch_selections().is_empty());
}

#[test]
fn deleting_thread_cascades_and_prunes() {
    let mut store = ChatStore::new();
    let thread = Thread::new("t");
    let thread_id = thread.id.clone();
    store.upsert_thread(thread);

    let first = item_at(&thread_id, "q1", 0);
    let second = item_at(&thread_id, "q2", 1).with_parent(first.id.clone());
    let first_id = first.id.clone();
    store.upsert_item(first);
    store.upsert_item(second);

    store.delete_thread(&thread_id).unwrap();
    assert!(store.thread_items(&thread_id).is_empty());
    assert!(store.branch_selections().is_empty());
    assert!(store.get_item(&first_id).is_none());
}

#[test]
fn delete_followups_removes_newer_items_in_thread() {
    let mut store = ChatStore::new();
    let thread = Thread::new("t");
    let thread_id = thread.id.clone();
    store.upsert_thread(thread);
    let other = Thread::new("other");
    let other_id = other.id.clone();
    store.upsert_thread(other);

    let anchor = item_at(&thread_id, "keep", 0);
    let newer = item_at(&thread_id, "drop", 1);
    let unrelated = item_at(&other_id, "keep too", 2);
    let anchor_id = anchor.id.clone();
    let unrelated_id = unrelated.id.clone();
    store.upsert_item(anchor);
    store.upsert_item(newer);
    store.upsert_item(unrelated);

    let removed = store.delete_followups(&anchor_id).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.thread_items(&thread_id).len(), 1);
    assert!(store.get_item(&unrelated_id).is_some());
}

#[test]
fn conversation_view_follows_selections_across_branch_point() {
    let mut store = ChatStore::new();
    let thread = Thread::new("t");
    let thread_id = thread.id.clone();
    store.upsert_thread(thread);

    let root = item_at(&thread_id, "q1", 0);
    let root_id = root.id.clone();
    store.upsert_item(root);

    // Two alternative replies to the root, then a child under the
    // older one.
    let reply_a = item_at(&thread_id, "q2a", 1).with_parent(root_id.clone());
    let reply_b = item_at(&thread_id, "q2b", 2).with_parent(root_id.clone());
    let a_id = reply_a.id.clone();
    let b_id = reply_b.id.clone();
    store.upsert_item(reply_a);
    store.upsert_item(reply_b);

    let child = item_at(&thread_id, "q3", 3).with_parent(a_id.clone());
    let child_id = child.id.clone();
    store.upsert_item(child);

    // Newest sibling wins by default.
    let view: Vec<String> = store
        .build_conversation_view(&thread_id)
        .iter()
        .map(|item| item.id.clone())
        .collect();
    assert_eq!(view, vec![root_id.clone(), b_id.clone()]);

    // Selecting the older sibling surfaces its subtree.
    store.select_branch(&root_id, &a_id).unwrap();
    let view: Vec<String> = store
        .build_conversation_view(&thread_id)
        .iter()
        .map(|item| item.id.clone())
        .collect();
    assert_eq!(view, vec![root_id, a_id, child_id]);
}

#[test]
fn branch_groups_key_by_effective_root() {
    let mut store = ChatStore::new();
    let thread = Thread::new("t");
    let thread_id = thread.id.clone();
    store.upsert_thread(thread);

    let root = item_at(&thread_id, "q1", 0);
    let root_id = root.id.clone();
    // A reply without an explicit branch root groups under its parent.
    let reply = item_at(&thread_id, "q2", 1).with_parent(root_id.clone());
    let reply_id = reply.id.clone();
    store.upsert_item(root);
    store.upsert_item(reply);

    let groups = store.branch_groups();
    assert_eq!(groups.len(), 1);
    let group = store.branch_group(&root_id);
    assert_eq!(group.len(), 2);
    assert_eq!(group[0].id, root_id);
    assert_eq!(group[1].id, reply_id);
}
