use tokio::sync::mpsc;
use uuid::Uuid;

use super::*;

fn member(user_id: &str, board_id: &str) -> (Member, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(8);
    let member = Member {
        connection_id: Uuid::new_v4(),
        user_id: user_id.into(),
        board_id: board_id.into(),
        tx,
    };
    (member, rx)
}

// =============================================================
// Register / members_of
// =============================================================

#[tokio::test]
async fn register_makes_member_visible_on_its_board() {
    let registry = Registry::new();
    let (alice, _rx) = member("alice", "b1");
    let alice_conn = alice.connection_id;

    assert!(registry.register(alice).await.is_none());

    let members = registry.members_of("b1", None).await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].connection_id, alice_conn);
    assert_eq!(members[0].user_id, "alice");
}

#[tokio::test]
async fn members_of_is_scoped_to_one_board() {
    let registry = Registry::new();
    let (alice, _rx_a) = member("alice", "b1");
    let (bob, _rx_b) = member("bob", "b2");
    registry.register(alice).await;
    registry.register(bob).await;

    assert_eq!(registry.members_of("b1", None).await.len(), 1);
    assert_eq!(registry.members_of("b2", None).await.len(), 1);
    assert!(registry.members_of("b3", None).await.is_empty());
}

#[tokio::test]
async fn members_of_honors_exclusion() {
    let registry = Registry::new();
    let (alice, _rx_a) = member("alice", "b1");
    let (bob, _rx_b) = member("bob", "b1");
    let alice_conn = alice.connection_id;
    registry.register(alice).await;
    registry.register(bob).await;

    let members = registry.members_of("b1", Some(alice_conn)).await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, "bob");
}

#[tokio::test]
async fn same_user_may_join_two_boards() {
    let registry = Registry::new();
    let (one, _rx1) = member("alice", "b1");
    let (two, _rx2) = member("alice", "b2");
    registry.register(one).await;
    assert!(registry.register(two).await.is_none());
    assert_eq!(registry.len().await, 2);
}

// =============================================================
// Replacement
// =============================================================

#[tokio::test]
async fn register_replaces_prior_channel_for_same_key() {
    let registry = Registry::new();
    let (old, mut old_rx) = member("alice", "b1");
    let old_conn = old.connection_id;
    registry.register(old).await;

    let (new, _new_rx) = member("alice", "b1");
    let new_conn = new.connection_id;
    let evicted = registry.register(new).await.expect("prior entry evicted");
    assert_eq!(evicted.connection_id, old_conn);

    // Dropping the evicted member closes the old connection's queue.
    drop(evicted);
    assert!(old_rx.recv().await.is_none());

    let members = registry.members_of("b1", None).await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].connection_id, new_conn);
}

#[tokio::test]
async fn stale_unregister_does_not_remove_replacement() {
    let registry = Registry::new();
    let (old, _old_rx) = member("alice", "b1");
    let old_conn = old.connection_id;
    registry.register(old).await;

    let (new, _new_rx) = member("alice", "b1");
    registry.register(new).await;

    // The replaced connection's cleanup finds nothing to remove.
    assert!(registry.unregister(old_conn).await.is_none());
    assert_eq!(registry.members_of("b1", None).await.len(), 1);
}

// =============================================================
// Unregister
// =============================================================

#[tokio::test]
async fn unregister_removes_entry_and_is_idempotent() {
    let registry = Registry::new();
    let (alice, _rx) = member("alice", "b1");
    let conn = alice.connection_id;
    registry.register(alice).await;

    let removed = registry.unregister(conn).await.expect("entry removed");
    assert_eq!(removed.user_id, "alice");
    assert!(registry.members_of("b1", None).await.is_empty());

    // Second unregister is a no-op, never an error.
    assert!(registry.unregister(conn).await.is_none());
}

#[tokio::test]
async fn unregister_unknown_connection_is_a_no_op() {
    let registry = Registry::new();
    assert!(registry.unregister(Uuid::new_v4()).await.is_none());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn board_is_empty_tracks_membership() {
    let registry = Registry::new();
    assert!(registry.board_is_empty("b1").await);

    let (alice, _rx) = member("alice", "b1");
    let conn = alice.connection_id;
    registry.register(alice).await;
    assert!(!registry.board_is_empty("b1").await);

    registry.unregister(conn).await;
    assert!(registry.board_is_empty("b1").await);
}
