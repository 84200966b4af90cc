use std::collections::BTreeMap;

use crate::schema::Path;
use crate::schema::PathEntry;
use crate::schema::Snapshot;
use crate::schema::SnapshotNode;
use crate::schema::Value;

fn leaf(v: u64) -> SnapshotNode {
    SnapshotNode::Leaf(Value::UInt(v))
}

/// Change detection relies on structural equality being independent of the
/// order fields were inserted in.
#[test]
fn test_group_equality_is_insertion_order_independent() {
    let mut forward = BTreeMap::new();
    forward.insert("rpm".to_string(), leaf(4200));
    forward.insert("status".to_string(), SnapshotNode::Leaf(Value::Enum("HW_STATE_PRESENT".into())));

    let mut reverse = BTreeMap::new();
    reverse.insert("status".to_string(), SnapshotNode::Leaf(Value::Enum("HW_STATE_PRESENT".into())));
    reverse.insert("rpm".to_string(), leaf(4200));

    assert_eq!(
        Snapshot::new(SnapshotNode::Group(forward)),
        Snapshot::new(SnapshotNode::Group(reverse))
    );
}

#[test]
fn test_leaf_difference_breaks_equality() {
    let a = Snapshot::new(SnapshotNode::group([("rpm".to_string(), leaf(4200))]));
    let b = Snapshot::new(SnapshotNode::group([("rpm".to_string(), leaf(4201))]));
    assert_ne!(a, b);
}

#[test]
fn test_list_order_is_significant() {
    let a = Snapshot::new(SnapshotNode::group([(
        "fan_trays".to_string(),
        SnapshotNode::List(vec![leaf(1), leaf(2)]),
    )]));
    let b = Snapshot::new(SnapshotNode::group([(
        "fan_trays".to_string(),
        SnapshotNode::List(vec![leaf(2), leaf(1)]),
    )]));
    assert_ne!(a, b);
}

#[test]
fn test_leaf_navigation() {
    let tray = SnapshotNode::group([("rpm".to_string(), leaf(4200))]);
    let snapshot = Snapshot::new(SnapshotNode::group([(
        "fan_trays".to_string(),
        SnapshotNode::List(vec![tray]),
    )]));

    let path = Path::new(vec![PathEntry::indexed("fan_trays", 0), PathEntry::named("rpm")]);
    assert_eq!(snapshot.leaf(&path), Some(&Value::UInt(4200)));

    let missing = Path::new(vec![PathEntry::indexed("fan_trays", 7), PathEntry::named("rpm")]);
    assert_eq!(snapshot.leaf(&missing), None);

    // A group is not a leaf.
    let group = Path::new(vec![PathEntry::indexed("fan_trays", 0)]);
    assert_eq!(snapshot.leaf(&group), None);
}

#[test]
fn test_empty_snapshot() {
    assert_eq!(Snapshot::empty(), Snapshot::new(SnapshotNode::empty_group()));
}
