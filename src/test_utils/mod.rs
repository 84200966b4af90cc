use std::collections::BTreeMap;
use std::sync::Arc;

use crate::schema::MemAttributeTree;
use crate::schema::Path;
use crate::schema::PathEntry;
use crate::schema::SnapshotNode;
use crate::schema::Value;
use crate::schema::PLATFORM_DB_SCHEMA;

pub(crate) fn leaf_uint(v: u64) -> SnapshotNode {
    SnapshotNode::Leaf(Value::UInt(v))
}

pub(crate) fn leaf_enum(v: &str) -> SnapshotNode {
    SnapshotNode::Leaf(Value::Enum(v.to_string()))
}

fn fan_tray(rpm: u64) -> SnapshotNode {
    let mut children = BTreeMap::new();
    children.insert("rpm".to_string(), leaf_uint(rpm));
    children.insert("status".to_string(), leaf_enum("HW_STATE_PRESENT"));
    SnapshotNode::Group(children)
}

fn port(speed_bps: u64) -> SnapshotNode {
    let mut transceiver = BTreeMap::new();
    transceiver.insert("present".to_string(), SnapshotNode::Leaf(Value::Bool(true)));
    transceiver.insert("temperature_celsius".to_string(), SnapshotNode::Leaf(Value::Double(35.0)));

    let mut children = BTreeMap::new();
    children.insert("speed_bps".to_string(), leaf_uint(speed_bps));
    children.insert("transceiver".to_string(), SnapshotNode::Group(transceiver));
    SnapshotNode::Group(children)
}

/// A small PlatformDB-shaped value tree: two fan trays and one card with two
/// ports.
pub(crate) fn platform_root() -> SnapshotNode {
    let mut card = BTreeMap::new();
    card.insert(
        "ports".to_string(),
        SnapshotNode::List(vec![port(100_000_000_000), port(400_000_000_000)]),
    );

    let mut children = BTreeMap::new();
    children.insert(
        "fan_trays".to_string(),
        SnapshotNode::List(vec![fan_tray(4200), fan_tray(4300)]),
    );
    children.insert(
        "cards".to_string(),
        SnapshotNode::List(vec![SnapshotNode::Group(card)]),
    );
    SnapshotNode::Group(children)
}

pub(crate) fn platform_tree() -> Arc<MemAttributeTree> {
    Arc::new(MemAttributeTree::new(PLATFORM_DB_SCHEMA, platform_root()))
}

pub(crate) fn fan_rpm_path(tray: usize) -> Path {
    Path::new(vec![PathEntry::indexed("fan_trays", tray), PathEntry::named("rpm")])
}

pub(crate) fn all_fan_rpm_path() -> Path {
    Path::new(vec![PathEntry::all("fan_trays"), PathEntry::named("rpm")])
}

pub(crate) fn port_speed_path(
    card: usize,
    port: usize,
) -> Path {
    Path::new(vec![
        PathEntry::indexed("cards", card),
        PathEntry::indexed("ports", port),
        PathEntry::named("speed_bps"),
    ])
}
