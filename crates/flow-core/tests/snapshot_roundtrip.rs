//! Integration tests: fixture → import → export → import.

use flow_core::{
    ConnectionKey, FlowError, FlowEvent, GraphSnapshot, GraphStore, IdStrategy, NodeId, NodeSpec,
    Point, HOME_MODULE,
};
use pretty_assertions::assert_eq;

fn load_pipeline() -> GraphStore {
    let json = include_str!("fixtures/pipeline.json");
    let mut store = GraphStore::new(IdStrategy::Counter);
    store
        .import(GraphSnapshot::from_json(json).expect("fixture parses"))
        .expect("fixture imports");
    store
}

#[test]
fn fixture_imports_with_structure() {
    let store = load_pipeline();
    assert_eq!(
        store.module_names().collect::<Vec<_>>(),
        vec![HOME_MODULE, "Archive"]
    );
    assert_eq!(store.active().len(), 4);
    assert_eq!(store.module_of(NodeId::intern("7")), Some("Archive"));

    let slow = ConnectionKey::new(NodeId::intern("1"), 0, NodeId::intern("3"), 0);
    assert_eq!(store.waypoints(slow), Some(&[Point::new(260.0, 340.0)][..]));
    assert_eq!(
        store.connection(slow).and_then(|c| c.style.as_deref()),
        Some("slow")
    );
    assert!(store.node(NodeId::intern("3")).unwrap().prevent_remove);
    assert!(store.check_invariants().is_ok());
}

#[test]
fn export_then_import_is_structurally_equal() {
    let mut store = load_pipeline();
    let first = store.export();
    let json = first.to_json().unwrap();

    let mut other = GraphStore::new(IdStrategy::Counter);
    other.import(GraphSnapshot::from_json(&json).unwrap()).unwrap();
    assert_eq!(other.export(), first);
    for name in ["Home", "Archive"] {
        assert_eq!(store.module(name), other.module(name));
    }
}

#[test]
fn import_emits_single_event_and_continues_ids() {
    let mut store = load_pipeline();
    assert_eq!(store.events_mut().drain(), vec![FlowEvent::Imported]);
    let id = store.add_node(NodeSpec::new("next", 1, 1)).unwrap();
    assert_eq!(id.as_str(), "8");
}

#[test]
fn snapshot_without_home_gets_one() {
    let mut store = GraphStore::default();
    store
        .import(GraphSnapshot::from_json(r#"{ "Other": { "data": {} } }"#).unwrap())
        .unwrap();
    assert!(store.module(HOME_MODULE).is_some());
    assert_eq!(store.active_module(), HOME_MODULE);
}

#[test]
fn malformed_json_is_invalid_snapshot() {
    assert!(matches!(
        GraphSnapshot::from_json("{ not json"),
        Err(FlowError::InvalidSnapshot(_))
    ));
}
