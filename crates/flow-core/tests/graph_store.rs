//! Integration tests: graph store invariants under sequences of edits.

use flow_core::{
    ConnectOutcome, ConnectionKey, FlowEvent, GraphStore, IdStrategy, NodeId, NodeSpec,
    SlotDirection,
};
use pretty_assertions::assert_eq;

fn new_store() -> GraphStore {
    let _ = env_logger::builder().is_test(true).try_init();
    GraphStore::new(IdStrategy::Counter)
}

fn key(a: NodeId, out: usize, b: NodeId, inp: usize) -> ConnectionKey {
    ConnectionKey::new(a, out, b, inp)
}

fn edges(store: &GraphStore) -> Vec<ConnectionKey> {
    let mut keys: Vec<_> = store.connections().collect();
    keys.sort_by_key(|k| {
        (
            k.source.as_str().to_string(),
            k.source_slot,
            k.target.as_str().to_string(),
            k.target_slot,
        )
    });
    keys
}

// ─── Scenarios ───────────────────────────────────────────────────────────

#[test]
fn removing_the_only_input_drops_its_link() {
    let mut store = new_store();
    let a = store.add_node(NodeSpec::new("a", 0, 1)).unwrap();
    let b = store.add_node(NodeSpec::new("b", 1, 0)).unwrap();

    let slot_a = store.slot_index(a, SlotDirection::Output, "output_1").unwrap();
    let slot_b = store.slot_index(b, SlotDirection::Input, "input_1").unwrap();
    assert_eq!(
        store.add_connection(key(a, slot_a, b, slot_b), None),
        Ok(ConnectOutcome::Created)
    );

    store.remove_slot(b, SlotDirection::Input, slot_b).unwrap();
    assert_eq!(store.node(b).unwrap().inputs.len(), 0);
    assert!(store.node(a).unwrap().outputs[0].connections.is_empty());
    assert!(store.check_invariants().is_ok());
}

#[test]
fn duplicate_connect_stores_one_edge() {
    let mut store = GraphStore::new(IdStrategy::Uuid);
    let a = store.add_node(NodeSpec::new("a", 0, 1)).unwrap();
    let b = store.add_node(NodeSpec::new("b", 1, 0)).unwrap();

    store.add_connection(key(a, 0, b, 0), None).unwrap();
    store.add_connection(key(a, 0, b, 0), None).unwrap();

    assert_eq!(edges(&store), vec![key(a, 0, b, 0)]);
    let created = store
        .events_mut()
        .drain()
        .into_iter()
        .filter(|e| matches!(e, FlowEvent::ConnectionCreated(_)))
        .count();
    assert_eq!(created, 1);
}

#[test]
fn renumbering_keeps_every_link_reachable() {
    let mut store = new_store();
    let hub = store.add_node(NodeSpec::new("hub", 5, 0)).unwrap();
    let feeders: Vec<_> = (0..5)
        .map(|i| store.add_node(NodeSpec::new(format!("f{i}"), 0, 1)).unwrap())
        .collect();
    for (i, f) in feeders.iter().enumerate() {
        store.add_connection(key(*f, 0, hub, i), None).unwrap();
    }

    // Remove slot 2 (`input_3`): f2 is disconnected, f3/f4 shift down.
    store.remove_slot(hub, SlotDirection::Input, 2).unwrap();

    assert_eq!(store.node(hub).unwrap().inputs.len(), 4);
    assert!(store.node(feeders[2]).unwrap().outputs[0].connections.is_empty());
    let expected = [
        (feeders[0], 0),
        (feeders[1], 1),
        (feeders[3], 2),
        (feeders[4], 3),
    ];
    for (f, slot) in expected {
        let record = &store.node(f).unwrap().outputs[0].connections[0];
        assert!(record.points_at(hub, slot), "{f:?} should point at input {slot}");
        let mirror = &store.node(hub).unwrap().inputs[slot].connections;
        assert_eq!(mirror.len(), 1);
        assert!(mirror[0].points_at(f, 0));
    }
    assert!(store.check_invariants().is_ok());
}

#[test]
fn cascade_removes_incident_edges_only() {
    let mut store = new_store();
    let ids: Vec<_> = (0..4)
        .map(|i| store.add_node(NodeSpec::new(format!("n{i}"), 2, 2)).unwrap())
        .collect();
    store.add_connection(key(ids[0], 0, ids[1], 0), None).unwrap();
    store.add_connection(key(ids[1], 1, ids[2], 1), None).unwrap();
    store.add_connection(key(ids[2], 0, ids[3], 0), None).unwrap();
    store.add_connection(key(ids[0], 1, ids[3], 1), None).unwrap();
    store.add_connection(key(ids[3], 0, ids[1], 1), None).unwrap();

    store.remove_node(ids[1]).unwrap();

    assert_eq!(
        edges(&store),
        vec![key(ids[0], 1, ids[3], 1), key(ids[2], 0, ids[3], 0)]
    );
    assert!(store.check_invariants().is_ok());
}

// ─── Randomized edit sequences ───────────────────────────────────────────

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

#[test]
fn mirror_invariant_survives_random_edits() {
    for seed in 1..=20u64 {
        let mut rng = Lcg(seed);
        let mut store = new_store();
        let mut nodes: Vec<NodeId> = Vec::new();

        for _ in 0..300 {
            match rng.next(7) {
                0 | 1 => {
                    let id = store
                        .add_node(NodeSpec::new("n", rng.next(4), rng.next(4)))
                        .unwrap();
                    nodes.push(id);
                }
                2 | 3 if nodes.len() >= 2 => {
                    let a = nodes[rng.next(nodes.len())];
                    let b = nodes[rng.next(nodes.len())];
                    let outs = store.node(a).unwrap().outputs.len();
                    let ins = store.node(b).unwrap().inputs.len();
                    if outs > 0 && ins > 0 {
                        store
                            .add_connection(key(a, rng.next(outs), b, rng.next(ins)), None)
                            .unwrap();
                    }
                }
                4 if !nodes.is_empty() => {
                    let n = nodes[rng.next(nodes.len())];
                    let dir = if rng.next(2) == 0 {
                        SlotDirection::Input
                    } else {
                        SlotDirection::Output
                    };
                    let count = store.node(n).unwrap().slots(dir).len();
                    if count > 0 {
                        store.remove_slot(n, dir, rng.next(count)).unwrap();
                    } else {
                        store.add_slot(n, dir).unwrap();
                    }
                }
                5 if !nodes.is_empty() => {
                    let n = nodes.swap_remove(rng.next(nodes.len()));
                    store.remove_node(n).unwrap();
                }
                6 => {
                    let all = edges(&store);
                    if !all.is_empty() {
                        assert!(store.remove_connection(all[rng.next(all.len())]));
                    }
                }
                _ => {}
            }
            if let Err(e) = store.check_invariants() {
                panic!("seed {seed}: {e}");
            }
        }
    }
}
