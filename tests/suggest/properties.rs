use std::collections::HashSet;

use trial_ledger::document::{self, Document};
use trial_ledger::strategy::RandomStrategy;
use trial_ledger::{Error, GlobalId, Suggester, TrialStatus};

use super::conditional_space;

/// Drives `rounds` suggest calls with random batch sizes, feeding back a
/// random subset of the documents seen so far in random order.
fn random_session(seed: u64, rounds: usize) -> (Suggester, Vec<Document>) {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut suggester = Suggester::new(conditional_space(), RandomStrategy::with_seed(seed));
    let mut seen: Vec<Document> = Vec::new();

    for _ in 0..rounds {
        let mut history: Vec<Document> = seen
            .iter()
            .filter(|_| rng.bool())
            .cloned()
            .collect();
        rng.shuffle(&mut history);
        let outcomes: Vec<Option<f64>> = history.iter().map(|_| Some(rng.f64())).collect();
        let statuses = vec![TrialStatus::Ok; history.len()];

        let n = rng.usize(1..=6);
        let docs = suggester.suggest(&history, &outcomes, &statuses, n).unwrap();
        assert_eq!(docs.len(), n);
        seen.extend(docs);
    }
    (suggester, seen)
}

#[test]
fn ids_are_never_reissued() {
    let (suggester, seen) = random_session(3, 25);

    let ids: HashSet<GlobalId> = seen.iter().map(|d| d.id().unwrap()).collect();
    assert_eq!(ids.len(), seen.len());

    for slot in suggester.store().slots() {
        let unique: HashSet<_> = slot.ids().iter().collect();
        assert_eq!(unique.len(), slot.len());
    }
}

#[test]
fn counter_stays_ahead_of_every_stored_id() {
    let (suggester, seen) = random_session(17, 25);
    let store = suggester.store();

    let max = store.max_id().unwrap();
    assert!(store.next_id() > max);
    assert_eq!(store.next_id().get(), seen.len() as u64);
}

#[test]
fn recall_maps_each_id_to_its_request_index() {
    let (suggester, seen) = random_session(29, 10);
    let store = suggester.store();

    let mut rng = fastrand::Rng::with_seed(1);
    let mut requested: Vec<GlobalId> = seen.iter().map(|d| d.id().unwrap()).collect();
    rng.shuffle(&mut requested);
    requested.truncate(requested.len() / 2);
    // An id the store never issued is simply absent.
    requested.push(GlobalId::new(10_000));

    let recalled = store.recall(&requested).unwrap();
    for (slot, assignment) in store.slots().iter().zip(&recalled) {
        let expected: Vec<(usize, _)> = slot
            .entries()
            .filter_map(|(id, v)| {
                requested
                    .iter()
                    .position(|&r| r == id)
                    .map(|p| (p, v.clone()))
            })
            .collect();
        let got: Vec<(usize, _)> = assignment.iter().map(|(p, v)| (p, v.clone())).collect();
        assert_eq!(got, expected);
    }
}

#[test]
fn documents_round_trip_through_the_store() {
    let (suggester, seen) = random_session(41, 8);
    let space = suggester.space();

    let (ids, batch) = document::from_documents(space, &seen).unwrap();
    let recalled = suggester.store().recall(&ids).unwrap();

    assert_eq!(recalled, batch);
    for (assignment, expected) in recalled.iter().zip(&batch) {
        for (a, b) in assignment.values().iter().zip(expected.values()) {
            if let (Some(x), Some(y)) = (a.as_float(), b.as_float()) {
                assert_eq!(x.to_bits(), y.to_bits());
            }
        }
    }
}

#[test]
fn recall_rejects_repeated_ids() {
    let (suggester, _) = random_session(2, 1);
    let res = suggester
        .store()
        .recall(&[GlobalId::new(0), GlobalId::new(0)]);
    assert!(matches!(res, Err(Error::DuplicateIdentity { id }) if id == GlobalId::new(0)));
}
