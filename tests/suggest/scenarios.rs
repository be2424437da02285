use trial_ledger::document::{self, Node};
use trial_ledger::strategy::RandomStrategy;
use trial_ledger::{Error, GlobalId, ParamValue, Phase, SparseAssignment, Suggester, TrialStatus};

use super::{assignment, conditional_space, scripted, two_slot_space};

#[test]
fn first_batch_gets_fresh_increasing_ids() {
    let mut suggester = Suggester::new(two_slot_space(), RandomStrategy::with_seed(11));

    let docs = suggester.suggest(&[], &[], &[], 3).unwrap();

    assert_eq!(docs.len(), 3);
    let ids: Vec<u64> = docs.iter().map(|d| d.id().unwrap().get()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(suggester.store().next_id(), GlobalId::new(3));
    assert_eq!(suggester.store().slot(0).unwrap().len(), 3);
    assert_eq!(suggester.store().slot(1).unwrap().len(), 3);
    assert_eq!(suggester.phase(), Phase::Idle);
}

#[test]
fn second_batch_sees_recalled_history() {
    let first = vec![
        assignment(&[
            (0, ParamValue::Float(0.1)),
            (1, ParamValue::Float(0.2)),
            (2, ParamValue::Float(0.3)),
        ]),
        assignment(&[
            (0, ParamValue::Int(1)),
            (1, ParamValue::Int(2)),
            (2, ParamValue::Int(3)),
        ]),
    ];
    let (strategy, seen) = scripted(first.clone());
    let mut suggester = Suggester::new(two_slot_space(), strategy);
    let history = suggester.suggest(&[], &[], &[], 3).unwrap();

    let second = vec![
        assignment(&[(0, ParamValue::Float(0.4)), (1, ParamValue::Float(0.5))]),
        assignment(&[(0, ParamValue::Int(4)), (1, ParamValue::Int(5))]),
    ];
    let (strategy, seen_second) = scripted(second);
    suggester.set_strategy(strategy);

    let outcomes = vec![Some(1.0), Some(0.5), None];
    let statuses = vec![TrialStatus::Ok, TrialStatus::Ok, TrialStatus::Running];
    let docs = suggester.suggest(&history, &outcomes, &statuses, 2).unwrap();

    // The first call saw an empty history, one assignment per slot.
    assert_eq!(seen.lock().unwrap()[0], vec![SparseAssignment::new(); 2]);
    // The second call saw ids {0,1,2} renumbered to positions {0,1,2}.
    assert_eq!(seen_second.lock().unwrap()[0], first);

    let ids: Vec<u64> = docs.iter().map(|d| d.id().unwrap().get()).collect();
    assert_eq!(ids, vec![3, 4]);
    assert_eq!(suggester.store().next_id(), GlobalId::new(5));
}

#[test]
fn recall_positions_follow_request_order() {
    let batch = vec![
        assignment(&[
            (0, ParamValue::Float(0.1)),
            (1, ParamValue::Float(0.2)),
            (2, ParamValue::Float(0.3)),
        ]),
        assignment(&[(1, ParamValue::Int(2)), (2, ParamValue::Int(3))]),
    ];
    let (strategy, _) = scripted(batch);
    let mut suggester = Suggester::new(two_slot_space(), strategy);
    let _ = suggester.suggest(&[], &[], &[], 3).unwrap();

    let requested = [GlobalId::new(2), GlobalId::new(0), GlobalId::new(1)];
    let recalled = suggester.store().recall(&requested).unwrap();

    // Storage order (ids 0, 1, 2) mapped through the request's positions.
    assert_eq!(recalled[0].positions(), &[1, 2, 0]);
    assert_eq!(
        recalled[0].values(),
        &[
            ParamValue::Float(0.1),
            ParamValue::Float(0.2),
            ParamValue::Float(0.3)
        ]
    );
    // Slot 1 never stored id 0.
    assert_eq!(recalled[1].positions(), &[2, 0]);
}

#[test]
fn omitted_position_surfaces_as_unset() {
    let batch = vec![
        assignment(&[
            (0, ParamValue::Float(0.1)),
            (1, ParamValue::Float(0.2)),
            (2, ParamValue::Float(0.3)),
        ]),
        assignment(&[(0, ParamValue::Int(1)), (2, ParamValue::Int(3))]),
    ];
    let (strategy, _) = scripted(batch);
    let mut suggester = Suggester::new(two_slot_space(), strategy);

    let docs = suggester.suggest(&[], &[], &[], 3).unwrap();

    assert_eq!(docs[1].get("layers"), Some(&Node::Unset));
    assert_eq!(docs[1].value("lr"), Some(&ParamValue::Float(0.2)));
    let layers = suggester.store().slot(1).unwrap();
    assert_eq!(layers.ids(), &[GlobalId::new(0), GlobalId::new(2)]);
    assert_eq!(layers.get(GlobalId::new(1)), None);
}

#[test]
fn gap_in_coverage_changes_nothing() {
    let batch = vec![
        assignment(&[(0, ParamValue::Float(0.1)), (2, ParamValue::Float(0.3))]),
        assignment(&[(0, ParamValue::Int(1)), (2, ParamValue::Int(3))]),
    ];
    let (strategy, _) = scripted(batch);
    let mut suggester = Suggester::new(two_slot_space(), strategy);

    let before_counter = suggester.store().next_id();
    let before_entries = suggester.store().total_entries();
    let res = suggester.suggest(&[], &[], &[], 3);

    assert!(matches!(
        res,
        Err(Error::BatchSizeMismatch {
            expected: 3,
            got: 2
        })
    ));
    assert_eq!(suggester.store().next_id(), before_counter);
    assert_eq!(suggester.store().total_entries(), before_entries);
    assert_eq!(suggester.phase(), Phase::Idle);
}

#[test]
fn position_beyond_batch_is_rejected() {
    let batch = vec![
        assignment(&[(0, ParamValue::Float(0.1)), (5, ParamValue::Float(0.3))]),
        assignment(&[(0, ParamValue::Int(1))]),
    ];
    let (strategy, _) = scripted(batch);
    let mut suggester = Suggester::new(two_slot_space(), strategy);

    assert!(matches!(
        suggester.suggest(&[], &[], &[], 1),
        Err(Error::BatchSizeMismatch { expected: 1, .. })
    ));
    assert_eq!(suggester.store().next_id(), GlobalId::new(0));
}

#[test]
fn wrong_number_of_slots_is_a_schema_mismatch() {
    let batch = vec![assignment(&[(0, ParamValue::Float(0.1))])];
    let (strategy, _) = scripted(batch);
    let mut suggester = Suggester::new(two_slot_space(), strategy);

    assert!(matches!(
        suggester.suggest(&[], &[], &[], 1),
        Err(Error::SchemaMismatch(_))
    ));
}

#[test]
fn duplicate_position_is_not_dropped() {
    let batch = vec![
        assignment(&[(0, ParamValue::Float(0.1)), (0, ParamValue::Float(0.2))]),
        assignment(&[(0, ParamValue::Int(1))]),
    ];
    let (strategy, _) = scripted(batch);
    let mut suggester = Suggester::new(two_slot_space(), strategy);

    assert!(matches!(
        suggester.suggest(&[], &[], &[], 1),
        Err(Error::DuplicateIdentity { id }) if id == GlobalId::new(0)
    ));
    assert_eq!(suggester.store().total_entries(), 0);
}

#[test]
fn repeated_history_document_is_rejected() {
    let mut suggester = Suggester::new(two_slot_space(), RandomStrategy::with_seed(5));
    let docs = suggester.suggest(&[], &[], &[], 2).unwrap();

    let history = vec![docs[0].clone(), docs[0].clone()];
    let res = suggester.suggest(
        &history,
        &[None, None],
        &[TrialStatus::Running, TrialStatus::Running],
        1,
    );

    assert!(matches!(res, Err(Error::DuplicateIdentity { id }) if id == GlobalId::new(0)));
    assert_eq!(suggester.store().next_id(), GlobalId::new(2));
}

#[test]
fn conditional_branches_are_exclusive() {
    let space = conditional_space();
    let mut suggester = Suggester::new(space.clone(), RandomStrategy::with_seed(21));

    let docs = suggester.suggest(&[], &[], &[], 40).unwrap();

    for doc in &docs {
        let model = doc.value("model").and_then(ParamValue::as_categorical);
        let svm = doc.value("svm.c").is_some();
        let kernel = doc.value("svm.kernel").is_some();
        let forest = doc.value("forest.depth").is_some();
        assert_eq!(svm, model == Some(0));
        assert_eq!(kernel, model == Some(0));
        assert_eq!(forest, model == Some(1));
        // Every declared leaf is present, set or not.
        assert_eq!(
            doc.leaf_paths(),
            vec!["forest.depth", "model", "svm.c", "svm.kernel"]
        );
    }

    let store = suggester.store();
    let svm = store.slot(1).unwrap().len();
    let forest = store.slot(3).unwrap().len();
    assert_eq!(svm + forest, 40);
    assert_eq!(store.slot(0).unwrap().len(), 40);

    let (ids, batch) = document::from_documents(&space, &docs).unwrap();
    assert_eq!(store.recall(&ids).unwrap(), batch);
}

#[test]
fn strategy_keeps_learning_across_calls() {
    use trial_ledger::strategy::StrategyContext;
    use trial_ledger::{Result, SparseBatch};

    // Proposes one more than the best integer seen so far.
    let climber = |ctx: &StrategyContext<'_>| -> Result<SparseBatch> {
        let best = ctx
            .history
            .first()
            .into_iter()
            .flat_map(SparseAssignment::values)
            .filter_map(ParamValue::as_int)
            .max()
            .unwrap_or(0);
        let x: SparseAssignment = (0..ctx.n)
            .map(|p| (p, ParamValue::Int(best + 1 + p as i64)))
            .collect();
        Ok(vec![x])
    };
    let space = trial_ledger::space::SearchSpace::builder()
        .slot("x", trial_ledger::distribution::Distribution::int(0, 1000))
        .build()
        .unwrap();
    let mut suggester = Suggester::new(space, climber);

    let mut history = Vec::new();
    for _ in 0..4 {
        let docs = suggester
            .suggest(
                &history,
                &vec![None; history.len()],
                &vec![TrialStatus::Ok; history.len()],
                2,
            )
            .unwrap();
        history.extend(docs);
    }

    let xs: Vec<i64> = history
        .iter()
        .filter_map(|d| d.value("x").and_then(ParamValue::as_int))
        .collect();
    assert_eq!(xs, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(suggester.store().next_id(), GlobalId::new(8));
}

#[test]
fn proposal_outside_a_slot_domain_is_rejected() {
    // `layers` is int(1, 6).
    let batch = vec![
        assignment(&[(0, ParamValue::Float(0.1)), (1, ParamValue::Float(0.2))]),
        assignment(&[(0, ParamValue::Int(2)), (1, ParamValue::Int(9))]),
    ];
    let (strategy, _) = scripted(batch);
    let mut suggester = Suggester::new(two_slot_space(), strategy);

    let res = suggester.suggest(&[], &[], &[], 2);

    assert!(matches!(res, Err(Error::InvalidArgument(_))));
    assert_eq!(suggester.store().total_entries(), 0);
    assert_eq!(suggester.store().next_id(), GlobalId::new(0));
    assert_eq!(suggester.phase(), Phase::Idle);
}

#[test]
fn choice_index_past_the_last_category_is_rejected() {
    let batch = vec![
        assignment(&[(0, ParamValue::Categorical(2))]),
        SparseAssignment::new(),
        SparseAssignment::new(),
        SparseAssignment::new(),
    ];
    let (strategy, _) = scripted(batch);
    let mut suggester = Suggester::new(conditional_space(), strategy);

    assert!(matches!(
        suggester.suggest(&[], &[], &[], 1),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(suggester.store().total_entries(), 0);
}

#[test]
fn full_width_stepped_int_slot_is_sampled() {
    use trial_ledger::distribution::{Distribution, IntDistribution};

    let wide = Distribution::Int(IntDistribution {
        low: i64::MIN,
        high: i64::MAX,
        log_scale: false,
        step: Some(2),
    });
    let space = trial_ledger::space::SearchSpace::builder()
        .slot("seed", wide.clone())
        .build()
        .unwrap();
    let mut suggester = Suggester::new(space, RandomStrategy::with_seed(21));

    let docs = suggester.suggest(&[], &[], &[], 16).unwrap();

    assert_eq!(docs.len(), 16);
    for doc in &docs {
        let value = doc.value("seed").unwrap();
        assert!(wide.contains(value));
        assert_eq!(value.as_int().unwrap().rem_euclid(2), 0);
    }
}
