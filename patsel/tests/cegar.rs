use proptest::prelude::*;

use patsel_task::{fact, var, vars, Effect, Fact, Operator, PlanningTask, Var};

use patsel::cegar::{generate_pattern_collection, Cegar, CegarConfig, CegarError};
use patsel::pattern::Pattern;

fn config() -> CegarConfig {
    CegarConfig::default()
}

/// Two independent binary goal variables, each settable by one operator.
fn independent_goals_task() -> PlanningTask {
    let mut task = PlanningTask::new(vec![2, 2]);
    task.set_goals(vec![fact![0 => 1], fact![1 => 1]]);
    for index in 0..2 {
        task.add_operator(Operator {
            name: format!("set{}", index),
            cost: 1,
            preconditions: vec![],
            effects: vec![Effect::new(Fact::new(Var::from_index(index), 1))],
        });
    }
    task
}

/// Goal facts on `a` and `b`; reaching `a=1` needs `c=1` first.
fn chained_task() -> PlanningTask {
    let mut task = PlanningTask::new(vec![2, 2, 2]);
    task.set_goals(vec![fact![0 => 1], fact![1 => 1]]);
    task.add_operator(Operator {
        name: "o1".into(),
        cost: 1,
        preconditions: vec![fact![2 => 1]],
        effects: vec![Effect::new(fact![0 => 1])],
    });
    task.add_operator(Operator {
        name: "o2".into(),
        cost: 1,
        preconditions: vec![],
        effects: vec![Effect::new(fact![2 => 1])],
    });
    task.add_operator(Operator {
        name: "o3".into(),
        cost: 1,
        preconditions: vec![],
        effects: vec![Effect::new(fact![1 => 1])],
    });
    task
}

#[test]
fn solving_plan_returns_a_single_pattern() {
    // Executing the plan of either singleton leaves the other goal open, so
    // one merge happens; the merged pattern's plan then solves the task and
    // the result collapses to that single pattern.
    let task = independent_goals_task();
    let collection = generate_pattern_collection(&task, config()).expect("generation failed");
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.patterns()[0], Pattern::new(vars![0, 1].to_vec()));
}

#[test]
fn chained_task_grows_or_merges_until_solved() {
    let task = chained_task();
    let collection = generate_pattern_collection(&task, config()).expect("generation failed");
    // The task is solvable with every variable representable, so some plan
    // eventually executes in the concrete task.
    assert_eq!(collection.len(), 1);
    let pattern = &collection.patterns()[0];
    assert!(pattern.contains(var!(0)));
    assert!(pattern.contains(var!(2)));
}

#[test]
fn zero_refinements_return_the_initial_singletons() {
    let task = chained_task();
    let collection = generate_pattern_collection(
        &task,
        CegarConfig {
            max_refinements: 0,
            ..config()
        },
    )
    .expect("generation failed");
    assert_eq!(collection.patterns().len(), 2);
    assert_eq!(collection.patterns()[0], Pattern::singleton(var!(0)));
    assert_eq!(collection.patterns()[1], Pattern::singleton(var!(1)));
}

#[test]
fn zero_time_returns_the_initial_singletons() {
    let task = chained_task();
    let collection = generate_pattern_collection(
        &task,
        CegarConfig {
            max_time: 0.0,
            ..config()
        },
    )
    .expect("generation failed");
    assert_eq!(collection.patterns().len(), 2);
    assert_eq!(collection.patterns()[0], Pattern::singleton(var!(0)));
    assert_eq!(collection.patterns()[1], Pattern::singleton(var!(1)));
}

#[test]
fn goal_without_support_is_unsolvable() {
    let mut task = PlanningTask::new(vec![2, 2]);
    task.set_goals(vec![fact![0 => 1], fact![1 => 1]]);
    // Only the second goal variable has an operator.
    task.add_operator(Operator {
        name: "set1".into(),
        cost: 1,
        preconditions: vec![],
        effects: vec![Effect::new(fact![1 => 1])],
    });
    match generate_pattern_collection(&task, config()) {
        Err(CegarError::Unsolvable) => (),
        result => panic!("expected unsolvable, got {:?}", result.map(|c| c.len())),
    }
}

#[test]
fn tight_pdb_limit_blacklists_and_terminates() {
    let task = chained_task();
    let collection = generate_pattern_collection(
        &task,
        CegarConfig {
            max_pdb_size: 2,
            ..config()
        },
    )
    .expect("generation failed");
    // No pattern can grow, so every flawed variable ends up blacklisted and
    // the initial singletons survive.
    assert_eq!(collection.patterns().len(), 2);
    for pdb in collection.pdbs() {
        assert!(pdb.size() <= 2);
    }
}

#[test]
fn goal_singletons_may_exceed_the_pdb_limit() {
    // A goal variable with a domain larger than max_pdb_size must still be
    // representable in the initial collection.
    let mut task = PlanningTask::new(vec![5]);
    task.set_goals(vec![fact![0 => 4]]);
    for value in 0..4 {
        task.add_operator(Operator {
            name: format!("step{}", value),
            cost: 1,
            preconditions: vec![fact![0 => value]],
            effects: vec![Effect::new(fact![0 => value + 1])],
        });
    }
    let collection = generate_pattern_collection(
        &task,
        CegarConfig {
            max_pdb_size: 2,
            ..config()
        },
    )
    .expect("generation failed");
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.pdbs()[0].size(), 5);
}

#[test]
fn invalid_goal_is_rejected_in_debug_builds() {
    let task = independent_goals_task();
    let result = Cegar::new(&task, vec![fact![0 => 0]], config());
    if cfg!(debug_assertions) {
        match result {
            Err(CegarError::InvalidGoal { fact }) => assert_eq!(fact, fact![0 => 0]),
            _ => panic!("expected an invalid goal error"),
        }
    }
}

#[test]
fn goal_subset_restricts_detection() {
    // Only the first goal fact is configured. Its singleton's plan reaches
    // a=1 but not the full concrete goal; since goal flaws are drawn from
    // the configured facts only, the projection is marked solved and the
    // initial singleton is returned unchanged.
    let task = independent_goals_task();
    let collection = Cegar::new(&task, vec![fact![0 => 1]], config())
        .expect("setup failed")
        .run()
        .expect("generation failed");
    assert_eq!(collection.patterns(), &[Pattern::singleton(var!(0))]);
}

#[test]
fn fixed_seed_is_reproducible() {
    let task = chained_task();
    let seeded = |seed| {
        generate_pattern_collection(
            &task,
            CegarConfig {
                seed,
                max_pdb_size: 4,
                ..config()
            },
        )
        .expect("generation failed")
    };
    let first = seeded(3);
    let second = seeded(3);
    assert_eq!(first.patterns(), second.patterns());
    let first_sizes: Vec<u64> = first.pdbs().iter().map(|pdb| pdb.size()).collect();
    let second_sizes: Vec<u64> = second.pdbs().iter().map(|pdb| pdb.size()).collect();
    assert_eq!(first_sizes, second_sizes);
}

#[test]
fn preset_blacklist_suppresses_flaws_on_the_variable() {
    // With c blacklisted from the start, the plan for {a} pushes through o1
    // and only the goal flaw on b remains; no pattern ever contains c.
    let task = chained_task();
    let collection = generate_pattern_collection(
        &task,
        CegarConfig {
            blacklist: vec![var!(2)],
            ..config()
        },
    )
    .expect("generation failed");
    for pattern in collection.patterns() {
        assert!(!pattern.contains(var!(2)));
    }
}

proptest! {
    #[test]
    fn random_tasks_respect_the_size_limits(
        task in patsel_task::test::planning_task(1..5usize, 0..8usize),
        seed in 0..64u64,
    ) {
        let max_pdb_size = 16;
        let result = generate_pattern_collection(
            &task,
            CegarConfig {
                max_pdb_size,
                max_refinements: 50,
                seed,
                ..CegarConfig::default()
            },
        );
        let collection = match result {
            Ok(collection) => collection,
            // Random tasks may simply have unreachable goals.
            Err(CegarError::Unsolvable) => return Ok(()),
            Err(err) => panic!("generation failed: {}", err),
        };

        prop_assert!(!collection.is_empty());
        for (pattern, pdb) in collection.iter() {
            prop_assert_eq!(pattern, pdb.pattern());
            // Only the initial goal singletons may exceed the limit.
            if pattern.len() > 1 {
                prop_assert!(pdb.size() <= max_pdb_size);
            }
        }

        // Patterns of the returned collection never overlap.
        let mut seen = std::collections::HashSet::new();
        for pattern in collection.patterns() {
            for &var in pattern.vars() {
                prop_assert!(seen.insert(var), "variable {} in two patterns", var);
            }
        }
    }
}
