use std::fs;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use leduc_cfr::abstraction::Abstraction;
use leduc_cfr::cards::{NUM_FLOP_HANDS, NUM_PREFLOP_HANDS};
use leduc_cfr::error::LeducError;
use leduc_cfr::game_tree::GameTree;
use leduc_cfr::strategy::StrategyStore;
use leduc_cfr::trainer::{self, Seed, TrainConfig, Trainer, DEFAULT_ITERATIONS};
use tempfile::tempdir;

const COARSE: &str = "J,Q,K:JJ,JQ,JK,QJ,QQ,QK,KJ,KQ,KK";

fn decision_entries(tree: &GameTree, player: usize) -> usize {
    tree.internal_sequences()
        .filter(|&u| tree.whose_turn(u) == player)
        .map(|u| {
            if tree.round(u) > 0 {
                NUM_FLOP_HANDS
            } else {
                NUM_PREFLOP_HANDS
            }
        })
        .sum()
}

fn body(text: &str) -> Vec<&str> {
    text.lines().filter(|l| !l.starts_with('#')).collect()
}

#[test]
fn test_config_from_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("train.json");
    fs::write(
        &path,
        r#"{ "abstractions": [null, "J:Q:K:JJ:JQ:JK:QJ:QQ:QK:KJ:KQ:KK"], "iterations": 500, "seed": { "fixed": 7 } }"#,
    )
    .unwrap();

    let config = TrainConfig::load(&path).unwrap();
    assert_eq!(config.iterations, 500);
    assert_eq!(config.seed, Seed::Fixed(7));
    assert_eq!(config.outputs, [None, None]);

    let abstractions = config.abstractions().unwrap();
    assert_eq!(abstractions[0].preflop_buckets(), 3);
    assert_eq!(abstractions[1].flop_buckets(), 9);
}

#[test]
fn test_config_defaults() {
    let config = TrainConfig::default();
    assert_eq!(config.iterations, DEFAULT_ITERATIONS);
    assert_eq!(config.seed, Seed::Fixed(31337));
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_rejects_zero_iterations() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("train.json");
    fs::write(&path, r#"{ "iterations": 0 }"#).unwrap();
    assert!(matches!(
        TrainConfig::load(&path),
        Err(LeducError::InvalidValue(_))
    ));

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        TrainConfig::load(&path),
        Err(LeducError::JsonError(_))
    ));
}

#[test]
fn test_run_saves_both_strategies() {
    let tree = Arc::new(GameTree::leduc());
    let dir = tempdir().unwrap();
    let outputs = [dir.path().join("p1.txt"), dir.path().join("p2.txt")];
    let config = TrainConfig {
        outputs: [Some(outputs[0].clone()), Some(outputs[1].clone())],
        iterations: 2_000,
        ..TrainConfig::default()
    };

    let trainer = trainer::run(Arc::clone(&tree), &config).unwrap();
    assert_eq!(trainer.iterations(), 2_000);

    for (player, path) in outputs.iter().enumerate() {
        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("#\n# leduc strategy"));
        assert!(text.contains("# iterations:    2000"));

        let store = StrategyStore::load(Arc::clone(&tree), path.to_str().unwrap()).unwrap();
        assert_eq!(store.len(), decision_entries(&tree, player));
        for (_, _, tuple) in store.entries() {
            let sum: f64 = tuple.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }
}

#[test]
fn test_fixed_seed_is_reproducible() {
    let tree = Arc::new(GameTree::leduc());
    let dir = tempdir().unwrap();

    let mut saved = Vec::new();
    for run in 0..2 {
        let path = dir.path().join(format!("run{}.txt", run));
        let config = TrainConfig {
            outputs: [Some(path.clone()), None],
            iterations: 1_000,
            seed: Seed::Fixed(99),
            ..TrainConfig::default()
        };
        trainer::run(Arc::clone(&tree), &config).unwrap();
        saved.push(fs::read_to_string(&path).unwrap());
    }
    assert_eq!(body(&saved[0]), body(&saved[1]));
}

#[test]
fn test_coarse_abstraction_shares_strategy() {
    let tree = Arc::new(GameTree::leduc());
    let coarse = Abstraction::parse(COARSE).unwrap();
    let mut trainer = Trainer::new(
        Arc::clone(&tree),
        [coarse, Abstraction::identity()],
        31337,
    );
    trainer.train(2_000, 3600).unwrap();

    let store = trainer.recover_strategy(0).unwrap();
    assert_eq!(store.len(), decision_entries(&tree, 0));
    for u in tree.internal_sequences().filter(|&u| tree.whose_turn(u) == 0) {
        let tuples: Vec<_> = store.entries().filter(|(v, _, _)| *v == u).map(|(_, _, t)| *t).collect();
        assert!(!tuples.is_empty());
        assert!(tuples.iter().all(|t| t == &tuples[0]), "{}", tree.sequence_to_string(u));
    }

    // the identity player still distinguishes its hands somewhere
    let other = trainer.recover_strategy(1).unwrap();
    let root_reply = tree.parse_sequence("/r").unwrap();
    let replies: Vec<_> = other.entries().filter(|(v, _, _)| *v == root_reply).map(|(_, _, t)| *t).collect();
    assert_eq!(replies.len(), NUM_PREFLOP_HANDS);
    assert!(replies.iter().any(|t| t != &replies[0]));
}

#[test]
fn test_average_regret_is_running_mean() {
    let tree = Arc::new(GameTree::leduc());
    let identity = || [Abstraction::identity(), Abstraction::identity()];

    let mut stepped = Trainer::new(Arc::clone(&tree), identity(), 31337);
    let mut totals = [0.0; 2];
    let mut first = [0.0; 2];
    for i in 0..2_000 {
        let cfr = stepped.iterate().unwrap();
        if i == 0 {
            first = cfr;
        }
        totals[0] += cfr[0];
        totals[1] += cfr[1];
    }
    let regret = stepped.average_regret();
    for player in 0..2 {
        assert_abs_diff_eq!(regret[player], totals[player] / 2_000.0, epsilon = 1e-9);
        assert!(regret[player].is_finite() && regret[player] >= 0.0);
    }
    assert_ne!(regret, first);

    // the batch loop reports the same metric for the same seed
    let mut batch = Trainer::new(Arc::clone(&tree), identity(), 31337);
    batch.train(2_000, 3600).unwrap();
    assert_eq!(batch.iterations(), 2_000);
    assert_eq!(batch.average_regret(), regret);
}
