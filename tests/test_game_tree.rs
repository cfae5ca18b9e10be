use std::collections::HashSet;

use leduc_cfr::game_tree::*;

fn rule_sets() -> Vec<GameRules> {
    vec![
        GameRules::LEDUC,
        GameRules {
            bets_per_round: [1, 1],
            ..GameRules::LEDUC
        },
        GameRules {
            bets_per_round: [3, 3],
            ..GameRules::LEDUC
        },
        GameRules {
            bets_per_round: [1, 3],
            first_to_act: [0, 1],
            ..GameRules::LEDUC
        },
    ]
}

/// Raises made so far in the node's own round.
fn raises_in_round(tree: &GameTree, u: Sequence) -> u32 {
    let s = tree.sequence_to_string(u);
    let tail = s.rsplit(ROUND_SEPARATOR).next().unwrap_or("");
    tail.chars().filter(|&c| c == 'r').count() as u32
}

#[test]
fn test_leduc_sizes() {
    let tree = GameTree::leduc();
    assert_eq!(tree.num_internal(), 36);
    assert_eq!(tree.num_terminal(), 49);
    assert_eq!(tree.num_total(), 85);
}

#[test]
fn test_count_matches_allocation() {
    for rules in rule_sets() {
        let tree = GameTree::new(rules).unwrap();
        let (internal, terminal) = count_sequences(&rules);
        assert_eq!(tree.num_internal(), internal, "rules {:?}", rules);
        assert_eq!(tree.num_terminal(), terminal, "rules {:?}", rules);
    }
}

#[test]
fn test_every_node_reachable() {
    for rules in rule_sets() {
        let tree = GameTree::new(rules).unwrap();
        let mut seen = HashSet::new();
        let mut stack = vec![tree.root()];
        while let Some(u) = stack.pop() {
            assert!(seen.insert(u), "node {} reached twice", u.id());
            stack.extend(tree.actions(u).map(|(_, v)| v));
        }
        assert_eq!(seen.len(), tree.num_total());
    }
}

#[test]
fn test_string_round_trip() {
    for rules in rule_sets() {
        let tree = GameTree::new(rules).unwrap();
        for u in tree.sequences() {
            let s = tree.sequence_to_string(u);
            assert_eq!(tree.parse_sequence(&s).unwrap(), u, "string {}", s);
        }
    }
}

#[test]
fn test_transition_rules() {
    for rules in rule_sets() {
        let tree = GameTree::new(rules).unwrap();
        for u in tree.internal_sequences() {
            let raises = raises_in_round(&tree, u);
            let cap = rules.bets_per_round[tree.round(u)];
            assert!(tree.can_do_action(u, Action::Call));
            assert_eq!(tree.can_do_action(u, Action::Raise), raises < cap);
            assert_eq!(tree.can_do_action(u, Action::Fold), raises > 0);
        }
    }
}

#[test]
fn test_round_advances_once() {
    let tree = GameTree::leduc();
    for u in tree.internal_sequences() {
        for (_, v) in tree.actions(u) {
            assert_eq!(tree.parent(v), Some(u));
            let step = tree.round(v) - tree.round(u);
            assert!(step <= 1);
            if !tree.is_terminal(v) && step == 1 {
                assert!(tree.starts_round(v));
                assert_eq!(tree.whose_turn(v), GameRules::LEDUC.first_to_act[1]);
            }
        }
    }
}

#[test]
fn test_second_round_first_to_act() {
    let rules = GameRules {
        first_to_act: [0, 1],
        ..GameRules::LEDUC
    };
    let tree = GameTree::new(rules).unwrap();
    let u = tree.parse_sequence("/cc/").unwrap();
    assert_eq!(tree.whose_turn(u), 1);
    assert!(tree.starts_round(u));
}

#[test]
fn test_fold_payoffs() {
    let tree = GameTree::leduc();
    let cases = [("/rf", 1, 0), ("/crf", 1, 1), ("/rrf", 3, 1), ("/cc/rf", 1, 0), ("/rc/rrf", 7, 1)];
    for (s, amount, winner) in cases {
        let u = tree.parse_sequence(s).unwrap();
        assert!(tree.is_fold(u), "{}", s);
        assert_eq!(tree.win_amount(u), amount, "{}", s);
        assert_eq!(tree.winner_at_fold(u), Some(winner), "{}", s);
        assert_eq!(tree.who_folded(u), Some(opponent(winner)), "{}", s);
    }
}

#[test]
fn test_showdown_payoffs() {
    let tree = GameTree::leduc();
    let cases = [("/cc/cc", 1), ("/rc/cc", 3), ("/rc/rc", 7), ("/crrc/crrc", 13)];
    for (s, amount) in cases {
        let u = tree.parse_sequence(s).unwrap();
        assert!(tree.is_showdown(u), "{}", s);
        assert_eq!(tree.win_amount(u), amount, "{}", s);
        assert_eq!(tree.round(u), 1);
    }
}

#[test]
fn test_do_action() {
    let tree = GameTree::leduc();
    let root = tree.root();
    let r = tree.do_action(root, Action::Raise).unwrap();
    assert_eq!(tree.sequence_to_string(r), "/r");
    assert!(tree.do_action(root, Action::Fold).is_err());
}

#[test]
fn test_parse_errors() {
    let tree = GameTree::leduc();
    for bad in ["", "r", "/x", "/cc", "/ccc", "/rc", "/rc/rc/", "/cc/cc/"] {
        assert!(tree.parse_sequence(bad).is_err(), "'{}' should not parse", bad);
    }
}

#[test]
fn test_invalid_rules() {
    let zero_bet = GameRules {
        bet_size: [0, 4],
        ..GameRules::LEDUC
    };
    assert!(GameTree::new(zero_bet).is_err());
    let bad_seat = GameRules {
        first_to_act: [2, 0],
        ..GameRules::LEDUC
    };
    assert!(GameTree::new(bad_seat).is_err());
}
