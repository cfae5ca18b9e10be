//! Exact best response against a fixed opponent strategy.
//!
//! Runs in two passes over the unabstracted tree:
//!
//! 1. [`TerminalReach`]: for every terminal and every opponent hand, the
//!    probability that the opponent's own actions lead there.
//! 2. A bucket-by-bucket walk for the responder that takes the best action at
//!    each of its decision nodes and sums the opponent's choices, resolving
//!    terminals by enumerating every card combination consistent with the
//!    responder's bucket.
//!
//! The responder's abstraction must be complete and have perfect recall.

use std::path::Path;
use std::sync::Arc;

use crate::abstraction::Abstraction;
use crate::cards::{chance_prob, chance_prob_with_board, evaluate_winner, ALL_RANKS, NUM_FLOP_HANDS};
use crate::error::LeducResult;
use crate::game_tree::{opponent, GameTree, Sequence, NUM_ACTIONS};
use crate::strategy::StrategyStore;
use crate::trainer::unix_time;
use crate::view::{hand_index, PlayerView};

// ---------------------------------------------------------------------------
// Phase A: opponent reach at terminals
// ---------------------------------------------------------------------------

/// Opponent reach probability per (terminal, opponent hand).
///
/// Round 0 terminals use hand indices 0..3, round 1 terminals 0..9.
#[derive(Debug, Clone)]
pub struct TerminalReach {
    player: usize,
    num_internal: usize,
    reach: Vec<[f64; NUM_FLOP_HANDS]>,
}

impl TerminalReach {
    /// Reach of `player` playing `strategy`, for each of its hands.
    pub fn compute(tree: &GameTree, player: usize, strategy: &StrategyStore) -> LeducResult<Self> {
        let mut terminal = TerminalReach {
            player,
            num_internal: tree.num_internal(),
            reach: vec![[0.0; NUM_FLOP_HANDS]; tree.num_terminal()],
        };
        for hole in ALL_RANKS {
            terminal.walk(tree, strategy, PlayerView::preflop(player, hole), 1.0)?;
        }
        Ok(terminal)
    }

    fn walk(
        &mut self,
        tree: &GameTree,
        strategy: &StrategyStore,
        view: PlayerView,
        reach: f64,
    ) -> LeducResult<()> {
        let u = view.sequence;

        if tree.is_terminal(u) {
            self.reach[u.id() - self.num_internal][view.hand()] = reach;
            return Ok(());
        }

        if tree.round(u) > 0 && view.board.is_none() {
            for board in ALL_RANKS {
                let flop = PlayerView::new(view.player, view.hole, Some(board), u);
                self.walk(tree, strategy, flop, reach)?;
            }
            return Ok(());
        }

        if tree.whose_turn(u) == self.player {
            let probability = *strategy.get(&view)?;
            for (action, v) in tree.actions(u) {
                self.walk(tree, strategy, view.at(v), reach * probability[action.index()])?;
            }
        } else {
            for (_, v) in tree.actions(u) {
                self.walk(tree, strategy, view.at(v), reach)?;
            }
        }
        Ok(())
    }

    /// The player whose reach this is.
    pub fn player(&self) -> usize {
        self.player
    }

    #[inline]
    pub fn get(&self, u: Sequence, hand: usize) -> f64 {
        self.reach[u.id() - self.num_internal][hand]
    }
}

// ---------------------------------------------------------------------------
// Phase B: best response walk
// ---------------------------------------------------------------------------

/// Result of [`best_response`].
#[derive(Debug, Clone)]
pub struct BestResponse {
    pub player: usize,
    /// Expected value for the responder.
    pub value: f64,
    /// Pure strategy realizing `value`.
    pub strategy: StrategyStore,
}

impl BestResponse {
    /// Save the strategy under a provenance header naming the opponent.
    pub fn save_to_file(&self, path: &Path, opponent_name: &str) -> LeducResult<()> {
        log::info!("saving best response to {}...", path.display());
        let header = format!(
            "#\n# best response leduc strategy {}\n# made on:  {}\n# opponent: {}\n# value:    {}\n#\n",
            path.display(),
            unix_time(),
            opponent_name,
            self.value
        );
        self.strategy.save_to_file(path, &header)
    }
}

/// Value of `player` best responding to `opponent_strategy` under
/// `abstraction`.
pub fn best_response(
    tree: &Arc<GameTree>,
    player: usize,
    abstraction: &Abstraction,
    opponent_strategy: &StrategyStore,
) -> LeducResult<BestResponse> {
    abstraction.require_complete_perfect_recall()?;

    log::info!("computing terminal probabilities...");
    let reach = TerminalReach::compute(tree, opponent(player), opponent_strategy)?;

    log::info!("computing best response...");
    let mut responder = Responder {
        tree,
        player,
        abstraction,
        reach: &reach,
        out: StrategyStore::new(Arc::clone(tree)),
    };

    let mut value = 0.0;
    for b1 in 0..abstraction.preflop_buckets() {
        value += responder.value(tree.root(), b1, None)?;
    }

    Ok(BestResponse {
        player,
        value,
        strategy: responder.out,
    })
}

struct Responder<'a> {
    tree: &'a GameTree,
    player: usize,
    abstraction: &'a Abstraction,
    reach: &'a TerminalReach,
    out: StrategyStore,
}

impl Responder<'_> {
    fn value(&mut self, u: Sequence, b1: usize, b2: Option<usize>) -> LeducResult<f64> {
        let tree = self.tree;

        if tree.is_terminal(u) {
            return Ok(self.terminal_value(u, b1, b2));
        }

        if tree.round(u) > 0 && b2.is_none() {
            let mut v = 0.0;
            for post in 0..self.abstraction.flop_buckets() {
                if self.abstraction.can_extend(b1, post) {
                    v += self.value(u, b1, Some(post))?;
                }
            }
            return Ok(v);
        }

        if tree.whose_turn(u) != self.player {
            let mut v = 0.0;
            for (_, w) in tree.actions(u) {
                v += self.value(w, b1, b2)?;
            }
            return Ok(v);
        }

        let mut best: Option<(usize, f64)> = None;
        for (action, w) in tree.actions(u) {
            let v = self.value(w, b1, b2)?;
            if best.map_or(true, |(_, max)| v > max) {
                best = Some((action.index(), v));
            }
        }
        let Some((choice, max)) = best else {
            return Ok(0.0);
        };

        let mut tuple = [0.0; NUM_ACTIONS];
        tuple[choice] = 1.0;
        self.record(u, b1, b2, &tuple)?;
        Ok(max)
    }

    /// Write `tuple` for every hand in the current bucket.
    fn record(
        &mut self,
        u: Sequence,
        b1: usize,
        b2: Option<usize>,
        tuple: &[f64; NUM_ACTIONS],
    ) -> LeducResult<()> {
        let abstraction = self.abstraction;
        match b2 {
            Some(post) => {
                for (hole, board) in abstraction.flop_hands(post) {
                    let view = PlayerView::new(self.player, hole, Some(board), u);
                    self.out.set(&view, tuple)?;
                }
            }
            None => {
                for hole in abstraction.preflop_hands(b1) {
                    let view = PlayerView::new(self.player, hole, None, u);
                    self.out.set(&view, tuple)?;
                }
            }
        }
        Ok(())
    }

    fn terminal_value(&self, u: Sequence, b1: usize, b2: Option<usize>) -> f64 {
        let tree = self.tree;
        let amount = tree.win_amount(u) as f64;

        if tree.is_showdown(u) {
            let Some(post) = b2 else {
                return 0.0;
            };
            let mut ev = 0.0;
            for (hole, board) in self.abstraction.flop_hands(post) {
                for opp in ALL_RANKS {
                    if hole == board && opp == board {
                        continue;
                    }
                    let p = self.reach.get(u, hand_index(opp, Some(board)));
                    let chance = chance_prob_with_board(hole, opp, board);
                    ev += evaluate_winner(hole, opp, board) as f64 * amount * p * chance;
                }
            }
            return ev;
        }

        let sign = if tree.who_folded(u) == Some(self.player) {
            -1.0
        } else {
            1.0
        };

        let mut p = 0.0;
        match b2 {
            Some(post) if tree.round(u) > 0 => {
                for (hole, board) in self.abstraction.flop_hands(post) {
                    for opp in ALL_RANKS {
                        if hole == board && opp == board {
                            continue;
                        }
                        p += self.reach.get(u, hand_index(opp, Some(board)))
                            * chance_prob_with_board(hole, opp, board);
                    }
                }
            }
            _ => {
                for hole in self.abstraction.preflop_hands(b1) {
                    for opp in ALL_RANKS {
                        p += self.reach.get(u, opp.index()) * chance_prob(hole, opp);
                    }
                }
            }
        }
        p * sign * amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(tree: &Arc<GameTree>, player: usize) -> StrategyStore {
        let mut store = StrategyStore::new(Arc::clone(tree));
        store
            .fill(player, |v| {
                let mut t = [0.0; NUM_ACTIONS];
                for (action, _) in tree.actions(v.sequence) {
                    t[action.index()] = 1.0;
                }
                t
            })
            .unwrap();
        store
    }

    #[test]
    fn terminal_reach_of_always_call_player() {
        let tree = Arc::new(GameTree::leduc());
        let mut store = StrategyStore::new(Arc::clone(&tree));
        store.fill(0, |_| [0.0, 1.0, 0.0]).unwrap();
        let reach = TerminalReach::compute(&tree, 0, &store).unwrap();

        let cc_cc = tree.parse_sequence("/cc/cc").unwrap();
        let crf = tree.parse_sequence("/crf").unwrap();
        for hand in 0..9 {
            assert_eq!(reach.get(cc_cc, hand), 1.0);
        }
        for hand in 0..3 {
            // player 0 calls the raise instead of folding
            assert_eq!(reach.get(crf, hand), 0.0);
        }
        let first_raise = tree.parse_sequence("/rf").unwrap();
        assert_eq!(reach.get(first_raise, 0), 0.0);
    }

    #[test]
    fn incomplete_abstraction_rejected() {
        let tree = Arc::new(GameTree::leduc());
        let opponent = uniform(&tree, 1);
        let partial = Abstraction::parse("J,Q").unwrap();
        assert!(best_response(&tree, 0, &partial, &opponent).is_err());
    }
}
