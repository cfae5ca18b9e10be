//! Exact expected value between two fixed strategies.
//!
//! Enumerates every hole card deal, every board card and every betting
//! sequence; no sampling and no abstraction.

use crate::cards::{board_prob, chance_prob, evaluate_winner, Rank, ALL_RANKS};
use crate::error::LeducResult;
use crate::game_tree::{GameTree, Sequence};
use crate::strategy::StrategyStore;
use crate::view::PlayerView;

/// Expected value for player 0 when seat `i` plays `strategies[i]`.
pub fn expected_value(tree: &GameTree, strategies: [&StrategyStore; 2]) -> LeducResult<f64> {
    let mut sum = 0.0;
    for h0 in ALL_RANKS {
        for h1 in ALL_RANKS {
            let match_up = MatchUp {
                tree,
                strategies,
                holes: [h0, h1],
            };
            sum += match_up.value(tree.root(), None, chance_prob(h0, h1))?;
        }
    }
    Ok(sum)
}

struct MatchUp<'a> {
    tree: &'a GameTree,
    strategies: [&'a StrategyStore; 2],
    holes: [Rank; 2],
}

impl MatchUp<'_> {
    fn value(&self, u: Sequence, board: Option<Rank>, reach: f64) -> LeducResult<f64> {
        let tree = self.tree;

        if tree.is_terminal(u) {
            let amount = tree.win_amount(u) as f64;
            return Ok(match tree.who_folded(u) {
                Some(0) => -reach * amount,
                Some(_) => reach * amount,
                None => {
                    let result = match board {
                        Some(b) => evaluate_winner(self.holes[0], self.holes[1], b),
                        None => 0,
                    };
                    reach * amount * result as f64
                }
            });
        }

        if tree.round(u) > 0 && board.is_none() {
            let mut sum = 0.0;
            for b in ALL_RANKS {
                let p = board_prob(self.holes, b);
                if p > 0.0 {
                    sum += self.value(u, Some(b), reach * p)?;
                }
            }
            return Ok(sum);
        }

        let player = tree.whose_turn(u);
        let view = PlayerView::new(player, self.holes[player], board, u);
        let tuple = self.strategies[player].get(&view)?;

        let mut sum = 0.0;
        for (action, v) in tree.actions(u) {
            sum += self.value(v, board, reach * tuple[action.index()])?;
        }
        Ok(sum)
    }
}
