//! Dense regret and average-probability tables for one player.
//!
//! Only the player's own decision nodes get storage. Within a node the data
//! is laid out bucket-major:
//!
//!   index = offsets[node] + bucket * NUM_ACTIONS + action
//!
//! so every action of one (node, bucket) pair is contiguous.

use crate::game_tree::{GameTree, Sequence, ALL_ACTIONS, NUM_ACTIONS, NUM_ROUNDS};
use crate::strategy::Triple;

/// Positive regret (or average mass) below this falls back to uniform play.
const EPSILON: f64 = 1e-7;

#[derive(Debug, Clone)]
pub struct RegretTable {
    player: usize,
    buckets: [usize; NUM_ROUNDS],
    regret: Vec<f64>,
    average_probability: Vec<f64>,
    /// Start offset for each internal node owned by `player`.
    offsets: Vec<Option<usize>>,
    /// Legal action mask for each internal node.
    legal: Vec<[bool; NUM_ACTIONS]>,
}

impl RegretTable {
    /// Allocate zeroed tables for `player` with `buckets[round]` buckets per
    /// round.
    pub fn new(tree: &GameTree, player: usize, buckets: [usize; NUM_ROUNDS]) -> Self {
        let mut offsets = Vec::with_capacity(tree.num_internal());
        let mut legal = Vec::with_capacity(tree.num_internal());
        let mut offset = 0;

        for u in tree.internal_sequences() {
            let mut mask = [false; NUM_ACTIONS];
            for (action, _) in tree.actions(u) {
                mask[action.index()] = true;
            }
            legal.push(mask);

            if tree.whose_turn(u) == player {
                offsets.push(Some(offset));
                offset += buckets[tree.round(u)] * NUM_ACTIONS;
            } else {
                offsets.push(None);
            }
        }

        RegretTable {
            player,
            buckets,
            regret: vec![0.0; offset],
            average_probability: vec![0.0; offset],
            offsets,
            legal,
        }
    }

    pub fn player(&self) -> usize {
        self.player
    }

    pub fn buckets(&self, round: usize) -> usize {
        self.buckets[round]
    }

    /// Total number of f64 entries per table.
    pub fn total_entries(&self) -> usize {
        self.regret.len()
    }

    // -----------------------------------------------------------------------
    // Index helpers
    // -----------------------------------------------------------------------

    #[inline]
    fn base(&self, u: Sequence, bucket: usize) -> usize {
        let offset = self.offsets[u.id()];
        debug_assert!(offset.is_some(), "node {} is not player {}'s", u.id(), self.player);
        offset.unwrap_or(0) + bucket * NUM_ACTIONS
    }

    #[inline]
    fn uniform(&self, u: Sequence) -> Triple {
        let mask = &self.legal[u.id()];
        let n = mask.iter().filter(|&&legal| legal).count() as f64;
        let mut out = [0.0; NUM_ACTIONS];
        for (o, &legal) in out.iter_mut().zip(mask) {
            if legal {
                *o = 1.0 / n;
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Strategy computation
    // -----------------------------------------------------------------------

    /// Regret matching: proportional to positive regret, uniform over legal
    /// actions if there is none.
    #[inline]
    pub fn current_strategy(&self, u: Sequence, bucket: usize) -> Triple {
        let base = self.base(u, bucket);
        let regrets = &self.regret[base..base + NUM_ACTIONS];

        let sum: f64 = regrets.iter().map(|&r| r.max(0.0)).sum();
        if sum > EPSILON {
            let mut out = [0.0; NUM_ACTIONS];
            for (o, &r) in out.iter_mut().zip(regrets) {
                *o = r.max(0.0) / sum;
            }
            out
        } else {
            self.uniform(u)
        }
    }

    /// The accumulated average strategy, normalized.
    pub fn average_strategy(&self, u: Sequence, bucket: usize) -> Triple {
        let base = self.base(u, bucket);
        let cum = &self.average_probability[base..base + NUM_ACTIONS];

        let sum: f64 = cum.iter().sum();
        if sum > EPSILON {
            let mut out = [0.0; NUM_ACTIONS];
            for (o, &p) in out.iter_mut().zip(cum) {
                *o = p / sum;
            }
            out
        } else {
            self.uniform(u)
        }
    }

    pub fn regret(&self, u: Sequence, bucket: usize) -> &[f64] {
        let base = self.base(u, bucket);
        &self.regret[base..base + NUM_ACTIONS]
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Add `reach * probability` to the running average for (node, bucket).
    #[inline]
    pub fn accumulate_average(&mut self, u: Sequence, bucket: usize, probability: &Triple, reach: f64) {
        let base = self.base(u, bucket);
        for (a, &p) in self.average_probability[base..base + NUM_ACTIONS]
            .iter_mut()
            .zip(probability)
        {
            *a += reach * p;
        }
    }

    /// Add per-action regret deltas; illegal actions are left untouched.
    #[inline]
    pub fn add_regret(&mut self, u: Sequence, bucket: usize, delta: &Triple) {
        let base = self.base(u, bucket);
        let mask = self.legal[u.id()];
        for action in ALL_ACTIONS {
            if mask[action.index()] {
                self.regret[base + action.index()] += delta[action.index()];
            }
        }
    }
}
