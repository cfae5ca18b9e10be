//! Strategy store: action probabilities per (betting sequence, hand).
//!
//! Entries are created on demand; a missing entry means "no strategy here"
//! and callers check [`StrategyStore::has`] before relying on one. On disk a
//! strategy is one line per entry:
//!
//! ```text
//! # comment
//! K:/: 0.812345678 0.187654322 0.000000000
//! QJ:/cr/r: 0.000000000 0.350000000 0.650000000
//! ```
//!
//! with probabilities for raise, call and fold.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::cards::{parse_hand, Rank, ALL_RANKS, NUM_FLOP_HANDS, NUM_PREFLOP_HANDS};
use crate::error::{LeducError, LeducResult};
use crate::game_tree::{GameTree, Sequence, ALL_ACTIONS, NUM_ACTIONS};
use crate::view::{hand_cards, hand_to_string, PlayerView};

/// Probabilities for raise, call and fold.
pub type Triple = [f64; NUM_ACTIONS];

/// Mass below this is treated as zero.
const EPSILON: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct StrategyStore {
    tree: Arc<GameTree>,
    tuples: BTreeMap<(Sequence, usize), Triple>,
}

impl StrategyStore {
    pub fn new(tree: Arc<GameTree>) -> StrategyStore {
        StrategyStore {
            tree,
            tuples: BTreeMap::new(),
        }
    }

    /// Load and merge one or more comma separated strategy files.
    pub fn load(tree: Arc<GameTree>, paths: &str) -> LeducResult<StrategyStore> {
        let mut store = StrategyStore::new(tree);
        for path in paths.split(',').filter(|p| !p.is_empty()) {
            store.merge_file(path)?;
        }
        Ok(store)
    }

    pub fn tree(&self) -> &Arc<GameTree> {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn has(&self, view: &PlayerView) -> bool {
        self.tuples.contains_key(&(view.sequence, view.hand()))
    }

    pub fn lookup(&self, view: &PlayerView) -> Option<&Triple> {
        self.tuples.get(&(view.sequence, view.hand()))
    }

    pub fn get(&self, view: &PlayerView) -> LeducResult<&Triple> {
        self.lookup(view)
            .ok_or_else(|| LeducError::MissingStrategy {
                hand: view.hand_str(),
                sequence: self.tree.sequence_to_string(view.sequence),
            })
    }

    /// Store a probability triple, clamping negatives to zero and rescaling
    /// the rest to sum to one. Illegal actions always end up at exactly zero.
    pub fn set(&mut self, view: &PlayerView, tuple: &Triple) -> LeducResult<()> {
        let u = view.sequence;
        let mut clamped = [0.0; NUM_ACTIONS];
        let mut sum = 0.0;

        if let Some(p) = tuple.iter().find(|p| !p.is_finite()) {
            return Err(LeducError::InvalidValue(format!(
                "probability {} at '{}' is not finite",
                p,
                self.tree.sequence_to_string(u)
            )));
        }

        for action in ALL_ACTIONS {
            let p = tuple[action.index()];
            if !self.tree.can_do_action(u, action) {
                if p >= EPSILON {
                    return Err(LeducError::IllegalActionMass {
                        sequence: self.tree.sequence_to_string(u),
                        action: action.to_char(),
                    });
                }
                continue;
            }
            if p > 0.0 {
                clamped[action.index()] = p;
                sum += p;
            }
        }

        if sum <= EPSILON {
            return Err(LeducError::NegligibleMass {
                sequence: self.tree.sequence_to_string(u),
            });
        }

        for p in clamped.iter_mut() {
            *p /= sum;
        }
        self.tuples.insert((u, view.hand()), clamped);
        Ok(())
    }

    /// Like [`set`](Self::set), but an existing entry is an error.
    pub fn insert_new(&mut self, view: &PlayerView, tuple: &Triple) -> LeducResult<()> {
        if self.has(view) {
            return Err(LeducError::DuplicateStrategyEntry {
                hand: view.hand_str(),
                sequence: self.tree.sequence_to_string(view.sequence),
            });
        }
        self.set(view, tuple)
    }

    /// Set an entry at every decision node of `player` for every hand.
    pub fn fill<F>(&mut self, player: usize, mut policy: F) -> LeducResult<()>
    where
        F: FnMut(&PlayerView) -> Triple,
    {
        let tree = Arc::clone(&self.tree);
        for u in tree.internal_sequences() {
            if tree.whose_turn(u) != player {
                continue;
            }
            let postflop = tree.round(u) > 0;
            let hands = if postflop { NUM_FLOP_HANDS } else { NUM_PREFLOP_HANDS };
            for hand in 0..hands {
                if let Some((hole, board)) = hand_cards(hand, postflop) {
                    let view = PlayerView::new(player, hole, board, u);
                    let tuple = policy(&view);
                    self.set(&view, &tuple)?;
                }
            }
        }
        Ok(())
    }

    /// Defined entries in (sequence, hand) order.
    pub fn entries(&self) -> impl Iterator<Item = (Sequence, usize, &Triple)> {
        self.tuples.iter().map(|(&(u, hand), t)| (u, hand, t))
    }

    // -----------------------------------------------------------------------
    // Averaging
    // -----------------------------------------------------------------------

    /// Replace every entry with the reach weighted average of this strategy
    /// (weight `w1`) and `other` (weight `w2`).
    ///
    /// Both strategies must define exactly the same information sets along
    /// the paths they reach.
    pub fn average(&mut self, other: &StrategyStore, w1: f64, w2: f64) -> LeducResult<()> {
        let tree = Arc::clone(&self.tree);
        for player in 0..2 {
            for hole in ALL_RANKS {
                self.average_from(&tree, other, tree.root(), player, hole, None, w1, w2)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn average_from(
        &mut self,
        tree: &GameTree,
        other: &StrategyStore,
        u: Sequence,
        player: usize,
        hole: Rank,
        board: Option<Rank>,
        r1: f64,
        r2: f64,
    ) -> LeducResult<()> {
        if tree.is_terminal(u) {
            return Ok(());
        }

        if tree.round(u) > 0 && board.is_none() {
            for b in ALL_RANKS {
                self.average_from(tree, other, u, player, hole, Some(b), r1, r2)?;
            }
            return Ok(());
        }

        if tree.whose_turn(u) != player {
            for (_, v) in tree.actions(u) {
                self.average_from(tree, other, v, player, hole, board, r1, r2)?;
            }
            return Ok(());
        }

        let view = PlayerView::new(player, hole, board, u);
        match (self.lookup(&view).copied(), other.lookup(&view).copied()) {
            (None, None) => Ok(()),
            (Some(s1), Some(s2)) => {
                let n = tree.num_actions(u) as f64;
                let mut avg = [0.0; NUM_ACTIONS];
                for (action, v) in tree.actions(u) {
                    let i = action.index();
                    avg[i] = if r1 + r2 > EPSILON {
                        (s1[i] * r1 + s2[i] * r2) / (r1 + r2)
                    } else {
                        1.0 / n
                    };
                    self.average_from(tree, other, v, player, hole, board, r1 * s1[i], r2 * s2[i])?;
                }
                self.set(&view, &avg)
            }
            _ => Err(LeducError::StrategyMismatch {
                hand: view.hand_str(),
                sequence: tree.sequence_to_string(u),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Write one line per entry, probabilities at 9 decimal places.
    pub fn save<W: Write>(&self, out: &mut W) -> LeducResult<()> {
        for (&(u, hand), tuple) in &self.tuples {
            let postflop = self.tree.round(u) > 0;
            write!(
                out,
                "{}:{}:",
                hand_to_string(hand, postflop),
                self.tree.sequence_to_string(u)
            )?;
            for p in tuple {
                write!(out, " {:.9}", p)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Write `header` (already `#` prefixed) followed by the entries.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, header: &str) -> LeducResult<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut out = std::io::BufWriter::new(file);
        out.write_all(header.as_bytes())?;
        self.save(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Merge the entries of one strategy file into this store.
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> LeducResult<()> {
        let path = path.as_ref();
        log::debug!("reading strategy {}", path.display());
        let text = std::fs::read_to_string(path)?;
        self.merge_str(&path.display().to_string(), &text)
    }

    /// Merge strategy lines from `text`; `source_name` labels errors.
    pub fn merge_str(&mut self, source_name: &str, text: &str) -> LeducResult<()> {
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = |reason: String| LeducError::MalformedStrategyLine {
                source_name: source_name.to_string(),
                line: i + 1,
                reason,
            };

            let mut fields = line.splitn(3, ':');
            let (hand, betting, probs) = match (fields.next(), fields.next(), fields.next()) {
                (Some(h), Some(b), Some(p)) => (h, b, p),
                _ => return Err(malformed("expected <hand>:<betting>: p0 p1 p2".to_string())),
            };

            let u = self.tree.parse_sequence(betting)?;
            if self.tree.is_terminal(u) {
                return Err(malformed(format!("'{}' is a terminal sequence", betting)));
            }

            let (hole, board) = parse_hand(hand)?;
            let postflop = self.tree.round(u) > 0;
            if board.is_some() != postflop {
                return Err(malformed(format!(
                    "hand '{}' does not match the round of '{}'",
                    hand, betting
                )));
            }

            let values = probs
                .split_whitespace()
                .map(|s| match s.parse::<f64>() {
                    Ok(p) if p.is_finite() => Ok(p),
                    _ => Err(malformed(format!("bad probability '{}'", s))),
                })
                .collect::<LeducResult<Vec<f64>>>()?;
            if values.len() != NUM_ACTIONS {
                return Err(malformed(format!(
                    "expected {} probabilities, got {}",
                    NUM_ACTIONS,
                    values.len()
                )));
            }

            let view = PlayerView::new(self.tree.whose_turn(u), hole, board, u);
            self.insert_new(&view, &[values[0], values[1], values[2]])?;
        }
        Ok(())
    }
}
