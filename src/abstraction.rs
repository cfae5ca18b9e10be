//! Information abstraction: maps a player's private cards to a bucket.
//!
//! An abstraction is two lookup tables, one for the 3 preflop hands and one
//! for the 9 postflop (hole, board) hands. Custom abstractions are written as
//! colon separated groups of comma separated hands, each group becoming one
//! bucket in order of appearance:
//!
//! ```text
//! J,Q:K:JJ,QQ,KK:JQ,JK,QJ,QK,KJ,KQ
//! ```
//!
//! gives preflop buckets {J,Q}=0, {K}=1 and flop buckets pairs=0,
//! unpaired=1. Preflop and flop buckets are numbered independently.

use std::path::Path;

use crate::cards::{parse_hand, Rank, ALL_RANKS, NUM_FLOP_HANDS, NUM_PREFLOP_HANDS};
use crate::error::{LeducError, LeducResult};
use crate::view::{hand_index, PlayerView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abstraction {
    preflop: [Option<usize>; NUM_PREFLOP_HANDS],
    flop: [Option<usize>; NUM_FLOP_HANDS],
    description: String,
}

impl Abstraction {
    /// Every hand in its own bucket.
    pub fn identity() -> Abstraction {
        let mut preflop = [None; NUM_PREFLOP_HANDS];
        for (i, slot) in preflop.iter_mut().enumerate() {
            *slot = Some(i);
        }
        let mut flop = [None; NUM_FLOP_HANDS];
        for (i, slot) in flop.iter_mut().enumerate() {
            *slot = Some(i);
        }
        Abstraction {
            preflop,
            flop,
            description: "identity".to_string(),
        }
    }

    /// Parse an abstraction from the group grammar.
    ///
    /// Groups are separated by `:` and each group is one bucket, so
    /// `"J,Q,K"` is a single bucket while `"J:Q:K"` keeps every rank apart.
    pub fn parse(text: &str) -> LeducResult<Abstraction> {
        let text = text.trim();
        let malformed = |reason: String| LeducError::MalformedAbstraction {
            text: text.to_string(),
            reason,
        };

        let mut abstraction = Abstraction {
            preflop: [None; NUM_PREFLOP_HANDS],
            flop: [None; NUM_FLOP_HANDS],
            description: text.to_string(),
        };
        let mut next_preflop = 0;
        let mut next_flop = 0;

        for group in text.split(':').filter(|g| !g.is_empty()) {
            let hands = group
                .split(',')
                .map(parse_hand)
                .collect::<LeducResult<Vec<_>>>()?;

            let postflop = hands[0].1.is_some();
            if hands.iter().any(|(_, board)| board.is_some() != postflop) {
                return Err(malformed(format!(
                    "group '{}' mixes preflop and flop hands",
                    group
                )));
            }

            let bucket = if postflop {
                next_flop += 1;
                next_flop - 1
            } else {
                next_preflop += 1;
                next_preflop - 1
            };

            for (hole, board) in hands {
                let slot = match board {
                    None => &mut abstraction.preflop[hole.index()],
                    Some(_) => &mut abstraction.flop[hand_index(hole, board)],
                };
                if slot.is_some() {
                    let name = match board {
                        Some(b) => format!("{}{}", hole, b),
                        None => hole.to_string(),
                    };
                    return Err(LeducError::DuplicateBucketAssignment(name));
                }
                *slot = Some(bucket);
            }
        }

        Ok(abstraction)
    }

    /// Parse `arg` as grammar text, or, if it names an existing file, parse
    /// the first line of that file.
    pub fn load(arg: &str) -> LeducResult<Abstraction> {
        let path = Path::new(arg);
        if path.is_file() {
            let contents = std::fs::read_to_string(path)?;
            let line = contents.lines().next().unwrap_or("");
            log::info!("abstraction from file {} is {}", arg, line);
            let mut abstraction = Abstraction::parse(line)?;
            abstraction.description = arg.to_string();
            Ok(abstraction)
        } else {
            Abstraction::parse(arg)
        }
    }

    /// Where this abstraction came from: grammar text, a file name or
    /// `identity`.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn preflop_bucket(&self, hole: Rank) -> Option<usize> {
        self.preflop[hole.index()]
    }

    pub fn flop_bucket(&self, hole: Rank, board: Rank) -> Option<usize> {
        self.flop[hand_index(hole, Some(board))]
    }

    /// Bucket for a view, if the hand is mapped.
    #[inline]
    pub fn bucket(&self, view: &PlayerView) -> Option<usize> {
        match view.board {
            None => self.preflop[view.hand()],
            Some(_) => self.flop[view.hand()],
        }
    }

    pub fn can_abstract(&self, view: &PlayerView) -> bool {
        self.bucket(view).is_some()
    }

    /// Bucket for a view; an unmapped hand is an error.
    pub fn abstract_view(&self, view: &PlayerView) -> LeducResult<usize> {
        self.bucket(view)
            .ok_or_else(|| LeducError::UnmappedHand(view.hand_str()))
    }

    pub fn preflop_buckets(&self) -> usize {
        self.preflop.iter().flatten().max().map_or(0, |&b| b + 1)
    }

    pub fn flop_buckets(&self) -> usize {
        self.flop.iter().flatten().max().map_or(0, |&b| b + 1)
    }

    /// Number of buckets in a betting round.
    pub fn buckets(&self, round: usize) -> usize {
        if round == 0 {
            self.preflop_buckets()
        } else {
            self.flop_buckets()
        }
    }

    /// Hole cards mapped to a preflop bucket.
    pub fn preflop_hands(&self, bucket: usize) -> impl Iterator<Item = Rank> + '_ {
        ALL_RANKS
            .into_iter()
            .filter(move |&h| self.preflop_bucket(h) == Some(bucket))
    }

    /// (hole, board) pairs mapped to a flop bucket.
    pub fn flop_hands(&self, bucket: usize) -> impl Iterator<Item = (Rank, Rank)> + '_ {
        ALL_RANKS
            .into_iter()
            .flat_map(|h| ALL_RANKS.into_iter().map(move |b| (h, b)))
            .filter(move |&(h, b)| self.flop_bucket(h, b) == Some(bucket))
    }

    /// Every flop bucket must trace back to exactly one preflop bucket.
    pub fn is_perfect_recall(&self) -> bool {
        let mut seen: Vec<Option<usize>> = vec![None; self.flop_buckets()];

        for hole in ALL_RANKS {
            let Some(pre) = self.preflop_bucket(hole) else {
                continue;
            };
            for board in ALL_RANKS {
                let Some(post) = self.flop_bucket(hole, board) else {
                    continue;
                };
                match seen[post] {
                    None => seen[post] = Some(pre),
                    Some(first) if first != pre => return false,
                    Some(_) => {}
                }
            }
        }

        true
    }

    /// Whether some hand lands in preflop bucket `pre` and then flop bucket
    /// `post`.
    pub fn can_extend(&self, pre: usize, post: usize) -> bool {
        ALL_RANKS
            .into_iter()
            .filter(|&h| self.preflop_bucket(h) == Some(pre))
            .any(|h| ALL_RANKS.into_iter().any(|b| self.flop_bucket(h, b) == Some(post)))
    }

    pub fn is_complete(&self) -> bool {
        self.preflop.iter().all(Option::is_some) && self.flop.iter().all(Option::is_some)
    }

    /// Best response bookkeeping needs both completeness and perfect recall.
    pub fn require_complete_perfect_recall(&self) -> LeducResult<()> {
        if !self.is_complete() {
            return Err(LeducError::IncompleteAbstraction);
        }
        if !self.is_perfect_recall() {
            return Err(LeducError::ImperfectRecall);
        }
        Ok(())
    }
}

impl Default for Abstraction {
    fn default() -> Self {
        Abstraction::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_counts() {
        let a = Abstraction::identity();
        assert_eq!(a.preflop_buckets(), 3);
        assert_eq!(a.flop_buckets(), 9);
        assert!(a.is_complete());
        assert!(a.is_perfect_recall());
    }

    #[test]
    fn empty_text_has_no_buckets() {
        let a = Abstraction::parse("").unwrap();
        assert_eq!(a.preflop_buckets(), 0);
        assert_eq!(a.flop_buckets(), 0);
        assert!(!a.is_complete());
    }

    #[test]
    fn buckets_numbered_per_round() {
        let a = Abstraction::parse("J,Q:JJ,QQ:K:KK").unwrap();
        assert_eq!(a.preflop_bucket(Rank::Jack), Some(0));
        assert_eq!(a.preflop_bucket(Rank::Queen), Some(0));
        assert_eq!(a.preflop_bucket(Rank::King), Some(1));
        assert_eq!(a.flop_bucket(Rank::Jack, Rank::Jack), Some(0));
        assert_eq!(a.flop_bucket(Rank::King, Rank::King), Some(1));
        assert_eq!(a.flop_bucket(Rank::Jack, Rank::Queen), None);
    }

    #[test]
    fn mixed_group_rejected() {
        assert!(matches!(
            Abstraction::parse("J,QK"),
            Err(LeducError::MalformedAbstraction { .. })
        ));
    }

    #[test]
    fn duplicate_hand_rejected() {
        assert!(matches!(
            Abstraction::parse("J:J"),
            Err(LeducError::DuplicateBucketAssignment(_))
        ));
        assert!(matches!(
            Abstraction::parse("JQ,KK:JQ"),
            Err(LeducError::DuplicateBucketAssignment(_))
        ));
    }
}
