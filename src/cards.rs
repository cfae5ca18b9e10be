use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{LeducError, LeducResult};

pub const RANKS_STR: &str = "JQK";

/// Number of distinct ranks in the deck.
pub const NUM_RANKS: usize = 3;

/// Copies of each rank in the deck.
pub const COPIES_PER_RANK: usize = 2;

/// Number of preflop hands (hole card only).
pub const NUM_PREFLOP_HANDS: usize = NUM_RANKS;

/// Number of postflop hands (hole card + board card).
pub const NUM_FLOP_HANDS: usize = NUM_RANKS * NUM_RANKS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Jack = 0,
    Queen = 1,
    King = 2,
}

impl Rank {
    pub fn from_char(c: char) -> LeducResult<Rank> {
        match c {
            'J' => Ok(Rank::Jack),
            'Q' => Ok(Rank::Queen),
            'K' => Ok(Rank::King),
            _ => Err(LeducError::InvalidRank(c)),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
        }
    }

    pub fn from_index(index: usize) -> Option<Rank> {
        ALL_RANKS.get(index).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

pub const ALL_RANKS: [Rank; NUM_RANKS] = [Rank::Jack, Rank::Queen, Rank::King];

/// Two hole cards and the board card of one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deal {
    pub holes: [Rank; 2],
    pub board: Rank,
}

/// The six card deck: two copies of each rank.
pub struct Deck {
    pub cards: Vec<Rank>,
}

impl Deck {
    pub fn new() -> Deck {
        let cards = ALL_RANKS
            .iter()
            .flat_map(|&r| std::iter::repeat(r).take(COPIES_PER_RANK))
            .collect();
        Deck { cards }
    }

    /// Draw two hole cards and a board card without replacement.
    pub fn deal<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Deal {
        let (drawn, _) = self.cards.partial_shuffle(rng, 3);
        Deal {
            holes: [drawn[0], drawn[1]],
            board: drawn[2],
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Deck::new()
    }
}

/// Showdown result: 1 if player 0 wins, -1 if player 1 wins, 0 on a draw.
///
/// A pair with the board beats any unpaired hand; otherwise the higher hole
/// card wins.
pub fn evaluate_winner(hole0: Rank, hole1: Rank, board: Rank) -> i32 {
    debug_assert!(!(hole0 == hole1 && hole0 == board));

    if hole0 == board {
        1
    } else if hole1 == board {
        -1
    } else if hole0 > hole1 {
        1
    } else if hole1 > hole0 {
        -1
    } else {
        0
    }
}

/// Probability of dealing `hole0` to player 0 and `hole1` to player 1.
pub fn chance_prob(hole0: Rank, hole1: Rank) -> f64 {
    if hole0 == hole1 {
        1.0 / 15.0
    } else {
        2.0 / 15.0
    }
}

/// Probability of dealing the two hole cards and then `board`.
pub fn chance_prob_with_board(hole0: Rank, hole1: Rank, board: Rank) -> f64 {
    let mut remaining = [COPIES_PER_RANK; NUM_RANKS];
    let mut prob = 1.0;
    for card in [hole0, hole1, board] {
        prob *= remaining[card.index()] as f64;
        remaining[card.index()] = remaining[card.index()].saturating_sub(1);
    }
    prob / (6.0 * 5.0 * 4.0)
}

/// Probability of `board` given both hole cards are already dealt.
pub fn board_prob(holes: [Rank; 2], board: Rank) -> f64 {
    let used = holes.iter().filter(|&&h| h == board).count();
    (COPIES_PER_RANK - used) as f64 / 4.0
}

/// Parse a hand: one rank (preflop) or two ranks, hole then board (postflop).
pub fn parse_hand(notation: &str) -> LeducResult<(Rank, Option<Rank>)> {
    let chars: Vec<char> = notation.trim().chars().collect();
    match chars.as_slice() {
        [hole] => Ok((Rank::from_char(*hole)?, None)),
        [hole, board] => Ok((Rank::from_char(*hole)?, Some(Rank::from_char(*board)?))),
        _ => Err(LeducError::InvalidHand(notation.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn deck_has_two_of_each() {
        let deck = Deck::new();
        assert_eq!(deck.len(), 6);
        for r in ALL_RANKS {
            assert_eq!(deck.cards.iter().filter(|&&c| c == r).count(), 2);
        }
    }

    #[test]
    fn deal_never_triples_a_rank() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut deck = Deck::new();
        for _ in 0..2000 {
            let deal = deck.deal(&mut rng);
            assert!(!(deal.holes[0] == deal.holes[1] && deal.holes[0] == deal.board));
            assert_eq!(deck.len(), 6);
        }
    }

    #[test]
    fn board_probabilities_sum_to_one() {
        for h0 in ALL_RANKS {
            for h1 in ALL_RANKS {
                let total: f64 = ALL_RANKS.iter().map(|&b| board_prob([h0, h1], b)).sum();
                assert!((total - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn full_deal_probabilities_sum_to_one() {
        let mut total = 0.0;
        for h0 in ALL_RANKS {
            for h1 in ALL_RANKS {
                for b in ALL_RANKS {
                    total += chance_prob_with_board(h0, h1, b);
                }
            }
        }
        assert!((total - 1.0).abs() < 1e-12);
    }
}
