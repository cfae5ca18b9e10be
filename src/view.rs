//! What one player can see at a decision point.

use std::fmt;

use crate::cards::{Rank, NUM_RANKS};
use crate::game_tree::Sequence;

/// A player's private cards plus the public betting sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerView {
    pub player: usize,
    pub hole: Rank,
    pub board: Option<Rank>,
    pub sequence: Sequence,
}

impl PlayerView {
    /// View at the start of the game, before the board card.
    pub fn preflop(player: usize, hole: Rank) -> PlayerView {
        PlayerView {
            player,
            hole,
            board: None,
            sequence: Sequence::ROOT,
        }
    }

    /// View at the start of the game with the board card exposed.
    pub fn flop(player: usize, hole: Rank, board: Rank) -> PlayerView {
        PlayerView {
            player,
            hole,
            board: Some(board),
            sequence: Sequence::ROOT,
        }
    }

    pub fn new(player: usize, hole: Rank, board: Option<Rank>, sequence: Sequence) -> PlayerView {
        PlayerView {
            player,
            hole,
            board,
            sequence,
        }
    }

    /// The same cards at a different betting sequence.
    pub fn at(self, sequence: Sequence) -> PlayerView {
        PlayerView { sequence, ..self }
    }

    /// Hand index: the hole rank preflop, `3 * hole + board` once the board
    /// is known.
    #[inline]
    pub fn hand(&self) -> usize {
        hand_index(self.hole, self.board)
    }

    /// Hand notation: `J` preflop, `JQ` (hole then board) postflop.
    pub fn hand_str(&self) -> String {
        hand_to_string(self.hand(), self.board.is_some())
    }
}

impl fmt::Display for PlayerView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {} holding {}", self.player + 1, self.hand_str())
    }
}

#[inline]
pub fn hand_index(hole: Rank, board: Option<Rank>) -> usize {
    match board {
        None => hole.index(),
        Some(b) => NUM_RANKS * hole.index() + b.index(),
    }
}

/// Inverse of [`hand_index`].
pub fn hand_cards(hand: usize, postflop: bool) -> Option<(Rank, Option<Rank>)> {
    if postflop {
        let hole = Rank::from_index(hand / NUM_RANKS)?;
        let board = Rank::from_index(hand % NUM_RANKS)?;
        Some((hole, Some(board)))
    } else {
        Rank::from_index(hand).map(|hole| (hole, None))
    }
}

pub fn hand_to_string(hand: usize, postflop: bool) -> String {
    match hand_cards(hand, postflop) {
        Some((hole, Some(board))) => format!("{}{}", hole, board),
        Some((hole, None)) => hole.to_string(),
        None => format!("#{}", hand),
    }
}
