//! Compiled betting tree for two-round limit hold'em on a three-rank deck.
//!
//! The tree is a pure function of [`GameRules`] and is built once, in two
//! passes: a counting pass that sizes the tables and a construction pass that
//! allocates ids in pre-order. Internal ids are `0..num_internal()` and
//! terminal ids follow them, so a single `usize` identifies any node:
//!
//! ```text
//! /          (player 0, round 0)
//! ├─ r → /r  (player 1 faces a bet: raise / call / fold)
//! └─ c → /c  (player 1, no bet yet: raise / call)
//!             └─ c → /cc/  (round 1 starts, board card revealed)
//! ```
//!
//! Once built the tree is immutable and can be shared freely between the
//! trainer, the strategy store and the evaluators.

use std::fmt;

use crate::error::{LeducError, LeducResult};

/// Number of actions at a decision point: raise, call, fold.
pub const NUM_ACTIONS: usize = 3;

/// Number of betting rounds.
pub const NUM_ROUNDS: usize = 2;

/// Separator written before each round in canonical betting strings.
pub const ROUND_SEPARATOR: char = '/';

// ---------------------------------------------------------------------------
// Actions and players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Raise = 0,
    Call = 1,
    Fold = 2,
}

pub const ALL_ACTIONS: [Action; NUM_ACTIONS] = [Action::Raise, Action::Call, Action::Fold];

impl Action {
    pub fn from_char(c: char) -> LeducResult<Action> {
        match c {
            'r' => Ok(Action::Raise),
            'c' => Ok(Action::Call),
            'f' => Ok(Action::Fold),
            _ => Err(LeducError::InvalidAction(c)),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Action::Raise => 'r',
            Action::Call => 'c',
            Action::Fold => 'f',
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Raise => write!(f, "RAISE"),
            Action::Call => write!(f, "CALL"),
            Action::Fold => write!(f, "FOLD"),
        }
    }
}

/// The other seat in a two player game.
#[inline]
pub fn opponent(player: usize) -> usize {
    debug_assert!(player < 2);
    1 - player
}

// ---------------------------------------------------------------------------
// Game constants
// ---------------------------------------------------------------------------

/// Fixed constants that drive tree construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// Chips each player puts in before the deal.
    pub antes: [i32; 2],
    /// Fixed bet / raise size in each round.
    pub bet_size: [i32; NUM_ROUNDS],
    /// Maximum number of bets and raises in each round.
    pub bets_per_round: [u32; NUM_ROUNDS],
    /// Seat that opens the betting in each round.
    pub first_to_act: [usize; NUM_ROUNDS],
}

impl GameRules {
    /// Leduc hold'em: ante 1, bets of 2 then 4, two raises per round,
    /// player 0 first in both rounds.
    pub const LEDUC: GameRules = GameRules {
        antes: [1, 1],
        bet_size: [2, 4],
        bets_per_round: [2, 2],
        first_to_act: [0, 0],
    };

    pub fn validate(&self) -> LeducResult<()> {
        if self.antes[0] != self.antes[1] {
            return Err(LeducError::InvalidRules(format!(
                "antes must be equal, got {} and {}",
                self.antes[0], self.antes[1]
            )));
        }
        if self.antes[0] < 0 {
            return Err(LeducError::InvalidRules("antes must not be negative".to_string()));
        }
        if self.bet_size.iter().any(|&b| b <= 0) {
            return Err(LeducError::InvalidRules("bet sizes must be positive".to_string()));
        }
        if self.first_to_act.iter().any(|&p| p > 1) {
            return Err(LeducError::InvalidRules(
                "first player to act must be 0 or 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules::LEDUC
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Handle to a node of a [`GameTree`]; internal nodes come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(usize);

impl Sequence {
    pub const ROOT: Sequence = Sequence(0);

    pub fn new(id: usize) -> Sequence {
        Sequence(id)
    }

    #[inline]
    pub fn id(self) -> usize {
        self.0
    }
}

/// How a terminal node is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The opponent of `winner` folded.
    Fold { winner: usize },
    /// Compare hand strength.
    Showdown,
}

#[derive(Debug, Clone, Copy)]
struct InternalNode {
    round: usize,
    player: usize,
    transition: [Option<Sequence>; NUM_ACTIONS],
}

#[derive(Debug, Clone, Copy)]
struct TerminalNode {
    outcome: Outcome,
    amount: i32,
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GameTree {
    rules: GameRules,
    internal: Vec<InternalNode>,
    terminal: Vec<TerminalNode>,
    parent: Vec<Option<Sequence>>,
}

/// Count the internal and terminal nodes the rules produce, without building.
pub fn count_sequences(rules: &GameRules) -> (usize, usize) {
    let mut internal = 0;
    let mut terminal = 0;
    count_from(rules, 0, 0, true, &mut internal, &mut terminal);
    (internal, terminal)
}

fn count_from(
    rules: &GameRules,
    round: usize,
    raises: u32,
    first_action: bool,
    internal: &mut usize,
    terminal: &mut usize,
) {
    *internal += 1;

    if raises < rules.bets_per_round[round] {
        count_from(rules, round, raises + 1, false, internal, terminal);
    }

    if first_action {
        // check: round continues
        count_from(rules, round, raises, false, internal, terminal);
    } else if round + 1 == NUM_ROUNDS {
        *terminal += 1;
    } else {
        count_from(rules, round + 1, 0, true, internal, terminal);
    }

    if raises > 0 {
        *terminal += 1;
    }
}

struct Builder<'a> {
    rules: &'a GameRules,
    num_internal: usize,
    internal: Vec<InternalNode>,
    terminal: Vec<TerminalNode>,
    parent: Vec<Option<Sequence>>,
}

impl Builder<'_> {
    fn push_terminal(&mut self, outcome: Outcome, amount: i32) -> Sequence {
        let id = self.num_internal + self.terminal.len();
        self.terminal.push(TerminalNode { outcome, amount });
        Sequence(id)
    }

    fn link(&mut self, parent: usize, action: Action, child: Sequence) {
        self.internal[parent].transition[action.index()] = Some(child);
        self.parent[child.id()] = Some(Sequence(parent));
    }

    fn construct(
        &mut self,
        player: usize,
        round: usize,
        raises: u32,
        pot: [i32; 2],
        first_action: bool,
    ) -> Sequence {
        let u = self.internal.len();
        self.internal.push(InternalNode {
            round,
            player,
            transition: [None; NUM_ACTIONS],
        });

        let other = opponent(player);
        let to_call = pot[other] - pot[player];
        debug_assert!(to_call >= 0);

        if raises < self.rules.bets_per_round[round] {
            let mut raised = pot;
            raised[player] += to_call + self.rules.bet_size[round];
            let v = self.construct(other, round, raises + 1, raised, false);
            self.link(u, Action::Raise, v);
        }

        if first_action {
            debug_assert_eq!(pot[0], pot[1]);
            let v = self.construct(other, round, 0, pot, false);
            self.link(u, Action::Call, v);
        } else if round + 1 == NUM_ROUNDS {
            let v = self.push_terminal(Outcome::Showdown, pot[player] + to_call);
            self.link(u, Action::Call, v);
        } else {
            let mut called = pot;
            called[player] += to_call;
            let next = round + 1;
            let first = self.rules.first_to_act[next];
            let v = self.construct(first, next, 0, called, true);
            self.link(u, Action::Call, v);
        }

        if raises > 0 {
            debug_assert!(to_call > 0);
            let v = self.push_terminal(Outcome::Fold { winner: other }, pot[player]);
            self.link(u, Action::Fold, v);
        }

        Sequence(u)
    }
}

impl GameTree {
    /// Compile the tree for `rules`.
    pub fn new(rules: GameRules) -> LeducResult<GameTree> {
        rules.validate()?;
        Ok(GameTree::build(rules))
    }

    /// The standard Leduc hold'em tree.
    pub fn leduc() -> GameTree {
        GameTree::build(GameRules::LEDUC)
    }

    fn build(rules: GameRules) -> GameTree {
        let (num_internal, num_terminal) = count_sequences(&rules);

        let mut builder = Builder {
            rules: &rules,
            num_internal,
            internal: Vec::with_capacity(num_internal),
            terminal: Vec::with_capacity(num_terminal),
            parent: vec![None; num_internal + num_terminal],
        };
        builder.construct(rules.first_to_act[0], 0, 0, rules.antes, true);

        debug_assert_eq!(builder.internal.len(), num_internal);
        debug_assert_eq!(builder.terminal.len(), num_terminal);

        let Builder {
            internal,
            terminal,
            parent,
            ..
        } = builder;

        GameTree {
            rules,
            internal,
            terminal,
            parent,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn root(&self) -> Sequence {
        Sequence::ROOT
    }

    pub fn num_internal(&self) -> usize {
        self.internal.len()
    }

    pub fn num_terminal(&self) -> usize {
        self.terminal.len()
    }

    pub fn num_total(&self) -> usize {
        self.internal.len() + self.terminal.len()
    }

    /// All node handles, internal nodes first.
    pub fn sequences(&self) -> impl Iterator<Item = Sequence> {
        (0..self.num_total()).map(Sequence)
    }

    pub fn internal_sequences(&self) -> impl Iterator<Item = Sequence> {
        (0..self.num_internal()).map(Sequence)
    }

    pub fn terminal_sequences(&self) -> impl Iterator<Item = Sequence> {
        (self.num_internal()..self.num_total()).map(Sequence)
    }

    #[inline]
    pub fn is_terminal(&self, u: Sequence) -> bool {
        u.0 >= self.internal.len()
    }

    /// Betting round of a node; a terminal belongs to its parent's round.
    pub fn round(&self, u: Sequence) -> usize {
        if self.is_terminal(u) {
            match self.parent[u.0] {
                Some(p) => self.internal[p.0].round,
                None => 0,
            }
        } else {
            self.internal[u.0].round
        }
    }

    /// Seat to act at an internal node.
    ///
    /// Panics if `u` is terminal.
    #[inline]
    pub fn whose_turn(&self, u: Sequence) -> usize {
        self.internal[u.0].player
    }

    /// True for the root and for the first node of the second round.
    pub fn starts_round(&self, u: Sequence) -> bool {
        if u == Sequence::ROOT {
            return true;
        }
        if self.is_terminal(u) {
            return false;
        }
        match self.parent[u.0] {
            Some(p) => self.internal[p.0].round < self.internal[u.0].round,
            None => false,
        }
    }

    /// Child reached by taking `action`, or `None` if illegal or terminal.
    #[inline]
    pub fn child(&self, u: Sequence, action: Action) -> Option<Sequence> {
        self.internal
            .get(u.0)
            .and_then(|node| node.transition[action.index()])
    }

    /// Like [`child`](Self::child), but an illegal action is an error.
    pub fn do_action(&self, u: Sequence, action: Action) -> LeducResult<Sequence> {
        self.child(u, action)
            .ok_or_else(|| LeducError::InvalidBettingSequence {
                sequence: format!("{}{}", self.sequence_to_string(u), action.to_char()),
                reason: format!("{} is not legal here", action),
            })
    }

    #[inline]
    pub fn can_do_action(&self, u: Sequence, action: Action) -> bool {
        self.child(u, action).is_some()
    }

    /// Legal actions at `u` paired with the child each one leads to.
    pub fn actions(&self, u: Sequence) -> impl Iterator<Item = (Action, Sequence)> + '_ {
        ALL_ACTIONS
            .into_iter()
            .filter_map(move |a| self.child(u, a).map(|v| (a, v)))
    }

    pub fn num_actions(&self, u: Sequence) -> usize {
        self.actions(u).count()
    }

    pub fn parent(&self, u: Sequence) -> Option<Sequence> {
        self.parent.get(u.0).copied().flatten()
    }

    fn terminal_node(&self, u: Sequence) -> Option<&TerminalNode> {
        u.0.checked_sub(self.internal.len())
            .and_then(|t| self.terminal.get(t))
    }

    pub fn outcome(&self, u: Sequence) -> Option<Outcome> {
        self.terminal_node(u).map(|t| t.outcome)
    }

    pub fn is_fold(&self, u: Sequence) -> bool {
        matches!(self.outcome(u), Some(Outcome::Fold { .. }))
    }

    pub fn is_showdown(&self, u: Sequence) -> bool {
        matches!(self.outcome(u), Some(Outcome::Showdown))
    }

    pub fn winner_at_fold(&self, u: Sequence) -> Option<usize> {
        match self.outcome(u) {
            Some(Outcome::Fold { winner }) => Some(winner),
            _ => None,
        }
    }

    pub fn who_folded(&self, u: Sequence) -> Option<usize> {
        self.winner_at_fold(u).map(opponent)
    }

    /// Chips the losing player forfeits at a terminal (0 for internal nodes).
    pub fn win_amount(&self, u: Sequence) -> i32 {
        self.terminal_node(u).map(|t| t.amount).unwrap_or(0)
    }

    /// Canonical betting string, e.g. `/cr`, `/rc/` or `/cc/crc`.
    pub fn sequence_to_string(&self, u: Sequence) -> String {
        let mut chars = Vec::new();
        let mut w = u;
        while let Some(v) = self.parent(w) {
            let action = self
                .actions(v)
                .find(|&(_, child)| child == w)
                .map(|(a, _)| a);
            if !self.is_terminal(w) && self.round(v) < self.round(w) {
                chars.push(ROUND_SEPARATOR);
            }
            if let Some(a) = action {
                chars.push(a.to_char());
            }
            w = v;
        }
        chars.push(ROUND_SEPARATOR);
        chars.iter().rev().collect()
    }

    /// Replay a canonical betting string from the root.
    pub fn parse_sequence(&self, text: &str) -> LeducResult<Sequence> {
        let malformed = |reason: &str| LeducError::InvalidBettingSequence {
            sequence: text.to_string(),
            reason: reason.to_string(),
        };

        let mut chars = text.trim().chars();
        if chars.next() != Some(ROUND_SEPARATOR) {
            return Err(malformed("must start with '/'"));
        }

        let mut u = Sequence::ROOT;
        while let Some(c) = chars.next() {
            if self.is_terminal(u) {
                return Err(malformed("continues past a terminal node"));
            }
            let action = Action::from_char(c)?;
            let w = self
                .child(u, action)
                .ok_or_else(|| malformed(&format!("action '{}' is illegal here", c)))?;

            if !self.is_terminal(w) && self.round(w) > self.round(u) {
                if chars.next() != Some(ROUND_SEPARATOR) {
                    return Err(malformed("missing round separator"));
                }
            }
            u = w;
        }
        Ok(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leduc_node_counts() {
        let tree = GameTree::leduc();
        assert_eq!(tree.num_internal(), 36);
        assert_eq!(tree.num_terminal(), 49);
        assert_eq!(count_sequences(&GameRules::LEDUC), (36, 49));
    }

    #[test]
    fn root_is_player_zero_preflop() {
        let tree = GameTree::leduc();
        let root = tree.root();
        assert_eq!(tree.round(root), 0);
        assert_eq!(tree.whose_turn(root), 0);
        assert!(tree.starts_round(root));
        assert!(tree.can_do_action(root, Action::Raise));
        assert!(tree.can_do_action(root, Action::Call));
        assert!(!tree.can_do_action(root, Action::Fold));
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn known_strings() {
        let tree = GameTree::leduc();
        assert_eq!(tree.sequence_to_string(Sequence::new(0)), "/");
        assert_eq!(tree.sequence_to_string(Sequence::new(1)), "/r");
        assert_eq!(tree.sequence_to_string(Sequence::new(3)), "/rrc/");
        assert_eq!(tree.sequence_to_string(Sequence::new(15)), "/c");
        assert_eq!(tree.sequence_to_string(Sequence::new(84)), "/cc/cc");
    }

    #[test]
    fn raise_adds_call_plus_bet() {
        let tree = GameTree::leduc();
        // player 0 folds to the re-raise having put in ante + bet = 3
        let u = tree.parse_sequence("/rrf").unwrap();
        assert_eq!(tree.winner_at_fold(u), Some(1));
        assert_eq!(tree.who_folded(u), Some(0));
        assert_eq!(tree.win_amount(u), 3);

        // two raises in each round: 1 + 2 + 2 + 4 + 4 = 13
        let u = tree.parse_sequence("/rrc/rrc").unwrap();
        assert!(tree.is_showdown(u));
        assert_eq!(tree.win_amount(u), 13);
    }

    #[test]
    fn check_check_showdown_is_ante() {
        let tree = GameTree::leduc();
        let u = tree.parse_sequence("/cc/cc").unwrap();
        assert!(tree.is_showdown(u));
        assert_eq!(tree.win_amount(u), 1);
        assert_eq!(tree.round(u), 1);
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let tree = GameTree::leduc();
        assert!(tree.parse_sequence("/ccr").is_err());
        assert!(tree.parse_sequence("cc/").is_err());
        assert!(tree.parse_sequence("/rrr").is_err());
        assert!(tree.parse_sequence("/cx").is_err());
        assert!(tree.parse_sequence("/rf/").is_err());
    }

    #[test]
    fn unequal_antes_rejected() {
        let rules = GameRules {
            antes: [1, 2],
            ..GameRules::LEDUC
        };
        assert!(GameTree::new(rules).is_err());
    }
}
