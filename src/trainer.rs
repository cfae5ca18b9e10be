//! Chance-sampled CFR self-play.
//!
//! Every iteration deals one hand, buckets each player's view of it and walks
//! the full betting tree once, updating both players' regret and average
//! tables. The average strategy is recovered into a [`StrategyStore`] at the
//! end.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::abstraction::Abstraction;
use crate::cards::{evaluate_winner, Deal, Deck, Rank, NUM_FLOP_HANDS, NUM_PREFLOP_HANDS};
use crate::error::{LeducError, LeducResult};
use crate::game_tree::{opponent, GameTree, Sequence, NUM_ACTIONS, NUM_ROUNDS};
use crate::regret::RegretTable;
use crate::strategy::StrategyStore;
use crate::view::{hand_cards, PlayerView};

/// Default number of self-play iterations.
pub const DEFAULT_ITERATIONS: u64 = 100_000_000;

/// Default seconds between progress reports.
pub const DEFAULT_DISPLAY_SECONDS: u64 = 30;

/// Default RNG seed.
pub const DEFAULT_SEED: u64 = 31337;

/// Both players' reach below this prunes the subtree.
const REACH_CUTOFF: f64 = 1e-7;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seed {
    Fixed(u64),
    /// Seconds since the epoch at start-up.
    Time,
}

impl Seed {
    pub fn resolve(self) -> u64 {
        match self {
            Seed::Fixed(seed) => seed,
            Seed::Time => unix_time(),
        }
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed::Fixed(DEFAULT_SEED)
    }
}

/// Parameters of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Abstraction text or file per player; `None` means identity.
    pub abstractions: [Option<String>; 2],
    pub outputs: [Option<PathBuf>; 2],
    pub iterations: u64,
    pub seed: Seed,
    pub display_seconds: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            abstractions: [None, None],
            outputs: [None, None],
            iterations: DEFAULT_ITERATIONS,
            seed: Seed::default(),
            display_seconds: DEFAULT_DISPLAY_SECONDS,
        }
    }
}

impl TrainConfig {
    /// Read a config from a JSON file; missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> LeducResult<TrainConfig> {
        let json = std::fs::read_to_string(path)?;
        let config: TrainConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LeducResult<()> {
        if self.iterations == 0 {
            return Err(LeducError::InvalidValue(
                "iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build each player's abstraction.
    pub fn abstractions(&self) -> LeducResult<[Abstraction; 2]> {
        let build = |arg: &Option<String>| match arg {
            Some(text) => Abstraction::load(text),
            None => Ok(Abstraction::identity()),
        };
        Ok([build(&self.abstractions[0])?, build(&self.abstractions[1])?])
    }
}

pub fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Trainer
// ---------------------------------------------------------------------------

pub struct Trainer {
    tree: Arc<GameTree>,
    abstractions: [Abstraction; 2],
    tables: [RegretTable; 2],
    rng: StdRng,
    deck: Deck,
    iterations: u64,
    average_regret: [f64; 2],
}

impl Trainer {
    pub fn new(tree: Arc<GameTree>, abstractions: [Abstraction; 2], seed: u64) -> Trainer {
        let tables = [0, 1].map(|player| {
            let a = &abstractions[player];
            RegretTable::new(&tree, player, [a.preflop_buckets(), a.flop_buckets()])
        });
        for (player, table) in tables.iter().enumerate() {
            log::debug!(
                "player {} regret table: {} preflop buckets, {} flop buckets, {} entries",
                player + 1,
                table.buckets(0),
                table.buckets(1),
                table.total_entries()
            );
        }
        Trainer {
            tree,
            abstractions,
            tables,
            rng: StdRng::seed_from_u64(seed),
            deck: Deck::new(),
            iterations: 0,
            average_regret: [0.0; 2],
        }
    }

    pub fn tree(&self) -> &Arc<GameTree> {
        &self.tree
    }

    pub fn abstraction(&self, player: usize) -> &Abstraction {
        &self.abstractions[player]
    }

    pub fn table(&self, player: usize) -> &RegretTable {
        &self.tables[player]
    }

    /// Iterations completed so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Running mean of the positive regret collected per iteration.
    pub fn average_regret(&self) -> [f64; 2] {
        self.average_regret
    }

    /// Run `iterations` more iterations, logging progress every
    /// `display_seconds`.
    pub fn train(&mut self, iterations: u64, display_seconds: u64) -> LeducResult<()> {
        log::info!("training for {} iterations...", iterations);

        let start = Instant::now();
        let mut last_report = start;
        let interval = Duration::from_secs(display_seconds);

        for i in 1..=iterations {
            if i % 1000 == 0 {
                let now = Instant::now();
                if now.duration_since(last_report) > interval {
                    self.report(i, iterations, now.duration_since(start));
                    last_report = now;
                }
            }
            self.iterate()?;
        }

        log::info!(
            "finished {} iterations, average regret {:.6} {:.6}",
            iterations,
            self.average_regret[0],
            self.average_regret[1]
        );
        Ok(())
    }

    fn report(&self, i: u64, total: u64, elapsed: Duration) {
        let secs = elapsed.as_secs_f64().max(f64::MIN_POSITIVE);
        let eta = secs / i as f64 * (total - i) as f64;
        log::info!("{:<24}{}/{} ({:.2}%)", "iteration", i, total, 100.0 * i as f64 / total as f64);
        log::info!("{:<24}{:.2} min", "elapsed", secs / 60.0);
        log::info!("{:<24}{:.2} min", "eta", eta / 60.0);
        log::info!("{:<24}{:.0}", "iterations per second", i as f64 / secs);
        log::info!(
            "{:<24}{:.6} {:.6}",
            "average cfr",
            self.average_regret[0],
            self.average_regret[1]
        );
    }

    /// Deal a random hand and train on it.
    pub fn iterate(&mut self) -> LeducResult<[f64; 2]> {
        let deal = self.deck.deal(&mut self.rng);
        self.train_deal(deal)
    }

    /// Train on a specific deal; returns the positive regret collected by
    /// each player.
    pub fn train_deal(&mut self, deal: Deal) -> LeducResult<[f64; 2]> {
        let mut buckets = [[None; NUM_ROUNDS]; 2];
        for (player, slot) in buckets.iter_mut().enumerate() {
            let hole = deal.holes[player];
            let abstraction = &self.abstractions[player];
            slot[0] = abstraction.preflop_bucket(hole);
            slot[1] = abstraction.flop_bucket(hole, deal.board);
            if slot[0].is_none() {
                log::warn!("cannot view preflop: player {} holding {}", player + 1, hole);
            }
            if slot[1].is_none() {
                log::warn!(
                    "cannot view flop: player {} holding {}{}",
                    player + 1,
                    hole,
                    deal.board
                );
            }
        }

        let mut walk = RegretWalk {
            tree: &self.tree,
            tables: &mut self.tables,
            deal,
            buckets,
            result: evaluate_winner(deal.holes[0], deal.holes[1], deal.board),
            chance: 1.0,
            cfr: [0.0; 2],
        };
        walk.update(self.tree.root(), [1.0, 1.0])?;
        let cfr = walk.cfr;

        self.iterations += 1;
        let i = self.iterations as f64;
        if self.iterations == 1 {
            self.average_regret = cfr;
        } else {
            for (acfr, c) in self.average_regret.iter_mut().zip(cfr) {
                *acfr = (i - 1.0) / i * (*acfr + c / (i - 1.0));
            }
        }
        Ok(cfr)
    }

    /// Normalized average strategy for `player`, one entry per concrete hand
    /// that the player's abstraction maps.
    pub fn recover_strategy(&self, player: usize) -> LeducResult<StrategyStore> {
        let mut store = StrategyStore::new(Arc::clone(&self.tree));
        let abstraction = &self.abstractions[player];
        let table = &self.tables[player];

        for u in self.tree.internal_sequences() {
            if self.tree.whose_turn(u) != player {
                continue;
            }
            let postflop = self.tree.round(u) > 0;
            let hands = if postflop { NUM_FLOP_HANDS } else { NUM_PREFLOP_HANDS };
            for hand in 0..hands {
                let Some((hole, board)) = hand_cards(hand, postflop) else {
                    continue;
                };
                let view = PlayerView::new(player, hole, board, u);
                if let Some(bucket) = abstraction.bucket(&view) {
                    store.set(&view, &table.average_strategy(u, bucket))?;
                }
            }
        }

        Ok(store)
    }

    /// Recover `player`'s strategy and write it with a provenance header.
    pub fn save_strategy(&self, player: usize, path: &Path) -> LeducResult<()> {
        log::info!("saving player {} to {}...", player + 1, path.display());
        let header = format!(
            "#\n# leduc strategy {}\n# made on:       {}\n# abstraction:   {}\n# opponent:      {}\n# iterations:    {}\n#\n",
            path.display(),
            unix_time(),
            self.abstractions[player].description(),
            self.abstractions[opponent(player)].description(),
            self.iterations
        );
        self.recover_strategy(player)?.save_to_file(path, &header)
    }
}

/// Run a full training session from a config: build abstractions, train and
/// save whichever strategies have an output path.
pub fn run(tree: Arc<GameTree>, config: &TrainConfig) -> LeducResult<Trainer> {
    config.validate()?;
    if config.outputs.iter().all(Option::is_none) {
        log::warn!("you aren't saving the strategies anywhere");
    }

    log::info!("creating abstractions...");
    let abstractions = config.abstractions()?;
    let seed = config.seed.resolve();
    log::info!("seed {}", seed);

    let mut trainer = Trainer::new(tree, abstractions, seed);
    trainer.train(config.iterations, config.display_seconds)?;

    log::info!("saving strategies...");
    for (player, output) in config.outputs.iter().enumerate() {
        if let Some(path) = output {
            trainer.save_strategy(player, path)?;
        }
    }
    Ok(trainer)
}

// ---------------------------------------------------------------------------
// Regret update
// ---------------------------------------------------------------------------

struct RegretWalk<'a> {
    tree: &'a GameTree,
    tables: &'a mut [RegretTable; 2],
    deal: Deal,
    buckets: [[Option<usize>; NUM_ROUNDS]; 2],
    /// Showdown result from player 0's side.
    result: i32,
    chance: f64,
    cfr: [f64; 2],
}

impl RegretWalk<'_> {
    /// Counterfactual values of both players below `u`.
    fn update(&mut self, u: Sequence, reach: [f64; 2]) -> LeducResult<[f64; 2]> {
        let tree = self.tree;

        if tree.is_terminal(u) {
            let amount = tree.win_amount(u) as f64;
            let ev = match tree.who_folded(u) {
                Some(0) => [
                    -amount * reach[1] * self.chance,
                    amount * reach[0] * self.chance,
                ],
                Some(_) => [
                    amount * reach[1] * self.chance,
                    -amount * reach[0] * self.chance,
                ],
                None => {
                    let result = self.result as f64;
                    [
                        result * reach[1] * amount * self.chance,
                        -result * reach[0] * amount * self.chance,
                    ]
                }
            };
            return Ok(ev);
        }

        if reach[0] < REACH_CUTOFF && reach[1] < REACH_CUTOFF {
            return Ok([0.0, 0.0]);
        }

        let player = tree.whose_turn(u);
        let other = opponent(player);
        let round = tree.round(u);
        let bucket = self.bucket(player, round, u)?;

        let probability = self.tables[player].current_strategy(u, bucket);
        self.tables[player].accumulate_average(u, bucket, &probability, reach[player]);

        let mut values = [0.0; NUM_ACTIONS];
        let mut expected = 0.0;
        let mut sum = 0.0;
        for (action, v) in tree.actions(u) {
            let i = action.index();
            let mut next = reach;
            next[player] *= probability[i];
            let ev = self.update(v, next)?;
            values[i] = ev[player];
            expected += ev[player] * probability[i];
            sum += ev[other];
        }

        let mut delta = [0.0; NUM_ACTIONS];
        for (action, _) in tree.actions(u) {
            let i = action.index();
            delta[i] = values[i] - expected;
            self.cfr[player] += delta[i].max(0.0);
        }
        self.tables[player].add_regret(u, bucket, &delta);

        let mut ev = [0.0; 2];
        ev[player] = expected;
        ev[other] = sum;
        Ok(ev)
    }

    fn bucket(&self, player: usize, round: usize, u: Sequence) -> LeducResult<usize> {
        self.buckets[player][round].ok_or_else(|| {
            let hole: Rank = self.deal.holes[player];
            let board = (round > 0).then_some(self.deal.board);
            LeducError::UnmappedHand(PlayerView::new(player, hole, board, u).hand_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Rank;

    fn trainer(seed: u64) -> Trainer {
        let tree = Arc::new(GameTree::leduc());
        Trainer::new(tree, [Abstraction::identity(), Abstraction::identity()], seed)
    }

    #[test]
    fn first_iteration_sets_average_regret() {
        let mut t = trainer(1);
        let cfr = t
            .train_deal(Deal {
                holes: [Rank::King, Rank::Jack],
                board: Rank::Queen,
            })
            .unwrap();
        assert_eq!(t.iterations(), 1);
        assert_eq!(t.average_regret(), cfr);
        assert!(cfr[0] > 0.0);
    }

    #[test]
    fn same_seed_same_tables() {
        let mut a = trainer(99);
        let mut b = trainer(99);
        for _ in 0..200 {
            a.iterate().unwrap();
            b.iterate().unwrap();
        }
        let tree = GameTree::leduc();
        let root = tree.root();
        for bucket in 0..3 {
            assert_eq!(a.table(0).regret(root, bucket), b.table(0).regret(root, bucket));
        }
    }

    #[test]
    fn unmapped_bucket_is_an_error_when_reached() {
        let tree = Arc::new(GameTree::leduc());
        let partial = Abstraction::parse("J:Q").unwrap();
        let mut t = Trainer::new(tree, [partial, Abstraction::identity()], 5);
        let result = t.train_deal(Deal {
            holes: [Rank::King, Rank::Jack],
            board: Rank::Queen,
        });
        assert!(matches!(result, Err(LeducError::UnmappedHand(_))));
    }

    #[test]
    fn config_defaults() {
        let config: TrainConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.iterations, DEFAULT_ITERATIONS);
        assert_eq!(config.seed, Seed::Fixed(DEFAULT_SEED));
        assert_eq!(config.display_seconds, DEFAULT_DISPLAY_SECONDS);

        let config: TrainConfig =
            serde_json::from_str(r#"{"iterations": 10, "seed": "time"}"#).unwrap();
        assert_eq!(config.iterations, 10);
        assert_eq!(config.seed, Seed::Time);
    }
}
