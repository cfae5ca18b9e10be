use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::abstraction::Abstraction;
use crate::best_response::best_response;
use crate::display::{
    abstraction_table, exploitability_table, print_error, print_section, print_success,
    signed_value, tree_table,
};
use crate::error::{LeducError, LeducResult};
use crate::game_tree::GameTree;
use crate::head_to_head::expected_value;
use crate::strategy::StrategyStore;
use crate::trainer::{self, unix_time, Seed, TrainConfig};

#[derive(Parser)]
#[command(name = "leduc", version = "1.0.0", about = "CFR training and exact evaluation for Leduc hold'em.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train both seats with chance-sampled CFR
    Train {
        /// Player 1's abstraction (grammar text or file; default identity)
        #[arg(long)]
        abstraction1: Option<String>,
        /// Player 2's abstraction (grammar text or file; default identity)
        #[arg(long)]
        abstraction2: Option<String>,
        /// Where to save player 1's strategy
        #[arg(long)]
        output1: Option<PathBuf>,
        /// Where to save player 2's strategy
        #[arg(long)]
        output2: Option<PathBuf>,
        /// Number of iterations
        #[arg(short = 'n', long)]
        iterations: Option<u64>,
        /// Fixed RNG seed
        #[arg(long, conflicts_with = "seed_time")]
        seed: Option<u64>,
        /// Seed the RNG from the clock
        #[arg(long)]
        seed_time: bool,
        /// Seconds between progress reports
        #[arg(long)]
        display_seconds: Option<u64>,
        /// JSON training config; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Best response value against a saved strategy
    BestResponse {
        /// Strategy file(s), comma separated
        #[arg(long)]
        strategy: String,
        /// Seat of the best responder (1 or 2)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        player: u8,
        /// Best responder's abstraction (default identity)
        #[arg(long)]
        abstraction: Option<String>,
        /// Where to save the best response strategy
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Exact expected value of two strategies against each other
    Play {
        /// Seat 1 strategy file(s)
        #[arg(long)]
        strategy1: String,
        /// Seat 2 strategy file(s)
        #[arg(long)]
        strategy2: String,
    },
    /// Head-to-head value plus both best responses
    Exploitability {
        /// Seat 1 strategy file(s)
        #[arg(long)]
        strategy1: String,
        /// Seat 2 strategy file(s)
        #[arg(long)]
        strategy2: String,
        /// Best responders' abstraction (default identity)
        #[arg(long)]
        abstraction: Option<String>,
    },
    /// Reach-weighted average of two strategies
    Average {
        #[arg(long)]
        strategy1: String,
        #[arg(long)]
        strategy2: String,
        #[arg(long, default_value = "1")]
        weight1: f64,
        #[arg(long, default_value = "1")]
        weight2: f64,
        #[arg(long)]
        output: PathBuf,
    },
    /// Show how an abstraction buckets every hand
    Abstraction {
        /// Grammar text or file, e.g. "J,Q:K:JJ,QQ,KK:JQ,JK,QJ,QK,KJ,KQ"
        spec: String,
    },
    /// Dump the betting tree
    Tree,
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

pub fn run_with_args(args: Vec<String>) {
    let cli = Cli::parse_from(args);
    dispatch(cli);
}

fn dispatch(cli: Cli) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let tree = Arc::new(GameTree::leduc());
    let result = match cli.command {
        Commands::Train {
            abstraction1,
            abstraction2,
            output1,
            output2,
            iterations,
            seed,
            seed_time,
            display_seconds,
            config,
        } => {
            let overrides = TrainOverrides {
                abstractions: [abstraction1, abstraction2],
                outputs: [output1, output2],
                iterations,
                seed: if seed_time { Some(Seed::Time) } else { seed.map(Seed::Fixed) },
                display_seconds,
            };
            cmd_train(tree, config, overrides)
        }
        Commands::BestResponse {
            strategy,
            player,
            abstraction,
            output,
        } => cmd_best_response(tree, &strategy, player as usize - 1, abstraction, output),
        Commands::Play {
            strategy1,
            strategy2,
        } => cmd_play(tree, &strategy1, &strategy2),
        Commands::Exploitability {
            strategy1,
            strategy2,
            abstraction,
        } => cmd_exploitability(tree, &strategy1, &strategy2, abstraction),
        Commands::Average {
            strategy1,
            strategy2,
            weight1,
            weight2,
            output,
        } => cmd_average(tree, &strategy1, &strategy2, [weight1, weight2], output),
        Commands::Abstraction { spec } => cmd_abstraction(&spec),
        Commands::Tree => {
            println!("{}", tree_table(&tree));
            Ok(())
        }
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

struct TrainOverrides {
    abstractions: [Option<String>; 2],
    outputs: [Option<PathBuf>; 2],
    iterations: Option<u64>,
    seed: Option<Seed>,
    display_seconds: Option<u64>,
}

fn cmd_train(
    tree: Arc<GameTree>,
    config_path: Option<PathBuf>,
    overrides: TrainOverrides,
) -> LeducResult<()> {
    let mut config = match config_path {
        Some(path) => TrainConfig::load(path)?,
        None => TrainConfig::default(),
    };

    let TrainOverrides {
        abstractions,
        outputs,
        iterations,
        seed,
        display_seconds,
    } = overrides;
    for (slot, value) in config.abstractions.iter_mut().zip(abstractions) {
        if value.is_some() {
            *slot = value;
        }
    }
    for (slot, value) in config.outputs.iter_mut().zip(outputs) {
        if value.is_some() {
            *slot = value;
        }
    }
    if let Some(n) = iterations {
        config.iterations = n;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(secs) = display_seconds {
        config.display_seconds = secs;
    }

    for (player, abstraction) in config.abstractions()?.iter().enumerate() {
        let title = format!("abstraction {}: {}", player + 1, abstraction.description());
        println!("{}", abstraction_table(abstraction, &title));
    }

    let trainer = trainer::run(tree, &config)?;
    let regret = trainer.average_regret();
    print_success(&format!(
        "trained {} iterations, average regret {:.6} {:.6}",
        trainer.iterations(),
        regret[0],
        regret[1]
    ));
    Ok(())
}

fn load_abstraction(arg: Option<String>) -> LeducResult<Abstraction> {
    match arg {
        Some(text) => Abstraction::load(&text),
        None => Ok(Abstraction::identity()),
    }
}

fn load_strategy(tree: &Arc<GameTree>, paths: &str, seat: &str) -> LeducResult<StrategyStore> {
    log::info!("loading strategy {} for {}...", paths, seat);
    StrategyStore::load(Arc::clone(tree), paths)
}

fn cmd_best_response(
    tree: Arc<GameTree>,
    strategy_paths: &str,
    player: usize,
    abstraction: Option<String>,
    output: Option<PathBuf>,
) -> LeducResult<()> {
    if output.is_none() {
        log::warn!("strategy will not be saved");
    }
    let abstraction = load_abstraction(abstraction)?;
    let opponent = load_strategy(&tree, strategy_paths, "the opponent")?;

    let response = best_response(&tree, player, &abstraction, &opponent)?;
    println!(
        "value for player {} against {} is {}",
        player + 1,
        strategy_paths,
        signed_value(response.value)
    );

    if let Some(path) = output {
        response.save_to_file(&path, strategy_paths)?;
    }
    Ok(())
}

fn cmd_play(tree: Arc<GameTree>, strategy1: &str, strategy2: &str) -> LeducResult<()> {
    let s1 = load_strategy(&tree, strategy1, "seat 1")?;
    let s2 = load_strategy(&tree, strategy2, "seat 2")?;

    log::info!("computing expected value in terms of player 1...");
    let value = expected_value(&tree, [&s1, &s2])?;
    println!("EV = {}", signed_value(value));
    Ok(())
}

fn cmd_exploitability(
    tree: Arc<GameTree>,
    strategy1: &str,
    strategy2: &str,
    abstraction: Option<String>,
) -> LeducResult<()> {
    let abstraction = load_abstraction(abstraction)?;
    let s1 = load_strategy(&tree, strategy1, "seat 1")?;
    let s2 = load_strategy(&tree, strategy2, "seat 2")?;

    let ev = expected_value(&tree, [&s1, &s2])?;
    let (br1, br2) = rayon::join(
        || best_response(&tree, 0, &abstraction, &s2),
        || best_response(&tree, 1, &abstraction, &s1),
    );
    let values = [br1?.value, br2?.value];

    print_section(
        &format!("{} vs {}", strategy1, strategy2),
        &exploitability_table(ev, values),
    );
    Ok(())
}

fn cmd_average(
    tree: Arc<GameTree>,
    strategy1: &str,
    strategy2: &str,
    weights: [f64; 2],
    output: PathBuf,
) -> LeducResult<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(LeducError::InvalidValue(format!(
            "weights must be non-negative, got {} and {}",
            weights[0], weights[1]
        )));
    }
    let mut averaged = load_strategy(&tree, strategy1, "the first strategy")?;
    let other = load_strategy(&tree, strategy2, "the second strategy")?;

    log::info!("averaging strategies...");
    averaged.average(&other, weights[0], weights[1])?;

    let header = format!(
        "#\n# averaged leduc strategy {}\n# made on:    {}\n# strategy 1: {} (weight {})\n# strategy 2: {} (weight {})\n#\n",
        output.display(),
        unix_time(),
        strategy1,
        weights[0],
        strategy2,
        weights[1]
    );
    averaged.save_to_file(&output, &header)?;
    print_success(&format!("saved average to {}", output.display()));
    Ok(())
}

fn cmd_abstraction(spec: &str) -> LeducResult<()> {
    let abstraction = Abstraction::load(spec)?;
    println!("{}", abstraction_table(&abstraction, abstraction.description()));
    Ok(())
}
