use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use itertools::Itertools;

use crate::abstraction::Abstraction;
use crate::cards::ALL_RANKS;
use crate::game_tree::{Action, GameTree, Outcome};

fn bucket_cell(bucket: Option<usize>) -> Cell {
    match bucket {
        Some(b) => Cell::new(b).set_alignment(CellAlignment::Right),
        None => Cell::new("-1".dimmed().to_string()).set_alignment(CellAlignment::Right),
    }
}

fn flag(value: bool) -> String {
    if value {
        "yes".green().bold().to_string()
    } else {
        "no".red().bold().to_string()
    }
}

/// Hand to bucket table for both rounds, plus bucket counts and flags.
pub fn abstraction_table(abstraction: &Abstraction, title: &str) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Hand".bold().to_string()),
        Cell::new("Bucket".bold().to_string()).set_alignment(CellAlignment::Right),
    ]);

    for hole in ALL_RANKS {
        table.add_row(vec![
            Cell::new(hole.to_string()),
            bucket_cell(abstraction.preflop_bucket(hole)),
        ]);
    }
    for hole in ALL_RANKS {
        for board in ALL_RANKS {
            table.add_row(vec![
                Cell::new(format!("{}{}", hole, board)),
                bucket_cell(abstraction.flop_bucket(hole, board)),
            ]);
        }
    }

    format!(
        "  {}\n{}\n  {} preflop buckets\n  {} flop buckets\n  complete: {}  perfect recall: {}",
        title.bold(),
        table,
        abstraction.preflop_buckets(),
        abstraction.flop_buckets(),
        flag(abstraction.is_complete()),
        flag(abstraction.is_perfect_recall())
    )
}

pub fn styled_action(action: Action) -> String {
    let name = action.to_string();
    match action {
        Action::Raise => name.red().bold().to_string(),
        Action::Call => name.green().bold().to_string(),
        Action::Fold => name.dimmed().bold().to_string(),
    }
}

/// Every node with its betting string, actor or outcome and payoff.
pub fn tree_table(tree: &GameTree) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").set_alignment(CellAlignment::Right),
        Cell::new("Sequence"),
        Cell::new("Round").set_alignment(CellAlignment::Right),
        Cell::new("Node"),
        Cell::new("Amount").set_alignment(CellAlignment::Right),
    ]);

    for u in tree.sequences() {
        let node = match tree.outcome(u) {
            Some(Outcome::Fold { winner }) => format!("fold, player {} wins", winner + 1),
            Some(Outcome::Showdown) => "showdown".yellow().to_string(),
            None => {
                let actions = tree.actions(u).map(|(a, _)| styled_action(a)).join(" ");
                format!("player {}: {}", tree.whose_turn(u) + 1, actions)
            }
        };
        let amount = if tree.is_terminal(u) {
            tree.win_amount(u).to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(u.id()).set_alignment(CellAlignment::Right),
            Cell::new(tree.sequence_to_string(u)),
            Cell::new(tree.round(u)).set_alignment(CellAlignment::Right),
            Cell::new(node),
            Cell::new(amount).set_alignment(CellAlignment::Right),
        ]);
    }

    format!(
        "{}\n  {} internal sequences\n  {} terminal sequences",
        table,
        tree.num_internal(),
        tree.num_terminal()
    )
}

/// A value colored by sign.
pub fn signed_value(value: f64) -> String {
    let text = format!("{}", value);
    if value >= 0.0 {
        text.green().bold().to_string()
    } else {
        text.red().bold().to_string()
    }
}

/// Head-to-head and best response values side by side.
pub fn exploitability_table(ev: f64, best_responses: [f64; 2]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Metric".bold().to_string()),
        Cell::new("Value").set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![Cell::new("EV (player 1)"), Cell::new(signed_value(ev))]);
    table.add_row(vec![
        Cell::new("Best response, player 1"),
        Cell::new(signed_value(best_responses[0])),
    ]);
    table.add_row(vec![
        Cell::new("Best response, player 2"),
        Cell::new(signed_value(best_responses[1])),
    ]);
    table.add_row(vec![
        Cell::new("Exploitability".bold().to_string()),
        Cell::new(format!("{:.6}", (best_responses[0] + best_responses[1]) / 2.0)),
    ]);
    table.to_string()
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{}", msg.green().bold());
}
