//! Counterfactual regret minimization for Leduc hold'em.
//!
//! The betting tree is compiled once into a [`game_tree::GameTree`] and shared
//! by the trainer, the strategy store and the exact evaluators.

pub mod abstraction;
pub mod best_response;
pub mod cards;
pub mod cli;
pub mod display;
pub mod error;
pub mod game_tree;
pub mod head_to_head;
pub mod regret;
pub mod strategy;
pub mod trainer;
pub mod view;
