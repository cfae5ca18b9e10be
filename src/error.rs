use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeducError {
    #[error("Invalid rank: {0}")]
    InvalidRank(char),

    #[error("Invalid action: {0}")]
    InvalidAction(char),

    #[error("Invalid betting sequence '{sequence}': {reason}")]
    InvalidBettingSequence { sequence: String, reason: String },

    #[error("Invalid hand '{0}'")]
    InvalidHand(String),

    #[error("Invalid game rules: {0}")]
    InvalidRules(String),

    #[error("Malformed strategy line {line} in {source_name}: {reason}")]
    MalformedStrategyLine {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error("Strategy entry {hand}:{sequence} is defined more than once")]
    DuplicateStrategyEntry { hand: String, sequence: String },

    #[error("No strategy defined for {hand}:{sequence}")]
    MissingStrategy { hand: String, sequence: String },

    #[error("Probability on illegal action '{action}' at {sequence}")]
    IllegalActionMass { sequence: String, action: char },

    #[error("Probability tuple at {sequence} has no positive mass")]
    NegligibleMass { sequence: String },

    #[error("Strategies disagree on whether {hand}:{sequence} is defined")]
    StrategyMismatch { hand: String, sequence: String },

    #[error("Malformed abstraction '{text}': {reason}")]
    MalformedAbstraction { text: String, reason: String },

    #[error("Hand {0} is assigned to more than one bucket")]
    DuplicateBucketAssignment(String),

    #[error("Hand {0} has no bucket in this abstraction")]
    UnmappedHand(String),

    #[error("Abstraction is not complete")]
    IncompleteAbstraction,

    #[error("Abstraction does not have perfect recall")]
    ImperfectRecall,

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type LeducResult<T> = Result<T, LeducError>;
