pub mod error;
pub mod models;
pub mod validation;
pub mod images;
pub mod identity;
pub mod voting_logic;

pub use error::{Error, ErrorCode, Result};
pub use models::*;
pub use validation::*;
pub use identity::*;
pub use images::{ImagePlaceholder, ImageSource, PLACEHOLDER_IMAGES};
pub use voting_logic::{compute_results, VotingError};

#[cfg(test)]
mod tests;
