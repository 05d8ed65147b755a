pub mod interaction;

pub use interaction::{Interaction, Timestamp, UserHistory};
