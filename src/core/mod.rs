pub mod logger;
pub mod metadata;
pub mod player;
pub mod supervisor;

pub use logger::{open_log, DrainOutcome, MetadataLogger};
pub use metadata::{extract_title, LogEntry, MARKER};
pub use player::{locate_player, LineReader, LineSource, PlayerOutput, PlayerProcess};
pub use supervisor::{RunOutcome, Supervisor};
