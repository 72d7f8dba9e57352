/// Crypto Inventory
///
/// Rule-driven detection of cryptographic API usage in Java and Python
/// sources. Detection rules describe call sites and the arguments to
/// extract; matches are translated into a tree of crypto assets and
/// normalized by the reorganizer before landing in the inventory.
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod reorganizer;
pub mod rules;
pub mod scanner;
pub mod syntax;
pub mod translation;
pub mod utils;

pub use config::EngineConfig;
pub use engine::{DetectionExecutive, DetectionStore, Finding};
pub use error::{Error, Result};
pub use inventory::Inventory;
pub use model::{Node, NodeKind};
pub use scanner::{ScanResult, Scanner};
pub use syntax::Language;
