pub mod commands;
pub mod graph;
pub mod history;
pub mod manager;
pub mod optimizer;
pub mod scheduler;
pub mod search;
pub mod state;
pub mod store;
pub mod types;


pub use commands::*;
pub use graph::*;
pub use history::*;
pub use manager::*;
pub use optimizer::*;
pub use scheduler::*;
pub use search::*;
pub use state::*;
pub use store::*;
pub use types::*;
