mod breakdown;
mod handlers;
mod models;
mod state;

pub use handlers::{router, run_server};
pub use models::{BreakdownRequest, ErrorResponse};
pub use state::ServerState;
