use crate::analyzer::Analyzer;

#[derive(Clone)]
pub struct ServerState {
    pub analyzer: Analyzer,
}
