//! Agents of the research pipeline.
//!
//! Each agent owns one stage: the coordinator decomposes queries into
//! search tasks, the research worker executes them, the planning agent
//! synthesizes stored papers, and the analysis agent scores the syntheses.
//! Agents share nothing but the injected [`Store`](crate::store::Store).

/// Feasibility scoring over synthesis records.
pub mod analysis;
/// Query decomposition and task dispatch.
pub mod coordinator;
/// TF-IDF synthesis over stored papers.
pub mod planning;
/// The `tasks:research` worker loop.
pub mod research;

pub use analysis::AnalysisAgent;
pub use coordinator::{CoordinatorAgent, Decomposer, HeuristicDecomposer, HttpDecomposer};
pub use planning::PlanningAgent;
pub use research::ResearchAgent;
