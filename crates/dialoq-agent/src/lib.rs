pub mod chat;
pub mod decision;
pub mod evaluator;
pub mod graph;
pub mod graphgen;
pub mod record;
pub mod registry;
pub mod session;

pub use chat::{ChatResponder, UserSimulator};
pub use decision::{parse_decision, DecisionMaker};
pub use evaluator::{DialogueEvaluator, EvalReport, EvalScores};
pub use graph::{FlowPlanner, TaskGraph, TransitionOutcome};
pub use graphgen::GraphGenerator;
pub use record::DialogueRecord;
pub use registry::{AgentContext, AgentHandle, AgentKind, AgentRegistry};
pub use session::DialogueSession;
