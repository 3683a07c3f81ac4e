use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use dialoq_core::config::AppConfig;
use dialoq_core::error::{DialoqError, Result};
use dialoq_core::traits::LlmClient;

use crate::chat::{ChatResponder, UserSimulator};
use crate::decision::DecisionMaker;
use crate::evaluator::DialogueEvaluator;
use crate::graph::{FlowPlanner, TaskGraph};
use crate::graphgen::GraphGenerator;

/// The closed set of agent kinds in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    GraphGenerator,
    StatePlanner,
    ChatResponder,
    DecisionMaker,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentKind::GraphGenerator => "graph_generator",
            AgentKind::StatePlanner => "state_planner",
            AgentKind::ChatResponder => "chat_responder",
            AgentKind::DecisionMaker => "decision_maker",
        };
        write!(f, "{}", name)
    }
}

/// Everything a constructor may need. The task graph is present only once
/// flow parsing has happened, so graph-dependent kinds fail cleanly when
/// constructed too early.
#[derive(Clone)]
pub struct AgentContext {
    pub llm: Arc<dyn LlmClient>,
    pub config: AppConfig,
    pub graph: Option<Arc<TaskGraph>>,
}

/// A constructed agent, tagged by kind.
pub enum AgentHandle {
    GraphGenerator(GraphGenerator),
    StatePlanner(FlowPlanner),
    ChatResponder(ChatResponder),
    DecisionMaker(DecisionMaker),
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentHandle::GraphGenerator(_) => "GraphGenerator",
            AgentHandle::StatePlanner(_) => "StatePlanner",
            AgentHandle::ChatResponder(_) => "ChatResponder",
            AgentHandle::DecisionMaker(_) => "DecisionMaker",
        };
        f.debug_tuple(name).finish()
    }
}

type Constructor = Box<dyn Fn(&AgentContext) -> Result<AgentHandle> + Send + Sync>;

/// Explicit kind-to-constructor mapping, built once at startup.
///
/// Extensions replace a constructor with an explicit [`register`] call at
/// process init; there is no runtime scanning of any sort.
///
/// [`register`]: AgentRegistry::register
pub struct AgentRegistry {
    constructors: HashMap<AgentKind, Constructor>,
}

impl AgentRegistry {
    /// Registry with the built-in constructor for every kind.
    pub fn builtin() -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
        };

        registry.register(AgentKind::GraphGenerator, |ctx| {
            Ok(AgentHandle::GraphGenerator(GraphGenerator::new(
                ctx.llm.clone(),
                ctx.config.model.clone(),
            )))
        });

        registry.register(AgentKind::StatePlanner, |ctx| {
            let graph = ctx.graph.clone().ok_or_else(|| {
                DialoqError::Config("state planner requires a parsed task graph".into())
            })?;
            Ok(AgentHandle::StatePlanner(FlowPlanner::new(graph)?))
        });

        registry.register(AgentKind::ChatResponder, |ctx| {
            Ok(AgentHandle::ChatResponder(ChatResponder::new(
                ctx.llm.clone(),
                ctx.config.model.clone(),
                ctx.config.roles.assistant_role.clone(),
                ctx.config.roles.task.clone(),
            )))
        });

        registry.register(AgentKind::DecisionMaker, |ctx| {
            Ok(AgentHandle::DecisionMaker(DecisionMaker::new(
                ctx.llm.clone(),
                ctx.config.model.clone(),
            )))
        });

        registry
    }

    /// Register (or replace) the constructor for a kind.
    pub fn register<F>(&mut self, kind: AgentKind, constructor: F)
    where
        F: Fn(&AgentContext) -> Result<AgentHandle> + Send + Sync + 'static,
    {
        self.constructors.insert(kind, Box::new(constructor));
    }

    /// Construct an agent of the given kind.
    pub fn create(&self, kind: AgentKind, ctx: &AgentContext) -> Result<AgentHandle> {
        let constructor = self.constructors.get(&kind).ok_or_else(|| {
            DialoqError::Config(format!("no constructor registered for agent kind {}", kind))
        })?;
        constructor(ctx)
    }

    /// All kinds with a registered constructor.
    pub fn kinds(&self) -> Vec<AgentKind> {
        self.constructors.keys().copied().collect()
    }
}

/// Build the user simulator alongside the registry agents; it is a harness
/// collaborator rather than one of the system's agent kinds.
pub fn build_user_simulator(ctx: &AgentContext) -> UserSimulator {
    UserSimulator::new(
        ctx.llm.clone(),
        ctx.config.model.clone(),
        ctx.config.roles.user_role.clone(),
    )
}

/// Build the evaluator from the shared context.
pub fn build_evaluator(ctx: &AgentContext) -> DialogueEvaluator {
    DialogueEvaluator::new(
        ctx.llm.clone(),
        ctx.config.model.clone(),
        ctx.config.evaluation.weights.clone(),
    )
}
