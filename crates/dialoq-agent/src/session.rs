use tracing::{debug, error, info, warn};

use dialoq_core::config::DialogueConfig;
use dialoq_core::error::Result;
use dialoq_core::types::{ChatMessage, Decision, SessionId};

use crate::chat::{ChatResponder, UserSimulator};
use crate::decision::DecisionMaker;
use crate::evaluator::DialogueEvaluator;
use crate::graph::FlowPlanner;
use crate::record::DialogueRecord;

/// One self-play dialogue session driven over a task graph.
///
/// Each turn reads the planner's current subtask and legal transitions,
/// generates the assistant and simulated-user utterances, obtains a
/// [`Decision`], and applies it. The loop ends when the graph is exhausted
/// (no legal next nodes), when the decision step says end, or at the
/// configured turn cap. The cap is what bounds a flow whose terminal node
/// is unreachable, so graphs should normally contain a reachable sink.
///
/// Decision failures never abort a session; generation failures end it
/// early but still produce a record of what happened.
pub struct DialogueSession {
    session_id: SessionId,
    planner: FlowPlanner,
    responder: ChatResponder,
    simulator: UserSimulator,
    decider: DecisionMaker,
    evaluator: Option<DialogueEvaluator>,
    task: String,
    max_turns: usize,
    history_window: usize,
    history: Vec<ChatMessage>,
}

impl DialogueSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        planner: FlowPlanner,
        responder: ChatResponder,
        simulator: UserSimulator,
        decider: DecisionMaker,
        evaluator: Option<DialogueEvaluator>,
        task: impl Into<String>,
        dialogue: &DialogueConfig,
    ) -> Self {
        Self {
            session_id: SessionId::new(),
            planner,
            responder,
            simulator,
            decider,
            evaluator,
            task: task.into(),
            max_turns: dialogue.max_turns,
            history_window: dialogue.history_window,
            history: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Trailing history slice embedded into generation prompts.
    fn history_tail(&self) -> &[ChatMessage] {
        let len = self.history.len();
        &self.history[len.saturating_sub(self.history_window)..]
    }

    /// Drive the dialogue to completion and return the session record.
    pub async fn run(&mut self) -> Result<DialogueRecord> {
        let flow_text = self.planner.graph().source().to_string();
        let mut turn = 0usize;

        loop {
            if self.planner.legal_next().is_empty() {
                debug!(node = %self.planner.current(), "Graph exhausted, ending dialogue");
                break;
            }
            if turn >= self.max_turns {
                warn!(
                    max_turns = self.max_turns,
                    node = %self.planner.current(),
                    "Turn cap reached before graph exhaustion, ending dialogue"
                );
                break;
            }
            turn += 1;

            let current = self.planner.current().to_string();
            let current_task = self.planner.current_label().to_string();
            info!(turn, node = %current, subtask = %current_task, "Dialogue turn");

            let assistant = match self
                .responder
                .respond(&flow_text, &current_task, self.history_tail())
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "Assistant generation failed, ending dialogue");
                    break;
                }
            };
            self.history.push(ChatMessage::assistant(assistant.clone()));

            let user = match self.simulator.reply(self.history_tail(), &assistant).await {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "User simulation failed, ending dialogue");
                    break;
                }
            };
            self.history.push(ChatMessage::user(user.clone()));

            let decision = self
                .decider
                .decide(self.planner.graph(), &current, &user)
                .await;

            match decision {
                Decision::Stay => {
                    debug!(node = %current, "Staying at current subtask");
                }
                Decision::Transition { target } => {
                    match self.planner.transition(&target) {
                        Ok(outcome) => {
                            info!(
                                from = %current,
                                to = %outcome.current,
                                progress = outcome.progress,
                                "Transitioned to next subtask"
                            );
                        }
                        Err(e) => {
                            // The planner is the authority on legality; an
                            // illegal pick from the decision layer is a stay.
                            warn!(error = %e, "Decision produced an illegal transition, staying");
                        }
                    }
                }
                Decision::End => {
                    info!(node = %current, "Decision step ended the dialogue");
                    break;
                }
            }
        }

        match self.responder.farewell(self.history_tail()).await {
            Ok(farewell) => self.history.push(ChatMessage::assistant(farewell)),
            Err(e) => warn!(error = %e, "Farewell generation failed"),
        }

        let evaluation = match &self.evaluator {
            Some(evaluator) => match evaluator.evaluate(&self.task, &self.history).await {
                Ok(report) => {
                    info!(overall = report.overall, "Dialogue evaluated");
                    Some(report)
                }
                Err(e) => {
                    warn!(error = %e, "Dialogue evaluation failed");
                    None
                }
            },
            None => None,
        };

        Ok(DialogueRecord {
            session_id: self.session_id.clone(),
            task: self.task.clone(),
            created_at: chrono::Utc::now(),
            flow_text,
            dialogue_history: self.history.clone(),
            visited: self.planner.visited().to_vec(),
            progress: self.planner.progress(),
            evaluation,
        })
    }
}
