use std::sync::Arc;

use dialoq_core::config::ModelConfig;
use dialoq_core::error::Result;
use dialoq_core::traits::LlmClient;
use dialoq_core::types::{ChatMessage, Role};

/// Render a history slice the way the prompts embed it.
fn render_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| {
            let who = match m.role {
                Role::Assistant => "assistant",
                Role::User => "user",
                Role::System => "system",
            };
            format!("{}: {}", who, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Generates the assistant side of the dialogue, anchored to the current
/// subtask of the flow graph.
pub struct ChatResponder {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
    assistant_role: String,
    task: String,
}

impl ChatResponder {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        config: ModelConfig,
        assistant_role: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            config,
            assistant_role: assistant_role.into(),
            task: task.into(),
        }
    }

    /// Produce the next assistant utterance for the current subtask.
    pub async fn respond(
        &self,
        flow_text: &str,
        current_task: &str,
        history: &[ChatMessage],
    ) -> Result<String> {
        let prompt = format!(
            r#"You are {}, dedicated to assisting users in completing their tasks with expertise and professionalism.
The task is {}. With extensive experience and numerous successful interactions, you are committed to providing warm, friendly, and professional assistance.

Sub-Task Graph: {}

Please strictly adhere to the steps of this sub-task graph, without skipping or reversing any steps.

Current Dialogue Sub-Task: {}

You must always focus on the sub-task of this step in this round of dialogue!

Dialogue history: {}

Generate appropriate response:"#,
            self.assistant_role,
            self.task,
            flow_text,
            current_task,
            render_history(history),
        );

        self.llm
            .generate(&self.config, vec![ChatMessage::system(prompt)])
            .await
    }

    /// Produce the closing message once the graph is exhausted.
    pub async fn farewell(&self, history: &[ChatMessage]) -> Result<String> {
        let prompt = format!(
            r#"#Role:
{}
The dialogue should now end.
Dialogue history: {}
Generate a polite farewell message to end the conversation. The message should include:
1. Thank the user for their time
2. Express appreciation for their cooperation
3. Wish them all the best"#,
            self.assistant_role,
            render_history(history),
        );

        self.llm
            .generate(&self.config, vec![ChatMessage::system(prompt)])
            .await
    }
}

/// Simulates the user side of a self-play dialogue.
pub struct UserSimulator {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
    user_role: String,
}

impl UserSimulator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        config: ModelConfig,
        user_role: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            config,
            user_role: user_role.into(),
        }
    }

    /// Produce the simulated user's reply to the latest assistant message.
    pub async fn reply(&self, history: &[ChatMessage], last_assistant: &str) -> Result<String> {
        let prompt = format!(
            r#"You are {}. Answer as concisely as possible, don't repeat topics already discussed. Don't actively expand topics unless asked. Reply in a colloquial manner.
Dialogue history: {}
The other party's most recent message is: {}
Generate appropriate response:"#,
            self.user_role,
            render_history(history),
            last_assistant,
        );

        self.llm
            .generate(&self.config, vec![ChatMessage::system(prompt)])
            .await
    }
}
