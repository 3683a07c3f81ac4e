use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use dialoq_core::error::Result;
use dialoq_core::types::{ChatMessage, SessionId};

use crate::evaluator::EvalReport;

/// Persisted output of one dialogue session: the full turn-by-turn history
/// plus the final evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueRecord {
    pub session_id: SessionId,
    pub task: String,
    pub created_at: DateTime<Utc>,
    /// The flow description the session ran against.
    pub flow_text: String,
    pub dialogue_history: Vec<ChatMessage>,
    /// Node ids in visit order, repeats included.
    pub visited: Vec<String>,
    /// Distinct-visited / total-node progress at session end.
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvalReport>,
}

impl DialogueRecord {
    /// Write the record as pretty JSON to `{dir}/{session_id}.json`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", self.session_id));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), "Saved dialogue record");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DialogueRecord {
        DialogueRecord {
            session_id: SessionId::from_str("test-session"),
            task: "Book a table".to_string(),
            created_at: Utc::now(),
            flow_text: "N1 --> N2".to_string(),
            dialogue_history: vec![
                ChatMessage::assistant("Hello!"),
                ChatMessage::user("Hi."),
            ],
            visited: vec!["N1".to_string(), "N2".to_string()],
            progress: 1.0,
            evaluation: None,
        }
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = record().save(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "test-session.json");

        let loaded: DialogueRecord =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded.task, "Book a table");
        assert_eq!(loaded.visited, ["N1", "N2"]);
        assert_eq!(loaded.dialogue_history.len(), 2);
    }

    #[test]
    fn test_missing_evaluation_omitted_from_json() {
        let json = serde_json::to_string(&record()).unwrap();
        assert!(!json.contains("evaluation"));
    }
}
