use std::fs;
use std::path::Path;

use anyhow::Context;
use duel::{MemoryBank, Question};

/// Loads a question bank from a JSON file holding an array of questions:
///
/// ```json
/// [{"id": 1, "subject": "math", "difficulty": "medium",
///   "statement": "2 + 2 = ?",
///   "options": [{"key": "a", "text": "3"}, {"key": "b", "text": "4"}],
///   "correctOption": "b", "resolution": "count on your fingers"}]
/// ```
pub fn load(path: &Path) -> anyhow::Result<MemoryBank> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading question bank {}", path.display()))?;
    let questions: Vec<Question> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing question bank {}", path.display()))?;
    anyhow::ensure!(
        !questions.is_empty(),
        "question bank {} is empty",
        path.display()
    );
    Ok(MemoryBank::new(questions))
}
