//! The read-only, ordered question catalog shared by every session. Loaded
//! once at process start; sessions only ever reference it by index.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the question file.
const DEFAULT_CATALOG_PATH: &str = "config/questions.json";
/// Environment variable that overrides [`DEFAULT_CATALOG_PATH`].
const CATALOG_PATH_ENV: &str = "MINI_MADNESS_QUESTIONS_PATH";

/// One multiple-choice question.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Question {
    /// The text shown on every display.
    pub prompt: String,
    /// The options a player can pick from.
    pub options: Vec<String>,
    /// The correct option; must be one of `options`.
    pub correct: String,
}

impl Question {
    fn is_well_formed(&self) -> bool {
        !self.prompt.trim().is_empty()
            && self.options.len() >= 2
            && self.options.contains(&self.correct)
    }
}

/// Ordered catalog of questions for the whole process lifetime.
#[derive(Debug, Clone)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// Load the catalog from disk, dropping malformed entries, falling back
    /// to the built-in set when the file is absent, unreadable, or empty
    /// after filtering.
    pub fn load() -> Self {
        let path = resolve_catalog_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Vec<Question>>(&contents) {
                Ok(raw) => {
                    let catalog = Self::from_questions(raw);
                    if catalog.is_empty() {
                        warn!(
                            path = %path.display(),
                            "question file held no usable questions; using built-in set"
                        );
                        return Self::builtin();
                    }
                    info!(
                        path = %path.display(),
                        count = catalog.len(),
                        "loaded question catalog"
                    );
                    catalog
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse question file; using built-in set"
                    );
                    Self::builtin()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "question file not found; using built-in set"
                );
                Self::builtin()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read question file; using built-in set"
                );
                Self::builtin()
            }
        }
    }

    /// Build a catalog from explicit questions, keeping only well-formed ones.
    pub fn from_questions(questions: Vec<Question>) -> Self {
        let questions = questions
            .into_iter()
            .filter(|q| {
                let ok = q.is_well_formed();
                if !ok {
                    warn!(prompt = %q.prompt, "dropping malformed question");
                }
                ok
            })
            .collect();
        Self { questions }
    }

    /// The catalog shipped with the binary.
    pub fn builtin() -> Self {
        Self {
            questions: builtin_questions(),
        }
    }

    /// Number of questions in the catalog.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the catalog holds no questions at all.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Look up a question by round index.
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Whether a round with `index` would be the last one.
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 >= self.questions.len()
    }
}

/// Resolve the catalog path taking the environment override into account.
fn resolve_catalog_path() -> PathBuf {
    env::var_os(CATALOG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH))
}

fn q(prompt: &str, options: [&str; 4], correct: &str) -> Question {
    Question {
        prompt: prompt.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct: correct.to_string(),
    }
}

/// Gaming trivia shipped with the binary.
fn builtin_questions() -> Vec<Question> {
    vec![
        q(
            "Which company created the original Game Boy?",
            ["Sega", "Nintendo", "Atari", "Sony"],
            "Nintendo",
        ),
        q(
            "What is the best-selling video game of all time?",
            ["Tetris", "Minecraft", "GTA V", "Wii Sports"],
            "Minecraft",
        ),
        q(
            "In which game do players fight over the Iron Throne... of loot llamas?",
            ["Apex Legends", "PUBG", "Fortnite", "Warzone"],
            "Fortnite",
        ),
        q(
            "Which plumber first appeared in Donkey Kong?",
            ["Luigi", "Wario", "Mario", "Toad"],
            "Mario",
        ),
        q(
            "What currency do you mine in Minecraft to craft the strongest pre-Netherite tools?",
            ["Gold", "Iron", "Emerald", "Diamond"],
            "Diamond",
        ),
        q(
            "Which studio developed The Witcher 3?",
            ["Ubisoft", "CD Projekt Red", "Bethesda", "BioWare"],
            "CD Projekt Red",
        ),
        q(
            "What color is Sonic the Hedgehog?",
            ["Red", "Green", "Blue", "Yellow"],
            "Blue",
        ),
        q(
            "Which of these is NOT a Pokémon starter type?",
            ["Fire", "Water", "Grass", "Electric"],
            "Electric",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_well_formed() {
        let catalog = QuestionCatalog::builtin();
        assert!(!catalog.is_empty());
        for index in 0..catalog.len() {
            let question = catalog.question(index).unwrap();
            assert!(question.options.contains(&question.correct));
        }
        assert!(catalog.is_last(catalog.len() - 1));
        assert!(!catalog.is_last(0));
    }

    #[test]
    fn malformed_questions_are_dropped() {
        let catalog = QuestionCatalog::from_questions(vec![
            q("ok", ["a", "b", "c", "d"], "a"),
            Question {
                prompt: "correct option missing".into(),
                options: vec!["a".into(), "b".into()],
                correct: "z".into(),
            },
        ]);
        assert_eq!(catalog.len(), 1);
    }
}
