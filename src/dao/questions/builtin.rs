//! In-memory question bank used when no remote source is configured.

use std::sync::Arc;

use futures::future::{self, BoxFuture};
use rand::seq::SliceRandom;

use super::{Difficulty, QuestionSupplier, SupplierError, SupplierResult, shuffled_question};
use crate::state::game::Question;

/// One question of the bank with its answers in canonical order.
#[derive(Debug, Clone)]
pub struct BankEntry {
    pub difficulty: Difficulty,
    pub prompt: String,
    pub correct: String,
    pub incorrect: Vec<String>,
}

impl BankEntry {
    /// Convenience constructor taking string slices.
    pub fn new(difficulty: Difficulty, prompt: &str, correct: &str, incorrect: [&str; 3]) -> Self {
        Self {
            difficulty,
            prompt: prompt.to_string(),
            correct: correct.to_string(),
            incorrect: incorrect.iter().map(|answer| answer.to_string()).collect(),
        }
    }
}

/// Supplier drawing random questions from a fixed bank.
#[derive(Debug, Clone)]
pub struct BuiltinSupplier {
    bank: Arc<Vec<BankEntry>>,
}

impl BuiltinSupplier {
    /// Supplier backed by the bank shipped with the binary.
    pub fn new() -> Self {
        Self::with_bank(default_bank())
    }

    /// Supplier backed by a custom bank.
    pub fn with_bank(bank: Vec<BankEntry>) -> Self {
        Self {
            bank: Arc::new(bank),
        }
    }

    /// Pick `count` questions, preferring `difficulty` and topping up from the rest of the bank.
    pub fn pick(&self, count: usize, difficulty: Difficulty) -> SupplierResult<Vec<Question>> {
        if count > self.bank.len() {
            return Err(SupplierError::Exhausted {
                requested: count,
                available: self.bank.len(),
            });
        }

        let mut rng = rand::rng();
        let (mut preferred, mut others): (Vec<&BankEntry>, Vec<&BankEntry>) = self
            .bank
            .iter()
            .partition(|entry| entry.difficulty == difficulty);
        preferred.shuffle(&mut rng);
        others.shuffle(&mut rng);

        Ok(preferred
            .into_iter()
            .chain(others)
            .take(count)
            .map(|entry| {
                shuffled_question(
                    entry.prompt.clone(),
                    entry.correct.clone(),
                    entry.incorrect.clone(),
                    &mut rng,
                )
            })
            .collect())
    }
}

impl Default for BuiltinSupplier {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionSupplier for BuiltinSupplier {
    fn fetch(
        &self,
        count: usize,
        difficulty: Difficulty,
    ) -> BoxFuture<'static, SupplierResult<Vec<Question>>> {
        Box::pin(future::ready(self.pick(count, difficulty)))
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

fn default_bank() -> Vec<BankEntry> {
    use Difficulty::{Easy, Hard, Medium};

    vec![
        BankEntry::new(
            Easy,
            "What is the capital of France?",
            "Paris",
            ["London", "Berlin", "Madrid"],
        ),
        BankEntry::new(
            Easy,
            "Which planet is known as the Red Planet?",
            "Mars",
            ["Venus", "Jupiter", "Saturn"],
        ),
        BankEntry::new(
            Easy,
            "What is the largest mammal in the world?",
            "Blue Whale",
            ["African Elephant", "Giraffe", "Hippopotamus"],
        ),
        BankEntry::new(
            Easy,
            "Who painted the Mona Lisa?",
            "Leonardo da Vinci",
            ["Vincent van Gogh", "Pablo Picasso", "Michelangelo"],
        ),
        BankEntry::new(
            Easy,
            "What is the chemical symbol for gold?",
            "Au",
            ["Ag", "Fe", "Cu"],
        ),
        BankEntry::new(
            Easy,
            "How many continents are there on Earth?",
            "7",
            ["5", "6", "8"],
        ),
        BankEntry::new(
            Medium,
            "Which element has the atomic number 1?",
            "Hydrogen",
            ["Helium", "Oxygen", "Carbon"],
        ),
        BankEntry::new(
            Medium,
            "In which year did the Berlin Wall fall?",
            "1989",
            ["1987", "1991", "1985"],
        ),
        BankEntry::new(
            Medium,
            "What is the longest river in South America?",
            "Amazon",
            ["Paraná", "Orinoco", "São Francisco"],
        ),
        BankEntry::new(
            Medium,
            "Which composer wrote the opera 'The Magic Flute'?",
            "Wolfgang Amadeus Mozart",
            ["Ludwig van Beethoven", "Giuseppe Verdi", "Richard Wagner"],
        ),
        BankEntry::new(
            Hard,
            "What is the smallest prime number greater than 100?",
            "101",
            ["103", "107", "109"],
        ),
        BankEntry::new(
            Hard,
            "Which mathematician proved the incompleteness theorems?",
            "Kurt Gödel",
            ["David Hilbert", "Alan Turing", "Emmy Noether"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_requested_difficulty_first() {
        let supplier = BuiltinSupplier::new();
        let questions = supplier.pick(2, Difficulty::Hard).unwrap();
        assert_eq!(questions.len(), 2);
        let hard_prompts: Vec<String> = default_bank()
            .into_iter()
            .filter(|entry| entry.difficulty == Difficulty::Hard)
            .map(|entry| entry.prompt)
            .collect();
        for question in &questions {
            assert!(hard_prompts.contains(&question.prompt));
        }
    }

    #[test]
    fn tops_up_from_other_difficulties() {
        let supplier = BuiltinSupplier::new();
        let questions = supplier.pick(5, Difficulty::Hard).unwrap();
        assert_eq!(questions.len(), 5);
        for question in &questions {
            assert!(question.correct_index < question.options.len());
        }
    }

    #[test]
    fn asking_for_more_than_the_bank_fails() {
        let supplier = BuiltinSupplier::with_bank(vec![BankEntry::new(
            Difficulty::Easy,
            "What is the chemical symbol for gold?",
            "Au",
            ["Ag", "Fe", "Cu"],
        )]);
        assert!(matches!(
            supplier.pick(2, Difficulty::Easy).unwrap_err(),
            SupplierError::Exhausted {
                requested: 2,
                available: 1
            }
        ));
    }

    #[tokio::test]
    async fn fetch_resolves_immediately() {
        let supplier = BuiltinSupplier::new();
        let questions = supplier.fetch(5, Difficulty::Easy).await.unwrap();
        assert_eq!(questions.len(), 5);
        assert_ne!(supplier.name(), "");
    }
}
