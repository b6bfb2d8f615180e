use async_trait::async_trait;
use grid_types::OptionValue;

/// Picks a category option for a task name.
///
/// Lives behind the backend: clients only see its result through
/// `add_task_with_category` and `suggest_category`.
#[async_trait]
pub trait CategorySuggester: Send + Sync {
    /// Name of one of `options`, or `None` when nothing fits.
    async fn suggest(&self, task_name: &str, options: &[OptionValue]) -> Option<String>;
}

/// Never suggests anything.
pub struct NullSuggester;

#[async_trait]
impl CategorySuggester for NullSuggester {
    async fn suggest(&self, _task_name: &str, _options: &[OptionValue]) -> Option<String> {
        None
    }
}

/// Lexical baseline: scores each option by how many task-name words appear in its
/// name or context. Ties go to the earlier option.
pub struct KeywordSuggester;

impl KeywordSuggester {
    fn words(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 2)
            .map(str::to_lowercase)
            .collect()
    }

    fn related(a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        // crude stemming: "write"/"writing", "report"/"reports"
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        let n = short.chars().count();
        if n < 4 {
            return false;
        }
        let stem: String = short.chars().take(n - 1).collect();
        long.starts_with(&stem)
    }

    fn score(task_words: &[String], option: &OptionValue) -> usize {
        let mut vocab = Self::words(option.name());
        vocab.extend(Self::words(option.context()));
        task_words
            .iter()
            .filter(|w| vocab.iter().any(|v| Self::related(w, v)))
            .count()
    }
}

#[async_trait]
impl CategorySuggester for KeywordSuggester {
    async fn suggest(&self, task_name: &str, options: &[OptionValue]) -> Option<String> {
        let task_words = Self::words(task_name);
        let mut best: Option<(&OptionValue, usize)> = None;
        for option in options {
            let score = Self::score(&task_words, option);
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((option, score));
            }
        }
        best.map(|(o, _)| o.name().to_string())
    }
}
