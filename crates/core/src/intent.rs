use crate::models::Intent;

impl Intent {
    /// Normalize a raw classifier label into the closed intent set.
    ///
    /// Trims and lowercases before matching; anything outside
    /// {joke, fact, advice} collapses to `General`. Total — malformed model
    /// output is coerced, never rejected.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "joke" => Self::Joke,
            "fact" => Self::Fact,
            "advice" => Self::Advice,
            _ => Self::General,
        }
    }
}
