//! Optional web-search augmentation of the outbound turn sequence.
//!
//! Augmentation only shapes the request for the current submission. The
//! visible transcript receives a short marker turn instead of the injected
//! search content.

use chat_provider::{SearchFailure, SearchHit, SearchProvider};
use tracing::{debug, warn};

use crate::turn::Turn;

/// Longest query sent to the search provider, in characters.
pub const MAX_QUERY_CHARS: usize = 200;

const SEARCH_DIRECTIVE: &str = "Web search results for the user's latest message follow in the next system message. Use them when they are relevant, prefer them over older knowledge for recent events, and cite the source URL when you rely on one. Ignore results that do not help answer the question.";

/// Whether marker turns from earlier searches are sent back to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerPolicy {
    /// Markers stay visible to the user but are dropped from outbound requests.
    #[default]
    Exclude,
    /// Markers are sent as ordinary system turns.
    Forward,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AugmentationConfig {
    pub enabled: bool,
    pub marker_policy: MarkerPolicy,
}

/// What the augmentation stage did for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AugmentOutcome {
    Disabled,
    /// Search succeeded and `hits` results were injected.
    Applied { query: String, hits: usize },
    /// Search succeeded without results; nothing was injected.
    NoResults { query: String },
    /// Search failed; the request goes out unaugmented.
    Failed { query: String, failure: SearchFailure },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmented {
    pub final_turns: Vec<Turn>,
    pub outcome: AugmentOutcome,
}

impl Augmented {
    fn identity(turns: &[Turn], outcome: AugmentOutcome) -> Self {
        Self {
            final_turns: turns.to_vec(),
            outcome,
        }
    }

    /// Marker turn to record in the visible transcript, when search was applied.
    #[must_use]
    pub fn marker(&self) -> Option<Turn> {
        match &self.outcome {
            AugmentOutcome::Applied { query, .. } => Some(Turn::search_marker(query)),
            _ => None,
        }
    }
}

/// Turns of a transcript that are sent to the model under `policy`.
#[must_use]
pub fn outbound_turns(transcript: &[Turn], policy: MarkerPolicy) -> Vec<Turn> {
    transcript
        .iter()
        .filter(|turn| policy == MarkerPolicy::Forward || !turn.augmented)
        .cloned()
        .collect()
}

/// Search query derived from the user's text: whitespace collapsed, length capped.
#[must_use]
pub fn search_query(latest_user_text: &str) -> String {
    latest_user_text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_QUERY_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Returns the turn sequence to send for the current submission.
///
/// Disabled, empty queries, empty results and search failures all yield
/// `turns` unchanged. On success a directive turn and a context turn are
/// spliced in immediately before the final user turn.
pub fn augment(
    config: &AugmentationConfig,
    turns: &[Turn],
    latest_user_text: &str,
    search: Option<&dyn SearchProvider>,
) -> Augmented {
    if !config.enabled {
        return Augmented::identity(turns, AugmentOutcome::Disabled);
    }

    let query = search_query(latest_user_text);
    if query.is_empty() {
        return Augmented::identity(turns, AugmentOutcome::Disabled);
    }

    let Some(search) = search else {
        let failure = SearchFailure::new("web search is not configured");
        warn!(query = %query, "augmentation enabled without a search provider");
        return Augmented::identity(turns, AugmentOutcome::Failed { query, failure });
    };

    match search.search(&query) {
        Ok(hits) if hits.is_empty() => {
            debug!(query = %query, "web search returned no results");
            Augmented::identity(turns, AugmentOutcome::NoResults { query })
        }
        Ok(hits) => {
            let count = hits.len();
            let final_turns = splice_before_last_user(
                turns,
                [Turn::system(SEARCH_DIRECTIVE), context_turn(&query, &hits)],
            );
            debug!(query = %query, hits = count, "augmented request with web search");
            Augmented {
                final_turns,
                outcome: AugmentOutcome::Applied { query, hits: count },
            }
        }
        Err(failure) => {
            warn!(query = %query, error = %failure, "web search failed, sending unaugmented request");
            Augmented::identity(turns, AugmentOutcome::Failed { query, failure })
        }
    }
}

fn context_turn(query: &str, hits: &[SearchHit]) -> Turn {
    let mut content = format!("Search results for \"{query}\":");
    for (index, hit) in hits.iter().enumerate() {
        content.push_str(&format!("\n\n[{}] {}", index + 1, hit.title.trim()));
        if let Some(url) = hit.url.as_deref() {
            content.push_str(&format!("\n{url}"));
        }
        let snippet = hit.snippet.trim();
        if !snippet.is_empty() {
            content.push('\n');
            content.push_str(snippet);
        }
    }
    Turn::system(content)
}

fn splice_before_last_user<const N: usize>(turns: &[Turn], extra: [Turn; N]) -> Vec<Turn> {
    let position = turns
        .iter()
        .rposition(|turn| turn.role == chat_provider::Role::User)
        .unwrap_or(turns.len());

    let mut spliced = Vec::with_capacity(turns.len() + N);
    spliced.extend_from_slice(&turns[..position]);
    spliced.extend(extra);
    spliced.extend_from_slice(&turns[position..]);
    spliced
}

#[cfg(test)]
mod tests {
    use chat_provider::Role;
    use chat_provider_mock::MockSearchProvider;
    use pretty_assertions::assert_eq;

    use super::*;

    fn enabled() -> AugmentationConfig {
        AugmentationConfig {
            enabled: true,
            marker_policy: MarkerPolicy::Exclude,
        }
    }

    fn conversation() -> Vec<Turn> {
        vec![
            Turn::user("earlier question"),
            Turn::assistant("earlier answer"),
            Turn::user("what changed in rust 1.80?"),
        ]
    }

    fn hit(title: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            snippet: format!("{title} snippet"),
            url: Some(format!("https://example.com/{title}")),
        }
    }

    #[test]
    fn disabled_is_identity_and_skips_search() {
        let search = MockSearchProvider::new();

        let result = augment(
            &AugmentationConfig::default(),
            &conversation(),
            "what changed in rust 1.80?",
            Some(&search),
        );

        assert_eq!(result.final_turns, conversation());
        assert_eq!(result.outcome, AugmentOutcome::Disabled);
        assert!(search.queries().is_empty());
        assert_eq!(result.marker(), None);
    }

    #[test]
    fn success_splices_directive_and_context_before_final_user_turn() {
        let search = MockSearchProvider::new();
        search.push_hits(vec![hit("release-notes"), hit("blog")]);

        let result = augment(&enabled(), &conversation(), "what changed in rust 1.80?", Some(&search));

        let roles: Vec<Role> = result.final_turns.iter().map(|turn| turn.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::System, Role::System, Role::User]
        );
        assert_eq!(result.final_turns[2].content, SEARCH_DIRECTIVE);
        assert!(result.final_turns[3].content.contains("[1] release-notes"));
        assert!(result.final_turns[3].content.contains("https://example.com/blog"));
        assert_eq!(result.final_turns[4], Turn::user("what changed in rust 1.80?"));
        assert_eq!(
            result.marker(),
            Some(Turn::search_marker("what changed in rust 1.80?"))
        );
        assert_eq!(search.queries(), vec!["what changed in rust 1.80?".to_string()]);
    }

    #[test]
    fn failure_falls_back_to_identity() {
        let search = MockSearchProvider::new();
        search.push_failure(SearchFailure::new("timed out"));

        let result = augment(&enabled(), &conversation(), "what changed in rust 1.80?", Some(&search));

        assert_eq!(result.final_turns, conversation());
        assert!(matches!(
            result.outcome,
            AugmentOutcome::Failed { ref failure, .. } if failure.message() == "timed out"
        ));
        assert_eq!(result.marker(), None);
    }

    #[test]
    fn missing_provider_is_reported_as_failure() {
        let result = augment(&enabled(), &conversation(), "question", None);

        assert_eq!(result.final_turns, conversation());
        assert!(matches!(result.outcome, AugmentOutcome::Failed { .. }));
    }

    #[test]
    fn empty_results_inject_nothing() {
        let search = MockSearchProvider::new();
        search.push_hits(Vec::new());

        let result = augment(&enabled(), &conversation(), "obscure", Some(&search));

        assert_eq!(result.final_turns, conversation());
        assert_eq!(
            result.outcome,
            AugmentOutcome::NoResults {
                query: "obscure".to_string()
            }
        );
    }

    #[test]
    fn input_turns_are_not_mutated() {
        let turns = conversation();
        let search = MockSearchProvider::new();

        let _ = augment(&enabled(), &turns, "q", Some(&search));

        assert_eq!(turns, conversation());
    }

    #[test]
    fn outbound_turns_follow_marker_policy() {
        let transcript = vec![
            Turn::user("q"),
            Turn::search_marker("q"),
            Turn::assistant("a"),
            Turn::user("follow-up"),
        ];

        assert_eq!(
            outbound_turns(&transcript, MarkerPolicy::Exclude),
            vec![Turn::user("q"), Turn::assistant("a"), Turn::user("follow-up")]
        );
        assert_eq!(outbound_turns(&transcript, MarkerPolicy::Forward), transcript);
    }

    #[test]
    fn query_collapses_whitespace_and_is_capped() {
        assert_eq!(search_query("  rust \n\t async  traits "), "rust async traits");

        let long = "word ".repeat(100);
        let query = search_query(&long);
        assert!(query.chars().count() <= MAX_QUERY_CHARS);
        assert!(!query.ends_with(' '));
    }
}
