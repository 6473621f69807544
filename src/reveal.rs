//! Incremental disclosure of a finished reply.
//!
//! Every [`Revealer::reveal`] call bumps a generation counter. Scheduled
//! steps carry the generation they were scheduled for; a step whose
//! generation is no longer current is a no-op, so a superseded reveal can
//! never write into the display again.

/// Identifier of one reveal. Strictly increasing per [`Revealer`].
pub type Generation = u64;

/// Characters disclosed per step unless configured otherwise.
pub const DEFAULT_CHUNK_CHARS: usize = 4;

/// Finite sequence of growing prefixes of a text, ending with the full text.
///
/// Chunks always end on `char` boundaries. An empty text yields a single
/// empty prefix. The sequence cannot be restarted once consumed.
#[derive(Debug, Clone)]
pub struct Reveal {
    text: String,
    cursor: usize,
    chunk_chars: usize,
    done: bool,
}

impl Reveal {
    #[must_use]
    pub fn new(text: impl Into<String>, chunk_chars: usize) -> Self {
        Self {
            text: text.into(),
            cursor: 0,
            chunk_chars: chunk_chars.max(1),
            done: false,
        }
    }

    #[must_use]
    pub fn full_text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.done
    }
}

impl Iterator for Reveal {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.cursor = self.text[self.cursor..]
            .char_indices()
            .nth(self.chunk_chars)
            .map_or(self.text.len(), |(offset, _)| self.cursor + offset);
        self.done = self.cursor == self.text.len();
        Some(self.text[..self.cursor].to_string())
    }
}

/// Result of delivering one scheduled step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// The step belongs to a superseded or cancelled reveal.
    Stale,
    /// More text is visible; schedule another step.
    Partial(String),
    /// The full text is visible and the revealer is idle again.
    Complete(String),
}

#[derive(Debug)]
struct ActiveReveal {
    generation: Generation,
    reveal: Reveal,
    visible: String,
}

/// `Idle -> Revealing -> Idle` state machine guarded by generations.
#[derive(Debug)]
pub struct Revealer {
    generation: Generation,
    chunk_chars: usize,
    active: Option<ActiveReveal>,
}

impl Default for Revealer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_CHARS)
    }
}

impl Revealer {
    #[must_use]
    pub fn new(chunk_chars: usize) -> Self {
        Self {
            generation: 0,
            chunk_chars: chunk_chars.max(1),
            active: None,
        }
    }

    /// Starts revealing `text`, superseding any reveal in progress.
    pub fn reveal(&mut self, text: impl Into<String>) -> Generation {
        self.generation += 1;
        self.active = Some(ActiveReveal {
            generation: self.generation,
            reveal: Reveal::new(text, self.chunk_chars),
            visible: String::new(),
        });
        self.generation
    }

    /// Advances the reveal scheduled as `generation`.
    pub fn step(&mut self, generation: Generation) -> RevealStep {
        let Some(active) = self
            .active
            .as_mut()
            .filter(|active| active.generation == generation)
        else {
            return RevealStep::Stale;
        };

        let Some(prefix) = active.reveal.next() else {
            self.active = None;
            return RevealStep::Stale;
        };

        if active.reveal.is_finished() {
            self.active = None;
            RevealStep::Complete(prefix)
        } else {
            active.visible.clone_from(&prefix);
            RevealStep::Partial(prefix)
        }
    }

    /// Abandons the reveal in progress. Pending steps become stale.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.active = None;
    }

    #[must_use]
    pub fn is_revealing(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn current_generation(&self) -> Option<Generation> {
        self.active.as_ref().map(|active| active.generation)
    }

    /// Text disclosed so far by the reveal in progress.
    #[must_use]
    pub fn visible_text(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.visible.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(revealer: &mut Revealer, generation: Generation) -> Vec<RevealStep> {
        let mut steps = Vec::new();
        loop {
            let step = revealer.step(generation);
            let finished = !matches!(step, RevealStep::Partial(_));
            steps.push(step);
            if finished {
                return steps;
            }
        }
    }

    #[test]
    fn reveal_yields_growing_prefixes_ending_with_full_text() {
        let prefixes: Vec<String> = Reveal::new("hello world", 4).collect();

        assert_eq!(prefixes, vec!["hell", "hello wo", "hello world"]);
    }

    #[test]
    fn reveal_respects_char_boundaries() {
        let prefixes: Vec<String> = Reveal::new("héllo→ok", 2).collect();

        assert_eq!(prefixes, vec!["hé", "héll", "héllo→", "héllo→ok"]);
    }

    #[test]
    fn empty_reveal_yields_one_empty_prefix() {
        let mut reveal = Reveal::new("", 4);

        assert_eq!(reveal.next().as_deref(), Some(""));
        assert!(reveal.is_finished());
        assert_eq!(reveal.next(), None);
    }

    #[test]
    fn revealer_returns_to_idle_after_completion() {
        let mut revealer = Revealer::new(3);
        let generation = revealer.reveal("abcdefg");

        let steps = drive(&mut revealer, generation);

        assert_eq!(
            steps,
            vec![
                RevealStep::Partial("abc".to_string()),
                RevealStep::Partial("abcdef".to_string()),
                RevealStep::Complete("abcdefg".to_string()),
            ]
        );
        assert!(!revealer.is_revealing());
        assert_eq!(revealer.step(generation), RevealStep::Stale);
    }

    #[test]
    fn new_reveal_supersedes_old_generation() {
        let mut revealer = Revealer::new(2);
        let first = revealer.reveal("AAAAAAAA");
        assert_eq!(revealer.step(first), RevealStep::Partial("AA".to_string()));

        let second = revealer.reveal("bbbb");
        assert!(second > first);

        assert_eq!(revealer.step(first), RevealStep::Stale);
        assert_eq!(revealer.visible_text(), Some(""));
        let steps = drive(&mut revealer, second);
        assert_eq!(steps.last(), Some(&RevealStep::Complete("bbbb".to_string())));
        assert_eq!(revealer.step(first), RevealStep::Stale);
    }

    #[test]
    fn cancel_makes_pending_steps_stale() {
        let mut revealer = Revealer::default();
        let generation = revealer.reveal("some reply text");

        revealer.cancel();

        assert_eq!(revealer.step(generation), RevealStep::Stale);
        assert_eq!(revealer.visible_text(), None);
    }
}
