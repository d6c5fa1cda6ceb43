/// Intro / outro text sequences.
///
/// A sequence walks `Title → Prompt → Message(0) → … → Message(n-1) → Done`,
/// spending `step_ms` in each state. `skip()` jumps to the next state at
/// once. The outro starts directly at the messages.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SeqState {
    Title,
    Prompt,
    Message(usize),
    Done,
}

#[derive(Clone, Debug)]
pub struct Sequence {
    state: SeqState,
    elapsed_ms: u32,
    step_ms: u32,
    title: String,
    prompt: String,
    messages: Vec<String>,
}

pub const TITLE: &str = "S T A I R W E L L";
pub const PROMPT: &str = "arrows move   Z undo   R reset   Enter to begin";

impl Sequence {
    /// Title, controls prompt, then the level name.
    pub fn intro(level_name: &str, step_ms: u32) -> Self {
        Sequence {
            state: SeqState::Title,
            elapsed_ms: 0,
            step_ms,
            title: TITLE.to_string(),
            prompt: PROMPT.to_string(),
            messages: vec![level_name.to_string()],
        }
    }

    pub fn outro(step_ms: u32) -> Self {
        let messages = vec![
            "The stairs end here.".to_string(),
            "Back to the top.".to_string(),
        ];
        Sequence {
            state: SeqState::Message(0),
            elapsed_ms: 0,
            step_ms,
            title: String::new(),
            prompt: String::new(),
            messages,
        }
    }

    /// A sequence that is already over.
    pub fn finished() -> Self {
        Sequence {
            state: SeqState::Done,
            elapsed_ms: 0,
            step_ms: 0,
            title: String::new(),
            prompt: String::new(),
            messages: vec![],
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> SeqState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == SeqState::Done
    }

    /// Advance by `dt_ms`. A long frame may cross several states.
    pub fn update(&mut self, dt_ms: u32) {
        if self.is_done() {
            return;
        }
        self.elapsed_ms += dt_ms;
        while !self.is_done() && self.elapsed_ms >= self.step_ms {
            self.elapsed_ms -= self.step_ms;
            self.state = self.next_state();
        }
    }

    pub fn skip(&mut self) {
        self.elapsed_ms = 0;
        self.state = self.next_state();
    }

    /// Text to draw for the current state.
    pub fn text(&self) -> Option<&str> {
        match self.state {
            SeqState::Title => Some(&self.title),
            SeqState::Prompt => Some(&self.prompt),
            SeqState::Message(n) => self.messages.get(n).map(String::as_str),
            SeqState::Done => None,
        }
    }

    fn next_state(&self) -> SeqState {
        let first_message = if self.messages.is_empty() { SeqState::Done } else { SeqState::Message(0) };
        match self.state {
            SeqState::Title => SeqState::Prompt,
            SeqState::Prompt => first_message,
            SeqState::Message(n) if n + 1 < self.messages.len() => SeqState::Message(n + 1),
            SeqState::Message(_) | SeqState::Done => SeqState::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intro_walks_all_states() {
        let mut s = Sequence::intro("Descent", 100);
        assert_eq!(s.state(), SeqState::Title);
        assert_eq!(s.text(), Some(TITLE));
        s.update(99);
        assert_eq!(s.state(), SeqState::Title);
        s.update(1);
        assert_eq!(s.state(), SeqState::Prompt);
        s.update(100);
        assert_eq!(s.state(), SeqState::Message(0));
        assert_eq!(s.text(), Some("Descent"));
        s.update(100);
        assert!(s.is_done());
        assert_eq!(s.text(), None);
    }

    #[test]
    fn long_frame_crosses_several_states() {
        let mut s = Sequence::intro("x", 100);
        s.update(250);
        assert_eq!(s.state(), SeqState::Message(0));
        s.update(10_000);
        assert!(s.is_done());
    }

    #[test]
    fn skip_jumps_one_state() {
        let mut s = Sequence::intro("x", 1000);
        s.update(900);
        s.skip();
        assert_eq!(s.state(), SeqState::Prompt);
        // elapsed time restarts after a skip
        s.update(900);
        assert_eq!(s.state(), SeqState::Prompt);
    }

    #[test]
    fn outro_starts_at_messages() {
        let mut s = Sequence::outro(50);
        assert_eq!(s.state(), SeqState::Message(0));
        s.skip();
        assert_eq!(s.state(), SeqState::Message(1));
        s.skip();
        assert!(s.is_done());
        s.skip();
        assert!(s.is_done());
    }
}
