// Shared input buffer and the add/edit mode it feeds

/// What the input buffer currently feeds into
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Buffer text becomes a new task on submit
    #[default]
    Composing,
    /// Buffer text replaces the text of the task with this id on submit
    Editing(String),
}

impl InputMode {
    pub fn is_editing(&self) -> bool {
        matches!(self, InputMode::Editing(_))
    }

    /// Id of the task under edit, if any
    pub fn editing_id(&self) -> Option<&str> {
        match self {
            InputMode::Editing(id) => Some(id),
            InputMode::Composing => None,
        }
    }
}

/// Text buffer shared between adding and editing
///
/// Transitions:
/// - `Composing` -> `Editing(id)` via [`begin_edit`](Self::begin_edit)
/// - `Editing(id)` -> `Editing(other)` via another `begin_edit`
/// - any -> `Composing` via [`reset`](Self::reset)
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    text: String,
    mode: InputMode,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    /// Replace the buffer contents without touching the mode
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Trimmed buffer contents, or `None` when only whitespace is left
    pub fn trimmed(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Clear the text but stay in the current mode
    pub fn clear_text(&mut self) {
        self.text.clear();
    }

    /// Point the buffer at a task and preload its text
    pub fn begin_edit(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.mode = InputMode::Editing(id.into());
        self.text = text.into();
    }

    /// Back to composing with an empty buffer
    pub fn reset(&mut self) {
        self.mode = InputMode::Composing;
        self.text.clear();
    }
}
