//! Caption text for the capsule video.

/// Maps detected labels to a newline-delimited caption. Must be total.
pub trait NarrativeBuilder: Send + Sync {
    fn build(&self, labels: &[String]) -> String;
}

/// Fixed-template captions.
#[derive(Debug, Clone)]
pub struct TemplateNarrator {
    /// Caption used when nothing was detected.
    pub generic: Vec<String>,
    /// Lines appended after the focus line when labels exist.
    pub closing: Vec<String>,
    /// Maximum number of labels named in the focus line.
    pub max_labels: usize,
}

impl Default for TemplateNarrator {
    fn default() -> Self {
        Self {
            generic: vec![
                "Natural light, true colors.".into(),
                "The style stays exactly as shot.".into(),
                "Ready for your feed.".into(),
            ],
            closing: vec![
                "Details that catch the light.".into(),
                "Worn your way, every day.".into(),
            ],
            max_labels: 3,
        }
    }
}

impl NarrativeBuilder for TemplateNarrator {
    fn build(&self, labels: &[String]) -> String {
        let named: Vec<&str> = labels
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .take(self.max_labels)
            .collect();

        if named.is_empty() {
            return self.generic.join("\n");
        }

        let mut lines = Vec::with_capacity(self.closing.len() + 1);
        lines.push(format!("Focus: {}", named.join(", ")));
        lines.extend(self.closing.iter().cloned());
        lines.join("\n")
    }
}
