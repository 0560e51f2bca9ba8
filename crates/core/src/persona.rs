//! Persona — the represented person and the system prompt built around them.
//!
//! Two optional context documents feed the prompt:
//!
//! 1. **Summary** — a short plain-text biography
//! 2. **Profile** — longer profile text (e.g. an exported professional profile,
//!    already converted to text)
//!
//! Both are read once at startup. A missing or unreadable file becomes an
//! empty section and a warning, never an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where to find the persona's context documents.
#[derive(Debug, Clone, Default)]
pub struct PersonaPaths {
    pub summary: Option<PathBuf>,
    pub profile: Option<PathBuf>,
}

/// The represented person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Full name the assistant speaks as
    pub name: String,

    /// Plain-text summary
    #[serde(default)]
    pub summary: String,

    /// Profile text
    #[serde(default)]
    pub profile: String,
}

impl Persona {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: String::new(),
            profile: String::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Load the context documents for `name`.
    pub fn load(name: impl Into<String>, paths: &PersonaPaths) -> Self {
        let summary = paths
            .summary
            .as_deref()
            .map(Self::read_or_empty)
            .unwrap_or_default();
        let profile = paths
            .profile
            .as_deref()
            .map(Self::read_or_empty)
            .unwrap_or_default();

        let persona = Self {
            name: name.into(),
            summary,
            profile,
        };
        debug!(
            persona = %persona.name,
            summary_len = persona.summary.len(),
            profile_len = persona.profile.len(),
            "Persona loaded"
        );
        persona
    }

    fn read_or_empty(path: &Path) -> String {
        match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Persona context unavailable, using empty text");
                String::new()
            }
        }
    }

    /// Render the system prompt.
    ///
    /// The STEPS section encodes the contact policy: try to collect name and
    /// email with the question first, and only log the bare question if the
    /// visitor declines.
    pub fn system_prompt(&self) -> String {
        let name = &self.name;
        let mut prompt = String::with_capacity(2048 + self.summary.len() + self.profile.len());

        prompt.push_str("<task>\n");
        prompt.push_str(&format!(
            "You are acting as {name}. You answer questions on {name}'s website, \
             particularly questions about {name}'s career, background, skills and experience.\n"
        ));
        prompt.push_str(&format!(
            "Your responsibility is to represent {name} as faithfully as possible. \
             You are given a summary and a profile of {name} to draw on.\n"
        ));
        prompt.push_str(
            "Never invent answers you do not know. When you cannot answer, follow the steps below.\n",
        );
        prompt.push_str(
            "Keep a professional and engaging tone, as if talking to a potential client or employer.\n",
        );
        prompt.push_str("</task>\n\n");

        prompt.push_str("<steps>\n");
        prompt.push_str(
            "Step 1. Ask the user for their name and email, then send them together with the \
             question using `record_user_details`. Always try this step first.\n",
        );
        prompt.push_str(
            "Step 2. ONLY if the user declines to share their details, use \
             `record_unknown_question` to record just the question. Then tell the user the \
             question was passed on, but without their details there is no way to get back \
             to them.\n",
        );
        prompt.push_str("</steps>\n\n");

        prompt.push_str("<summary>\n");
        prompt.push_str(self.summary.trim());
        prompt.push_str("\n</summary>\n\n");

        prompt.push_str("<profile>\n");
        prompt.push_str(self.profile.trim());
        prompt.push_str("\n</profile>\n\n");

        prompt.push_str(&format!(
            "With this context, chat with the user, always staying in character as {name}."
        ));
        prompt
    }

    /// Estimate the token count of the system prompt (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.system_prompt().len() / 4
    }
}
