use serde::{Deserialize, Serialize};

/// One page of `GET project/{slug}/pipeline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelinePage {
    #[serde(default)]
    pub next_page_token: Option<String>,
    pub items: Vec<Pipeline>,
}

impl PipelinePage {
    /// The cursor for the following page, if the API handed one out.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub created_at: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub vcs: Vcs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub actor: Actor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vcs {
    #[serde(default)]
    pub revision: String,
}
