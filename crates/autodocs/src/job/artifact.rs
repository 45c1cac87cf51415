use std::fmt;

use serde::{Deserialize, Serialize};

/// Substring every placeholder artifact contains. Used to find jobs that
/// were generated offline and can be reprocessed once a key is configured.
pub const PLACEHOLDER_MARKER: &str = "AutoDocs is ready to generate this artifact.";

/// The fixed set of documents produced for every job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Readme,
    ApiDocs,
    Uml,
    Tests,
    Architecture,
}

impl ArtifactKind {
    /// Generation order. Artifacts are independent, the order only keeps
    /// output stable.
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Readme,
        ArtifactKind::ApiDocs,
        ArtifactKind::Uml,
        ArtifactKind::Tests,
        ArtifactKind::Architecture,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ArtifactKind::Readme => "README",
            ArtifactKind::ApiDocs => "API Docs",
            ArtifactKind::Uml => "UML",
            ArtifactKind::Tests => "Tests",
            ArtifactKind::Architecture => "Architecture",
        }
    }

    /// Type tag stored on the artifact row and used as the file stem.
    pub fn type_tag(&self) -> &'static str {
        match self {
            ArtifactKind::Readme => "readme",
            ArtifactKind::ApiDocs => "api_docs",
            ArtifactKind::Uml => "uml",
            ArtifactKind::Tests => "tests",
            ArtifactKind::Architecture => "architecture",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.md", self.type_tag())
    }

    /// Task line sent to the provider for this artifact.
    pub fn instruction(&self) -> &'static str {
        match self {
            ArtifactKind::Readme => {
                "Write a concise README with setup instructions and a feature list."
            }
            ArtifactKind::ApiDocs => {
                "Produce REST API docs with endpoints, parameters, and responses."
            }
            ArtifactKind::Uml => "Describe a high-level UML diagram in Mermaid syntax.",
            ArtifactKind::Tests => "Suggest starter test cases covering the main user flows.",
            ArtifactKind::Architecture => "Summarize the architecture, queues, and data stores.",
        }
    }

    /// Offline stand-in used when no provider output is available.
    pub fn placeholder(&self) -> String {
        format!(
            "# {}\n{} Add an OPENAI_API_KEY and\nrestart the worker to see live AI output.",
            self.title(),
            PLACEHOLDER_MARKER
        )
    }

    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_tag() == tag)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}
