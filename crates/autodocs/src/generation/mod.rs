//! Artifact content generation.

pub mod context;
pub mod offline;
pub mod strategy;

pub use context::{extract_context, CONTEXT_CHAR_CAP, ENTRY_PREVIEW_CHARS, MAX_ENTRIES};
pub use strategy::GenerationStrategy;

use crate::config::RouteEntry;
use crate::job::ArtifactKind;
use crate::provider::{build_prompt, ProviderError};

/// Content produced for one artifact kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub content: String,
}

/// Produces content for all five artifact kinds.
///
/// Only a rate limit (any path) or a direct-call failure is returned as an
/// error; client-path failures degrade the affected artifact to its
/// placeholder.
pub fn generate_all(
    strategy: &GenerationStrategy,
    context: &str,
    routes: &[RouteEntry],
) -> Result<Vec<GeneratedArtifact>, ProviderError> {
    let mut out = Vec::with_capacity(ArtifactKind::ALL.len());

    for kind in ArtifactKind::ALL {
        let content = match strategy {
            GenerationStrategy::Offline => offline::render(kind, routes),
            GenerationStrategy::Placeholder => kind.placeholder(),
            GenerationStrategy::Client(client) => {
                let prompt = build_prompt(context, kind.instruction());
                match client.complete(&prompt) {
                    Ok(text) => text,
                    Err(e) if e.is_rate_limited() => return Err(e),
                    Err(e) => {
                        tracing::warn!(artifact = kind.type_tag(), error = %e, "Provider call failed, using placeholder");
                        kind.placeholder()
                    }
                }
            }
            GenerationStrategy::Direct(caller) => {
                let prompt = build_prompt(context, kind.instruction());
                caller.complete(&prompt)?
            }
        };

        out.push(GeneratedArtifact { kind, content });
    }

    Ok(out)
}
