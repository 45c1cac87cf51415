//! Deterministic documents rendered from the route manifest.
//!
//! Used in safe mode. Output depends only on the manifest, so repeated runs
//! over the same manifest produce identical artifacts.

use std::fmt::Write;

use crate::config::RouteEntry;
use crate::job::ArtifactKind;

pub fn render(kind: ArtifactKind, routes: &[RouteEntry]) -> String {
    match kind {
        ArtifactKind::Readme => readme(routes),
        ArtifactKind::ApiDocs => api_docs(routes),
        ArtifactKind::Uml => uml(routes),
        ArtifactKind::Tests => test_cases(routes),
        ArtifactKind::Architecture => architecture(routes),
    }
}

fn readme(routes: &[RouteEntry]) -> String {
    let mut out = String::from(
        "# README\n\n\
         AutoDocs turns an uploaded code archive into developer documentation: \
         a README, API docs, a UML sketch, starter tests and an architecture summary.\n\n\
         ## Setup\n\n\
         1. Configure `uploadsDir`, `artifactsDir` and `databasePath`.\n\
         2. Set `OPENAI_API_KEY` to enable live generation, or `SAFE_MODE=true` to stay offline.\n\
         3. Start the worker and upload an archive.\n\n\
         ## Features\n\n",
    );
    for route in routes {
        let _ = writeln!(out, "- {}", route.summary.trim_end_matches('.'));
    }
    out
}

fn api_docs(routes: &[RouteEntry]) -> String {
    let mut out = String::from("# API Docs\n");
    for route in routes {
        let _ = write!(out, "\n## {} {}\n\n{}\n", route.method, route.path, route.summary);
        let params = path_params(&route.path);
        if !params.is_empty() {
            out.push_str("\nParameters:\n");
            for p in params {
                let _ = writeln!(out, "- `{}` (path)", p);
            }
        }
    }
    out
}

fn uml(routes: &[RouteEntry]) -> String {
    let mut out = String::from("# UML\n\n```mermaid\nflowchart LR\n    Client([Client])\n");
    for (i, route) in routes.iter().enumerate() {
        let _ = writeln!(
            out,
            "    Client -->|{}| R{}[\"{}\"]",
            route.method,
            i,
            route.path.replace('"', "'")
        );
    }
    out.push_str(
        "    Client --> Queue[[Job queue]]\n    Queue --> Worker[Worker]\n    \
         Worker --> Store[(Job store)]\n    Worker --> Files[(Artifact files)]\n```\n",
    );
    out
}

fn test_cases(routes: &[RouteEntry]) -> String {
    let mut out = String::from("# Tests\n\n");
    for route in routes {
        let _ = writeln!(
            out,
            "- `{} {}` succeeds for a valid request: {}",
            route.method, route.path, route.summary
        );
        if !path_params(&route.path).is_empty() {
            let _ = writeln!(
                out,
                "- `{} {}` returns not found for an unknown identifier",
                route.method, route.path
            );
        }
    }
    out
}

fn architecture(routes: &[RouteEntry]) -> String {
    let mut out = String::from(
        "# Architecture\n\n\
         - API surface: accepts uploads, serves job status and artifact downloads.\n\
         - Job queue: hands `(job_id, upload_path)` to a pool of worker threads.\n\
         - Worker: extracts context, generates five artifacts, retries on provider rate limits.\n\
         - Job store: SQLite database holding jobs and artifacts.\n\
         - File storage: uploads plus one artifact directory per job.\n\n",
    );
    let _ = writeln!(out, "The service exposes {} routes.", routes.len());
    out
}

/// Names of `{param}` segments in a route path.
fn path_params(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .collect()
}
