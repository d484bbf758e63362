//! Source-list assembly per discovery mode.

use crate::config::DiscoveryMode;
use crate::paths::{has_content, resolve_bmad_path};
use crate::types::{Source, SourceKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate roots before mode filtering.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    /// Resolved remote checkouts, highest precedence first.
    pub remotes: Vec<PathBuf>,
    pub project: Option<PathBuf>,
    pub user: Option<PathBuf>,
}

/// True when the mode looks at remote sources at all.
pub fn uses_remotes(mode: DiscoveryMode) -> bool {
    matches!(
        mode,
        DiscoveryMode::Strict | DiscoveryMode::Auto | DiscoveryMode::First
    )
}

/// Effective content root of a directory (unwraps a nested `bmad/`).
fn effective_root(path: &Path) -> PathBuf {
    let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    resolve_bmad_path(&canonical).bmad_root
}

/// Build the ordered source list. Priorities are assigned 1, 2, … in order.
pub fn assemble(mode: DiscoveryMode, candidates: Candidates) -> Vec<Source> {
    let remote = |roots: &[PathBuf], require_content: bool| -> Vec<(PathBuf, SourceKind)> {
        roots
            .iter()
            .map(|root| effective_root(root))
            .filter(|root| !require_content || has_content(root))
            .map(|root| (root, SourceKind::Remote))
            .collect()
    };
    let local = |root: &Option<PathBuf>, kind: SourceKind, require_content: bool| {
        root.as_ref()
            .filter(|root| root.is_dir())
            .map(|root| effective_root(root))
            .filter(|root| !require_content || has_content(root))
            .map(|root| (root, kind))
    };

    let roots: Vec<(PathBuf, SourceKind)> = match mode {
        DiscoveryMode::Strict => remote(&candidates.remotes, false),
        DiscoveryMode::Local => local(&candidates.project, SourceKind::Project, false)
            .into_iter()
            .collect(),
        DiscoveryMode::User => local(&candidates.user, SourceKind::User, false)
            .into_iter()
            .collect(),
        DiscoveryMode::Auto | DiscoveryMode::First => {
            let mut roots = remote(&candidates.remotes, true);
            roots.extend(local(&candidates.project, SourceKind::Project, true));
            roots.extend(local(&candidates.user, SourceKind::User, true));
            if mode == DiscoveryMode::First {
                roots.truncate(1);
            }
            roots
        }
    };

    let mut sources: Vec<Source> = Vec::with_capacity(roots.len());
    for (root, kind) in roots {
        if sources.iter().any(|existing| existing.root == root) {
            debug!(root = %root.display(), %kind, "Skipping duplicate source root");
            continue;
        }
        sources.push(Source {
            priority: sources.len() as u32 + 1,
            root,
            kind,
        });
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Layout {
        _temp: TempDir,
        remote: PathBuf,
        project: PathBuf,
        user: PathBuf,
        empty: PathBuf,
    }

    fn layout() -> Layout {
        let temp = TempDir::new().unwrap();
        let base = dunce::canonicalize(temp.path()).unwrap();
        let remote = base.join("remote");
        let project = base.join("project");
        let user = base.join("user");
        let empty = base.join("empty");
        fs::create_dir_all(remote.join("bmad/core/agents")).unwrap();
        fs::create_dir_all(project.join("agents")).unwrap();
        fs::create_dir_all(user.join("bmm/workflows")).unwrap();
        fs::create_dir_all(&empty).unwrap();
        Layout {
            _temp: temp,
            remote,
            project,
            user,
            empty,
        }
    }

    fn kinds(sources: &[Source]) -> Vec<(SourceKind, u32)> {
        sources.iter().map(|s| (s.kind, s.priority)).collect()
    }

    #[test]
    fn auto_orders_remote_project_user() {
        let l = layout();
        let sources = assemble(
            DiscoveryMode::Auto,
            Candidates {
                remotes: vec![l.remote.clone()],
                project: Some(l.project.clone()),
                user: Some(l.user.clone()),
            },
        );
        assert_eq!(
            kinds(&sources),
            vec![
                (SourceKind::Remote, 1),
                (SourceKind::Project, 2),
                (SourceKind::User, 3)
            ]
        );
        // Nested bmad/ is unwrapped.
        assert_eq!(sources[0].root, l.remote.join("bmad"));
    }

    #[test]
    fn auto_skips_roots_without_content() {
        let l = layout();
        let sources = assemble(
            DiscoveryMode::Auto,
            Candidates {
                remotes: vec![],
                project: Some(l.empty.clone()),
                user: Some(l.user.clone()),
            },
        );
        assert_eq!(kinds(&sources), vec![(SourceKind::User, 1)]);
    }

    #[test]
    fn first_keeps_only_the_top_source() {
        let l = layout();
        let sources = assemble(
            DiscoveryMode::First,
            Candidates {
                remotes: vec![],
                project: Some(l.project.clone()),
                user: Some(l.user.clone()),
            },
        );
        assert_eq!(kinds(&sources), vec![(SourceKind::Project, 1)]);
    }

    #[test]
    fn single_scope_modes_ignore_other_roots() {
        let l = layout();
        let candidates = Candidates {
            remotes: vec![l.remote.clone()],
            project: Some(l.empty.clone()),
            user: Some(l.user.clone()),
        };
        assert_eq!(
            kinds(&assemble(DiscoveryMode::Strict, candidates.clone())),
            vec![(SourceKind::Remote, 1)]
        );
        // Local mode takes the project root even without content evidence.
        assert_eq!(
            kinds(&assemble(DiscoveryMode::Local, candidates.clone())),
            vec![(SourceKind::Project, 1)]
        );
        assert_eq!(
            kinds(&assemble(DiscoveryMode::User, candidates)),
            vec![(SourceKind::User, 1)]
        );
    }

    #[test]
    fn project_equal_to_user_is_listed_once() {
        let l = layout();
        let sources = assemble(
            DiscoveryMode::Auto,
            Candidates {
                remotes: vec![],
                project: Some(l.project.clone()),
                user: Some(l.project.clone()),
            },
        );
        assert_eq!(sources.len(), 1);
    }
}
