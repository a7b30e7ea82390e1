//! Locating the artifacts the toolkit leaves under `output/`.
//!
//! The expected names come first; when they are absent, fixed candidate lists
//! are searched in order. Both lists are relied on by downstream consumers and
//! must not be reordered.

use crate::core::protocol::ResultPair;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const EXPECTED_TOPOLOGY: &str = "output/emin.pdb";
/// The toolkit really writes `trajetory`; matching its spelling is required.
pub const EXPECTED_TRAJECTORY: &str = "output/md_trajetory_id_0.dcd";

pub const TOPOLOGY_FALLBACKS: [&str; 4] = [
    "output/emin.pdb",
    "emin.pdb",
    "output/system.pdb",
    "system.pdb",
];

pub const TRAJECTORY_PATTERNS: [&str; 5] = [
    "output/md_trajectory_id_*.dcd",
    "output/md_trajectory*.dcd",
    "output/trajectory*.dcd",
    "md_trajectory_id_*.dcd",
    "trajectory.dcd",
];

pub const TOPOLOGY_PLACEHOLDER: &str = "Not found - expected at output/emin.pdb";
pub const TRAJECTORY_PLACEHOLDER: &str = "Not found - expected at output/md_trajectory_id_0.dcd";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub topology: Option<PathBuf>,
    pub trajectory: Option<PathBuf>,
}

impl ResolvedOutputs {
    /// Values for the sentinel lines: the path when it (still) exists,
    /// otherwise the placeholder text.
    pub fn to_result_pair(&self) -> ResultPair {
        fn shown(path: &Option<PathBuf>, placeholder: &str) -> String {
            match path {
                Some(p) if p.exists() => p.display().to_string(),
                _ => placeholder.to_string(),
            }
        }
        ResultPair {
            topology: shown(&self.topology, TOPOLOGY_PLACEHOLDER),
            trajectory: shown(&self.trajectory, TRAJECTORY_PLACEHOLDER),
        }
    }
}

/// Resolves artifact paths relative to a root directory, returning absolute
/// paths. Notes about missing or substituted files go to `out` as progress text.
#[derive(Debug, Clone)]
pub struct OutputResolver {
    root: PathBuf,
}

impl OutputResolver {
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: std::path::absolute(root)?,
        })
    }

    pub fn resolve(&self, out: &mut impl Write) -> io::Result<ResolvedOutputs> {
        Ok(ResolvedOutputs {
            topology: self.resolve_topology(out)?,
            trajectory: self.resolve_trajectory(out)?,
        })
    }

    pub fn resolve_topology(&self, out: &mut impl Write) -> io::Result<Option<PathBuf>> {
        let expected = self.root.join(EXPECTED_TOPOLOGY);
        if expected.exists() {
            return Ok(Some(expected));
        }
        writeln!(
            out,
            "Warning: Expected topology file not found at {}",
            expected.display()
        )?;
        warn!("Expected topology file missing: {:?}", expected);

        let found = TOPOLOGY_FALLBACKS
            .iter()
            .map(|candidate| self.root.join(candidate))
            .find(|candidate| candidate.exists());
        if let Some(path) = &found {
            writeln!(out, "Found topology file at: {}", path.display())?;
        }
        Ok(found)
    }

    pub fn resolve_trajectory(&self, out: &mut impl Write) -> io::Result<Option<PathBuf>> {
        let expected = self.root.join(EXPECTED_TRAJECTORY);
        if expected.exists() {
            return Ok(Some(expected));
        }
        writeln!(
            out,
            "Warning: Expected trajectory file not found at {}",
            expected.display()
        )?;
        warn!("Expected trajectory file missing: {:?}", expected);

        let found = TRAJECTORY_PATTERNS
            .iter()
            .find_map(|pattern| self.first_match(pattern));
        if let Some(path) = &found {
            writeln!(out, "Found trajectory file at: {}", path.display())?;
        }
        Ok(found)
    }

    fn first_match(&self, pattern: &str) -> Option<PathBuf> {
        let full = format!(
            "{}{}{}",
            glob::Pattern::escape(&self.root.to_string_lossy()),
            std::path::MAIN_SEPARATOR,
            pattern
        );
        match glob::glob(&full) {
            Ok(paths) => paths.filter_map(Result::ok).next(),
            Err(e) => {
                warn!("Skipping invalid trajectory pattern {:?}: {}", full, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"").unwrap();
        path
    }

    fn resolver(root: &Path) -> OutputResolver {
        OutputResolver::new(root).unwrap()
    }

    #[test]
    fn expected_files_are_used_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let topo = touch(dir.path(), "output/emin.pdb");
        let traj = touch(dir.path(), "output/md_trajetory_id_0.dcd");
        touch(dir.path(), "output/md_trajectory_id_0.dcd");

        let mut out = Vec::new();
        let resolved = resolver(dir.path()).resolve(&mut out).unwrap();

        assert_eq!(resolved.topology, Some(topo));
        assert_eq!(resolved.trajectory, Some(traj));
        assert!(out.is_empty());
    }

    #[test]
    fn topology_falls_back_to_system_pdb() {
        let dir = tempfile::tempdir().unwrap();
        let system = touch(dir.path(), "output/system.pdb");
        touch(dir.path(), "system.pdb");

        let mut out = Vec::new();
        let found = resolver(dir.path()).resolve_topology(&mut out).unwrap();

        assert_eq!(found, Some(system.clone()));
        assert!(found.unwrap().is_absolute());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Warning: Expected topology file not found"));
        assert!(text.contains(&format!("Found topology file at: {}", system.display())));
    }

    #[test]
    fn root_level_emin_wins_over_system_files() {
        let dir = tempfile::tempdir().unwrap();
        let emin = touch(dir.path(), "emin.pdb");
        touch(dir.path(), "output/system.pdb");

        let found = resolver(dir.path())
            .resolve_topology(&mut io::sink())
            .unwrap();
        assert_eq!(found, Some(emin));
    }

    #[test]
    fn trajectory_uses_the_first_pattern_with_a_match() {
        let dir = tempfile::tempdir().unwrap();
        let wanted = touch(dir.path(), "output/trajectory_run.dcd");
        touch(dir.path(), "md_trajectory_id_7.dcd");
        touch(dir.path(), "trajectory.dcd");

        let found = resolver(dir.path())
            .resolve_trajectory(&mut io::sink())
            .unwrap();
        assert_eq!(found, Some(wanted));
    }

    #[test]
    fn correctly_spelled_trajectory_is_found_by_the_first_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let first = touch(dir.path(), "output/md_trajectory_id_0.dcd");
        touch(dir.path(), "output/md_trajectory_id_1.dcd");
        touch(dir.path(), "output/trajectory.dcd");

        let found = resolver(dir.path())
            .resolve_trajectory(&mut io::sink())
            .unwrap();
        assert_eq!(found, Some(first));
    }

    #[test]
    fn missing_artifacts_resolve_to_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let resolved = resolver(dir.path()).resolve(&mut out).unwrap();

        assert_eq!(resolved, ResolvedOutputs::default());
        let pair = resolved.to_result_pair();
        assert_eq!(pair.topology, "Not found - expected at output/emin.pdb");
        assert_eq!(
            pair.trajectory,
            "Not found - expected at output/md_trajectory_id_0.dcd"
        );
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn root_with_glob_metacharacters_is_matched_literally() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("run[1]");
        let wanted = touch(&root, "trajectory.dcd");

        let found = resolver(&root)
            .resolve_trajectory(&mut io::sink())
            .unwrap();
        assert_eq!(found, Some(wanted));
    }
}
