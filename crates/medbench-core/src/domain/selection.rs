//! Model selection for compatibility tests.

use std::path::PathBuf;

use uuid::Uuid;

/// Which model a compatibility test runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelection {
    /// The benchmark's reference model.
    Reference,
    /// An existing model cube.
    ByUid(String),
    /// A cube directory on this machine, linked into cube storage under a
    /// synthesized uid.
    LocalPath(PathBuf),
}

impl ModelSelection {
    /// Build a selection from already-validated inputs. A local path wins
    /// over a uid.
    pub fn from_inputs(model_uid: Option<&str>, cube_path: Option<&PathBuf>) -> Self {
        match (cube_path, model_uid) {
            (Some(path), _) => ModelSelection::LocalPath(path.clone()),
            (None, Some(uid)) => ModelSelection::ByUid(uid.to_string()),
            (None, None) => ModelSelection::Reference,
        }
    }
}

/// Fresh uid for a local test cube: `<prefix><uuid>`.
pub fn synthesize_test_uid(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4().simple())
}
