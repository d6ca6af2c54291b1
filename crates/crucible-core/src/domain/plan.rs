//! Structured project plans.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::PlanValidationError;

/// File tree of a plan: names map to nested directories or leaf descriptions.
pub type FileTree = BTreeMap<String, PlanNode>;

/// A node in the plan's file tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanNode {
    /// Natural-language description of the file to generate.
    File(String),
    Directory(FileTree),
}

/// One step of the plan's execution recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStep {
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Structured plan produced from an objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub file_structure: FileTree,
    #[serde(default)]
    pub execution_steps: Vec<ExecutionStep>,
}

/// A leaf of the file tree with its path relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLeaf<'a> {
    pub path: PathBuf,
    pub description: &'a str,
}

impl Plan {
    pub fn validate(&self) -> Result<(), PlanValidationError> {
        validate_tree(&self.file_structure)
    }

    /// Depth-first leaves in traversal order.
    pub fn leaves(&self) -> Vec<PlanLeaf<'_>> {
        leaves(&self.file_structure)
    }
}

/// Validate a file tree: non-empty, non-empty leaves, safe relative names.
pub fn validate_tree(tree: &FileTree) -> Result<(), PlanValidationError> {
    fn walk(tree: &FileTree, parent: &Path, leaf_count: &mut usize) -> Result<(), PlanValidationError> {
        for (name, node) in tree {
            if name.trim().is_empty() {
                return Err(PlanValidationError::EmptyName {
                    parent: parent.display().to_string(),
                });
            }
            let path = parent.join(name);
            if !is_safe_relative(Path::new(name)) {
                return Err(PlanValidationError::UnsafePath {
                    path: path.display().to_string(),
                });
            }
            match node {
                PlanNode::File(description) => {
                    if description.trim().is_empty() {
                        return Err(PlanValidationError::EmptyLeaf {
                            path: path.display().to_string(),
                        });
                    }
                    *leaf_count += 1;
                }
                PlanNode::Directory(children) => walk(children, &path, leaf_count)?,
            }
        }
        Ok(())
    }

    let mut leaf_count = 0usize;
    walk(tree, Path::new(""), &mut leaf_count)?;
    if leaf_count == 0 {
        return Err(PlanValidationError::EmptyFileStructure);
    }
    Ok(())
}

/// Depth-first, name-ordered leaves of a file tree.
pub fn leaves(tree: &FileTree) -> Vec<PlanLeaf<'_>> {
    fn walk<'a>(tree: &'a FileTree, parent: &Path, out: &mut Vec<PlanLeaf<'a>>) {
        for (name, node) in tree {
            let path = parent.join(name);
            match node {
                PlanNode::File(description) => out.push(PlanLeaf {
                    path,
                    description: description.as_str(),
                }),
                PlanNode::Directory(children) => walk(children, &path, out),
            }
        }
    }

    let mut out = Vec::new();
    walk(tree, Path::new(""), &mut out);
    out
}

/// `true` if `path` is relative and made only of normal components.
pub fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc_plan() -> Plan {
        serde_json::from_str(
            r#"{
                "project_name": "calc",
                "technologies": ["Python"],
                "file_structure": {
                    "calc_project": {
                        "main.py": "define add(a,b) and print add(5,7)",
                        "util": { "helpers.py": "helpers" }
                    },
                    "README.md": "usage notes"
                },
                "execution_steps": [{ "step": 1, "description": "run", "command": "python main.py" }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_plan_parses() {
        let plan = calc_plan();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.execution_steps[0].command.as_deref(), Some("python main.py"));
    }

    #[test]
    fn test_leaves_depth_first_in_name_order() {
        let plan = calc_plan();
        let paths: Vec<_> = plan.leaves().into_iter().map(|l| l.path).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("README.md"),
                PathBuf::from("calc_project/main.py"),
                PathBuf::from("calc_project/util/helpers.py"),
            ]
        );
    }

    #[test]
    fn test_missing_file_structure_is_invalid() {
        let plan: Plan = serde_json::from_str(r#"{"project_name": "x"}"#).unwrap();
        assert_eq!(plan.validate(), Err(PlanValidationError::EmptyFileStructure));
    }

    #[test]
    fn test_directories_without_files_are_invalid() {
        let plan: Plan =
            serde_json::from_str(r#"{"file_structure": {"src": {}, "docs": {"x": {}}}}"#).unwrap();
        assert_eq!(plan.validate(), Err(PlanValidationError::EmptyFileStructure));
    }

    #[test]
    fn test_empty_leaf_is_invalid() {
        let plan: Plan = serde_json::from_str(r#"{"file_structure": {"a.py": "  "}}"#).unwrap();
        assert!(matches!(
            plan.validate(),
            Err(PlanValidationError::EmptyLeaf { .. })
        ));
    }

    #[test]
    fn test_parent_traversal_is_rejected() {
        let plan: Plan =
            serde_json::from_str(r#"{"file_structure": {"..": {"evil.py": "x"}}}"#).unwrap();
        assert!(matches!(
            plan.validate(),
            Err(PlanValidationError::UnsafePath { .. })
        ));
    }
}
