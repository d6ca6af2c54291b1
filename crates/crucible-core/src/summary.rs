//! Structural summaries of generated source files.
//!
//! A summary lists imports, top-level functions and classes (with their
//! methods) so that later generation calls can reference earlier files
//! without seeing their full text. Extraction is line-based and regex-driven;
//! anything it cannot recognise is skipped, so malformed input produces a
//! partial or empty summary rather than an error.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

struct PythonPatterns {
    import: Regex,
    from: Regex,
    def: Regex,
    class: Regex,
}

struct JavaScriptPatterns {
    import: Regex,
    require: Regex,
    function: Regex,
    arrow: Regex,
    class: Regex,
    method: Regex,
}

struct RustPatterns {
    use_decl: Regex,
    function: Regex,
    type_decl: Regex,
    impl_block: Regex,
    method: Regex,
}

// Compiled once per process; `None` only if a pattern fails to compile.
static PYTHON: LazyLock<Option<PythonPatterns>> = LazyLock::new(|| {
    Some(PythonPatterns {
        import: Regex::new(r"^\s*import\s+(?P<names>[\w\.]+(?:\s*,\s*[\w\.]+)*)").ok()?,
        from: Regex::new(r"^\s*from\s+(?P<module>[\w\.]+)\s+import\s+(?P<names>.+?)\s*$").ok()?,
        def: Regex::new(
            r"^(?P<indent>\s*)(?:async\s+)?def\s+(?P<name>\w+)\s*\((?P<params>[^)]*)\)",
        )
        .ok()?,
        class: Regex::new(r"^class\s+(?P<name>\w+)\s*(?:\((?P<bases>[^)]*)\))?\s*:").ok()?,
    })
});

static JAVASCRIPT: LazyLock<Option<JavaScriptPatterns>> = LazyLock::new(|| {
    Some(JavaScriptPatterns {
        import: Regex::new(r#"^\s*import\s+(?:.+?\s+from\s+)?['"](?P<module>[^'"]+)['"]"#).ok()?,
        require: Regex::new(r#"require\(\s*['"](?P<module>[^'"]+)['"]\s*\)"#).ok()?,
        function: Regex::new(
            r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>\w+)\s*\((?P<params>[^)]*)\)",
        )
        .ok()?,
        arrow: Regex::new(
            r"^(?:export\s+)?(?:const|let|var)\s+(?P<name>\w+)\s*=\s*(?:async\s*)?\((?P<params>[^)]*)\)\s*(?::\s*[\w<>\[\]]+\s*)?=>",
        )
        .ok()?,
        class: Regex::new(
            r"^(?:export\s+)?(?:default\s+)?class\s+(?P<name>\w+)(?:\s+extends\s+(?P<base>[\w\.]+))?",
        )
        .ok()?,
        method: Regex::new(
            r"^\s+(?:static\s+)?(?:async\s+)?(?P<name>[A-Za-z_$][\w$]*)\s*\((?P<params>[^)]*)\)\s*(?::\s*[\w<>\[\]]+\s*)?\{",
        )
        .ok()?,
    })
});

static RUST: LazyLock<Option<RustPatterns>> = LazyLock::new(|| {
    Some(RustPatterns {
        use_decl: Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?use\s+(?P<path>[^;]+);").ok()?,
        function: Regex::new(
            r"^(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(?P<name>\w+)",
        )
        .ok()?,
        type_decl: Regex::new(
            r"^(?:pub(?:\([^)]*\))?\s+)?(?P<kind>struct|enum|trait)\s+(?P<name>\w+)",
        )
        .ok()?,
        impl_block: Regex::new(
            r"^impl(?:<[^>]*>)?\s+(?:(?P<trait>[\w:]+)\s+for\s+)?(?P<ty>\w+)",
        )
        .ok()?,
        method: Regex::new(
            r"^\s+(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(?P<name>\w+)",
        )
        .ok()?,
    })
});

/// Source languages that get a structural summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Python,
    JavaScript,
    TypeScript,
    Rust,
}

impl SourceKind {
    /// Classify by file extension. Non-source files return `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "py" => Some(SourceKind::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceKind::JavaScript),
            "ts" | "tsx" => Some(SourceKind::TypeScript),
            "rs" => Some(SourceKind::Rust),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Outline {
    imports: Vec<String>,
    functions: Vec<String>,
    classes: Vec<(String, Vec<String>)>,
}

impl Outline {
    fn render(mut self) -> String {
        self.imports.sort();
        self.imports.dedup();

        let mut out = Vec::new();
        if !self.imports.is_empty() {
            out.push("IMPORTS:".to_string());
            out.extend(self.imports.iter().map(|i| format!("  - {i}")));
        }
        if !self.functions.is_empty() {
            out.push("FUNCTIONS:".to_string());
            out.extend(self.functions.iter().map(|f| format!("  - {f}")));
        }
        if !self.classes.is_empty() {
            out.push("CLASSES:".to_string());
            for (class, methods) in &self.classes {
                out.push(format!("  - {class}"));
                out.extend(methods.iter().map(|m| format!("    - {m}")));
            }
        }
        out.join("\n")
    }
}

/// Summarise `content` according to `kind`.
pub fn summarize(kind: SourceKind, content: &str) -> String {
    let outline = match kind {
        SourceKind::Python => outline_python(content),
        SourceKind::JavaScript | SourceKind::TypeScript => outline_javascript(content),
        SourceKind::Rust => outline_rust(content),
    };
    outline.map(Outline::render).unwrap_or_default()
}

/// Summarise the file at `path` if it is a recognised source kind.
pub fn summarize_path(path: &Path, content: &str) -> Option<String> {
    SourceKind::from_path(path).map(|kind| summarize(kind, content))
}

/// Parameter names only: annotations and defaults are dropped.
fn param_names(params: &str) -> String {
    params
        .split(',')
        .map(|p| {
            p.split([':', '='])
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn outline_python(content: &str) -> Option<Outline> {
    let re = PYTHON.as_ref()?;
    let mut outline = Outline::default();
    let mut in_class = false;

    for line in content.lines() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let top_level = !line.starts_with(char::is_whitespace);

        if let Some(caps) = re.import.captures(line) {
            for name in caps["names"].split(',') {
                outline.imports.push(format!("import {}", name.trim()));
            }
            continue;
        }
        if let Some(caps) = re.from.captures(line) {
            let names = caps["names"].trim_matches(|c| c == '(' || c == ')');
            outline
                .imports
                .push(format!("from {} import {}", &caps["module"], names.trim()));
            continue;
        }
        if let Some(caps) = re.class.captures(line) {
            let bases = caps.name("bases").map(|b| b.as_str().trim()).unwrap_or("");
            outline
                .classes
                .push((format!("class {}({}):", &caps["name"], bases), Vec::new()));
            in_class = true;
            continue;
        }
        if let Some(caps) = re.def.captures(line) {
            let signature = format!("def {}({})", &caps["name"], param_names(&caps["params"]));
            if caps["indent"].is_empty() {
                outline.functions.push(signature);
                in_class = false;
            } else if in_class {
                if let Some((_, methods)) = outline.classes.last_mut() {
                    methods.push(signature);
                }
            }
            continue;
        }
        if top_level {
            in_class = false;
        }
    }
    Some(outline)
}

fn outline_javascript(content: &str) -> Option<Outline> {
    let re = JAVASCRIPT.as_ref()?;
    let mut outline = Outline::default();
    let mut in_class = false;

    for line in content.lines() {
        if let Some(caps) = re.import.captures(line) {
            outline.imports.push(format!("import {}", &caps["module"]));
            continue;
        }
        if let Some(caps) = re.require.captures(line) {
            outline.imports.push(format!("require {}", &caps["module"]));
        }
        if let Some(caps) = re.class.captures(line) {
            let base = caps.name("base").map(|b| b.as_str()).unwrap_or("");
            outline
                .classes
                .push((format!("class {}({})", &caps["name"], base), Vec::new()));
            in_class = true;
            continue;
        }
        if let Some(caps) = re
            .function
            .captures(line)
            .or_else(|| re.arrow.captures(line))
        {
            outline.functions.push(format!(
                "function {}({})",
                &caps["name"],
                param_names(&caps["params"])
            ));
            in_class = false;
            continue;
        }
        if in_class {
            if line.starts_with('}') {
                in_class = false;
            } else if let Some(caps) = re.method.captures(line) {
                let name = &caps["name"];
                if !matches!(name, "if" | "for" | "while" | "switch" | "catch" | "return") {
                    let signature = format!("{}({})", name, param_names(&caps["params"]));
                    if let Some((_, methods)) = outline.classes.last_mut() {
                        methods.push(signature);
                    }
                }
            }
        }
    }
    Some(outline)
}

fn outline_rust(content: &str) -> Option<Outline> {
    let re = RUST.as_ref()?;
    let mut outline = Outline::default();
    let mut current_impl: Option<String> = None;

    for line in content.lines() {
        if let Some(caps) = re.use_decl.captures(line) {
            outline.imports.push(format!("use {}", caps["path"].trim()));
            continue;
        }
        if let Some(caps) = re.type_decl.captures(line) {
            outline
                .classes
                .push((format!("{} {}", &caps["kind"], &caps["name"]), Vec::new()));
            current_impl = None;
            continue;
        }
        if let Some(caps) = re.impl_block.captures(line) {
            current_impl = Some(caps["ty"].to_string());
            continue;
        }
        if let Some(caps) = re.function.captures(line) {
            outline.functions.push(format!("fn {}", &caps["name"]));
            current_impl = None;
            continue;
        }
        if line.starts_with('}') {
            current_impl = None;
            continue;
        }
        if let (Some(ty), Some(caps)) = (current_impl.as_deref(), re.method.captures(line)) {
            let method = format!("fn {}", &caps["name"]);
            let target = outline
                .classes
                .iter_mut()
                .find(|(name, _)| name.rsplit(' ').next() == Some(ty));
            if let Some((_, methods)) = target {
                methods.push(method);
            }
        }
    }
    Some(outline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pattern_set_compiles() {
        assert!(PYTHON.is_some());
        assert!(JAVASCRIPT.is_some());
        assert!(RUST.is_some());
    }

    #[test]
    fn test_source_kind_from_extension() {
        assert_eq!(SourceKind::from_path(Path::new("a/main.py")), Some(SourceKind::Python));
        assert_eq!(SourceKind::from_path(Path::new("app.tsx")), Some(SourceKind::TypeScript));
        assert_eq!(SourceKind::from_path(Path::new("README.md")), None);
        assert_eq!(SourceKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_python_summary() {
        let source = r#"
import os, sys
from typing import List, Optional

def add(a: int, b: int = 0) -> int:
    return a + b

class Calculator(Base):
    def __init__(self, start):
        self.value = start

    async def total(self):
        return self.value

def main():
    print(add(5, 7))
"#;
        let summary = summarize(SourceKind::Python, source);
        assert_eq!(
            summary,
            "IMPORTS:\n  - from typing import List, Optional\n  - import os\n  - import sys\n\
             FUNCTIONS:\n  - def add(a, b)\n  - def main()\n\
             CLASSES:\n  - class Calculator(Base):\n    - def __init__(self, start)\n    - def total(self)"
        );
    }

    #[test]
    fn test_nested_functions_are_not_top_level() {
        let source = "def outer():\n    def inner():\n        pass\n    return inner\n";
        let summary = summarize(SourceKind::Python, source);
        assert!(summary.contains("def outer()"));
        assert!(!summary.contains("inner"));
    }

    #[test]
    fn test_javascript_summary() {
        let source = r#"import React from 'react';
const fs = require('fs');

export function render(props, target) {
  return null;
}

export const add = (a, b) => a + b;

class Store extends Base {
  constructor(state) {
    super();
  }
  dispatch(action) {
    if (action) {
    }
  }
}
"#;
        let summary = summarize(SourceKind::JavaScript, source);
        assert!(summary.contains("import react"));
        assert!(summary.contains("require fs"));
        assert!(summary.contains("function render(props, target)"));
        assert!(summary.contains("function add(a, b)"));
        assert!(summary.contains("class Store(Base)"));
        assert!(summary.contains("    - dispatch(action)"));
        assert!(!summary.contains("- if("));
    }

    #[test]
    fn test_rust_summary() {
        let source = "use std::fmt;\n\npub struct Point {\n    x: i32,\n}\n\nimpl Point {\n    pub fn new() -> Self {\n        Point { x: 0 }\n    }\n}\n\npub async fn run() {}\n";
        let summary = summarize(SourceKind::Rust, source);
        assert!(summary.contains("use std::fmt"));
        assert!(summary.contains("struct Point"));
        assert!(summary.contains("    - fn new"));
        assert!(summary.contains("fn run"));
    }

    #[test]
    fn test_garbage_yields_empty_summary() {
        assert_eq!(summarize(SourceKind::Python, "}}}{{{ not python ((("), "");
        assert_eq!(summarize(SourceKind::Rust, ""), "");
    }

    #[test]
    fn test_non_source_paths_are_not_summarised() {
        assert!(summarize_path(Path::new("docs/index.html"), "<html/>").is_none());
        assert!(summarize_path(Path::new("main.py"), "x = 1").is_some());
    }
}
