//! Prompt construction and response clean-up for the generative service.

use std::path::Path;

use crate::domain::Plan;

/// Human-readable language name inferred from a file extension.
pub fn language_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "py" => "Python",
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "rs" => "Rust",
        "html" | "htm" => "HTML",
        "css" => "CSS",
        "md" => "Markdown",
        "json" => "JSON",
        "yml" | "yaml" => "YAML",
        "toml" => "TOML",
        "sh" => "Bash",
        _ => "text",
    }
}

/// Strip Markdown code fences. The first fenced block wins; unfenced text is
/// returned trimmed.
pub fn extract_code(text: &str) -> String {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed.to_string();
    };
    let after_open = &trimmed[open + 3..];
    // Skip the info string (e.g. "python") on the opening fence line.
    let body = match after_open.find('\n') {
        Some(nl) => &after_open[nl + 1..],
        None => return String::new(),
    };
    match body.find("```") {
        Some(close) => body[..close].trim_end().to_string(),
        None => body.trim_end().to_string(),
    }
}

pub fn planning_prompt(objective: &str) -> String {
    format!(
        "You are a senior software architect. Produce a project plan for the objective below.\n\
         Respond with a single JSON object with these keys:\n\
         - \"project_name\": short snake_case name\n\
         - \"technologies\": list of strings\n\
         - \"file_structure\": nested object; directories map to objects, files map to a \
         one-sentence description of their contents\n\
         - \"execution_steps\": list of {{\"step\": number, \"description\": string, \"command\": string}}\n\n\
         Objective: {objective}"
    )
}

fn plan_json(plan: &Plan) -> String {
    serde_json::to_string_pretty(plan).unwrap_or_default()
}

pub fn risk_prompt(plan: &Plan) -> String {
    format!(
        "You are a risk analyst reviewing a software project plan before any code is written.\n\
         Identify concrete risks (security, feasibility, missing files, dependency problems).\n\
         Respond with a single JSON object:\n\
         {{\"status\": \"PASS\" | \"WARNING\" | \"FAIL\", \"confidence\": number between 0 and 1, \
         \"risks\": [{{\"id\": string, \"description\": string, \
         \"severity\": \"LOW\" | \"MEDIUM\" | \"HIGH\" | \"CRITICAL\", \"suggestion\": string}}]}}\n\n\
         Plan:\n{}",
        plan_json(plan)
    )
}

pub fn scoring_prompt(plan: &Plan) -> String {
    format!(
        "Rate the quality of this project plan for completeness, clarity and feasibility.\n\
         Respond with a single JSON object: {{\"overall_score\": integer 1-100, \"justification\": string}}\n\n\
         Plan:\n{}",
        plan_json(plan)
    )
}

pub fn generation_prompt(path: &Path, description: &str, context: &str) -> String {
    let language = language_for(path);
    let context = if context.is_empty() {
        "(no files have been generated yet)"
    } else {
        context
    };
    format!(
        "You are an expert {language} programmer writing one file of a larger project.\n\
         File: {}\n\
         Purpose: {description}\n\n\
         Summaries of files already written in this project:\n{context}\n\n\
         Respond with only the complete contents of the file, no explanations.",
        path.display()
    )
}

fn current_code_section(current: &str) -> String {
    if current.trim().is_empty() {
        String::new()
    } else {
        format!("\n\nCurrent code:\n{current}")
    }
}

/// First-attempt prompt of the retry loop. `current` is the seed content.
pub fn challenge_prompt(challenge: &str, current: &str) -> String {
    format!(
        "Write a complete, self-contained Python module that satisfies the challenge below.\n\
         Respond with only the code.\n\nChallenge: {challenge}{}",
        current_code_section(current)
    )
}

/// Prompt for attempts after a failing gate. `failure_detail` is included verbatim;
/// `current` is the candidate that failed.
pub fn corrective_prompt(challenge: &str, current: &str, failure_detail: &str) -> String {
    format!(
        "Your previous attempt failed a check. Fix the following failure and resubmit the \
         complete code. Respond with only the code.\n\n\
         Failure report:\n{failure_detail}\n\n\
         Original challenge: {challenge}{}",
        current_code_section(current)
    )
}

pub fn lint_fix_prompt(path: &Path, content: &str, report: &str) -> String {
    format!(
        "The {} file {} has lint problems. Rewrite it so the problems are fixed without \
         changing its behaviour. Respond with only the corrected file.\n\n\
         Lint report:\n{report}\n\nCurrent contents:\n{content}",
        language_for(path),
        path.display()
    )
}

pub fn test_prompt(source: &str, module_name: &str) -> String {
    format!(
        "Write pytest unit tests for the Python module `{module_name}` shown below. Import it \
         with `from {module_name} import *`. Cover normal behaviour and edge cases. \
         Respond with only the test code.\n\nSource:\n{source}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_map() {
        assert_eq!(language_for(Path::new("a/main.py")), "Python");
        assert_eq!(language_for(Path::new("index.HTML")), "HTML");
        assert_eq!(language_for(Path::new("LICENSE")), "text");
    }

    #[test]
    fn test_extract_code_strips_fences() {
        assert_eq!(extract_code("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(extract_code("Here you go:\n```\nx = 2\n```\nthanks"), "x = 2");
        assert_eq!(extract_code("  plain text \n"), "plain text");
        assert_eq!(extract_code("```py\nunterminated\n"), "unterminated");
    }

    #[test]
    fn test_corrective_prompt_carries_detail_verbatim() {
        let prompt = corrective_prompt(
            "add two numbers",
            "def add(a, b): return a+b",
            "score 4.20 < 7.00\nC0103 bad name",
        );
        assert!(prompt.contains("score 4.20 < 7.00\nC0103 bad name"));
        assert!(prompt.contains("add two numbers"));
        assert!(prompt.contains("Current code:\ndef add(a, b): return a+b"));
    }

    #[test]
    fn test_challenge_prompt_omits_empty_seed() {
        assert!(!challenge_prompt("add two numbers", "  ").contains("Current code"));
        assert!(challenge_prompt("refactor", "x = 1").contains("Current code:\nx = 1"));
    }

    #[test]
    fn test_generation_prompt_mentions_context() {
        let prompt = generation_prompt(Path::new("app/ui.js"), "renders", "--- File: a.py ---\nX");
        assert!(prompt.contains("JavaScript"));
        assert!(prompt.contains("--- File: a.py ---"));
    }
}
