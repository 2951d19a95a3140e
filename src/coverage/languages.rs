//! Rules for deciding which CodeQL-supported languages a repository contains
//! but does not scan.

use std::fmt;

/// GitHub linguist names (lower-cased) that CodeQL can analyse.
pub const CODEQL_LANGUAGES: &[&str] = &[
    "c",
    "c++",
    "cpp",
    "csharp",
    "c#",
    "go",
    "java",
    "kotlin",
    "javascript",
    "typescript",
    "python",
    "ruby",
    "swift",
];

pub fn is_codeql_language(lang: &str) -> bool {
    CODEQL_LANGUAGES.contains(&lang.to_lowercase().as_str())
}

/// Maps a linguist language to the CodeQL extractor name that covers it.
pub fn normalize(lang: &str) -> String {
    let lower = lang.to_lowercase();
    let normalized = match lower.as_str() {
        "c#" | "csharp" => "csharp",
        "c" | "c++" | "cpp" => "c-cpp",
        "javascript" | "typescript" => "javascript-typescript",
        "java" | "kotlin" => "java-kotlin",
        other => other,
    };
    normalized.to_string()
}

/// Whether `lang` (lower-cased) is covered by one of the scanned languages.
/// Combined extractors cover every language they are named after.
fn is_covered(lang: &str, scanned: &[String]) -> bool {
    match lang {
        "javascript" | "typescript" => scanned.iter().any(|s| s.contains("javascript")),
        "java" | "kotlin" => scanned.iter().any(|s| s.contains("java")),
        "c" | "c++" | "cpp" => scanned.iter().any(|s| s == "cpp" || s.contains("c-cpp")),
        other => scanned.iter().any(|s| s == other),
    }
}

/// Result of comparing detected and scanned languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unscanned {
    /// Nothing to compare: no detected languages and nothing scanned.
    NotApplicable,
    Languages(Vec<String>),
}

impl Unscanned {
    pub fn has_gaps(&self) -> bool {
        matches!(self, Unscanned::Languages(langs) if !langs.is_empty())
    }
}

impl fmt::Display for Unscanned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unscanned::NotApplicable => f.write_str("N/A"),
            Unscanned::Languages(langs) if langs.is_empty() => f.write_str("None"),
            Unscanned::Languages(langs) => f.write_str(&langs.join(";")),
        }
    }
}

/// Lists CodeQL languages present in `repo_languages` that no scanned
/// language covers, in detection order. With `check_actions`, `actions` is
/// reported when the repository has workflows that are not scanned.
pub fn unscanned_languages(
    repo_languages: &[String],
    scanned_languages: &[String],
    has_workflows: bool,
    check_actions: bool,
) -> Unscanned {
    let scanned: Vec<String> = scanned_languages.iter().map(|l| l.to_lowercase()).collect();
    let mut unscanned: Vec<String> = Vec::new();

    if check_actions && has_workflows && !scanned.iter().any(|s| s == "actions") {
        unscanned.push("actions".to_string());
    }

    if repo_languages.is_empty() {
        if unscanned.is_empty() && scanned.is_empty() {
            return Unscanned::NotApplicable;
        }
        return Unscanned::Languages(unscanned);
    }

    for lang in repo_languages {
        let lower = lang.to_lowercase();
        let lower = if lower == "c#" { "csharp".to_string() } else { lower };

        if !is_codeql_language(&lower) || is_covered(&lower, &scanned) {
            continue;
        }

        let name = normalize(&lower);
        if !unscanned.contains(&name) {
            unscanned.push(name);
        }
    }

    Unscanned::Languages(unscanned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_codeql_language() {
        assert!(is_codeql_language("Python"));
        assert!(is_codeql_language("C#"));
        assert!(is_codeql_language("C++"));
        assert!(!is_codeql_language("HCL"));
        assert!(!is_codeql_language("Shell"));
    }

    #[test]
    fn test_combined_extractors_cover_members() {
        let result = unscanned_languages(
            &langs(&["TypeScript", "JavaScript", "Kotlin", "C++"]),
            &langs(&["javascript-typescript", "java-kotlin", "c-cpp"]),
            false,
            false,
        );
        assert_eq!(result, Unscanned::Languages(vec![]));
        assert_eq!(result.to_string(), "None");
    }

    #[test]
    fn test_gaps_use_extractor_names() {
        let result = unscanned_languages(
            &langs(&["Java", "Kotlin", "C#", "Go", "Shell", "C"]),
            &langs(&["go"]),
            false,
            false,
        );
        assert_eq!(
            result,
            Unscanned::Languages(langs(&["java-kotlin", "csharp", "c-cpp"]))
        );
        assert_eq!(result.to_string(), "java-kotlin;csharp;c-cpp");
        assert!(result.has_gaps());
    }

    #[test]
    fn test_legacy_cpp_category_counts() {
        let result = unscanned_languages(&langs(&["C"]), &langs(&["cpp"]), false, false);
        assert_eq!(result, Unscanned::Languages(vec![]));
    }

    #[test]
    fn test_actions_reported_when_workflows_unscanned() {
        let result = unscanned_languages(&langs(&["Python"]), &langs(&["python"]), true, true);
        assert_eq!(result, Unscanned::Languages(langs(&["actions"])));

        let scanned = unscanned_languages(
            &langs(&["Python"]),
            &langs(&["python", "actions"]),
            true,
            true,
        );
        assert!(!scanned.has_gaps());

        let unchecked = unscanned_languages(&langs(&["Python"]), &langs(&["python"]), true, false);
        assert!(!unchecked.has_gaps());
    }

    #[test]
    fn test_no_detected_languages() {
        assert_eq!(
            unscanned_languages(&[], &[], false, false),
            Unscanned::NotApplicable
        );
        assert_eq!(
            unscanned_languages(&[], &langs(&["python"]), false, false),
            Unscanned::Languages(vec![])
        );
        assert_eq!(
            unscanned_languages(&[], &[], true, true),
            Unscanned::Languages(langs(&["actions"]))
        );
    }
}
