//! Markdown bodies for copied discussions, comments and replies. Each one
//! carries a footer recording who wrote the original and when.

pub const UNKNOWN_AUTHOR: &str = "unknown";

pub fn author_or_unknown(login: Option<&str>) -> &str {
    login.filter(|l| !l.is_empty()).unwrap_or(UNKNOWN_AUTHOR)
}

pub fn discussion_body(body: &str, author: &str, created_at: &str, source_url: &str) -> String {
    format!(
        "{body}\n\n---\n<details>\n<summary><i>Original discussion metadata</i></summary>\n\n\
         _Original discussion by @{author} on {created_at}_\n_Source: {source_url}_\n</details>"
    )
}

pub fn comment_body(body: &str, author: &str, created_at: &str) -> String {
    format!(
        "{body}\n\n---\n<details>\n<summary><i>Original comment metadata</i></summary>\n\n\
         _Original comment by @{author} on {created_at}_\n</details>"
    )
}

pub fn reply_body(body: &str, author: &str, created_at: &str) -> String {
    format!("{body}\n\n---\n_Original reply by @{author} on {created_at}_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discussion_body_footer() {
        let body = discussion_body(
            "Hello",
            "octocat",
            "2024-01-02T03:04:05Z",
            "https://github.com/src/repo/discussions/1",
        );
        assert_eq!(
            body,
            "Hello\n\n---\n<details>\n<summary><i>Original discussion metadata</i></summary>\n\n\
             _Original discussion by @octocat on 2024-01-02T03:04:05Z_\n\
             _Source: https://github.com/src/repo/discussions/1_\n</details>"
        );
    }

    #[test]
    fn test_comment_and_reply_bodies() {
        assert!(comment_body("hi", "a", "t").ends_with(
            "<summary><i>Original comment metadata</i></summary>\n\n_Original comment by @a on t_\n</details>"
        ));
        assert_eq!(reply_body("ok", "b", "t"), "ok\n\n---\n_Original reply by @b on t_");
    }

    #[test]
    fn test_missing_author() {
        assert_eq!(author_or_unknown(None), "unknown");
        assert_eq!(author_or_unknown(Some("")), "unknown");
        assert_eq!(author_or_unknown(Some("ghost")), "ghost");
    }
}
