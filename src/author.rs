//! Comment author resolution.
//!
//! Resolution order:
//! 1) CLI --author (explicit)
//! 2) TASKDECK_AUTHOR environment variable
//! 3) Signed-in session email
//! 4) Config default (author.default)

use crate::config::Config;

pub const AUTHOR_ENV: &str = "TASKDECK_AUTHOR";

/// Resolve the author name for new comments.
pub fn resolve_author(config: &Config, cli_author: Option<&str>, session_email: Option<&str>) -> String {
    if let Some(author) = non_empty(cli_author) {
        return author.to_string();
    }

    if let Ok(env_author) = std::env::var(AUTHOR_ENV) {
        if let Some(author) = non_empty(Some(env_author.as_str())) {
            return author.to_string();
        }
    }

    if let Some(email) = non_empty(session_email) {
        return email.to_string();
    }

    config.author.default.clone()
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_author_wins() {
        let config = Config::default();
        assert_eq!(resolve_author(&config, Some("  bob "), Some("a@b.c")), "bob");
    }

    #[test]
    fn falls_back_to_config_default() {
        let mut config = Config::default();
        config.author.default = "team".to_string();
        if std::env::var(AUTHOR_ENV).is_err() {
            assert_eq!(resolve_author(&config, Some("   "), None), "team");
        }
    }
}
