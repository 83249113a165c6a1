//! User-Agent parsing into OS, platform and browser strings

use woothee::parser::Parser;

const UNKNOWN: &str = "UNKNOWN";

/// Parsed view of a User-Agent header. Unknown parts are empty strings, so
/// an unknown browser is a bare `" "`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub os: String,
    /// Device category: pc, smartphone, mobilephone, crawler, appliance or misc
    pub platform: String,
    /// `"<name> <version>"`
    pub browser: String,
}

pub fn parse_user_agent(user_agent: Option<&str>) -> UserAgentInfo {
    let parser = Parser::new();
    let parsed = user_agent
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .and_then(|ua| parser.parse(ua));

    let Some(result) = parsed else {
        return UserAgentInfo {
            browser: browser_label("", ""),
            ..Default::default()
        };
    };

    UserAgentInfo {
        os: known(result.os).to_string(),
        platform: known(result.category).to_string(),
        browser: browser_label(known(result.name), known(result.version)),
    }
}

fn browser_label(name: &str, version: &str) -> String {
    format!("{name} {version}")
}

fn known(value: &str) -> &str {
    if value == UNKNOWN {
        ""
    } else {
        value
    }
}
