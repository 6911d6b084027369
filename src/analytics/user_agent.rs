//! User-Agent header parsing backed by woothee

use woothee::parser::Parser;

use crate::models::UserAgentInfo;

const UNKNOWN: &str = "UNKNOWN";

pub struct UserAgentParser {
    parser: Parser,
}

impl UserAgentParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Extract browser and OS names. Unknown or unparseable values come back empty.
    pub fn parse(&self, header: &str) -> UserAgentInfo {
        if header.trim().is_empty() {
            return UserAgentInfo::default();
        }

        let Some(result) = self.parser.parse(header) else {
            return UserAgentInfo::default();
        };

        UserAgentInfo {
            browser: known(result.name),
            os: known(result.os),
        }
    }
}

impl Default for UserAgentParser {
    fn default() -> Self {
        Self::new()
    }
}

fn known(value: &str) -> String {
    if value == UNKNOWN {
        String::new()
    } else {
        value.to_string()
    }
}
