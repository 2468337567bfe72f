use std::fmt;

/// Public username of a channel, always starts with `@`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Username(String);

impl Username {
    /// Returns `None` if the input doesn't look like a channel username.
    /// No normalization is done here, the input must already contain the `@`.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        lazy_regex::regex_is_match!(r"^@\w+$", raw).then(|| Self(raw.to_owned()))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{expect, Expect};

    #[track_caller]
    fn assert_parse(raw: &str, expected: Expect) {
        let actual = match Username::parse(raw) {
            Some(username) => username.to_string(),
            None => "None".to_owned(),
        };
        expected.assert_eq(&actual);
    }

    #[test]
    fn smoke() {
        use assert_parse as test;

        test("@durov", expect!["@durov"]);
        test("@some_channel_42", expect!["@some_channel_42"]);
        test("@канал", expect!["@канал"]);
    }

    #[test]
    fn invalid() {
        use assert_parse as test;

        test("not-a-channel", expect!["None"]);
        test("durov", expect!["None"]);
        test("@", expect!["None"]);
        test("@foo bar", expect!["None"]);
        test("@foo-bar", expect!["None"]);
        test("", expect!["None"]);
    }
}
