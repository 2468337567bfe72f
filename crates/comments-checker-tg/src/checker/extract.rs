use itertools::Itertools;

/// Finds channel usernames in the free-form text. Both bare `@name` mentions
/// and `https://{host}/channel/@name/stat` links are recognized. The result
/// is normalized to `@name` and de-duplicated, the first occurrence wins.
pub(crate) fn extract_usernames(text: &str) -> Vec<String> {
    lazy_regex::regex!(r"(?:https?://[\w.\-]+/channel/)?@(\w+)(?:/stat)?")
        .captures_iter(text)
        .map(|captures| format!("@{}", &captures[1]))
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{expect, Expect};

    #[track_caller]
    fn assert_extract(text: &str, expected: Expect) {
        expected.assert_debug_eq(&extract_usernames(text));
    }

    #[test]
    fn duplicates_are_removed() {
        assert_extract(
            "@foo @bar @foo",
            expect![[r#"
                [
                    "@foo",
                    "@bar",
                ]
            "#]],
        );
    }

    #[test]
    fn stat_links_are_normalized() {
        assert_extract(
            "https://tgstat.ru/channel/@foo/stat\n@foo\nhttp://tgstat.com/channel/@bar/stat",
            expect![[r#"
                [
                    "@foo",
                    "@bar",
                ]
            "#]],
        );
    }

    #[test]
    fn file_with_one_username_per_line() {
        assert_extract(
            "@first_channel\r\n@second_channel\r\n\r\n@third\r\n",
            expect![[r#"
                [
                    "@first_channel",
                    "@second_channel",
                    "@third",
                ]
            "#]],
        );
    }

    #[test]
    fn no_usernames() {
        assert_extract(
            "just some text without mentions, and a lonely @ sign",
            expect![[r#"
                []
            "#]],
        );
    }
}
