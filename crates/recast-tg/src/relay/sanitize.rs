use super::channel_slug;
use lazy_regex::regex;

/// Strips source-identifying and promotional artifacts from a candidate's
/// text: the self-referencing link of the source channel, generic URLs,
/// `t.me/...` links, hashtags, mentions and markdown emphasis characters.
///
/// Pure and idempotent: running the output through the sanitizer again
/// yields the same string.
pub(crate) fn sanitize_text(raw: &str, source_channel: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    // The self-link is matched before markup stripping, since channel slugs
    // may themselves contain `_`.
    let self_link = format!("t.me/{}", channel_slug(source_channel));

    let text = raw.replace(&self_link, "");

    // Markup goes before the link-shaped passes: a markup-interrupted URL
    // (`*h*ttp://...`) must not outlive the first pass.
    let text = regex!(r"[*~_]").replace_all(&text, "");

    // The trailing `\S*` (not `\S+`) also swallows a bare dangling scheme
    // left behind by the self-link removal above.
    let text = regex!(r"(?:https?|ftp)://\S*").replace_all(&text, "");
    let text = regex!(r"\bt\.me/\S+").replace_all(&text, "");
    let text = regex!(r"#\S+").replace_all(&text, "");
    let text = regex!(r"@\S+").replace_all(&text, "");

    let text = regex!(r"\s+").replace_all(&text, " ");

    text.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{expect, Expect};

    fn test(raw: &str, channel: &str, expected: Expect) {
        expected.assert_eq(&sanitize_text(raw, channel));
    }

    #[test]
    fn strips_all_artifact_kinds() {
        test(
            "Hello #world @someone https://t.me/mychan check *this* out",
            "@mychan",
            expect!["Hello check this out"],
        );
    }

    #[test]
    fn strips_generic_urls() {
        test(
            "Read more at https://example.com/article and ftp://files.example.com",
            "@mychan",
            expect!["Read more at and"],
        );
    }

    #[test]
    fn strips_bare_telegram_links() {
        test(
            "Join t.me/some_other_channel now",
            "@mychan",
            expect!["Join now"],
        );
    }

    #[test]
    fn strips_markup_characters() {
        test(
            "~spoiler~ *bold* and _italics_ survive as plain words",
            "@mychan",
            expect!["spoiler bold and italics survive as plain words"],
        );
    }

    #[test]
    fn markup_interrupted_url_is_still_stripped() {
        test(
            "*h*ttp://spam.example.com check this",
            "@mychan",
            expect!["check this"],
        );
        test("Join t.me/other*chan now", "@mychan", expect!["Join now"]);
    }

    #[test]
    fn empty_input_passes_through() {
        test("", "@mychan", expect![""]);
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "Hello #world @someone https://t.me/mychan check *this* out",
            "plain text stays plain",
            "  surrounded   by \t whitespace  ",
            "#only #hashtags",
            "*h*ttp://spam.example.com check this",
            "",
        ];

        for input in inputs {
            let once = sanitize_text(input, "@mychan");
            let twice = sanitize_text(&once, "@mychan");
            assert_eq!(once, twice, "sanitizer is not idempotent for {input:?}");
        }
    }
}
