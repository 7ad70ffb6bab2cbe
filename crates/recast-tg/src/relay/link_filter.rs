use super::channel_slug;

/// Substrings that mark a candidate as carrying an external or promotional
/// link. URL shorteners are listed explicitly because they bypass the
/// scheme-based checks once shortened.
const FORBIDDEN_LINKS: &[&str] = &["http://", "https://", "t.me/", "bit.ly", "goo.gl"];

/// Returns `true` if the raw text carries a link that disqualifies the
/// candidate from being relayed.
///
/// The only permitted link is the self-reference of the candidate's own
/// source channel (`t.me/<channel>`). The permitted link is scoped strictly
/// to the `source_channel` argument: a self-link of some *other* channel
/// does not whitelist the text.
pub(crate) fn contains_unwanted_links(text: &str, source_channel: &str) -> bool {
    let slug = channel_slug(source_channel);

    // Scheme-prefixed forms first, so that scrubbing the bare form does not
    // leave a dangling `https://` behind that would then count as forbidden.
    let permitted = [
        format!("https://t.me/{slug}"),
        format!("http://t.me/{slug}"),
        format!("t.me/{slug}"),
    ];

    let mut scrubbed = text.to_owned();
    for link in &permitted {
        scrubbed = scrub_exact(&scrubbed, link);
    }

    FORBIDDEN_LINKS.iter().any(|link| scrubbed.contains(link))
}

/// Removes occurrences of `link` that end at a token boundary. An occurrence
/// followed by more username characters is a link to a *different* channel
/// (`t.me/mychannel` vs `t.me/mychan`) and must be left in place for the
/// forbidden-substring check to catch.
fn scrub_exact(text: &str, link: &str) -> String {
    let is_username_char = |ch: char| ch.is_ascii_alphanumeric() || ch == '_';

    let mut scrubbed = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(link) {
        let (head, tail) = rest.split_at(start);
        let tail = &tail[link.len()..];

        scrubbed.push_str(head);
        if tail.chars().next().is_some_and(is_username_char) {
            scrubbed.push_str(link);
        }
        rest = tail;
    }

    scrubbed.push_str(rest);
    scrubbed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_generic_urls() {
        assert!(contains_unwanted_links(
            "Check this out https://example.com/x",
            "@mychan"
        ));
    }

    #[test]
    fn rejects_shortener_domains() {
        assert!(contains_unwanted_links("bit.ly/3xyz", "@mychan"));
        assert!(contains_unwanted_links("goo.gl/abc", "@mychan"));
    }

    #[test]
    fn accepts_own_self_link() {
        assert!(!contains_unwanted_links("Great post! t.me/mychan", "@mychan"));
        assert!(!contains_unwanted_links(
            "Great post! https://t.me/mychan",
            "@mychan"
        ));
    }

    #[test]
    fn accepts_plain_text() {
        assert!(!contains_unwanted_links("No links here at all", "@mychan"));
    }

    // The permitted link must be computed from the channel argument, never
    // from any surrounding state.
    #[test]
    fn self_link_is_scoped_to_the_given_channel() {
        assert!(contains_unwanted_links(
            "Great post! t.me/otherchan",
            "@mychan"
        ));
    }

    #[test]
    fn self_link_prefix_extensions_are_not_whitelisted() {
        // `t.me/mychannel` is a different channel that merely starts with
        // the `mychan` slug
        assert!(contains_unwanted_links("t.me/mychannel", "@mychan"));
        assert!(contains_unwanted_links(
            "https://t.me/mychannelfeed",
            "@mychan"
        ));
        // A punctuation-delimited self-link is still the channel's own
        assert!(!contains_unwanted_links(
            "See t.me/mychan, the original",
            "@mychan"
        ));
    }

    #[test]
    fn self_link_does_not_whitelist_other_links() {
        assert!(contains_unwanted_links(
            "t.me/mychan but also https://spam.example.com",
            "@mychan"
        ));
    }
}
