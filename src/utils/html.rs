// src/utils/html.rs

/// Clean admin-entered question content using the ammonia library.
///
/// Whitelist-based: safe inline tags survive, `<script>`, `<iframe>` and
/// event-handler attributes are stripped. Question text is rendered by the
/// web client, so this guards the test-taker against stored XSS from the
/// admin panel.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
