// src/utils/html.rs

/// Clean HTML content using the ammonia library.
///
/// Game titles and descriptions are shown to every player, so markup is
/// reduced to a whitelist of safe tags and `<script>`/`<style>` blocks are
/// dropped with their content.
///
/// Note: question text and answers are NOT cleaned, since answers are compared
/// literally and players type them as plain text.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_untouched() {
        assert_eq!(clean_html("World capitals"), "World capitals");
    }

    #[test]
    fn test_script_is_removed() {
        assert_eq!(clean_html("<b>Hi</b><script>steal()</script>"), "<b>Hi</b>");
    }
}
