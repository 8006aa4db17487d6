use ammonia;

/// Strip dangerous HTML from untrusted text before it is persisted.
///
/// Model-generated question text, options, and explanations are rendered
/// verbatim by clients, so anything script-shaped has to go here. Safe
/// inline markup (like <b> or <sub>, which chemistry questions do use)
/// survives.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let cleaned = clean_html("H<sub>2</sub>O<script>alert(1)</script>");
        assert!(cleaned.contains("<sub>2</sub>"));
        assert!(!cleaned.contains("script"));
    }
}
