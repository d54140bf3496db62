/// XML 1.0 valid char ranges:
/// - 0x09, 0x0A, 0x0D
/// - 0x20..=0xD7FF
/// - 0xE000..=0xFFFD
/// - 0x10000..=0x10FFFF
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

/// Drops characters XML 1.0 cannot carry. Borrows when nothing needs removing.
pub fn sanitize_xml_text(text: &str) -> std::borrow::Cow<'_, str> {
    if text.chars().all(is_valid_xml_char) {
        std::borrow::Cow::Borrowed(text)
    } else {
        std::borrow::Cow::Owned(text.chars().filter(|&c| is_valid_xml_char(c)).collect())
    }
}

/// Escapes a value for use inside a double-quoted attribute.
pub fn escape_attr(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if !is_valid_xml_char(c) {
            continue;
        }
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_attr, sanitize_xml_text};
    use std::borrow::Cow;

    #[test]
    fn remove_invalid_control_chars() {
        let s = "<svg>A\u{0007}B\u{000C}C</svg>";
        assert_eq!(sanitize_xml_text(s), "<svg>ABC</svg>");
        assert_eq!(escape_attr("A\u{0000}B"), "AB");
    }

    #[test]
    fn clean_text_is_borrowed() {
        let s = "a\tb\nc\rd ✓";
        assert!(matches!(sanitize_xml_text(s), Cow::Borrowed(_)));
    }

    #[test]
    fn escape_special_xml_chars() {
        assert_eq!(
            escape_attr(r#"red" onload="x&y"#),
            "red&quot; onload=&quot;x&amp;y"
        );
    }
}
