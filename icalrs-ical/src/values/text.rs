//! TEXT value escaping (spec §3): `\\` → `\`, `\;` → `;`, `\,` → `,`,
//! `\n`/`\N` → LF.

pub fn decode_text(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }

        match chars.peek() {
            Some('\\') => {
                output.push('\\');
                chars.next();
            }
            Some(';') => {
                output.push(';');
                chars.next();
            }
            Some(',') => {
                output.push(',');
                chars.next();
            }
            Some('n') | Some('N') => {
                output.push('\n');
                chars.next();
            }
            _ => output.push('\\'),
        }
    }

    output
}

/// The inverse of [`decode_text`], used by the serializer.
pub fn encode_text(text: &str) -> String {
    let mut output = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\\' => output.push_str("\\\\"),
            ';' => output.push_str("\\;"),
            ',' => output.push_str("\\,"),
            '\n' => output.push_str("\\n"),
            _ => output.push(c),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_escapes() {
        let original = "A, B\\C";
        let encoded = encode_text(original);
        assert_eq!(encoded, "A\\, B\\\\C");
        assert_eq!(decode_text(&encoded), original);
    }

    #[test]
    fn decodes_newline_escapes() {
        assert_eq!(decode_text("line1\\nline2"), "line1\nline2");
        assert_eq!(decode_text("line1\\Nline2"), "line1\nline2");
    }
}
