//! Masking helpers for identifiers that end up in logs

/// Mask an OTP subject (e-mail address or other handle) for logging
///
/// E-mail addresses keep the first character of the local part and the
/// domain (`a****@example.com`); other handles keep their last four
/// characters (`****5678`).
pub fn mask_identifier(identifier: &str) -> String {
    if let Some((local, domain)) = identifier.split_once('@') {
        let first: String = local.chars().take(1).collect();
        return format!("{}****@{}", first, domain);
    }

    let chars: Vec<char> = identifier.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_identifier("alice@example.com"), "a****@example.com");
        assert_eq!(mask_identifier("@example.com"), "****@example.com");
    }

    #[test]
    fn test_mask_handles() {
        let cases = vec![
            ("+61412345678", "****5678"),
            ("12345", "****2345"),
            ("555", "****"),
            ("", "****"),
        ];
        for (input, expected) in cases {
            assert_eq!(mask_identifier(input), expected, "Failed for: {}", input);
        }
    }

    #[test]
    fn test_mask_multibyte() {
        assert_eq!(mask_identifier("用户名称标识"), "****名称标识");
    }
}
