use rand::{distr::Alphanumeric, Rng};

pub const PUBLIC_SLUG_LEN: usize = 12;

/// Random lowercase alphanumeric slug for public share links.
pub fn generate_public_slug() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PUBLIC_SLUG_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

pub fn is_valid_public_slug(slug: &str) -> bool {
    slug.len() == PUBLIC_SLUG_LEN
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_slugs_are_well_formed_and_vary() {
        let a = generate_public_slug();
        let b = generate_public_slug();
        assert!(is_valid_public_slug(&a));
        assert!(is_valid_public_slug(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_foreign_slugs() {
        assert!(!is_valid_public_slug("short"));
        assert!(!is_valid_public_slug("UPPERCASE123"));
        assert!(!is_valid_public_slug("has-dash-123"));
    }
}
