// Derived catalog identifiers: slugs and variant SKUs.

/// Replaces every non-ASCII character by its ASCII transliteration
/// ("Áo thun trắng" -> "ao thun trang"). ASCII is left as is.
pub fn strip_accents(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii() {
            out.push(c);
        } else if c.is_whitespace() {
            out.push(' ');
        } else {
            out.push_str(&::slug::slugify(c.to_string()));
        }
    }
    out
}

/// URL-safe form of a display name: `[a-z0-9]` words joined by single hyphens.
pub fn slugify(name: &str) -> String {
    let stripped = strip_accents(name).to_lowercase();
    let hyphenated = stripped.split_whitespace().collect::<Vec<_>>().join("-");

    let mut slug = String::with_capacity(hyphenated.len());
    for c in hyphenated.chars() {
        match c {
            'a'..='z' | '0'..='9' => slug.push(c),
            '-' if !slug.is_empty() && !slug.ends_with('-') => slug.push('-'),
            _ => {}
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Uppercase first letter of every word, accents stripped.
/// "Áo thun trắng" -> "ATT"
pub fn initials(text: &str) -> String {
    strip_accents(text)
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// SKU of a variant: category initials, product initials, then the variant's own id.
pub fn generate_sku(category_name: &str, product_name: &str, variant_id: i32) -> String {
    format!("{}{}{}", initials(category_name), initials(product_name), variant_id)
}

/// Sum of variant stocks, `None` on overflow.
pub fn total_stock<I>(stocks: I) -> Option<i32>
where
    I: IntoIterator<Item = i32>,
{
    stocks.into_iter().try_fold(0i32, |acc, stock| acc.checked_add(stock))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_accents_vietnamese() {
        assert_eq!(strip_accents("Áo thun trắng"), "ao thun trang");
        assert_eq!(strip_accents("Đồng hồ"), "dong ho");
        assert_eq!(strip_accents("plain ascii"), "plain ascii");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Áo Thun  Trắng!!"), "ao-thun-trang");
        assert_eq!(slugify("  Hello   World  "), "hello-world");
        assert_eq!(slugify("--a - b--"), "a-b");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        for name in ["Áo Thun  Trắng!!", "Giày thể thao 2024", "a--b"] {
            let once = slugify(name);
            assert_eq!(slugify(&once), once);
            assert!(!once.contains("--"));
            assert!(!once.starts_with('-') && !once.ends_with('-'));
        }
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("Áo thun"), "AT");
        assert_eq!(initials("Áo thun trắng"), "ATT");
        assert_eq!(initials("   "), "");
    }

    #[test]
    fn test_generate_sku() {
        assert_eq!(generate_sku("Áo thun", "Áo thun trắng", 1), "ATATT1");
        assert_eq!(generate_sku("Giày", "Giày chạy bộ", 42), "GGCB42");
    }

    #[test]
    fn test_total_stock() {
        assert_eq!(total_stock([5, 3]), Some(8));
        assert_eq!(total_stock(Vec::new()), Some(0));
        assert_eq!(total_stock([i32::MAX, 1]), None);
    }
}
