//! Ordered strategy lists for every metadata field.

use crate::extract::strategy::{Element, MetaTag, Pattern, Strategy};

/// Page titles the site serves when it has nothing listing-specific to say.
pub const GENERIC_TITLES: &[&str] = &[
    "Airbnb: aluguéis por temporada",
    "Airbnb: Vacation Rentals",
    "Airbnb | Vacation rentals",
    "Airbnb",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Price,
    Rating,
    ReviewCount,
    Location,
    BedroomCount,
    BathroomCount,
    GuestCapacity,
}

pub struct FieldRule {
    pub field: Field,
    pub strategies: Vec<Box<dyn Strategy>>,
}

impl FieldRule {
    fn new(field: Field, strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { field, strategies }
    }
}

/// Keep the part before the first `" - "`; the site appends the city or
/// its own name after that separator.
pub fn headline(text: &str) -> Option<String> {
    let head = text.split(" - ").next().unwrap_or(text).trim();
    (!head.is_empty()).then(|| head.to_string())
}

/// Headline of a title-like value, unless the value or its headline is one
/// of the site's placeholder titles.
pub fn page_title(text: &str) -> Option<String> {
    if is_generic_title(text) {
        return None;
    }
    headline(text).filter(|head| !is_generic_title(head))
}

pub fn is_generic_title(text: &str) -> bool {
    let text = text.trim();
    GENERIC_TITLES
        .iter()
        .any(|generic| text == *generic || (generic.len() > 6 && text.starts_with(generic)))
}

pub fn default_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new(
            Field::Title,
            vec![
                Box::new(MetaTag::property("og:title").refine(page_title)),
                Box::new(MetaTag::named("twitter:title").refine(page_title)),
                // icons carry their own <title> inside <svg>
                Box::new(Element::new("head > title").first_only().refine(page_title)),
                Box::new(Element::new("h1")),
                Box::new(Element::new(r#"div[data-section-id="TITLE_DEFAULT"]"#)),
                Box::new(Pattern::new(r#""title":"([^"]+)""#).json_string()),
            ],
        ),
        FieldRule::new(
            Field::Price,
            vec![
                Box::new(Pattern::new(r#""priceString":"([^"]+)""#).json_string()),
                Box::new(Element::new(r#"span[data-testid="listing-price"]"#)),
                Box::new(Pattern::new(r"(?:R\$|US\$|\$|€|£)\s*\d[\d.,]*")),
            ],
        ),
        FieldRule::new(
            Field::Rating,
            vec![
                Box::new(Pattern::new(r#""starRating":\s*([0-9]+(?:\.[0-9]+)?)"#)),
                Box::new(Pattern::new(r#""avgRating":\s*([0-9]+(?:\.[0-9]+)?)"#)),
                Box::new(
                    Element::new(r#"span[data-testid="rating-value"]"#)
                        .capture(r"(\d+(?:[.,]\d+)?)"),
                ),
            ],
        ),
        FieldRule::new(
            Field::ReviewCount,
            vec![
                Box::new(Pattern::new(r#""reviewCount":\s*([0-9]+)"#)),
                Box::new(Pattern::new(r#""visibleReviewCount":\s*"?([0-9]+)"#)),
                Box::new(Element::new(r#"span[data-testid="reviews-count"]"#).capture(r"(\d+)")),
            ],
        ),
        FieldRule::new(
            Field::Location,
            vec![
                Box::new(MetaTag::property("og:location")),
                Box::new(Pattern::new(r#""location":\s*\{[^}]*"city":"([^"]+)""#).json_string()),
                Box::new(Element::new(r#"span[data-testid="listing-location"]"#)),
            ],
        ),
        FieldRule::new(
            Field::BedroomCount,
            vec![
                Box::new(Pattern::new(r#""bedrooms":\s*([0-9]+)"#)),
                Box::new(Pattern::new(r"(?i)\b(\d+)\s*(?:quartos?|bedrooms?)\b")),
            ],
        ),
        FieldRule::new(
            Field::BathroomCount,
            vec![
                Box::new(Pattern::new(r#""bathrooms":\s*([0-9]+(?:\.[0-9]+)?)"#)),
                Box::new(Pattern::new(
                    r"(?i)\b(\d+(?:[.,]\d+)?)\s*(?:banheiros?|bathrooms?|baths?)\b",
                )),
            ],
        ),
        FieldRule::new(
            Field::GuestCapacity,
            vec![
                Box::new(Pattern::new(r#""personCapacity":\s*([0-9]+)"#)),
                Box::new(Pattern::new(r"(?i)\b(\d+)\s*(?:hóspedes?|guests?)\b")),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headline_cuts_at_separator() {
        assert_eq!(headline("Cozy Loft - City"), Some("Cozy Loft".to_string()));
        assert_eq!(headline("Cozy Loft"), Some("Cozy Loft".to_string()));
        assert_eq!(headline(" - Airbnb"), None);
        assert_eq!(headline("Casa-de-praia"), Some("Casa-de-praia".to_string()));
    }

    #[test]
    fn generic_titles_are_rejected() {
        assert!(is_generic_title("Airbnb"));
        assert!(is_generic_title(
            "Airbnb: aluguéis por temporada, cabanas, casas de praia e muito mais"
        ));
        assert!(!is_generic_title("Airbnb-style loft in Centro"));
        assert_eq!(page_title("Airbnb: Vacation Rentals, Cabins, Beach Houses"), None);
        assert_eq!(
            page_title("Apartamento no Centro - Airbnb"),
            Some("Apartamento no Centro".to_string())
        );
    }

    #[test]
    fn placeholder_left_after_the_cut_is_rejected() {
        assert_eq!(page_title("Airbnb - Rio de Janeiro"), None);
        assert_eq!(page_title("Airbnb: Vacation Rentals - Brasil"), None);
        assert_eq!(page_title("Airbnb"), None);
        assert_eq!(
            page_title("Loft Airbnb-ready - Rio"),
            Some("Loft Airbnb-ready".to_string())
        );
    }

    #[test]
    fn every_field_has_strategies() {
        let rules = default_rules();
        assert_eq!(rules.len(), 8);
        assert!(rules.iter().all(|r| !r.strategies.is_empty()));
        assert_eq!(rules[0].field, Field::Title);
    }
}
