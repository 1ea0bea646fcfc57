pub mod content;
pub mod rules;
pub mod strategy;

pub use content::main_content;
pub use rules::{default_rules, Field, FieldRule};
pub use strategy::{first_match, Element, MetaTag, Page, Pattern, Strategy};

use tracing::debug;

use crate::models::ExtractedMetadata;

/// Pulls listing metadata out of raw markup.
///
/// Extraction is total: a field whose strategies all miss stays `None`.
/// The same input always gives the same output.
pub struct Extractor {
    rules: Vec<FieldRule>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn extract(&self, raw: &str) -> ExtractedMetadata {
        let page = Page::parse(raw);
        let mut meta = ExtractedMetadata::default();

        for rule in &self.rules {
            let Some((strategy, value)) = first_match(&rule.strategies, &page) else {
                debug!("{:?}: no strategy matched", rule.field);
                continue;
            };
            debug!("{:?} = {:?} (via {})", rule.field, value, strategy);

            let slot = match rule.field {
                Field::Title => &mut meta.title,
                Field::Price => &mut meta.price,
                Field::Rating => &mut meta.rating,
                Field::ReviewCount => &mut meta.review_count,
                Field::Location => &mut meta.location,
                Field::BedroomCount => &mut meta.bedroom_count,
                Field::BathroomCount => &mut meta.bathroom_count,
                Field::GuestCapacity => &mut meta.guest_capacity,
            };
            // a field listed twice keeps its first hit
            slot.get_or_insert(value);
        }

        meta
    }
}
