use rand::Rng;
use rand::seq::SliceRandom;

use crate::data_models::{AnalysisResult, ClothingAttributes, Product};
use crate::normalizer::{
    DEFAULT_CURRENCY, SimilarityPolicy, capitalize, placeholder_image, synthetic_price,
};
use crate::rng::token;

pub const FALLBACK_PRODUCT_COUNT: usize = 8;
const FALLBACK_PRODUCT_URL: &str = "https://example.com/product";

/// Categories and the color drawn with each.
const CATEGORY_COLORS: &[(&str, &str, &str)] = &[
    ("robe", "#ff0000", "rouge"),
    ("t-shirt", "#0000ff", "bleu"),
    ("pantalon", "#008000", "vert"),
    ("chemise", "#000000", "noir"),
    ("veste", "#ffffff", "blanc"),
    ("pull", "#ffc0cb", "rose"),
];
const PATTERNS: &[&str] = &["uni", "rayé", "à carreaux", "imprimé", "fleuri"];
const STYLES: &[&str] = &["décontracté", "élégant", "sportif", "vintage", "bohème"];
const STORES: &[&str] = &[
    "Zara",
    "H&M",
    "Mango",
    "Uniqlo",
    "Asos",
    "Zalando",
    "Bershka",
    "Pull & Bear",
];

/// Builds a complete, well-formed result without any external service.
#[derive(Debug, Clone, Default)]
pub struct FallbackGenerator {
    similarity: SimilarityPolicy,
}

impl FallbackGenerator {
    pub fn new(similarity: SimilarityPolicy) -> Self {
        Self { similarity }
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> AnalysisResult {
        let attributes = Self::attributes(rng);
        let products = (0..FALLBACK_PRODUCT_COUNT)
            .map(|rank| self.product(rank, &attributes, rng))
            .collect();
        AnalysisResult {
            attributes,
            products,
        }
    }

    fn attributes<R: Rng + ?Sized>(rng: &mut R) -> ClothingAttributes {
        let (category, color_hex, color_name) =
            CATEGORY_COLORS[rng.gen_range(0..CATEGORY_COLORS.len())];
        let pattern = PATTERNS.choose(rng).copied().unwrap_or(PATTERNS[0]);
        let style = STYLES.choose(rng).copied().unwrap_or(STYLES[0]);

        ClothingAttributes {
            color_hex: color_hex.to_string(),
            color_name: color_name.to_string(),
            category: category.to_string(),
            pattern: pattern.to_string(),
            style: style.to_string(),
            colors: vec![color_hex.to_string()],
        }
    }

    fn product<R: Rng + ?Sized>(
        &self,
        rank: usize,
        attributes: &ClothingAttributes,
        rng: &mut R,
    ) -> Product {
        let style = capitalize(&attributes.style).unwrap_or_default();
        let store = STORES[rank % STORES.len()];

        Product {
            id: format!("mock-{rank}-{}", token(rng, 10)),
            name: format!(
                "{} {} {} {}",
                style, attributes.category, attributes.pattern, attributes.color_name
            ),
            brand: store.to_string(),
            price: synthetic_price(rng),
            currency: DEFAULT_CURRENCY.to_string(),
            image_url: placeholder_image(&attributes.category, &attributes.color_name),
            product_url: FALLBACK_PRODUCT_URL.to_string(),
            source: store.to_string(),
            similarity: self.similarity.score(rank),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{CATEGORY, PATTERN, STYLE};
    use crate::color::color_name_for_hex;
    use crate::rng::RandomSource;
    use std::collections::HashSet;

    #[test]
    fn test_generated_result_is_well_formed() {
        let result = FallbackGenerator::default().generate(&mut RandomSource::Seeded(11).rng());

        assert_eq!(result.products.len(), FALLBACK_PRODUCT_COUNT);
        assert!(CATEGORY.values().any(|v| v == result.attributes.category));
        assert!(PATTERN.values().any(|v| v == result.attributes.pattern));
        assert!(STYLE.values().any(|v| v == result.attributes.style));
        assert_eq!(
            color_name_for_hex(&result.attributes.color_hex).unwrap(),
            result.attributes.color_name
        );

        let ids: HashSet<&str> = result.products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), FALLBACK_PRODUCT_COUNT);
        for product in &result.products {
            assert!((19.99..=69.99).contains(&product.price));
            assert!((0.0..=1.0).contains(&product.similarity));
            assert_eq!(product.currency, "€");
            assert!(product.name.contains(&result.attributes.category));
        }
        assert!(
            result
                .products
                .windows(2)
                .all(|w| w[0].similarity > w[1].similarity)
        );
    }

    #[test]
    fn test_same_seed_same_result() {
        let generator = FallbackGenerator::default();
        let a = generator.generate(&mut RandomSource::Seeded(5).rng());
        let b = generator.generate(&mut RandomSource::Seeded(5).rng());
        assert_eq!(a, b);
    }

    #[test]
    fn test_stores_follow_rank() {
        let result = FallbackGenerator::default().generate(&mut RandomSource::Seeded(2).rng());
        let sources: Vec<&str> = result.products.iter().map(|p| p.source.as_str()).collect();
        assert_eq!(sources, STORES);
    }
}
