use crate::color::{Rgb, color_name};
use crate::data_models::{ClothingAttributes, DominantColor, RawVisionOutput};

/// A canonical value and the keywords that select it.
#[derive(Debug)]
pub struct Rule {
    pub value: &'static str,
    pub keywords: &'static [&'static str],
}

/// An ordered rule table. Rules are tried in declaration order and the first rule with a keyword
/// contained in any label wins, so earlier rules take priority over later ones.
#[derive(Debug)]
pub struct Taxonomy {
    pub name: &'static str,
    pub rules: &'static [Rule],
    pub default: &'static str,
}

impl Taxonomy {
    /// Case-insensitive; keywords are stored lowercase.
    pub fn classify<S: AsRef<str>>(&self, labels: &[S]) -> &'static str {
        let labels: Vec<String> = labels.iter().map(|l| l.as_ref().to_lowercase()).collect();
        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|kw| labels.iter().any(|label| label.contains(kw)))
            })
            .map(|rule| rule.value)
            .unwrap_or(self.default)
    }

    pub fn values(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.default).chain(self.rules.iter().map(|r| r.value))
    }
}

pub const CATEGORY: Taxonomy = Taxonomy {
    name: "category",
    rules: &[
        Rule { value: "t-shirt", keywords: &["t-shirt", "tee-shirt", "tee"] },
        Rule { value: "robe", keywords: &["robe", "dress"] },
        Rule { value: "pantalon", keywords: &["pantalon", "jeans", "pants", "trousers"] },
        // before chemise: "sweatshirt" contains "shirt"
        Rule {
            value: "pull",
            keywords: &["pull", "sweater", "pullover", "sweatshirt", "hoodie"],
        },
        Rule { value: "chemise", keywords: &["chemise", "shirt", "blouse"] },
        Rule { value: "veste", keywords: &["veste", "jacket", "blazer"] },
        Rule { value: "manteau", keywords: &["manteau", "coat"] },
        Rule { value: "jupe", keywords: &["jupe", "skirt"] },
        Rule { value: "short", keywords: &["short", "shorts"] },
    ],
    default: "vêtement",
};

pub const PATTERN: Taxonomy = Taxonomy {
    name: "pattern",
    rules: &[
        Rule { value: "rayé", keywords: &["stripes", "striped", "rayé", "rayures"] },
        Rule { value: "à pois", keywords: &["dots", "polka dots", "spotted", "pois"] },
        Rule {
            value: "à carreaux",
            keywords: &["checkered", "checked", "plaid", "tartan", "carreaux"],
        },
        Rule { value: "fleuri", keywords: &["floral", "flower", "flowers", "fleuri"] },
        Rule {
            value: "imprimé",
            keywords: &["print", "printed", "imprimé", "pattern", "motif"],
        },
    ],
    default: "uni",
};

pub const STYLE: Taxonomy = Taxonomy {
    name: "style",
    rules: &[
        Rule { value: "décontracté", keywords: &["casual", "décontracté", "casual wear"] },
        Rule {
            value: "élégant",
            keywords: &["formal", "business", "elegant", "formel", "élégant", "chic"],
        },
        Rule { value: "sportif", keywords: &["sport", "athletic", "sportif", "sportswear"] },
        Rule { value: "vintage", keywords: &["vintage", "retro", "rétro"] },
        Rule { value: "bohème", keywords: &["bohemian", "boho", "bohème"] },
    ],
    default: "décontracté",
};

/// Highest-scoring color; the earliest one wins ties, so unscored colors keep service order.
pub fn dominant_color(colors: &[DominantColor]) -> Option<&DominantColor> {
    let mut best: Option<&DominantColor> = None;
    for color in colors {
        match best {
            Some(b) if color.score <= b.score => {}
            _ => best = Some(color),
        }
    }
    best
}

/// Derives the clothing attributes of an image from its labels, web entities and colors.
/// Never fails: with no signal at all the taxonomy defaults and black are returned.
pub fn classify(vision: &RawVisionOutput) -> ClothingAttributes {
    let labels: Vec<String> = vision
        .labels
        .iter()
        .map(|l| l.description.as_str())
        .chain(vision.web_entities.iter().map(|e| e.description.as_str()))
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let main = dominant_color(&vision.colors)
        .map(|c| c.rgb)
        .unwrap_or(Rgb::BLACK);

    let attributes = ClothingAttributes {
        color_hex: main.to_hex(),
        color_name: color_name(main).to_string(),
        category: CATEGORY.classify(&labels).to_string(),
        pattern: PATTERN.classify(&labels).to_string(),
        style: STYLE.classify(&labels).to_string(),
        colors: vision.colors.iter().map(|c| c.rgb.to_hex()).collect(),
    };

    tracing::debug!(
        labels = labels.len(),
        category = %attributes.category,
        pattern = %attributes.pattern,
        style = %attributes.style,
        color = %attributes.color_name,
        "classified image"
    );

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::{Label, WebEntity};

    fn vision_with_labels(labels: &[&str]) -> RawVisionOutput {
        RawVisionOutput {
            labels: labels
                .iter()
                .map(|l| Label {
                    description: l.to_string(),
                    confidence: 0.9,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn color(r: u8, g: u8, b: u8, score: f32) -> DominantColor {
        DominantColor {
            rgb: Rgb::new(r, g, b),
            score,
            pixel_fraction: 0.1,
        }
    }

    #[test]
    fn test_empty_labels_yield_defaults() {
        let attributes = classify(&RawVisionOutput::default());
        assert_eq!(attributes.category, "vêtement");
        assert_eq!(attributes.pattern, "uni");
        assert_eq!(attributes.style, "décontracté");
        assert_eq!(attributes.color_hex, "#000000");
        assert_eq!(attributes.color_name, "noir");
        assert!(attributes.colors.is_empty());
    }

    #[test]
    fn test_dress_floral_elegant() {
        let mut vision = vision_with_labels(&["red dress", "floral pattern", "elegant"]);
        vision.colors = vec![color(210, 15, 20, 0.6)];
        let attributes = classify(&vision);
        assert_eq!(attributes.category, "robe");
        assert_eq!(attributes.pattern, "fleuri");
        assert_eq!(attributes.style, "élégant");
        assert_eq!(attributes.color_name, "rouge");
        assert_eq!(attributes.color_hex, "#d20f14");
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let attributes = classify(&vision_with_labels(&["Denim JEANS", "STRIPED"]));
        assert_eq!(attributes.category, "pantalon");
        assert_eq!(attributes.pattern, "rayé");
    }

    #[test]
    fn test_rule_order_beats_label_order() {
        // jacket is declared after dress, so dress wins whatever order the labels come in
        for labels in [["jacket", "dress"], ["dress", "jacket"]] {
            assert_eq!(CATEGORY.classify(&labels), "robe");
        }
        for labels in [["plaid", "polka dots"], ["polka dots", "plaid"]] {
            assert_eq!(PATTERN.classify(&labels), "à pois");
        }
        for labels in [["vintage", "sportswear"], ["sportswear", "vintage"]] {
            assert_eq!(STYLE.classify(&labels), "sportif");
        }
    }

    #[test]
    fn test_t_shirt_takes_priority_over_shirt() {
        assert_eq!(CATEGORY.classify(&["t-shirt"]), "t-shirt");
        assert_eq!(CATEGORY.classify(&["dress shirt"]), "robe");
        assert_eq!(CATEGORY.classify(&["blouse"]), "chemise");
    }

    #[test]
    fn test_web_entities_contribute() {
        let vision = RawVisionOutput {
            web_entities: vec![WebEntity {
                description: "Trench coat".into(),
                score: 0.7,
            }],
            ..Default::default()
        };
        assert_eq!(classify(&vision).category, "manteau");
    }

    #[test]
    fn test_classify_is_deterministic() {
        let vision = vision_with_labels(&["hoodie", "sport", "print"]);
        let first = classify(&vision);
        for _ in 0..5 {
            assert_eq!(classify(&vision), first);
        }
        assert_eq!(first.category, "pull");
        assert_eq!(first.pattern, "imprimé");
        assert_eq!(first.style, "sportif");
    }

    #[test]
    fn test_each_rule_keyword_selects_its_value() {
        let mut shadowed = vec![];
        for taxonomy in [&CATEGORY, &PATTERN, &STYLE] {
            for rule in taxonomy.rules {
                for keyword in rule.keywords {
                    let selected = taxonomy.classify(&[keyword]);
                    if selected != rule.value {
                        shadowed.push(format!(
                            "{}: {keyword:?} -> {selected} (expected {})",
                            taxonomy.name, rule.value
                        ));
                    }
                }
            }
        }
        assert!(shadowed.is_empty(), "{shadowed:?}");
    }

    #[test]
    fn test_sweatshirt_is_not_a_shirt() {
        assert_eq!(CATEGORY.classify(&["sweatshirt"]), "pull");
        assert_eq!(CATEGORY.classify(&["grey sweatshirt", "sleeve"]), "pull");
        assert_eq!(CATEGORY.classify(&["shirt"]), "chemise");
    }

    #[test]
    fn test_taxonomy_lowercases_labels() {
        assert_eq!(CATEGORY.classify(&["SWEATSHIRT"]), "pull");
        assert_eq!(PATTERN.classify(&["Polka Dots"]), "à pois");
        assert_eq!(STYLE.classify(&[String::from("Bohemian")]), "bohème");
    }

    #[test]
    fn test_dominant_color_prefers_score_then_order() {
        let colors = vec![color(0, 0, 255, 0.2), color(255, 0, 0, 0.5), color(0, 255, 0, 0.5)];
        assert_eq!(dominant_color(&colors).unwrap().rgb, Rgb::new(255, 0, 0));

        let unscored = vec![color(1, 2, 3, 0.0), color(4, 5, 6, 0.0)];
        assert_eq!(dominant_color(&unscored).unwrap().rgb, Rgb::new(1, 2, 3));

        assert!(dominant_color(&[]).is_none());
    }

    #[test]
    fn test_values_lists_default_first() {
        let values: Vec<_> = PATTERN.values().collect();
        assert_eq!(values[0], "uni");
        assert!(values.contains(&"fleuri"));
    }
}
