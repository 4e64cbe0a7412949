use std::str::FromStr;

use crate::classifier::{PATTERN, STYLE};
use crate::data_models::ClothingAttributes;

/// Market the search is biased toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    French,
    English,
}

impl Locale {
    /// Trailing terms that push the search engine toward shop pages.
    pub fn augmentation(&self) -> &'static str {
        match self {
            Locale::French => "acheter vêtement",
            Locale::English => "buy clothing online",
        }
    }

    /// Interface language / country code for the search API.
    pub fn code(&self) -> &'static str {
        match self {
            Locale::French => "fr",
            Locale::English => "en",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fr" | "fr-fr" | "french" => Ok(Locale::French),
            "en" | "en-us" | "en-gb" | "english" => Ok(Locale::English),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// `<colorName> <category>[ <pattern>][ <style>] <augmentation>`, single-spaced.
/// The plain pattern and the neutral style carry no information and are left out.
pub fn build_query(attributes: &ClothingAttributes, locale: Locale) -> String {
    let mut terms: Vec<&str> = vec![attributes.color_name.as_str(), attributes.category.as_str()];

    if attributes.pattern != PATTERN.default {
        terms.push(&attributes.pattern);
    }
    if attributes.style != STYLE.default {
        terms.push(&attributes.style);
    }
    terms.push(locale.augmentation());

    terms
        .iter()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<&str>>()
        .join(" ")
}
