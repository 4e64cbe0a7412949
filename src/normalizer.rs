use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::Url;

use crate::data_models::{ClothingAttributes, Product, RawSearchItem};
use crate::rng::token;

pub const DEFAULT_CURRENCY: &str = "€";
pub const UNKNOWN_BRAND: &str = "Marque inconnue";
pub const UNKNOWN_SOURCE: &str = "Google Shopping";

/// Checked in this order; the first one present in a title splits it.
const TITLE_SEPARATORS: &[&str] = &[" - ", " | ", " : ", " – ", " — "];

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d.,]*").unwrap());
static SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[€$£¥]").unwrap());
static PRICE_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<sym1>[€$£¥])\s*(?P<num1>\d[\d.,]*)",
        r"|(?P<num2>\d[\d.,]*)\s*(?P<sym2>[€$£¥])",
    ))
    .unwrap()
});

/// Rank based confidence: `max(floor, base - rank * step)`, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityPolicy {
    pub base: f64,
    pub step: f64,
    pub floor: f64,
}

impl Default for SimilarityPolicy {
    fn default() -> Self {
        Self {
            base: 0.95,
            step: 0.07,
            floor: 0.35,
        }
    }
}

impl SimilarityPolicy {
    pub fn score(&self, rank: usize) -> f64 {
        round2((self.base - rank as f64 * self.step).max(self.floor))
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A plausible shop price between 19.99 and 69.99.
pub(crate) fn synthetic_price<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    round2(rng.gen_range(0..=50) as f64 + 19.99)
}

pub(crate) fn placeholder_image(category: &str, color_name: &str) -> String {
    let raw = format!("https://source.unsplash.com/random/300x400?{category},{color_name}");
    Url::parse(&raw).map(String::from).unwrap_or(raw)
}

fn iso_to_symbol(code: &str) -> Option<&'static str> {
    match code.trim().to_uppercase().as_str() {
        "EUR" => Some("€"),
        "USD" => Some("$"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        _ => None,
    }
}

/// Parses a price that may use `,` or `.` for decimals and the other one for thousands.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches(['.', ',']);
    let normalized: String = match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let (decimal, thousands) = if dot > comma { ('.', ',') } else { (',', '.') };
            s.chars()
                .filter(|&c| c != thousands)
                .map(|c| if c == decimal { '.' } else { c })
                .collect()
        }
        (Some(pos), None) | (None, Some(pos)) => {
            let sep = if s.as_bytes()[pos] == b'.' { '.' } else { ',' };
            let digits_after = s.len() - pos - 1;
            if s.matches(sep).count() > 1 || digits_after == 3 {
                s.chars().filter(|&c| c != sep).collect()
            } else {
                s.replace(sep, ".")
            }
        }
        (None, None) => s.to_string(),
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
        .map(round2)
}

/// Structured price string such as `"€29.99"`, `"29,99"` or `"39.90 EUR"`.
fn parse_structured_price(price: &str, currency_code: Option<&str>) -> Option<(f64, String)> {
    let amount = parse_decimal(NUMBER.find(price)?.as_str())?;
    let currency = SYMBOL
        .find(price)
        .map(|m| m.as_str())
        .or_else(|| currency_code.and_then(iso_to_symbol))
        .or_else(|| {
            price
                .split(|c: char| !c.is_ascii_alphabetic())
                .find_map(iso_to_symbol)
        })
        .unwrap_or(DEFAULT_CURRENCY);
    Some((amount, currency.to_string()))
}

/// First `<symbol><amount>` or `<amount><symbol>` in free text.
pub fn price_from_text(text: &str) -> Option<(f64, String)> {
    PRICE_IN_TEXT.captures_iter(text).find_map(|caps| {
        let (symbol, number) = match (caps.name("sym1"), caps.name("num1")) {
            (Some(sym), Some(num)) => (sym, num),
            _ => (caps.name("sym2")?, caps.name("num2")?),
        };
        parse_decimal(number.as_str()).map(|amount| (amount, symbol.as_str().to_string()))
    })
}

fn extract_price(item: &RawSearchItem) -> Option<(f64, String)> {
    if let Some(pagemap) = &item.pagemap {
        let from_offer = pagemap.offer.first().and_then(|offer| {
            parse_structured_price(offer.price.as_deref()?, offer.pricecurrency.as_deref())
        });
        let from_product = || {
            pagemap.product.first().and_then(|product| {
                parse_structured_price(product.price.as_deref()?, product.pricecurrency.as_deref())
            })
        };
        if let Some(found) = from_offer.or_else(from_product) {
            return Some(found);
        }
    }

    [item.title.as_deref(), item.snippet.as_deref()]
        .into_iter()
        .flatten()
        .find_map(price_from_text)
}

/// Splits a listing title into `(brand, name)`.
pub fn split_title(title: &str) -> Option<(String, String)> {
    let title = title.trim();

    for sep in TITLE_SEPARATORS {
        if let Some((left, right)) = title.split_once(sep) {
            let (left, right) = (left.trim(), right.trim());
            if !left.is_empty() && !right.is_empty() {
                return Some((left.to_string(), right.to_string()));
            }
        }
    }

    let (first, rest) = title.split_once(char::is_whitespace)?;
    let rest = rest.trim();
    if first.is_empty() || rest.is_empty() {
        return None;
    }
    Some((first.to_string(), rest.to_string()))
}

fn brand_and_name(item: &RawSearchItem, attributes: &ClothingAttributes) -> (String, String) {
    let structured_brand = item
        .pagemap
        .as_ref()
        .and_then(|p| p.product.first())
        .and_then(|p| p.brand.as_deref())
        .map(str::trim)
        .filter(|b| !b.is_empty());

    let title = item
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match (structured_brand, title) {
        (Some(brand), Some(title)) => (brand.to_string(), title.to_string()),
        (Some(brand), None) => (brand.to_string(), describe(attributes)),
        (None, Some(title)) => {
            split_title(title).unwrap_or_else(|| (UNKNOWN_BRAND.to_string(), title.to_string()))
        }
        (None, None) => (UNKNOWN_BRAND.to_string(), describe(attributes)),
    }
}

fn describe(attributes: &ClothingAttributes) -> String {
    format!(
        "{} {} {} {}",
        attributes.style, attributes.category, attributes.pattern, attributes.color_name
    )
}

fn extract_image(item: &RawSearchItem, attributes: &ClothingAttributes) -> String {
    item.pagemap
        .as_ref()
        .and_then(|p| {
            p.cse_image
                .first()
                .and_then(|i| i.src.clone())
                .or_else(|| p.cse_thumbnail.first().and_then(|i| i.src.clone()))
                .or_else(|| p.product.first().and_then(|i| i.image.clone()))
        })
        .filter(|src| !src.trim().is_empty())
        .unwrap_or_else(|| placeholder_image(&attributes.category, &attributes.color_name))
}

/// `www.zalando.fr` becomes `Zalando`.
pub fn source_name(item: &RawSearchItem) -> String {
    let host = item
        .display_link
        .clone()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            let link = item.link.as_deref()?;
            Url::parse(link).ok()?.host_str().map(str::to_string)
        });

    host.and_then(|h| {
        let h = h.trim();
        let h = h.strip_prefix("www.").unwrap_or(h);
        let label = h.split(['.', '/']).next()?;
        capitalize(label)
    })
    .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

pub(crate) fn capitalize(s: &str) -> Option<String> {
    let mut chars = s.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

fn product_url(item: &RawSearchItem, name: &str) -> String {
    match item.link.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(link) => link.to_string(),
        None => Url::parse_with_params(
            "https://www.google.com/search",
            &[("tbm", "shop"), ("q", name)],
        )
        .map(String::from)
        .unwrap_or_default(),
    }
}

/// Turns ranked search hits into products, one per hit, in the same order.
#[derive(Debug, Clone, Default)]
pub struct ResultNormalizer {
    similarity: SimilarityPolicy,
}

impl ResultNormalizer {
    pub fn new(similarity: SimilarityPolicy) -> Self {
        Self { similarity }
    }

    pub fn similarity(&self) -> &SimilarityPolicy {
        &self.similarity
    }

    pub fn normalize<R: Rng + ?Sized>(
        &self,
        items: &[RawSearchItem],
        attributes: &ClothingAttributes,
        rng: &mut R,
    ) -> Vec<Product> {
        items
            .iter()
            .enumerate()
            .map(|(rank, item)| self.normalize_one(rank, item, attributes, rng))
            .collect()
    }

    fn normalize_one<R: Rng + ?Sized>(
        &self,
        rank: usize,
        item: &RawSearchItem,
        attributes: &ClothingAttributes,
        rng: &mut R,
    ) -> Product {
        let (price, currency) = extract_price(item)
            .unwrap_or_else(|| (synthetic_price(rng), DEFAULT_CURRENCY.to_string()));
        let (brand, name) = brand_and_name(item, attributes);

        Product {
            id: format!("google-{rank}-{}", token(rng, 10)),
            product_url: product_url(item, &name),
            image_url: extract_image(item, attributes),
            source: source_name(item),
            similarity: self.similarity.score(rank),
            name,
            brand,
            price,
            currency,
        }
    }
}
