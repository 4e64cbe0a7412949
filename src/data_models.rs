use serde::{Deserialize, Deserializer, Serialize};

use crate::color::Rgb;

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub description: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DominantColor {
    pub rgb: Rgb,
    pub score: f32,
    pub pixel_fraction: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebEntity {
    pub description: String,
    pub score: f32,
}

/// What the vision service saw in one image. Order is the service's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawVisionOutput {
    pub labels: Vec<Label>,
    pub colors: Vec<DominantColor>,
    pub web_entities: Vec<WebEntity>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClothingAttributes {
    #[serde(rename = "color")]
    pub color_hex: String,
    pub color_name: String,
    pub category: String,
    pub pattern: String,
    pub style: String,
    /// Hex codes of every dominant color, in service order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
}

/// One entry of a Custom Search response. Only the fields we read are modelled.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub display_link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub pagemap: Option<PageMap>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PageMap {
    #[serde(default)]
    pub offer: Vec<OfferMeta>,
    #[serde(default)]
    pub product: Vec<ProductMeta>,
    #[serde(default)]
    pub cse_image: Vec<ImageRef>,
    #[serde(default)]
    pub cse_thumbnail: Vec<ImageRef>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct OfferMeta {
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,
    #[serde(default)]
    pub pricecurrency: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProductMeta {
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,
    #[serde(default)]
    pub pricecurrency: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ImageRef {
    #[serde(default)]
    pub src: Option<String>,
}

/// Pagemap values are usually strings, but some sites publish bare numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub price: f64,
    pub currency: String,
    pub image_url: String,
    pub product_url: String,
    pub source: String,
    pub similarity: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub attributes: ClothingAttributes,
    pub products: Vec<Product>,
}
