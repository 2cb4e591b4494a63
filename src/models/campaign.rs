use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::Value as JsonValue;

/// Display metadata scraped for one product link.
///
/// `url` always carries a scheme and `title`/`image` are never empty, even when
/// the page could not be fetched; in that case `error` explains why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub title: String,
    pub image: String,
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignProduct {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: String,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub price: Option<String>,
}

/// Structured campaign produced by the synthesis stage and fed to the renderer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDescription {
    #[serde(default, deserialize_with = "lenient_string")]
    pub campaign_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub audience: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tone: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub call_to_action: String,
    #[serde(default)]
    pub products: Vec<CampaignProduct>,
}

// Models occasionally emit prices as bare numbers or nulls.
fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where D: Deserializer<'de>
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error> where D: Deserializer<'de> {
    Ok(lenient_optional_string(deserializer)?.unwrap_or_default())
}
