use crate::error::{Result, ScraperError};
use crate::types::{FieldKind, FieldSpec, FieldValue, PlayerRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

// First number in a string, allowing thousands separators: "1,234 pts", "-7", "52.5%"
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?|-?\.\d+").expect("valid number regex"));

struct CompiledField {
    spec: FieldSpec,
    selector: Selector,
}

/// Extracts the configured fields from a profile page
pub struct ProfileParser {
    fields: Vec<CompiledField>,
}

impl ProfileParser {
    /// Compiles every selector up front so a typo fails before any request is made.
    pub fn new(specs: &[FieldSpec]) -> Result<Self> {
        let fields = specs
            .iter()
            .map(|spec| {
                let selector = Selector::parse(&spec.selector).map_err(|e| {
                    ScraperError::Config(format!(
                        "invalid selector '{}' for field '{}': {:?}",
                        spec.selector, spec.name, e
                    ))
                })?;
                Ok(CompiledField {
                    spec: spec.clone(),
                    selector,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { fields })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.spec.name.as_str())
    }

    #[instrument(skip(self, html), fields(bytes = html.len()))]
    pub fn parse(&self, player: &str, source: &str, html: &str) -> Result<PlayerRecord> {
        let document = Html::parse_document(html);
        let mut record = PlayerRecord::new(player, source);

        for field in &self.fields {
            let spec = &field.spec;
            let raw = document.select(&field.selector).next().and_then(|el| {
                let text = match &spec.attr {
                    Some(attr) => el.value().attr(attr).map(normalize_ws),
                    None => Some(normalize_ws(&el.text().collect::<Vec<_>>().join(" "))),
                };
                text.filter(|t| !t.is_empty())
            });

            let Some(raw) = raw else {
                if spec.required {
                    return Err(ScraperError::Parse(format!(
                        "field '{}' not found for player '{}' (selector '{}')",
                        spec.name, player, spec.selector
                    )));
                }
                debug!("Optional field '{}' missing", spec.name);
                continue;
            };

            let value = convert(&raw, spec.kind).ok_or_else(|| {
                ScraperError::Parse(format!(
                    "field '{}' for player '{}' is not a valid {:?}: '{}'",
                    spec.name, player, spec.kind, raw
                ))
            })?;
            record.fields.insert(spec.name.clone(), value);
        }

        debug!("Parsed {} fields", record.fields.len());
        Ok(record)
    }
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_number(s: &str) -> Option<String> {
    NUMBER_RE.find(s).map(|m| m.as_str().replace(',', ""))
}

fn convert(raw: &str, kind: FieldKind) -> Option<FieldValue> {
    match kind {
        FieldKind::Text => Some(FieldValue::Text(raw.to_string())),
        FieldKind::Integer => {
            let n = first_number(raw)?;
            n.parse::<i64>().ok().map(FieldValue::Integer)
        }
        FieldKind::Float => {
            let n = first_number(raw)?;
            n.parse::<f64>().ok().map(FieldValue::Float)
        }
    }
}
