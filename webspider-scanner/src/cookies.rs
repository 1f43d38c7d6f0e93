use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parse `name1=value1; name2=value2` into ordered pairs.
/// Segments without `=` or with an empty name are skipped.
pub fn parse_cookie_string(raw: &str) -> Vec<Cookie> {
    raw.split(';')
        .filter_map(|segment| {
            let segment = segment.trim();
            if segment.is_empty() {
                return None;
            }
            let Some((name, value)) = segment.split_once('=') else {
                debug!("Skipping malformed cookie segment '{}'", segment);
                return None;
            };
            let name = name.trim();
            if name.is_empty() {
                debug!("Skipping cookie segment with empty name '{}'", segment);
                return None;
            }
            Some(Cookie::new(name, value.trim()))
        })
        .collect()
}
