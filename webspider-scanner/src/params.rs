use crate::result::{QueryParams, QueryValue};
use url::Url;
use url::form_urlencoded;

/// Query parameters from the URL's own query string.
///
/// A key seen once maps to a scalar, a repeated key to its values in order.
/// Pairs with an empty value are dropped, so a query without any `key=value`
/// segment yields an empty mapping.
pub fn extract_query_params(url: &str) -> QueryParams {
    let Ok(parsed) = Url::parse(url) else {
        return QueryParams::new();
    };
    let mut params = QueryParams::new();
    for (key, value) in parsed.query_pairs() {
        if value.is_empty() {
            continue;
        }
        let value = value.into_owned();
        match params.remove(key.as_ref()) {
            None => {
                params.insert(key.into_owned(), QueryValue::Single(value));
            }
            Some(QueryValue::Single(first)) => {
                params.insert(key.into_owned(), QueryValue::Multiple(vec![first, value]));
            }
            Some(QueryValue::Multiple(mut values)) => {
                values.push(value);
                params.insert(key.into_owned(), QueryValue::Multiple(values));
            }
        }
    }
    params
}

/// Encode parameters back into a query string, repeating keys for list values.
pub fn encode_query_params(params: &QueryParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        match value {
            QueryValue::Single(v) => {
                serializer.append_pair(key, v);
            }
            QueryValue::Multiple(values) => {
                for v in values {
                    serializer.append_pair(key, v);
                }
            }
        }
    }
    serializer.finish()
}
