use mime::Mime;

pub const APPLICATION_JSON: &str = "application/json";

/// `type/subtype` of a media type, lower-cased, parameters dropped.
#[must_use]
pub fn essence(media_type: &str) -> String {
    match media_type.trim().parse::<Mime>() {
        Ok(mime) => mime.essence_str().to_ascii_lowercase(),
        Err(_) => media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase(),
    }
}

#[must_use]
pub fn same_essence(a: &str, b: &str) -> bool {
    essence(a) == essence(b)
}

/// `application/json` or any `+json` suffix type.
#[must_use]
pub fn is_json(media_type: &str) -> bool {
    let essence = essence(media_type);
    essence == APPLICATION_JSON || essence.ends_with("+json")
}
