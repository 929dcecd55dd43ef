//! Request path resolution: application name, base path and template match.

/// Split `{prefix}/{application}/{rest}` into the application name and the
/// api path (`/{rest}`).
#[must_use]
pub fn extract_api_name_and_path<'a>(prefix: &str, uri_path: &'a str) -> Option<(&'a str, &'a str)> {
    let prefix = prefix.trim_end_matches('/');
    let rest = uri_path.strip_prefix(prefix)?.strip_prefix('/')?;
    let slash = rest.find('/')?;
    let (name, api_path) = rest.split_at(slash);
    if name.is_empty() {
        return None;
    }
    Some((name, api_path))
}

/// Strip the first matching server base path, trying longer (lexicographically
/// greater) bases first. `None` when no server applies.
#[must_use]
pub fn adjust_base_path(path: &str, servers: &[String]) -> Option<String> {
    let mut bases: Vec<&str> = servers.iter().map(String::as_str).collect();
    bases.sort_unstable_by(|a, b| b.cmp(a));
    bases.into_iter().find_map(|base| match base {
        "" | "/" => Some(path.to_owned()),
        base => {
            let base = base.trim_end_matches('/');
            let rest = path.strip_prefix(base)?;
            (rest.is_empty() || rest.starts_with('/')).then(|| rest.to_owned())
        }
    })
}

/// Exact key first, then the first template whose segments match.
#[must_use]
pub fn find_matching_path<'t, I>(path: &str, templates: I) -> Option<&'t str>
where
    I: IntoIterator<Item = &'t str>,
    I::IntoIter: Clone,
{
    let mut templates = templates.into_iter();
    if let Some(exact) = templates.clone().find(|t| *t == path) {
        return Some(exact);
    }
    templates.find(|t| template_matches(t, path))
}

fn is_variable(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
}

fn template_matches(template: &str, path: &str) -> bool {
    let mut template_segments = template.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (template_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(t), Some(p)) => {
                let matched = if is_variable(t) { !p.is_empty() } else { t == p };
                if !matched {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// `(name, value)` for every template variable, percent-decoded, in template
/// order. Empty when `path` does not match `template`.
#[must_use]
pub fn extract_path_variables(path: &str, template: &str) -> Vec<(String, String)> {
    if !template_matches(template, path) {
        return Vec::new();
    }
    template
        .split('/')
        .zip(path.split('/'))
        .filter(|(t, _)| is_variable(t))
        .map(|(t, p)| (t[1..t.len() - 1].to_owned(), percent_decode(p)))
        .collect()
}

/// Malformed escapes stay literal; invalid UTF-8 becomes U+FFFD.
fn percent_decode(segment: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_application_and_path() {
        assert_eq!(
            extract_api_name_and_path("/oas", "/oas/petstore/v1/pets/1"),
            Some(("petstore", "/v1/pets/1"))
        );
        assert_eq!(extract_api_name_and_path("/oas", "/oas/petstore"), None);
        assert_eq!(extract_api_name_and_path("/oas", "/other/petstore/x"), None);
        assert_eq!(extract_api_name_and_path("/oas", "/oas//x"), None);
        assert_eq!(
            extract_api_name_and_path("/", "/petstore/ping"),
            Some(("petstore", "/ping"))
        );
    }

    #[test]
    fn longest_base_path_wins() {
        let servers = vec!["/".to_owned(), "/v1".to_owned(), "/v1/admin".to_owned()];
        assert_eq!(adjust_base_path("/v1/admin/users", &servers).as_deref(), Some("/users"));
        assert_eq!(adjust_base_path("/v1/pets", &servers).as_deref(), Some("/pets"));
        assert_eq!(adjust_base_path("/pets", &servers).as_deref(), Some("/pets"));
    }

    #[test]
    fn unmatched_base_path_is_no_match() {
        let servers = vec!["/v1".to_owned()];
        assert_eq!(adjust_base_path("/v2/pets", &servers), None);
        assert_eq!(adjust_base_path("/v10/pets", &servers), None);
    }

    #[test]
    fn exact_key_beats_template() {
        let templates = ["/pets/{id}", "/pets/mine"];
        assert_eq!(find_matching_path("/pets/mine", templates), Some("/pets/mine"));
        assert_eq!(find_matching_path("/pets/7", templates), Some("/pets/{id}"));
        assert_eq!(find_matching_path("/pets", templates), None);
    }

    #[test]
    fn trailing_slash_is_significant() {
        assert_eq!(find_matching_path("/path/1/", ["/path/{val}"]), None);
        assert_eq!(find_matching_path("/path2/2/", ["/path2/{val}/"]), Some("/path2/{val}/"));
        assert_eq!(find_matching_path("/path//", ["/path/{val}/"]), None);
    }

    #[test]
    fn variables_are_decoded_in_order() {
        assert_eq!(
            extract_path_variables("/owners/a%20b/pets/7", "/owners/{owner}/pets/{id}"),
            vec![
                ("owner".to_owned(), "a b".to_owned()),
                ("id".to_owned(), "7".to_owned())
            ]
        );
        assert!(extract_path_variables("/x", "/owners/{owner}").is_empty());
    }

    #[test]
    fn malformed_escapes_are_kept() {
        assert_eq!(
            extract_path_variables("/tags/100%25%zz%E2%9C%93", "/tags/{tag}"),
            vec![("tag".to_owned(), "100%%zz\u{2713}".to_owned())]
        );
        assert_eq!(
            extract_path_variables("/tags/%FF", "/tags/{tag}"),
            vec![("tag".to_owned(), "\u{FFFD}".to_owned())]
        );
    }
}
