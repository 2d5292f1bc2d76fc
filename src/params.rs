use std::borrow::Cow;
use tracing::trace;

/// Query parameters that never carry a filter
pub fn default_reserved_params() -> Vec<String> {
    ["page", "per_page", "limit", "offset", "sort", "order", "fields"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Split a raw query string into filter tokens
///
/// Pieces are separated by `&` and percent-decoded; `+` is kept as is. A
/// piece whose `key=...` prefix names a reserved parameter (pagination,
/// sorting, projection) is left out, everything else is returned in order.
pub fn filter_tokens(query: &str, reserved: &[String]) -> Vec<String> {
    let query = query.strip_prefix('?').unwrap_or(query);

    query
        .split('&')
        .filter(|piece| !piece.is_empty())
        .map(|piece| match urlencoding::decode(piece) {
            Ok(decoded) => decoded,
            Err(_) => Cow::Borrowed(piece),
        })
        .filter(|piece| {
            let keep = !is_reserved(piece, reserved);
            if !keep {
                trace!(param = %piece, "reserved query parameter skipped");
            }
            keep
        })
        .map(Cow::into_owned)
        .collect()
}

fn is_reserved(piece: &str, reserved: &[String]) -> bool {
    let key = piece.split_once('=').map_or(piece, |(key, _)| key);
    reserved.iter().any(|r| r == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_and_keeps_order() {
        let tokens = filter_tokens(
            "?age%3C%3D30&status=%7Bactive%3Bpending%7D&score!=[10;20]",
            &default_reserved_params(),
        );
        assert_eq!(
            tokens,
            vec!["age<=30", "status={active;pending}", "score!=[10;20]"]
        );
    }

    #[test]
    fn test_skips_reserved_parameters() {
        let tokens = filter_tokens(
            "page=2&age<=30&sort=name&limit=10&name=bob",
            &default_reserved_params(),
        );
        assert_eq!(tokens, vec!["age<=30", "name=bob"]);
    }

    #[test]
    fn test_reserved_name_used_with_another_operator_is_a_filter() {
        let tokens = filter_tokens("page<=3&&", &default_reserved_params());
        assert_eq!(tokens, vec!["page<=3"]);
    }

    #[test]
    fn test_invalid_percent_sequence_is_used_raw() {
        let tokens = filter_tokens("name=%FF", &[]);
        assert_eq!(tokens, vec!["name=%FF"]);
    }
}
