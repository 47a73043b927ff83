//! Item id extraction from card elements

use super::CardElement;
use regex::Regex;
use std::sync::LazyLock;

/// `id=<32 hex>` as a query parameter (not `serverId=` or `ParentId=`)
static HREF_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[?&#])id=([a-f0-9]{32})").expect("href id pattern is valid")
});

/// `/Items/<32 hex>/` inside an image URL
static IMAGE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/Items/([a-f0-9]{32})/").expect("image id pattern is valid")
});

/// Extract the item id from a link target
pub fn item_id_from_href(href: &str) -> Option<String> {
    HREF_ID
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the item id from a background-image value
pub fn item_id_from_background(background: &str) -> Option<String> {
    IMAGE_ID
        .captures(background)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Item id for a card: link target first, then background image
pub fn item_id(element: &dyn CardElement) -> Option<String> {
    element
        .href()
        .as_deref()
        .and_then(item_id_from_href)
        .or_else(|| {
            element
                .background_image()
                .as_deref()
                .and_then(item_id_from_background)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "abc123abc123abc123abc123abc123ab";

    #[test]
    fn extracts_from_href_query() {
        let href = format!("https://media.local/web/#/details?id={}&serverId=f00", ID);
        assert_eq!(item_id_from_href(&href).as_deref(), Some(ID));
    }

    #[test]
    fn href_match_is_case_insensitive() {
        let upper = ID.to_uppercase();
        let href = format!("#/details?ID={}", upper);
        assert_eq!(item_id_from_href(&href), Some(upper));
    }

    #[test]
    fn ignores_other_id_parameters() {
        let href = format!("#/details?serverId={}", ID);
        assert_eq!(item_id_from_href(&href), None);
    }

    #[test]
    fn rejects_short_ids() {
        assert_eq!(item_id_from_href("#/details?id=abc123"), None);
        assert_eq!(item_id_from_href("#/home"), None);
    }

    #[test]
    fn extracts_from_background_image() {
        let bg = format!(
            "url(\"https://media.local/Items/{}/Images/Primary?fillHeight=396&quality=96\")",
            ID
        );
        assert_eq!(item_id_from_background(&bg).as_deref(), Some(ID));
        assert_eq!(item_id_from_background("url(\"/Users/x/Images\")"), None);
    }
}
