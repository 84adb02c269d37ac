//! Canonical on-disk filenames.

use super::transliterate::{transliterate, Scheme};
use crate::types::EntityDescriptor;

/// Build the canonical filename for an asset at `position`.
///
/// Layout: `<name>_<identifier>_<color>_<position+1><extension>`, where each
/// part is transliterated under the current scheme and empty parts are left
/// out entirely. Only the first non-empty of the two colors is used.
///
/// # Examples
///
/// ```
/// use catalog_media::naming::synthesize;
/// use catalog_media::EntityDescriptor;
///
/// let descriptor = EntityDescriptor {
///     identifier: "Шкаф-1".into(),
///     name: Some("Шкаф купе".into()),
///     color: None,
///     color_secondary: Some("Белый".into()),
/// };
/// assert_eq!(synthesize(&descriptor, 0, "JPG"), "shkaf_kupe_shkaf-1_belyy_1.jpg");
/// ```
pub fn synthesize(descriptor: &EntityDescriptor, position: u32, extension: &str) -> String {
    let color = [&descriptor.color, &descriptor.color_secondary]
        .into_iter()
        .flatten()
        .map(|c| transliterate(c, Scheme::Current))
        .find(|c| !c.is_empty());

    let mut parts: Vec<String> = [
        descriptor.name.as_deref().unwrap_or_default(),
        descriptor.identifier.as_str(),
    ]
    .into_iter()
    .map(|p| transliterate(p, Scheme::Current))
    .filter(|p| !p.is_empty())
    .collect();
    parts.extend(color);
    parts.push((u64::from(position) + 1).to_string());

    format!("{}{}", parts.join("_"), normalize_extension(extension))
}

/// Normalize an extension to lower-case `.ext` form.
///
/// Accepts `jpg`, `.JPG`, or `..jpg`; anything that is not ASCII
/// alphanumeric is dropped. Returns an empty string when nothing is left.
pub fn normalize_extension(extension: &str) -> String {
    let cleaned: String = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if cleaned.is_empty() {
        String::new()
    } else {
        format!(".{}", cleaned)
    }
}

/// The extension of an existing filename, including its dot.
pub fn extension_of(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(0) | None => "",
        Some(pos) => &filename[pos..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(identifier: &str, name: Option<&str>, c1: Option<&str>, c2: Option<&str>) -> EntityDescriptor {
        EntityDescriptor {
            identifier: identifier.to_string(),
            name: name.map(String::from),
            color: c1.map(String::from),
            color_secondary: c2.map(String::from),
        }
    }

    #[test]
    fn test_full_descriptor() {
        let d = descriptor("SKU-7", Some("Corner Desk"), Some("Oak"), Some("White"));
        assert_eq!(synthesize(&d, 2, ".jpg"), "corner_desk_sku-7_oak_3.jpg");
    }

    #[test]
    fn test_empty_parts_are_omitted() {
        let d = descriptor("Шкаф-1", None, Some(""), None);
        assert_eq!(synthesize(&d, 0, "png"), "shkaf-1_1.png");

        let d = descriptor("", None, None, None);
        assert_eq!(synthesize(&d, 4, "webp"), "5.webp");
    }

    #[test]
    fn test_second_color_used_when_first_is_blank() {
        let d = descriptor("kit", Some("Kit"), Some(""), Some("Чёрный"));
        assert_eq!(synthesize(&d, 1, "jpg"), "kit_kit_chyornyy_2.jpg");
    }

    #[test]
    fn test_position_changes_only_suffix() {
        let d = descriptor("a1", Some("Stool"), None, None);
        assert_eq!(synthesize(&d, 0, "jpg"), "stool_a1_1.jpg");
        assert_eq!(synthesize(&d, 9, "jpg"), "stool_a1_10.jpg");
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("JPG"), ".jpg");
        assert_eq!(normalize_extension(".jpeg"), ".jpeg");
        assert_eq!(normalize_extension("..p n g"), ".png");
        assert_eq!(normalize_extension(""), "");
        assert_eq!(normalize_extension("."), "");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("stool_a1_1.jpg"), ".jpg");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of(".hidden"), "");
    }
}
