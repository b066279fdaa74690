//! User-facing strings with host overrides.

use smol_str::SmolStr;

/// The strings the editor core surfaces to users. Hosts override any subset
/// through [`DictionaryOverlay`]; the merge is pure and happens once at
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dictionary {
    pub placeholder: SmolStr,
    pub new_link_placeholder: SmolStr,
    pub searching: SmolStr,
    pub no_results: SmolStr,
    pub create_link: SmolStr,
    pub image_upload_error: SmolStr,
    pub image_caption_placeholder: SmolStr,
    pub find_or_create_doc: SmolStr,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self {
            placeholder: SmolStr::new("Write something nice…"),
            new_link_placeholder: SmolStr::new("Paste a link or search"),
            searching: SmolStr::new("Searching…"),
            no_results: SmolStr::new("No results"),
            create_link: SmolStr::new("Create link"),
            image_upload_error: SmolStr::new("Sorry, an error occurred uploading the image"),
            image_caption_placeholder: SmolStr::new("Write a caption"),
            find_or_create_doc: SmolStr::new("Find or create a doc…"),
        }
    }
}

impl Dictionary {
    /// Overlay host strings over the defaults; `None` fields keep defaults.
    pub fn merged(overlay: DictionaryOverlay) -> Self {
        let mut dict = Self::default();
        macro_rules! take {
            ($($field:ident),*) => {
                $(if let Some(v) = overlay.$field { dict.$field = v; })*
            };
        }
        take!(
            placeholder,
            new_link_placeholder,
            searching,
            no_results,
            create_link,
            image_upload_error,
            image_caption_placeholder,
            find_or_create_doc
        );
        dict
    }
}

/// Host-supplied string overrides.
#[derive(Clone, Debug, Default)]
pub struct DictionaryOverlay {
    pub placeholder: Option<SmolStr>,
    pub new_link_placeholder: Option<SmolStr>,
    pub searching: Option<SmolStr>,
    pub no_results: Option<SmolStr>,
    pub create_link: Option<SmolStr>,
    pub image_upload_error: Option<SmolStr>,
    pub image_caption_placeholder: Option<SmolStr>,
    pub find_or_create_doc: Option<SmolStr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_defaults_for_unset_fields() {
        let merged = Dictionary::merged(DictionaryOverlay {
            placeholder: Some(SmolStr::new("Start typing")),
            ..Default::default()
        });
        assert_eq!(merged.placeholder, "Start typing");
        assert_eq!(merged.no_results, Dictionary::default().no_results);
    }

    #[test]
    fn test_merge_is_pure() {
        let a = Dictionary::merged(DictionaryOverlay::default());
        let b = Dictionary::merged(DictionaryOverlay::default());
        assert_eq!(a, b);
        assert_eq!(a, Dictionary::default());
    }
}
