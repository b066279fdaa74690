//! Image and embed extensions. Both are rendered by host adapters.

use std::rc::Rc;

use smol_str::SmolStr;
use vellum_model::{AttrSpec, AttrValue, NodeSpec, TypeContribution};

use crate::extension::{Extension, MarkdownRules};
use crate::markdown::serializer::{escape_link_title, escape_link_url, escape_markdown};

/// Layout classes the image title field can carry instead of a caption.
pub const IMAGE_LAYOUTS: [&str; 3] = ["left-50", "right-50", "full-width"];

pub fn image() -> Extension {
    Extension::new("image")
        .with_type(
            "image",
            TypeContribution::Node(NodeSpec {
                content: None,
                group: None,
                inline: true,
                attrs: vec![
                    AttrSpec::new("src", AttrValue::Null),
                    AttrSpec::new("alt", AttrValue::Null),
                    AttrSpec::new("title", AttrValue::Null),
                    AttrSpec::new("layout_class", AttrValue::Null),
                    // id of an in-flight upload this node is a placeholder for
                    AttrSpec::new("upload", AttrValue::Null),
                ],
            }),
        )
        .with_markdown(
            "image",
            MarkdownRules {
                token: Some(SmolStr::new("image")),
                serialize_node: Some(Rc::new(|_, st, node| {
                    let get = |name: &str| {
                        node.attrs
                            .get(name)
                            .and_then(AttrValue::as_str)
                            .unwrap_or("")
                    };
                    let alt = get("alt");
                    let src = get("src");
                    // the title position doubles as the layout slot
                    let title = node
                        .attrs
                        .get("layout_class")
                        .and_then(AttrValue::as_str)
                        .or_else(|| node.attrs.get("title").and_then(AttrValue::as_str));
                    st.write(&format!(
                        "![{}]({}",
                        escape_markdown(alt, false),
                        escape_link_url(src)
                    ));
                    if let Some(title) = title {
                        st.write(&format!(" \"{}\"", escape_link_title(title)));
                    }
                    st.write(")");
                })),
                ..Default::default()
            },
        )
        .with_rendered_type("image")
}

pub fn embed() -> Extension {
    Extension::new("embed")
        .with_type(
            "embed",
            TypeContribution::Node(NodeSpec {
                content: None,
                group: Some(SmolStr::new("block")),
                inline: false,
                attrs: vec![AttrSpec::new("href", AttrValue::Null)],
            }),
        )
        .with_markdown(
            "embed",
            MarkdownRules {
                token: Some(SmolStr::new("embed")),
                serialize_node: Some(Rc::new(|_, st, node| {
                    let href = node
                        .attrs
                        .get("href")
                        .and_then(AttrValue::as_str)
                        .unwrap_or("");
                    st.write(&format!(
                        "[{}]({})",
                        escape_markdown(href, false),
                        escape_link_url(href)
                    ));
                })),
                ..Default::default()
            },
        )
        .with_rendered_type("embed")
}
