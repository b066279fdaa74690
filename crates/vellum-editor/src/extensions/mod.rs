//! Built-in extensions, assembled in the order the schema depends on.
//!
//! Order matters twice over: content models may only name earlier-declared
//! types, and group terms pick up whatever is declared anywhere in the set.
//! Items are declared before the lists that contain them.

pub mod behavior;
pub mod marks;
pub mod media;
pub mod nodes;

use crate::extension::Extension;

/// The default extension set. Host extensions are appended after these.
pub fn built_ins(is_mac: bool) -> Vec<Extension> {
    vec![
        nodes::doc(),
        nodes::text(),
        nodes::hard_break(),
        nodes::paragraph(),
        nodes::blockquote(),
        nodes::code_block(),
        nodes::checkbox_item(),
        nodes::checkbox_list(),
        nodes::list_item(),
        nodes::bullet_list(),
        nodes::ordered_list(),
        nodes::heading(),
        nodes::horizontal_rule(),
        media::image(),
        media::embed(),
        marks::strong(is_mac),
        marks::em(is_mac),
        marks::code(is_mac),
        marks::strikethrough(is_mac),
        marks::link(),
        behavior::history(is_mac),
        behavior::keys(is_mac),
        behavior::smart_text(),
        behavior::markdown_paste(),
    ]
}
