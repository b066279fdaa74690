//! Editor lifecycle coverage: composition ordering, read-only gating,
//! outline slugs, host async staleness, external value injection, and
//! renderer binding persistence.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smol_str::SmolStr;
use vellum_editor::controller::Editor;
use vellum_editor::error::EditorError;
use vellum_editor::extension::Extension;
use vellum_editor::extensions::built_ins;
use vellum_editor::input::{Key, KeyCombo};
use vellum_editor::manager::ExtensionManager;
use vellum_editor::node_views::{NoopAdapter, RendererAdapter, RendererBinding};
use vellum_editor::options::{EditorOptions, EmbedDescriptor, Hooks};
use vellum_editor::tasks::LinkSearchResult;
use vellum_model::{NodeSpec, SchemaError, Selection, TypeContribution};

fn editor_with(options: EditorOptions) -> Editor {
    Editor::new(options, Box::new(NoopAdapter)).unwrap()
}

fn change_counter() -> (Rc<Cell<usize>>, Hooks) {
    let count = Rc::new(Cell::new(0));
    let counter = Rc::clone(&count);
    let hooks = Hooks {
        on_change: Some(Box::new(move |_get| {
            counter.set(counter.get() + 1);
        })),
        ..Default::default()
    };
    (count, hooks)
}

#[derive(Default)]
struct AdapterLog {
    mounts: Vec<(u64, SmolStr)>,
    unmounts: Vec<u64>,
    updates: Vec<u64>,
}

struct RecordingAdapter(Rc<RefCell<AdapterLog>>);

impl RendererAdapter for RecordingAdapter {
    fn mount(&mut self, binding: &RendererBinding) {
        self.0
            .borrow_mut()
            .mounts
            .push((binding.id, binding.type_name.clone()));
    }
    fn update(&mut self, binding: &RendererBinding) {
        self.0.borrow_mut().updates.push(binding.id);
    }
    fn unmount(&mut self, id: u64) {
        self.0.borrow_mut().unmounts.push(id);
    }
}

fn leaf_extension() -> Extension {
    Extension::new("custom_leaf").with_type(
        "custom_leaf",
        TypeContribution::Node(NodeSpec {
            content: None,
            group: Some(SmolStr::new("block")),
            ..Default::default()
        }),
    )
}

fn container_extension() -> Extension {
    Extension::new("custom_container").with_type(
        "custom_container",
        TypeContribution::Node(NodeSpec {
            content: Some("custom_leaf+".to_string()),
            group: Some(SmolStr::new("block")),
            ..Default::default()
        }),
    )
}

#[test]
fn test_composition_order_matters() {
    let mut ordered = built_ins(false);
    ordered.push(leaf_extension());
    ordered.push(container_extension());
    assert!(ExtensionManager::new(ordered).schema().is_ok());

    let mut reversed = built_ins(false);
    reversed.push(container_extension());
    reversed.push(leaf_extension());
    let err = ExtensionManager::new(reversed).schema().unwrap_err();
    assert!(matches!(
        err,
        EditorError::Schema(SchemaError::UnresolvedReference { .. })
    ));
}

#[test]
fn test_duplicate_type_fails_composition() {
    let mut extensions = built_ins(false);
    extensions.push(leaf_extension());
    extensions.push(leaf_extension());
    let err = ExtensionManager::new(extensions).schema().unwrap_err();
    assert!(matches!(
        err,
        EditorError::Schema(SchemaError::DuplicateType { .. })
    ));
}

#[test]
fn test_typing_and_value() {
    let mut editor = editor_with(EditorOptions::default());
    editor.focus_at_start().unwrap();
    editor.handle_text_input("hello").unwrap();
    assert_eq!(editor.value(), "hello");
}

#[test]
fn test_heading_input_rule() {
    let mut editor = editor_with(EditorOptions::default());
    editor.focus_at_start().unwrap();
    editor.handle_text_input("#").unwrap();
    editor.handle_text_input(" ").unwrap();
    editor.handle_text_input("Title").unwrap();
    assert_eq!(editor.value(), "# Title");
}

#[test]
fn test_smart_text_ellipsis() {
    let mut editor = editor_with(EditorOptions::default());
    editor.focus_at_start().unwrap();
    for _ in 0..3 {
        editor.handle_text_input(".").unwrap();
    }
    assert_eq!(editor.value(), "\u{2026}");
}

#[test]
fn test_enter_splits_block() {
    let mut editor = editor_with(EditorOptions {
        default_value: "ab".to_string(),
        ..Default::default()
    });
    editor.focus_at_end().unwrap();
    editor.handle_key(KeyCombo::new(Key::Enter)).unwrap();
    editor.handle_text_input("cd").unwrap();
    assert_eq!(editor.value(), "ab\n\ncd");
}

#[test]
fn test_backspace_joins_blocks() {
    let mut editor = editor_with(EditorOptions {
        default_value: "ab\n\ncd".to_string(),
        ..Default::default()
    });
    // caret at the start of the second paragraph
    editor.dispatch(
        vellum_model::Transaction::new().set_selection(Selection::caret(5)),
    )
    .unwrap();
    editor.handle_key(KeyCombo::new(Key::Backspace)).unwrap();
    assert_eq!(editor.value(), "abcd");
}

#[test]
fn test_typing_over_cross_block_selection() {
    let mut editor = editor_with(EditorOptions {
        default_value: "ab\n\ncd".to_string(),
        ..Default::default()
    });
    // from after "a" to after "c", spanning both paragraphs
    editor
        .dispatch(vellum_model::Transaction::new().set_selection(Selection::new(2, 6)))
        .unwrap();
    editor.handle_text_input("X").unwrap();
    assert_eq!(editor.value(), "aXd");
}

#[test]
fn test_backspace_over_cross_block_selection() {
    let mut editor = editor_with(EditorOptions {
        default_value: "ab\n\ncd".to_string(),
        ..Default::default()
    });
    editor
        .dispatch(vellum_model::Transaction::new().set_selection(Selection::new(2, 6)))
        .unwrap();
    editor.handle_key(KeyCombo::new(Key::Backspace)).unwrap();
    assert_eq!(editor.value(), "ad");
    assert_eq!(editor.state().selection, Selection::caret(2));
}

#[test]
fn test_backspace_selection_spanning_three_blocks() {
    let mut editor = editor_with(EditorOptions {
        default_value: "ab\n\nmid\n\ncd".to_string(),
        ..Default::default()
    });
    editor
        .dispatch(vellum_model::Transaction::new().set_selection(Selection::new(2, 11)))
        .unwrap();
    editor.handle_key(KeyCombo::new(Key::Backspace)).unwrap();
    assert_eq!(editor.value(), "ad");
}

#[test]
fn test_enter_over_cross_block_selection() {
    let mut editor = editor_with(EditorOptions {
        default_value: "ab\n\ncd".to_string(),
        ..Default::default()
    });
    editor
        .dispatch(vellum_model::Transaction::new().set_selection(Selection::new(2, 6)))
        .unwrap();
    editor.handle_key(KeyCombo::new(Key::Enter)).unwrap();
    assert_eq!(editor.value(), "a\n\nd");
}

#[test]
fn test_toggle_strong_command() {
    let mut editor = editor_with(EditorOptions {
        default_value: "hello".to_string(),
        ..Default::default()
    });
    editor.dispatch(
        vellum_model::Transaction::new().set_selection(Selection::new(1, 6)),
    )
    .unwrap();
    assert!(editor.apply_command("toggle_strong").unwrap());
    assert_eq!(editor.value(), "**hello**");
    // toggling again removes the mark
    assert!(editor.apply_command("toggle_strong").unwrap());
    assert_eq!(editor.value(), "hello");
}

#[test]
fn test_undo_redo() {
    let mut editor = editor_with(EditorOptions::default());
    editor.focus_at_start().unwrap();
    editor.handle_text_input("typed").unwrap();
    assert!(editor.apply_command("undo").unwrap());
    assert_eq!(editor.value(), "");
    assert!(editor.apply_command("redo").unwrap());
    assert_eq!(editor.value(), "typed");
}

#[test]
fn test_read_only_suppresses_changes() {
    let (count, hooks) = change_counter();
    let mut editor = editor_with(EditorOptions {
        default_value: "locked".to_string(),
        read_only: true,
        hooks,
        ..Default::default()
    });
    editor.focus_at_end().unwrap();
    editor.handle_text_input("x").unwrap();
    assert_eq!(editor.value(), "locked");
    assert_eq!(count.get(), 0);
}

#[test]
fn test_read_only_checkbox_exception() {
    let (count, hooks) = change_counter();
    let mut editor = editor_with(EditorOptions {
        default_value: "- [ ] task".to_string(),
        read_only: true,
        read_only_write_checkboxes: true,
        hooks,
        ..Default::default()
    });
    // typing is still suppressed
    editor.handle_text_input("x").unwrap();
    assert_eq!(count.get(), 0);

    // the checkbox item starts one position into the list
    assert!(editor.toggle_checkbox(1).unwrap());
    assert_eq!(editor.value(), "- [x] task");
    assert_eq!(count.get(), 1);
}

#[test]
fn test_read_only_composite_checkbox_edit_notifies_once() {
    let (count, hooks) = change_counter();
    let mut editor = editor_with(EditorOptions {
        default_value: "- [ ] task".to_string(),
        read_only: true,
        read_only_write_checkboxes: true,
        hooks,
        ..Default::default()
    });
    let mut toggled = editor.state().doc.node_at(1).unwrap().clone();
    toggled.attrs.insert(
        SmolStr::new("checked"),
        vellum_model::AttrValue::Bool(true),
    );
    let size = toggled.node_size();
    // a transaction leading with a checkbox toggle passes the gate even
    // when it also edits text
    let tr = vellum_model::Transaction::new()
        .replace(1, 1 + size, vellum_model::Slice::blocks(vec![toggled]))
        .replace(
            4,
            4,
            vellum_model::Slice::inline(vec![vellum_model::Node::text_node("!", vec![])]),
        );
    editor.dispatch(tr).unwrap();
    assert_eq!(editor.value(), "- [x] t!ask");
    assert_eq!(count.get(), 1);
}

#[test]
fn test_save_and_cancel_signals() {
    let saves = Rc::new(RefCell::new(Vec::new()));
    let cancels = Rc::new(Cell::new(0));
    let saves_hook = Rc::clone(&saves);
    let cancels_hook = Rc::clone(&cancels);
    let mut editor = editor_with(EditorOptions {
        hooks: Hooks {
            on_save: Some(Box::new(move |done| saves_hook.borrow_mut().push(done))),
            on_cancel: Some(Box::new(move || cancels_hook.set(cancels_hook.get() + 1))),
            ..Default::default()
        },
        ..Default::default()
    });
    editor.apply_command("save").unwrap();
    editor.apply_command("save_and_exit").unwrap();
    editor.handle_key(KeyCombo::new(Key::Escape)).unwrap();
    assert_eq!(*saves.borrow(), vec![false, true]);
    assert_eq!(cancels.get(), 1);
}

#[test]
fn test_heading_slug_disambiguation() {
    let editor = editor_with(EditorOptions {
        default_value: "# Intro\n\n# Intro\n\n# Intro\n\n## Other".to_string(),
        ..Default::default()
    });
    let ids: Vec<String> = editor.headings().into_iter().map(|h| h.id).collect();
    assert_eq!(ids, vec!["intro", "intro-1", "intro-2", "other"]);
    let levels: Vec<i64> = editor.headings().into_iter().map(|h| h.level).collect();
    assert_eq!(levels, vec![1, 1, 1, 2]);
}

#[test]
fn test_scroll_to_anchor_best_effort() {
    let mut editor = editor_with(EditorOptions {
        default_value: "# Intro".to_string(),
        ..Default::default()
    });
    assert!(editor.scroll_to_anchor("intro"));
    assert!(editor.scroll_to_anchor("#intro"));
    assert!(!editor.scroll_to_anchor("missing"));
}

#[test]
fn test_set_value_does_not_echo() {
    let (count, hooks) = change_counter();
    let mut editor = editor_with(EditorOptions {
        hooks,
        ..Default::default()
    });
    editor.set_value("# Injected").unwrap();
    assert_eq!(editor.value(), "# Injected");
    assert_eq!(count.get(), 0);

    // ordinary edits still notify
    editor.focus_at_end().unwrap();
    editor.handle_text_input("x").unwrap();
    assert_eq!(count.get(), 1);
}

#[test]
fn test_on_change_accessor_serializes() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_hook = Rc::clone(&seen);
    let mut editor = editor_with(EditorOptions {
        hooks: Hooks {
            on_change: Some(Box::new(move |get| {
                // calling twice exercises the memoized accessor
                let first = get();
                let second = get();
                assert_eq!(first, second);
                seen_hook.borrow_mut().push(first);
            })),
            ..Default::default()
        },
        ..Default::default()
    });
    editor.focus_at_start().unwrap();
    editor.handle_text_input("note").unwrap();
    assert_eq!(*seen.borrow(), vec!["note".to_string()]);
}

#[test]
fn test_stale_upload_dropped() {
    let mut editor = editor_with(EditorOptions::default());
    editor.focus_at_start().unwrap();
    let ticket = editor.begin_upload().unwrap();
    // the placeholder disappears with the old document
    editor.set_value("fresh").unwrap();
    editor
        .resolve_upload(ticket, Ok("https://img.test/a.png".to_string()))
        .unwrap();
    assert_eq!(editor.value(), "fresh");
}

#[test]
fn test_upload_resolves_in_place() {
    let mut editor = editor_with(EditorOptions::default());
    editor.focus_at_start().unwrap();
    let ticket = editor.begin_upload().unwrap();
    editor
        .resolve_upload(ticket, Ok("https://img.test/a.png".to_string()))
        .unwrap();
    assert_eq!(editor.value(), "![](https://img.test/a.png)");
}

#[test]
fn test_failed_upload_removes_placeholder_and_toasts() {
    let toasts = Rc::new(Cell::new(0));
    let toasts_hook = Rc::clone(&toasts);
    let mut editor = editor_with(EditorOptions {
        hooks: Hooks {
            on_show_toast: Some(Box::new(move |_msg, _kind| {
                toasts_hook.set(toasts_hook.get() + 1);
            })),
            ..Default::default()
        },
        ..Default::default()
    });
    editor.focus_at_start().unwrap();
    let ticket = editor.begin_upload().unwrap();
    editor
        .resolve_upload(ticket, Err("network".to_string()))
        .unwrap();
    assert_eq!(editor.value(), "");
    assert_eq!(toasts.get(), 1);
}

#[test]
fn test_stale_link_resolution_dropped() {
    let mut editor = editor_with(EditorOptions {
        default_value: "hello".to_string(),
        ..Default::default()
    });
    editor.dispatch(
        vellum_model::Transaction::new().set_selection(Selection::new(1, 6)),
    )
    .unwrap();
    let ticket = editor.create_link("hello");
    // document changes before the host answers
    editor.handle_text_input("!").unwrap();
    editor.resolve_link(ticket, "https://doc.test/1").unwrap();
    assert!(!editor.value().contains("doc.test"));
}

#[test]
fn test_link_resolution_applies() {
    let mut editor = editor_with(EditorOptions {
        default_value: "hello".to_string(),
        ..Default::default()
    });
    editor.dispatch(
        vellum_model::Transaction::new().set_selection(Selection::new(1, 6)),
    )
    .unwrap();
    let ticket = editor.create_link("hello");
    editor.resolve_link(ticket, "https://doc.test/1").unwrap();
    assert_eq!(editor.value(), "[hello](https://doc.test/1)");
}

#[test]
fn test_search_last_request_wins() {
    let mut editor = editor_with(EditorOptions::default());
    let first = editor.search_links("al");
    let second = editor.search_links("alpha");
    editor.deliver_search_results(
        first,
        vec![LinkSearchResult {
            title: "stale".to_string(),
            url: "https://doc.test/stale".to_string(),
        }],
    );
    assert!(editor.link_search_results().is_empty());
    editor.deliver_search_results(
        second,
        vec![LinkSearchResult {
            title: "fresh".to_string(),
            url: "https://doc.test/fresh".to_string(),
        }],
    );
    assert_eq!(editor.link_search_results().len(), 1);
    assert_eq!(editor.link_search_results()[0].title, "fresh");
}

#[test]
fn test_markdown_paste() {
    let mut editor = editor_with(EditorOptions::default());
    editor.focus_at_start().unwrap();
    editor.handle_paste("# Pasted\n\n- one\n- two").unwrap();
    assert!(editor.value().contains("# Pasted"));
    assert!(editor.value().contains("- one"));
}

#[test]
fn test_embed_url_paste() {
    let mut editor = editor_with(EditorOptions {
        embeds: vec![EmbedDescriptor {
            name: SmolStr::new("test"),
            matcher: Rc::new(|url: &str| url.starts_with("https://embed.test/")),
            component: SmolStr::new("TestEmbed"),
        }],
        ..Default::default()
    });
    editor.focus_at_start().unwrap();
    editor.handle_paste("https://embed.test/x").unwrap();
    assert!(editor
        .value()
        .contains("[https://embed.test/x](https://embed.test/x)"));
}

#[test]
fn test_binding_ids_stable_across_edits() {
    let log = Rc::new(RefCell::new(AdapterLog::default()));
    let mut editor = Editor::new(
        EditorOptions {
            default_value: "![a](https://img.test/a.png)\n\n![b](https://img.test/b.png)"
                .to_string(),
            ..Default::default()
        },
        Box::new(RecordingAdapter(Rc::clone(&log))),
    )
    .unwrap();
    let initial_ids: Vec<u64> = editor.view().bindings().iter().map(|b| b.id).collect();
    assert_eq!(initial_ids.len(), 2);
    assert_eq!(log.borrow().mounts.len(), 2);

    editor.focus_at_end().unwrap();
    editor.handle_text_input("tail").unwrap();

    let after_ids: Vec<u64> = editor.view().bindings().iter().map(|b| b.id).collect();
    assert_eq!(initial_ids, after_ids);
    assert!(log.borrow().unmounts.is_empty());
    // surviving bindings are refreshed, not remounted
    assert!(!log.borrow().updates.is_empty());
}

#[test]
fn test_deleting_first_image_keeps_second_binding() {
    let log = Rc::new(RefCell::new(AdapterLog::default()));
    let mut editor = Editor::new(
        EditorOptions {
            default_value: "![a](https://img.test/a.png)\n\n![b](https://img.test/b.png)"
                .to_string(),
            ..Default::default()
        },
        Box::new(RecordingAdapter(Rc::clone(&log))),
    )
    .unwrap();
    let ids: Vec<u64> = editor.view().bindings().iter().map(|b| b.id).collect();
    assert_eq!(ids.len(), 2);

    // the first image occupies position 1 inside the first paragraph
    editor
        .dispatch(vellum_model::Transaction::new().delete(1, 2))
        .unwrap();

    let after: Vec<u64> = editor.view().bindings().iter().map(|b| b.id).collect();
    assert_eq!(after, vec![ids[1]]);
    assert_eq!(log.borrow().unmounts, vec![ids[0]]);
}

#[test]
fn test_vanished_node_unmounts() {
    let log = Rc::new(RefCell::new(AdapterLog::default()));
    let mut editor = Editor::new(
        EditorOptions {
            default_value: "![a](https://img.test/a.png)".to_string(),
            ..Default::default()
        },
        Box::new(RecordingAdapter(Rc::clone(&log))),
    )
    .unwrap();
    assert_eq!(editor.view().bindings().len(), 1);
    editor.set_value("plain text").unwrap();
    assert!(editor.view().bindings().is_empty());
    assert_eq!(log.borrow().unmounts.len(), 1);
}

#[test]
fn test_repaint_generation_bumps_on_every_dispatch() {
    let mut editor = editor_with(EditorOptions::default());
    let before = editor.view().repaint_gen();
    // selection-only transactions repaint too
    editor.focus_at_start().unwrap();
    assert!(editor.view().repaint_gen() > before);
}
