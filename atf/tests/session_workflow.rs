use atf::condition::ConditionKey;
use atf::elements::{ButtonElement, TextBoxElement, WindowRootElement};
use atf::testing::{InMemoryNavigation, InMemoryTree, InputEvent, NodeId};
use atf::{
    Condition, Element, ElementCreator, ElementKind, ElementRegistry, Key, Session, Settings,
    TypedElement,
};
use std::io::Write;
use std::ops::Deref;
use std::sync::Arc;

/// Button of the host application that is found by its automation id.
#[derive(Debug, Clone)]
struct SaveButton(Element);

impl TypedElement for SaveButton {
    const KIND: ElementKind = ElementKind::custom("SaveButton");

    fn from_element(element: Element) -> Self {
        SaveButton(element)
    }

    fn element(&self) -> &Element {
        &self.0
    }
}

impl Deref for SaveButton {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.0
    }
}

struct Editor {
    navigation: Arc<InMemoryNavigation>,
    session: Session,
    text_box: NodeId,
    save: NodeId,
}

fn editor(creator: ElementCreator) -> Editor {
    let tree = Arc::new(InMemoryTree::new());
    let window = tree.add(tree.root(), [("Name", "Editor"), ("ClassName", "Window")]);
    let toolbar = tree.add(window, [("ClassName", "ToolBar")]);
    let save = tree.add(
        toolbar,
        [("ClassName", "Button"), ("AutomationId", "Save"), ("Name", "Save"), ("IsEnabled", "True")],
    );
    tree.add(
        toolbar,
        [("ClassName", "Button"), ("AutomationId", "Close"), ("Name", "Close"), ("IsEnabled", "True")],
    );
    let text_box = tree.add(
        window,
        [("ClassName", "TextBox"), ("Value.Value", "draft"), ("IsEnabled", "True")],
    );
    let navigation = InMemoryNavigation::new(tree, 2);
    let session = Session::from_provider(navigation.clone(), creator);
    Editor {
        navigation,
        session,
        text_box,
        save,
    }
}

fn typed_text(events: &[InputEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            InputEvent::Text(_, text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn root_requires_an_opened_window() {
    let editor = editor(ElementCreator::standard());
    assert!(editor.session.root().is_err());

    let root: WindowRootElement = editor.session.navigation().window_root("Editor").unwrap();
    assert_eq!(root.class_name().unwrap(), "Window");
    assert_eq!(editor.session.root().unwrap(), root);
}

#[test]
fn standard_kinds_are_found_by_their_class_name() {
    let editor = editor(ElementCreator::standard());
    let root = editor.session.navigation().window_root("Editor").unwrap();

    let buttons: Vec<ButtonElement> = root.find_all_elements(&[]).unwrap();
    let names: Vec<String> = buttons.iter().map(|b| b.name().unwrap()).collect();
    assert_eq!(names, ["Save", "Close"]);

    let text_box: TextBoxElement = root.find_element(&[]).unwrap();
    assert_eq!(text_box.text().unwrap(), "draft");
    assert_eq!(
        text_box.property(ConditionKey::RuntimeId.as_str()).unwrap(),
        format!("42.{}", editor.text_box.0)
    );
}

#[test]
fn set_value_replaces_the_text_and_tabs_out() {
    let editor = editor(ElementCreator::standard());
    let root = editor.session.navigation().window_root("Editor").unwrap();
    let text_box: TextBoxElement = root.find_element(&[]).unwrap();
    editor.navigation.tree().clear_input();

    text_box.set_value("final").unwrap();

    let input = editor.navigation.tree().input();
    assert_eq!(typed_text(&input), ["final"]);
    let node = editor.text_box;
    assert!(input.contains(&InputEvent::Char(node, 'a')));
    assert_eq!(
        input.last(),
        Some(&InputEvent::Key(node, atf::keys::KeyStroke::Press(Key::Tab)))
    );
}

#[test]
fn host_factory_defaults_take_precedence() {
    let host = ElementRegistry::new()
        .register::<SaveButton>(vec![Condition::automation_id("Save")])
        .register::<ButtonElement>(vec![Condition::automation_id("Close")]);
    let creator = ElementCreator::new(vec![
        Arc::new(host),
        Arc::new(atf::elements::standard_registry()),
    ]);
    let editor = editor(creator);
    let root = editor.session.navigation().window_root("Editor").unwrap();

    let save: SaveButton = root.find_element(&[]).unwrap();
    assert_eq!(save.runtime_id().unwrap(), format!("42.{}", editor.save.0));

    let close: ButtonElement = root.find_element(&[]).unwrap();
    assert_eq!(close.name().unwrap(), "Close");
}

#[test]
fn settings_load_from_a_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "retry_count": 3, "action_delay_ms": 0, "backend": "accessibility" }}"#
    )
    .unwrap();

    let settings = Settings::from_file(file.path()).unwrap();
    assert_eq!(settings.retry_count, 3);
    assert_eq!(settings.action_delay_ms, 0);
    assert_eq!(settings.backend, atf::Backend::Accessibility);
    assert_eq!(settings.retry_delay_ms, Settings::default().retry_delay_ms);
}

#[test]
fn zero_retries_are_rejected() {
    let err = Settings::from_json_str(r#"{ "retry_count": 0 }"#).unwrap_err();
    assert!(matches!(err, atf::AutomationError::Config(_)));
}
