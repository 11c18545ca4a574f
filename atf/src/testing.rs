//! In-memory backend for exercising searches, elements and navigation
//! without a desktop session.
//!
//! [`InMemoryTree`] is a [`BackendAdapter`] over a hand-built node tree. It
//! records every lookup and every input event so tests can assert on call
//! counts, seed conditions and key sequences.

use crate::awaiting::AwaitingPolicy;
use crate::condition::{Condition, ConditionKey};
use crate::errors::AutomationError;
use crate::keys::{combo_strokes, Key, KeyStroke, MouseButton};
use crate::platforms::{BackendAdapter, NavigationProvider};
use crate::search::{SearchEngine, SearchScope};
use crate::wrapper::{
    is_visible_rectangle, BringIntoView, Bounds, ItemContext, UiItem, UiItemImpl,
    BOUNDING_RECTANGLE_PROPERTY, RUNTIME_ID_PROPERTY,
};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

pub const DESKTOP_CLASS_NAME: &str = "#32769";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterCall {
    FirstDescendant,
    AllDescendants,
    FirstBy(Condition),
    AllBy(Condition),
    ReadProperty(NodeId, String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    BringIntoView(String),
    Click {
        node: NodeId,
        button: MouseButton,
        x_offset: i32,
        y_offset: i32,
    },
    DoubleClick(NodeId),
    Hover(NodeId),
    Text(NodeId, String),
    Key(NodeId, KeyStroke),
    Char(NodeId, char),
}

#[derive(Debug, Default)]
struct TreeNode {
    properties: HashMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
pub struct InMemoryTree {
    nodes: Mutex<Vec<TreeNode>>,
    calls: Mutex<Vec<AdapterCall>>,
    input: Mutex<Vec<InputEvent>>,
    pending_failures: Mutex<VecDeque<AutomationError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for InMemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTree {
    /// A tree holding only the desktop root.
    pub fn new() -> Self {
        let desktop = TreeNode {
            properties: [
                ("ClassName".to_string(), DESKTOP_CLASS_NAME.to_string()),
                ("Name".to_string(), "Desktop 1".to_string()),
                (RUNTIME_ID_PROPERTY.to_string(), "0".to_string()),
            ]
            .into_iter()
            .collect(),
            ..TreeNode::default()
        };
        Self {
            nodes: Mutex::new(vec![desktop]),
            calls: Mutex::new(Vec::new()),
            input: Mutex::new(Vec::new()),
            pending_failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Adds a node below `parent`. A `RuntimeId` is assigned unless given.
    pub fn add<K, V>(&self, parent: NodeId, properties: impl IntoIterator<Item = (K, V)>) -> NodeId
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut nodes = lock(&self.nodes);
        let id = NodeId(nodes.len());
        let mut properties: HashMap<String, String> = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        properties
            .entry(RUNTIME_ID_PROPERTY.to_string())
            .or_insert_with(|| format!("42.{}", id.0));
        nodes.push(TreeNode {
            properties,
            parent: Some(parent),
            children: Vec::new(),
        });
        nodes[parent.0].children.push(id);
        id
    }

    pub fn set_property(&self, node: NodeId, key: &str, value: &str) {
        lock(&self.nodes)[node.0]
            .properties
            .insert(key.to_string(), value.to_string());
    }

    /// The next `count` lookups fail with a transport error.
    pub fn fail_next_lookups(&self, count: usize) {
        let mut pending = lock(&self.pending_failures);
        for _ in 0..count {
            pending.push_back(AutomationError::Transport("tree mutated".to_string()));
        }
    }

    pub fn calls(&self) -> Vec<AdapterCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Lookup calls only, without property reads.
    pub fn lookups(&self) -> Vec<AdapterCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, AdapterCall::ReadProperty(..)))
            .collect()
    }

    pub fn input(&self) -> Vec<InputEvent> {
        lock(&self.input).clone()
    }

    pub fn clear_input(&self) {
        lock(&self.input).clear();
    }

    pub(crate) fn record_input(&self, event: InputEvent) {
        lock(&self.input).push(event);
    }

    fn record(&self, call: AdapterCall) -> Result<(), AutomationError> {
        lock(&self.calls).push(call);
        match lock(&self.pending_failures).pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn descendants(&self, scope: Option<&NodeId>) -> Vec<NodeId> {
        let nodes = lock(&self.nodes);
        let start = scope.copied().unwrap_or(NodeId(0));
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = nodes[start.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    fn value_of(&self, node: NodeId, property: &str) -> String {
        let nodes = lock(&self.nodes);
        if property == ConditionKey::ParentRuntimeId.as_str() {
            return nodes[node.0]
                .parent
                .and_then(|p| nodes[p.0].properties.get(RUNTIME_ID_PROPERTY).cloned())
                .unwrap_or_default();
        }
        nodes[node.0]
            .properties
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    fn matching(&self, scope: Option<&NodeId>, condition: &Condition) -> Result<Vec<NodeId>, AutomationError> {
        let key = condition.parsed_key()?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|id| self.value_of(*id, key.as_str()) == condition.value)
            .collect())
    }
}

impl BackendAdapter for InMemoryTree {
    type Handle = NodeId;

    fn find_first_descendant(&self, scope: Option<&NodeId>) -> Result<Option<NodeId>, AutomationError> {
        self.record(AdapterCall::FirstDescendant)?;
        Ok(self.descendants(scope).into_iter().next())
    }

    fn find_all_descendants(&self, scope: Option<&NodeId>) -> Result<Vec<NodeId>, AutomationError> {
        self.record(AdapterCall::AllDescendants)?;
        Ok(self.descendants(scope))
    }

    fn find_first_by(
        &self,
        scope: Option<&NodeId>,
        condition: &Condition,
    ) -> Result<Option<NodeId>, AutomationError> {
        self.record(AdapterCall::FirstBy(condition.clone()))?;
        Ok(self.matching(scope, condition)?.into_iter().next())
    }

    fn find_all_by(
        &self,
        scope: Option<&NodeId>,
        condition: &Condition,
    ) -> Result<Vec<NodeId>, AutomationError> {
        self.record(AdapterCall::AllBy(condition.clone()))?;
        self.matching(scope, condition)
    }

    fn read_property(&self, handle: &NodeId, property: &str) -> Result<String, AutomationError> {
        lock(&self.calls).push(AdapterCall::ReadProperty(*handle, property.to_string()));
        Ok(self.value_of(*handle, property))
    }
}

/// Parses `Left:x Top:y Width:w Height:h`.
pub fn parse_bounding_rectangle(value: &str) -> Option<Bounds> {
    let mut fields = HashMap::new();
    for part in value.split_whitespace() {
        let (name, number) = part.split_once(':')?;
        fields.insert(name, number.parse::<f64>().ok()?);
    }
    Some(Bounds {
        x: *fields.get("Left")?,
        y: *fields.get("Top")?,
        width: *fields.get("Width")?,
        height: *fields.get("Height")?,
    })
}

/// A node of an [`InMemoryTree`].
#[derive(Debug, Clone)]
pub struct InMemoryItem {
    tree: Arc<InMemoryTree>,
    node: NodeId,
    context: ItemContext,
}

impl InMemoryItem {
    pub fn node(&self) -> NodeId {
        self.node
    }

    fn key(&self, stroke: KeyStroke) {
        self.tree.record_input(InputEvent::Key(self.node, stroke));
    }
}

impl UiItemImpl for InMemoryItem {
    fn object_id(&self) -> String {
        format!("node-{}", self.node.0)
    }

    fn context(&self) -> &ItemContext {
        &self.context
    }

    fn property(&self, name: &str) -> Result<String, AutomationError> {
        self.tree.read_property(&self.node, name)
    }

    fn is_visible(&self) -> Result<bool, AutomationError> {
        Ok(is_visible_rectangle(
            &self.tree.value_of(self.node, BOUNDING_RECTANGLE_PROPERTY),
        ))
    }

    fn bounds(&self) -> Result<Bounds, AutomationError> {
        let value = self.tree.value_of(self.node, BOUNDING_RECTANGLE_PROPERTY);
        parse_bounding_rectangle(&value).ok_or_else(|| {
            AutomationError::PlatformError(format!("malformed bounding rectangle: {value:?}"))
        })
    }

    fn click(&self, button: MouseButton, x_offset: i32, y_offset: i32) -> Result<(), AutomationError> {
        self.tree.record_input(InputEvent::Click {
            node: self.node,
            button,
            x_offset,
            y_offset,
        });
        Ok(())
    }

    fn double_click(&self) -> Result<(), AutomationError> {
        self.tree.record_input(InputEvent::DoubleClick(self.node));
        Ok(())
    }

    fn hover(&self) -> Result<(), AutomationError> {
        self.tree.record_input(InputEvent::Hover(self.node));
        Ok(())
    }

    fn send_keys(&self, text: &str) -> Result<(), AutomationError> {
        self.tree
            .record_input(InputEvent::Text(self.node, text.to_string()));
        Ok(())
    }

    fn press_key(&self, key: Key) -> Result<(), AutomationError> {
        self.key(KeyStroke::Press(key));
        Ok(())
    }

    fn press_modified_key(&self, modifier: Key, c: char) -> Result<(), AutomationError> {
        self.key(KeyStroke::Down(modifier));
        self.tree.record_input(InputEvent::Char(self.node, c));
        self.key(KeyStroke::Up(modifier));
        Ok(())
    }

    fn press_key_combo(&self, keys: &[Key]) -> Result<(), AutomationError> {
        for stroke in combo_strokes(keys) {
            self.key(stroke);
        }
        Ok(())
    }

    fn screenshot(&self) -> Result<Vec<u8>, AutomationError> {
        let bounds = self.bounds()?;
        let image = image::RgbaImage::new(bounds.width.max(1.0) as u32, bounds.height.max(1.0) as u32);
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, image::ImageFormat::Png)?;
        Ok(png.into_inner())
    }

    fn clone_box(&self) -> Box<dyn UiItemImpl> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl SearchScope for InMemoryItem {
    type Adapter = InMemoryTree;

    fn adapter(&self) -> &InMemoryTree {
        &self.tree
    }

    fn handle(&self) -> Option<&NodeId> {
        Some(&self.node)
    }

    fn wrap_child(&self, handle: NodeId) -> Result<Self, AutomationError> {
        Ok(Self {
            tree: self.tree.clone(),
            node: handle,
            context: self.context.child()?,
        })
    }
}

/// Awaiting policy that never sleeps and counts what was asked of it.
#[derive(Debug, Default)]
pub struct RecordingAwaiting {
    action_delays: AtomicU32,
    retry_delays: AtomicU32,
    waits: Mutex<Vec<Duration>>,
}

impl RecordingAwaiting {
    pub fn action_delays(&self) -> u32 {
        self.action_delays.load(Ordering::SeqCst)
    }

    pub fn retry_delays(&self) -> u32 {
        self.retry_delays.load(Ordering::SeqCst)
    }

    pub fn waits(&self) -> Vec<Duration> {
        lock(&self.waits).clone()
    }
}

impl AwaitingPolicy for RecordingAwaiting {
    /// Evaluates the predicate once per simulated second of `max` (one minute
    /// by default).
    fn wait_for(&self, predicate: &mut dyn FnMut() -> bool, max: Option<Duration>) {
        let ticks = max.unwrap_or(Duration::from_secs(60)).as_secs().max(1);
        for _ in 0..ticks {
            if predicate() {
                return;
            }
        }
    }

    fn wait(&self, duration: Duration) {
        lock(&self.waits).push(duration);
    }

    fn wait_for_default_action_delay(&self) {
        self.action_delays.fetch_add(1, Ordering::SeqCst);
    }

    fn wait_for_default_retry_delay(&self) {
        self.retry_delays.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct NavigationState {
    current_window_title: Option<String>,
    last_window: Option<NodeId>,
}

/// [`NavigationProvider`] over an [`InMemoryTree`].
pub struct InMemoryNavigation {
    tree: Arc<InMemoryTree>,
    engine: SearchEngine,
    awaiting: Arc<RecordingAwaiting>,
    state: Mutex<NavigationState>,
    this: Weak<InMemoryNavigation>,
}

impl InMemoryNavigation {
    pub fn new(tree: Arc<InMemoryTree>, retry_count: u32) -> Arc<Self> {
        let awaiting = Arc::new(RecordingAwaiting::default());
        let policy: Arc<dyn AwaitingPolicy> = awaiting.clone();
        Arc::new_cyclic(|this| Self {
            tree,
            engine: SearchEngine::new(retry_count, policy),
            awaiting,
            state: Mutex::new(NavigationState::default()),
            this: this.clone(),
        })
    }

    pub fn tree(&self) -> &Arc<InMemoryTree> {
        &self.tree
    }

    pub fn recorder(&self) -> &Arc<RecordingAwaiting> {
        &self.awaiting
    }

    fn bring_into_view_callback(&self) -> BringIntoView {
        let this = self.this.clone();
        Arc::new(move |title: &str| {
            let Some(provider) = this.upgrade() else {
                return Ok(());
            };
            if provider.current_window_title().as_deref() == Some(title) {
                return Ok(());
            }
            provider
                .tree
                .record_input(InputEvent::BringIntoView(title.to_string()));
            provider.get_app_root(title).map(|_| ())
        })
    }

    fn policy(&self) -> Arc<dyn AwaitingPolicy> {
        self.awaiting.clone()
    }
}

impl NavigationProvider for InMemoryNavigation {
    fn find_first(&self, scope: &UiItem, conditions: &[Condition]) -> Result<UiItem, AutomationError> {
        self.engine.find_first_in::<InMemoryItem>(scope, conditions)
    }

    fn find_all(&self, scope: &UiItem, conditions: &[Condition]) -> Result<Vec<UiItem>, AutomationError> {
        self.engine.find_all_in::<InMemoryItem>(scope, conditions)
    }

    fn get_app_root_with_retries(&self, title: &str, retries: u32) -> Result<UiItem, AutomationError> {
        if title == DESKTOP_CLASS_NAME {
            return self.get_desktop_root();
        }
        let cached = {
            let state = lock(&self.state);
            match (&state.current_window_title, state.last_window) {
                (Some(current), Some(window)) if current == title => Some(window),
                _ => None,
            }
        };
        let window = match cached {
            Some(window) => window,
            None => {
                let condition = Condition::name(title);
                let found = (0..retries.max(1))
                    .find_map(|_| self.tree.matching(None, &condition).ok()?.into_iter().next());
                let window = found.ok_or_else(|| {
                    AutomationError::ElementNotFound(format!("couldn't find window with title {title}"))
                })?;
                let mut state = lock(&self.state);
                state.current_window_title = Some(title.to_string());
                state.last_window = Some(window);
                window
            }
        };
        let context = ItemContext::window(self.policy(), title, Some(self.bring_into_view_callback()))?;
        Ok(UiItem::new(Box::new(InMemoryItem {
            tree: self.tree.clone(),
            node: window,
            context,
        })))
    }

    fn get_desktop_root(&self) -> Result<UiItem, AutomationError> {
        Ok(UiItem::new(Box::new(InMemoryItem {
            tree: self.tree.clone(),
            node: self.tree.root(),
            context: ItemContext::desktop(self.policy(), DESKTOP_CLASS_NAME),
        })))
    }

    fn current_window_title(&self) -> Option<String> {
        lock(&self.state).current_window_title.clone()
    }

    fn set_to_initial_state(&self) {
        *lock(&self.state) = NavigationState::default();
    }

    fn awaiting(&self) -> Arc<dyn AwaitingPolicy> {
        self.policy()
    }
}
