//! Condition evaluation over a [`BackendAdapter`] with bounded retries.
//!
//! One attempt of `find_first`:
//! - no conditions: first descendant of the scope;
//! - one condition: the adapter's single-condition lookup;
//! - several: the highest-priority condition yields candidates, the others are
//!   compared by exact string equality against each candidate, first match wins.
//!
//! One attempt of `find_all` intersects the candidate sets of all conditions
//! in caller order; any empty step ends the attempt.
//!
//! Attempts repeat up to the retry limit with the retry delay in between.
//! Criteria errors end the search at once; any other adapter error only ends
//! the current attempt.

use crate::awaiting::AwaitingPolicy;
use crate::condition::{describe_conditions, sort_by_priority, Condition, ConditionKey};
use crate::config::Settings;
use crate::errors::AutomationError;
use crate::platforms::BackendAdapter;
use crate::wrapper::{UiItem, UiItemImpl};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, instrument, warn};

/// Result of one search attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome<T> {
    Found(T),
    NotFound,
    CriteriaError(String),
}

impl<T> SearchOutcome<T> {
    fn from_lookup(result: Result<Option<T>, AutomationError>) -> Self {
        match result {
            Ok(Some(found)) => SearchOutcome::Found(found),
            Ok(None) => SearchOutcome::NotFound,
            Err(e) => Self::from_error(e),
        }
    }

    fn from_error(e: AutomationError) -> Self {
        match e {
            AutomationError::SearchCriteria(key) => SearchOutcome::CriteriaError(key),
            other => {
                warn!("lookup failed, treating as not found: {other}");
                SearchOutcome::NotFound
            }
        }
    }
}

/// A backend wrapper that can scope a search and wrap what it finds.
pub trait SearchScope: UiItemImpl + Sized + 'static {
    type Adapter: BackendAdapter;

    fn adapter(&self) -> &Self::Adapter;

    /// `None` for a root that scopes the whole session.
    fn handle(&self) -> Option<&<Self::Adapter as BackendAdapter>::Handle>;

    fn wrap_child(
        &self,
        handle: <Self::Adapter as BackendAdapter>::Handle,
    ) -> Result<Self, AutomationError>;
}

#[derive(Clone)]
pub struct SearchEngine {
    retry_count: u32,
    awaiting: Arc<dyn AwaitingPolicy>,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("retry_count", &self.retry_count)
            .finish()
    }
}

impl SearchEngine {
    pub fn new(retry_count: u32, awaiting: Arc<dyn AwaitingPolicy>) -> Self {
        Self {
            retry_count: retry_count.max(1),
            awaiting,
        }
    }

    pub fn from_settings(settings: &Settings, awaiting: Arc<dyn AwaitingPolicy>) -> Self {
        Self::new(settings.retry_count, awaiting)
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// First node under `scope` matching every condition.
    ///
    /// Fails with [`AutomationError::Navigation`] once all attempts are used.
    pub fn find_first<A: BackendAdapter>(
        &self,
        adapter: &A,
        scope: Option<&A::Handle>,
        conditions: &[Condition],
    ) -> Result<A::Handle, AutomationError> {
        let started = Instant::now();
        let outcome = self.retry(conditions, "first", || {
            self.attempt_first(adapter, scope, conditions)
        });
        let elapsed_ms = started.elapsed().as_millis();
        match outcome {
            (SearchOutcome::Found(handle), attempts) => {
                debug!(
                    criteria = %describe_conditions(conditions),
                    attempts,
                    elapsed_ms,
                    "completed search first element"
                );
                Ok(handle)
            }
            (SearchOutcome::CriteriaError(key), _) => {
                error!(criteria = %describe_conditions(conditions), "unsupported search criteria {key}");
                Err(AutomationError::SearchCriteria(key))
            }
            (SearchOutcome::NotFound, attempts) => {
                error!(
                    criteria = %describe_conditions(conditions),
                    attempts,
                    elapsed_ms,
                    "failed search first element"
                );
                Err(AutomationError::Navigation {
                    conditions: conditions.to_vec(),
                    attempts,
                    elapsed_ms,
                })
            }
        }
    }

    /// Every node under `scope` matching all conditions.
    ///
    /// Exhausted retries yield an empty vector, not an error.
    pub fn find_all<A: BackendAdapter>(
        &self,
        adapter: &A,
        scope: Option<&A::Handle>,
        conditions: &[Condition],
    ) -> Result<Vec<A::Handle>, AutomationError> {
        let started = Instant::now();
        let outcome = self.retry(conditions, "all", || {
            self.attempt_all(adapter, scope, conditions)
        });
        let elapsed_ms = started.elapsed().as_millis();
        match outcome {
            (SearchOutcome::Found(handles), attempts) => {
                debug!(
                    criteria = %describe_conditions(conditions),
                    attempts,
                    elapsed_ms,
                    found = handles.len(),
                    "completed search all elements"
                );
                Ok(handles)
            }
            (SearchOutcome::CriteriaError(key), _) => {
                error!(criteria = %describe_conditions(conditions), "unsupported search criteria {key}");
                Err(AutomationError::SearchCriteria(key))
            }
            (SearchOutcome::NotFound, attempts) => {
                debug!(
                    criteria = %describe_conditions(conditions),
                    attempts,
                    elapsed_ms,
                    "no elements found"
                );
                Ok(Vec::new())
            }
        }
    }

    fn retry<T>(
        &self,
        conditions: &[Condition],
        mode: &str,
        mut attempt: impl FnMut() -> SearchOutcome<T>,
    ) -> (SearchOutcome<T>, u32) {
        let mut attempts = 0;
        loop {
            attempts += 1;
            debug!(criteria = %describe_conditions(conditions), attempt = attempts, "search {mode}");
            match attempt() {
                SearchOutcome::NotFound => {
                    debug!(attempt = attempts, "couldn't find {mode} on attempt");
                    if attempts >= self.retry_count {
                        return (SearchOutcome::NotFound, attempts);
                    }
                    self.awaiting.wait_for_default_retry_delay();
                }
                done => return (done, attempts),
            }
        }
    }

    /// A single `find_first` attempt.
    pub fn attempt_first<A: BackendAdapter>(
        &self,
        adapter: &A,
        scope: Option<&A::Handle>,
        conditions: &[Condition],
    ) -> SearchOutcome<A::Handle> {
        match conditions {
            [] => SearchOutcome::from_lookup(adapter.find_first_descendant(scope)),
            [single] => SearchOutcome::from_lookup(adapter.find_first_by(scope, single)),
            _ => {
                let sorted = match sort_by_priority(conditions) {
                    Ok(sorted) => sorted,
                    Err(e) => return SearchOutcome::from_error(e),
                };
                let Some((seed, rest)) = sorted.split_first() else {
                    return SearchOutcome::NotFound;
                };
                let candidates = match adapter.find_all_by(scope, seed) {
                    Ok(candidates) => candidates,
                    Err(e) => return SearchOutcome::from_error(e),
                };
                SearchOutcome::from_lookup(first_matching(adapter, candidates, rest))
            }
        }
    }

    /// A single `find_all` attempt.
    pub fn attempt_all<A: BackendAdapter>(
        &self,
        adapter: &A,
        scope: Option<&A::Handle>,
        conditions: &[Condition],
    ) -> SearchOutcome<Vec<A::Handle>> {
        if conditions.is_empty() {
            return match adapter.find_all_descendants(scope) {
                Ok(all) if all.is_empty() => SearchOutcome::NotFound,
                Ok(all) => SearchOutcome::Found(all),
                Err(e) => SearchOutcome::from_error(e),
            };
        }
        if let Some(e) = conditions.iter().find_map(|c| c.parsed_key().err()) {
            return SearchOutcome::from_error(e);
        }

        let mut found: Option<Vec<A::Handle>> = None;
        for condition in conditions {
            let elements = match adapter.find_all_by(scope, condition) {
                Ok(elements) => elements,
                Err(e) => return SearchOutcome::from_error(e),
            };
            if elements.is_empty() {
                return SearchOutcome::NotFound;
            }
            let next = match found.take() {
                None => elements,
                Some(mut running) => {
                    running.retain(|h| elements.contains(h));
                    running
                }
            };
            if next.is_empty() {
                return SearchOutcome::NotFound;
            }
            found = Some(next);
        }
        match found {
            Some(handles) => SearchOutcome::Found(handles),
            None => SearchOutcome::NotFound,
        }
    }

    /// Runs `find_first` beneath a backend item and wraps the result.
    #[instrument(level = "debug", skip(self, scope), fields(window = %scope.window_title()))]
    pub fn find_first_in<S: SearchScope>(
        &self,
        scope: &UiItem,
        conditions: &[Condition],
    ) -> Result<UiItem, AutomationError> {
        let native = downcast_scope::<S>(scope)?;
        scope.bring_into_view()?;
        let handle = self.find_first(native.adapter(), native.handle(), conditions)?;
        Ok(UiItem::new(Box::new(native.wrap_child(handle)?)))
    }

    /// Runs `find_all` beneath a backend item and wraps the results.
    #[instrument(level = "debug", skip(self, scope), fields(window = %scope.window_title()))]
    pub fn find_all_in<S: SearchScope>(
        &self,
        scope: &UiItem,
        conditions: &[Condition],
    ) -> Result<Vec<UiItem>, AutomationError> {
        let native = downcast_scope::<S>(scope)?;
        scope.bring_into_view()?;
        self.find_all(native.adapter(), native.handle(), conditions)?
            .into_iter()
            .map(|handle| Ok(UiItem::new(Box::new(native.wrap_child(handle)?))))
            .collect()
    }
}

fn first_matching<A: BackendAdapter>(
    adapter: &A,
    candidates: Vec<A::Handle>,
    rest: &[&Condition],
) -> Result<Option<A::Handle>, AutomationError> {
    for candidate in candidates {
        let mut matches = true;
        for condition in rest {
            let key: ConditionKey = condition.parsed_key()?;
            if adapter.read_property(&candidate, key.as_str())? != condition.value {
                matches = false;
                break;
            }
        }
        if matches {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn downcast_scope<S: SearchScope>(scope: &UiItem) -> Result<&S, AutomationError> {
    scope.as_any().downcast_ref::<S>().ok_or_else(|| {
        AutomationError::InvalidArgument(format!(
            "search scope {} belongs to a different backend",
            scope.object_id()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AdapterCall, InMemoryTree, NodeId, RecordingAwaiting};

    fn engine(retry_count: u32) -> (SearchEngine, Arc<RecordingAwaiting>) {
        let awaiting = Arc::new(RecordingAwaiting::default());
        (SearchEngine::new(retry_count, awaiting.clone()), awaiting)
    }

    /// desktop
    /// └── window (Name=Run)
    ///     ├── pane (AutomationId=12298, ClassName=ComboBox)
    ///     │   └── edit (AutomationId=1001, ClassName=Edit, Name=Open)
    ///     └── button (AutomationId=1, ClassName=Button, Name=OK)
    fn run_dialog() -> (InMemoryTree, [NodeId; 4]) {
        let tree = InMemoryTree::new();
        let window = tree.add(tree.root(), [("Name", "Run"), ("ClassName", "#32770")]);
        let pane = tree.add(window, [("AutomationId", "12298"), ("ClassName", "ComboBox")]);
        let edit = tree.add(
            pane,
            [("AutomationId", "1001"), ("ClassName", "Edit"), ("Name", "Open")],
        );
        let button = tree.add(
            window,
            [("AutomationId", "1"), ("ClassName", "Button"), ("Name", "OK")],
        );
        (tree, [window, pane, edit, button])
    }

    #[test]
    fn single_condition_uses_the_single_lookup_only() {
        let (tree, [window, _, edit, _]) = run_dialog();
        let (engine, _) = engine(3);

        let found = engine
            .find_first(&tree, Some(&window), &[Condition::automation_id("1001")])
            .unwrap();
        assert_eq!(found, edit);
        assert_eq!(
            tree.calls(),
            vec![AdapterCall::FirstBy(Condition::automation_id("1001"))]
        );

        tree.clear_calls();
        let all = engine
            .find_all(&tree, Some(&window), &[Condition::class_name("Edit")])
            .unwrap();
        assert_eq!(all, vec![edit]);
        assert_eq!(tree.calls(), vec![AdapterCall::AllBy(Condition::class_name("Edit"))]);
    }

    #[test]
    fn highest_priority_condition_seeds_the_candidates() {
        let (tree, [window, _, _, button]) = run_dialog();
        let (engine, _) = engine(3);
        let orders = [
            vec![
                Condition::class_name("Button"),
                Condition::name("OK"),
                Condition::automation_id("1"),
            ],
            vec![
                Condition::automation_id("1"),
                Condition::class_name("Button"),
                Condition::name("OK"),
            ],
        ];
        for conditions in orders {
            tree.clear_calls();
            let found = engine.find_first(&tree, Some(&window), &conditions).unwrap();
            assert_eq!(found, button);
            assert_eq!(
                tree.lookups(),
                vec![AdapterCall::AllBy(Condition::automation_id("1"))]
            );
            assert!(tree
                .calls()
                .contains(&AdapterCall::ReadProperty(button, "Name".to_string())));
        }
    }

    #[test]
    fn verification_is_exact_string_equality() {
        let (tree, [window, ..]) = run_dialog();
        let (engine, _) = engine(2);
        let err = engine
            .find_first(
                &tree,
                Some(&window),
                &[Condition::automation_id("1"), Condition::name("ok")],
            )
            .unwrap_err();
        assert!(matches!(err, AutomationError::Navigation { attempts: 2, .. }));
    }

    #[test]
    fn find_first_makes_exactly_retry_count_attempts_then_fails() {
        let (tree, [window, ..]) = run_dialog();
        let (engine, awaiting) = engine(4);
        let conditions = [Condition::name("Missing")];

        let err = engine.find_first(&tree, Some(&window), &conditions).unwrap_err();

        match err {
            AutomationError::Navigation {
                conditions: searched,
                attempts,
                ..
            } => {
                assert_eq!(searched, conditions.to_vec());
                assert_eq!(attempts, 4);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(tree.lookups().len(), 4);
        assert_eq!(awaiting.retry_delays(), 3);
    }

    #[test]
    fn find_all_exhausts_retries_and_returns_empty() {
        let (tree, [window, ..]) = run_dialog();
        let (engine, awaiting) = engine(3);

        let found = engine
            .find_all(&tree, Some(&window), &[Condition::class_name("Slider")])
            .unwrap();

        assert!(found.is_empty());
        assert_eq!(tree.lookups().len(), 3);
        assert_eq!(awaiting.retry_delays(), 2);
    }

    #[test]
    fn find_all_intersects_in_caller_order() {
        let (tree, [window, _, edit, button]) = run_dialog();
        let (engine, _) = engine(1);

        let named = engine
            .find_all(
                &tree,
                Some(&window),
                &[Condition::name("OK"), Condition::class_name("Button")],
            )
            .unwrap();
        assert_eq!(named, vec![button]);
        assert_eq!(
            tree.lookups(),
            vec![
                AdapterCall::AllBy(Condition::name("OK")),
                AdapterCall::AllBy(Condition::class_name("Button")),
            ]
        );

        let everything = engine.find_all(&tree, Some(&window), &[]).unwrap();
        assert_eq!(everything.len(), 3);
        assert!(everything.contains(&edit));
    }

    #[test]
    fn empty_intersection_counts_as_a_failed_attempt() {
        let (tree, [window, ..]) = run_dialog();
        let (engine, _) = engine(2);
        let found = engine
            .find_all(
                &tree,
                Some(&window),
                &[Condition::class_name("Edit"), Condition::name("OK")],
            )
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(tree.lookups().len(), 4);
    }

    #[test]
    fn unsupported_key_bypasses_the_retry_loop() {
        let (tree, [window, ..]) = run_dialog();
        let (engine, awaiting) = engine(5);

        for conditions in [
            vec![Condition::new("Foo", "bar")],
            vec![Condition::name("OK"), Condition::new("Foo", "bar")],
        ] {
            tree.clear_calls();
            let err = engine.find_first(&tree, Some(&window), &conditions).unwrap_err();
            assert!(matches!(err, AutomationError::SearchCriteria(ref k) if k == "Foo"));
            assert!(tree.lookups().len() <= 1);

            let err = engine.find_all(&tree, Some(&window), &conditions).unwrap_err();
            assert!(matches!(err, AutomationError::SearchCriteria(ref k) if k == "Foo"));
        }
        assert_eq!(awaiting.retry_delays(), 0);
    }

    #[test]
    fn transient_lookup_errors_are_retried() {
        let (tree, [window, _, edit, _]) = run_dialog();
        let (engine, awaiting) = engine(5);
        tree.fail_next_lookups(2);

        let found = engine
            .find_first(&tree, Some(&window), &[Condition::class_name("Edit")])
            .unwrap();

        assert_eq!(found, edit);
        assert_eq!(tree.lookups().len(), 3);
        assert_eq!(awaiting.retry_delays(), 2);
    }

    #[test]
    fn zero_conditions_take_the_first_descendant() {
        let (tree, [window, pane, ..]) = run_dialog();
        let (engine, _) = engine(1);
        assert_eq!(engine.find_first(&tree, Some(&window), &[]).unwrap(), pane);
        assert_eq!(tree.lookups(), vec![AdapterCall::FirstDescendant]);
    }

    #[test]
    fn parent_runtime_id_scopes_to_direct_children() {
        let (tree, [window, pane, edit, _]) = run_dialog();
        let (engine, _) = engine(1);
        let pane_runtime_id = tree.read_property(&pane, "RuntimeId").unwrap();
        let children = engine
            .find_all(
                &tree,
                Some(&window),
                &[Condition::parent_runtime_id(pane_runtime_id)],
            )
            .unwrap();
        assert_eq!(children, vec![edit]);
    }

    #[test]
    fn attempt_reports_outcome_tags() {
        let (tree, [window, ..]) = run_dialog();
        let (engine, _) = engine(1);
        assert_eq!(
            engine.attempt_first(&tree, Some(&window), &[Condition::name("Nope")]),
            SearchOutcome::NotFound
        );
        assert_eq!(
            engine.attempt_all(&tree, Some(&window), &[Condition::new("Foo", "x")]),
            SearchOutcome::CriteriaError("Foo".to_string())
        );
    }
}
