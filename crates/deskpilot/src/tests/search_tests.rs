//! Slow and fast path behaviour of the element search

use super::flat_tree;
use crate::control_type::ControlType;
use crate::platforms::memory::{MemoryNode, MemoryTree};
use crate::search::{ElementSearch, SearchBudget, SearchStrategy, Termination};
use crate::selector::MatchCriterion;
use crate::types::{SearchScope, TraversalKind};
use std::time::Duration;

/// root
/// ├─ n0 (Button)
/// │  ├─ n1 (Text)
/// │  │  └─ n2 (Button)
/// │  └─ n3 (Button)
/// └─ n4 (Group)
///    └─ n5 (Button)
fn labelled_tree() -> MemoryTree {
    let tree = MemoryTree::new(MemoryNode::new(ControlType::Pane, "root"));
    let n0 = tree.add_child(MemoryTree::ROOT, MemoryNode::new(ControlType::Button, "n0"));
    let n1 = tree.add_child(n0, MemoryNode::new(ControlType::Text, "n1"));
    tree.add_child(n1, MemoryNode::new(ControlType::Button, "n2"));
    tree.add_child(n0, MemoryNode::new(ControlType::Button, "n3"));
    let n4 = tree.add_child(MemoryTree::ROOT, MemoryNode::new(ControlType::Group, "n4"));
    tree.add_child(n4, MemoryNode::new(ControlType::Button, "n5"));
    tree
}

#[test]
fn test_node_budget_caps_visits() {
    let limit = 50;
    let tree = flat_tree(limit + 100);
    let root = tree.element(MemoryTree::ROOT);
    let criterion = MatchCriterion::default().with_name_containing("missing");
    let budget = SearchBudget::default().with_max_nodes(limit);

    let (found, stats) = ElementSearch::default()
        .find_with_stats(&root, &criterion, 0, &budget)
        .unwrap();

    assert!(found.is_none());
    assert_eq!(stats.strategy, SearchStrategy::Slow);
    assert!(stats.visited <= limit, "visited {}", stats.visited);
    assert_eq!(stats.termination, Termination::NodeBudget);
}

#[test]
fn test_default_node_budget_applies_without_explicit_limit() {
    let tree = flat_tree(200);
    let root = tree.element(MemoryTree::ROOT);
    let criterion = MatchCriterion::default().with_name_containing("missing");

    let (found, stats) = ElementSearch::new(Duration::from_secs(60), 25)
        .find_with_stats(&root, &criterion, 0, &SearchBudget::default())
        .unwrap();

    assert!(found.is_none());
    assert!(stats.visited <= 25, "visited {}", stats.visited);
    assert_eq!(stats.termination, Termination::NodeBudget);
}

#[test]
fn test_default_time_budget_stops_unbounded_walk() {
    // Sibling steps in the memory tree are linear, so a full walk here
    // takes far longer than the budget.
    let tree = flat_tree(50_000);
    let root = tree.element(MemoryTree::ROOT);
    let criterion = MatchCriterion::default().with_name_containing("missing");

    let (found, stats) = ElementSearch::new(Duration::from_millis(50), usize::MAX)
        .find_with_stats(&root, &criterion, 0, &SearchBudget::default())
        .unwrap();

    assert!(found.is_none());
    assert_eq!(stats.termination, Termination::TimeBudget);
    assert!(stats.visited < 50_000);
    assert!(stats.elapsed < Duration::from_secs(2), "took {:?}", stats.elapsed);
}

#[test]
fn test_capped_budget_overrides_longer_default() {
    let tree = flat_tree(50_000);
    let root = tree.element(MemoryTree::ROOT);
    let criterion = MatchCriterion::default().with_name_containing("missing");
    let budget = SearchBudget::default().capped_to(Duration::from_millis(50));

    let (found, stats) = ElementSearch::new(Duration::from_secs(60), usize::MAX)
        .find_with_stats(&root, &criterion, 0, &budget)
        .unwrap();

    assert!(found.is_none());
    assert_eq!(stats.termination, Termination::TimeBudget);
    assert!(stats.elapsed < Duration::from_secs(2), "took {:?}", stats.elapsed);
}

#[test]
fn test_capped_to_keeps_tighter_limit() {
    let long = SearchBudget::default().with_timeout(Duration::from_secs(10));
    assert_eq!(long.capped_to(Duration::from_millis(200)).max_elapsed_ms, Some(200));

    let short = SearchBudget::default().with_timeout(Duration::from_millis(50));
    assert_eq!(short.capped_to(Duration::from_secs(1)).max_elapsed_ms, Some(50));

    // Zero would mean unbounded.
    let spent = SearchBudget::default().capped_to(Duration::ZERO);
    assert_eq!(spent.max_elapsed_ms, Some(1));
}

#[test]
fn test_node_budget_allows_early_match() {
    let tree = flat_tree(500);
    let root = tree.element(MemoryTree::ROOT);
    let criterion = MatchCriterion::default().with_name_containing("b3");
    let budget = SearchBudget::default().with_max_nodes(10);

    let (found, stats) = ElementSearch::default()
        .find_with_stats(&root, &criterion, 0, &budget)
        .unwrap();

    assert_eq!(found.unwrap().name().unwrap(), "b3");
    assert_eq!(stats.visited, 4);
    assert_eq!(stats.termination, Termination::Found);
}

#[test]
fn test_kth_match_follows_pre_order() {
    let tree = labelled_tree();
    let root = tree.element(MemoryTree::ROOT);
    let buttons = MatchCriterion::default().with_control_type(ControlType::Button);
    let expected = ["n0", "n2", "n3", "n5"];

    for (k, name) in expected.iter().enumerate() {
        let found = ElementSearch::default()
            .find(&root, &buttons, k as i32, &SearchBudget::default())
            .unwrap()
            .unwrap_or_else(|| panic!("no match for index {k}"));
        assert_eq!(found.name().unwrap(), *name, "index {k}");
    }

    let past_end = ElementSearch::default()
        .find(&root, &buttons, expected.len() as i32, &SearchBudget::default())
        .unwrap();
    assert!(past_end.is_none());
}

#[test]
fn test_negative_index_is_first_match() {
    let tree = labelled_tree();
    let root = tree.element(MemoryTree::ROOT);
    let buttons = MatchCriterion::default().with_control_type(ControlType::Button);
    let found = ElementSearch::default()
        .find(&root, &buttons, -3, &SearchBudget::default())
        .unwrap()
        .unwrap();
    assert_eq!(found.name().unwrap(), "n0");
}

#[test]
fn test_fast_and_slow_paths_agree() {
    let tree = labelled_tree();
    let root = tree.element(MemoryTree::ROOT);
    let criterion = MatchCriterion::default()
        .with_name("N5")
        .with_control_type(ControlType::Button);

    let fast_budget = SearchBudget::default();
    let slow_budget = SearchBudget::default().with_max_depth(16);
    assert_eq!(
        ElementSearch::choose_strategy(&criterion, 0, &fast_budget),
        SearchStrategy::Fast
    );
    assert_eq!(
        ElementSearch::choose_strategy(&criterion, 0, &slow_budget),
        SearchStrategy::Slow
    );

    let search = ElementSearch::default();
    let fast = search.find(&root, &criterion, 0, &fast_budget).unwrap();
    let slow = search.find(&root, &criterion, 0, &slow_budget).unwrap();
    assert!(fast.is_some());
    assert_eq!(fast, slow);
}

#[test]
fn test_non_exact_name_forces_slow_path() {
    let contains = MatchCriterion::default().with_name_containing("ok");
    let regex = MatchCriterion::default().with_name_regex("^o.$");
    let exact = MatchCriterion::default().with_name("ok");
    let budget = SearchBudget::default();

    assert_eq!(
        ElementSearch::choose_strategy(&contains, 0, &budget),
        SearchStrategy::Slow
    );
    assert_eq!(
        ElementSearch::choose_strategy(&regex, 0, &budget),
        SearchStrategy::Slow
    );
    assert_eq!(
        ElementSearch::choose_strategy(&exact, 1, &budget),
        SearchStrategy::Slow
    );
    assert_eq!(
        ElementSearch::choose_strategy(
            &exact,
            0,
            &budget.clone().with_scope(SearchScope::Children).with_max_depth(4)
        ),
        SearchStrategy::Fast
    );
}

#[test]
fn test_stale_node_is_skipped_and_walk_continues() {
    let tree = MemoryTree::new(MemoryNode::new(ControlType::Pane, "root"));
    let stale = tree.add_child(
        MemoryTree::ROOT,
        MemoryNode::new(ControlType::Button, "Target").stale(),
    );
    tree.add_child(stale, MemoryNode::new(ControlType::Button, "Target child"));
    tree.add_child(MemoryTree::ROOT, MemoryNode::new(ControlType::Button, "Target sibling"));
    let root = tree.element(MemoryTree::ROOT);
    let criterion = MatchCriterion::default().with_name_containing("target");
    let search = ElementSearch::default();

    let first = search
        .find(&root, &criterion, 0, &SearchBudget::default())
        .unwrap()
        .unwrap();
    assert_eq!(first.name().unwrap(), "Target child");

    let second = search
        .find(&root, &criterion, 1, &SearchBudget::default())
        .unwrap()
        .unwrap();
    assert_eq!(second.name().unwrap(), "Target sibling");
}

#[test]
fn test_removed_subtree_reads_as_stale() {
    let tree = flat_tree(3);
    let root = tree.element(MemoryTree::ROOT);
    let held = ElementSearch::default()
        .find(
            &root,
            &MatchCriterion::default().with_name("b1"),
            0,
            &SearchBudget::default(),
        )
        .unwrap()
        .unwrap();

    let id = MemoryTree::node_id(&held).unwrap();
    tree.remove(id);

    assert!(held.name().is_err());
    assert!(held.info().name.is_none());
    let again = ElementSearch::default()
        .find(
            &root,
            &MatchCriterion::default().with_name("b1"),
            0,
            &SearchBudget::default(),
        )
        .unwrap();
    assert!(again.is_none());
}

#[test]
fn test_children_scope_stops_at_depth_one() {
    let tree = labelled_tree();
    let root = tree.element(MemoryTree::ROOT);
    let criterion = MatchCriterion::default().with_name_containing("n5");
    let children = SearchBudget::default()
        .with_scope(SearchScope::Children)
        .with_max_depth(8);
    assert_eq!(children.effective_max_depth(), Some(1));

    let found = ElementSearch::default()
        .find(&root, &criterion, 0, &children)
        .unwrap();
    assert!(found.is_none());

    let fast_children = ElementSearch::default()
        .find(
            &root,
            &MatchCriterion::default().with_name("n5"),
            0,
            &SearchBudget::default().with_scope(SearchScope::Children),
        )
        .unwrap();
    assert!(fast_children.is_none());

    let top = ElementSearch::default()
        .find(
            &root,
            &MatchCriterion::default().with_name_containing("n4"),
            0,
            &children,
        )
        .unwrap();
    assert!(top.is_some());
}

#[test]
fn test_max_depth_limits_descent() {
    let tree = labelled_tree();
    let root = tree.element(MemoryTree::ROOT);
    let criterion = MatchCriterion::default().with_name_containing("n2");

    let shallow = SearchBudget::default().with_max_depth(2);
    assert!(ElementSearch::default()
        .find(&root, &criterion, 0, &shallow)
        .unwrap()
        .is_none());

    let deep = SearchBudget::default().with_max_depth(3);
    assert!(ElementSearch::default()
        .find(&root, &criterion, 0, &deep)
        .unwrap()
        .is_some());
}

#[test]
fn test_root_is_never_a_candidate() {
    let tree = flat_tree(2);
    let root = tree.element(MemoryTree::ROOT);
    let found = ElementSearch::default()
        .find(
            &root,
            &MatchCriterion::default().with_name_containing("root"),
            0,
            &SearchBudget::default(),
        )
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn test_traversal_kind_hides_structural_nodes() {
    let tree = MemoryTree::new(MemoryNode::new(ControlType::Pane, "root"));
    let filler = tree.add_child(
        MemoryTree::ROOT,
        MemoryNode::new(ControlType::Custom, "filler").structural(),
    );
    tree.add_child(
        filler,
        MemoryNode::new(ControlType::Text, "label").control_only(),
    );
    let root = tree.element(MemoryTree::ROOT);
    let search = ElementSearch::default();
    let filler_query = MatchCriterion::default().with_name_containing("filler");
    let label_query = MatchCriterion::default().with_name_containing("label");

    let control = SearchBudget::default();
    let raw = SearchBudget::default().with_traversal(TraversalKind::Raw);
    let content = SearchBudget::default().with_traversal(TraversalKind::Content);

    assert!(search.find(&root, &filler_query, 0, &control).unwrap().is_none());
    assert!(search.find(&root, &filler_query, 0, &raw).unwrap().is_some());
    // Hidden nodes are still walked through.
    assert!(search.find(&root, &label_query, 0, &control).unwrap().is_some());
    assert!(search.find(&root, &label_query, 0, &content).unwrap().is_none());
}

#[test]
fn test_malformed_regex_is_hard_error() {
    let tree = flat_tree(1);
    let root = tree.element(MemoryTree::ROOT);
    let err = ElementSearch::default()
        .find(
            &root,
            &MatchCriterion::default().with_name_regex("(unclosed"),
            0,
            &SearchBudget::default(),
        )
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_stale_root_is_not_found() {
    let tree = flat_tree(2);
    let root = tree.element(MemoryTree::ROOT);
    tree.update(MemoryTree::ROOT, |n| n.stale = true);
    // Navigation still works on a node whose properties cannot be read.
    let found = ElementSearch::default()
        .find(
            &root,
            &MatchCriterion::default().with_name("b1"),
            0,
            &SearchBudget::default(),
        )
        .unwrap();
    assert_eq!(found.unwrap().name().unwrap(), "b1");

    tree.remove(MemoryTree::ROOT);
    let (found, stats) = ElementSearch::default()
        .find_with_stats(
            &root,
            &MatchCriterion::default().with_name("b1"),
            0,
            &SearchBudget::default(),
        )
        .unwrap();
    assert!(found.is_none());
    assert_eq!(stats.termination, Termination::ProviderFailed);
}
