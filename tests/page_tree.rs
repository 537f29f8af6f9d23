//! End-to-end tests for tree mounting, bounded expansion and activation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pagetree::config::{Glyphs, TreeConfig};
use pagetree::document::{Document, ElementId};
use pagetree::error::AppError;
use pagetree::graph::backends::memory::MemoryStore;
use pagetree::graph::{QueryExecutor, RowStream};
use pagetree::tree::{
    Direction, GraphQueryClient, NodeState, PageTree, QueryKind, ATTR_TREE_DIRECTION,
    ATTR_TREE_PROP, CLASS_NODE,
};

/// Wraps a [`MemoryStore`], recording every query and failing those that
/// mention `fail_on`.
struct RecordingStore {
    inner: MemoryStore,
    log: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
}

impl RecordingStore {
    fn new(inner: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            log: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
        })
    }

    fn failing_on(inner: MemoryStore, needle: &str) -> Arc<Self> {
        Arc::new(Self {
            inner,
            log: Mutex::new(Vec::new()),
            fail_on: Mutex::new(Some(needle.to_string())),
        })
    }

    /// Starts failing queries that mention `needle`.
    fn fail_from_now_on(&self, needle: &str) {
        *self.fail_on.lock().unwrap() = Some(needle.to_string());
    }

    fn queries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn count_mentioning(&self, needle: &str) -> usize {
        self.queries().iter().filter(|q| q.contains(needle)).count()
    }
}

#[async_trait]
impl QueryExecutor for RecordingStore {
    async fn execute_query(&self, datalog: &str) -> Result<RowStream<'_>, AppError> {
        self.log.lock().unwrap().push(datalog.to_string());
        let failing = self
            .fail_on
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|needle| datalog.contains(needle));
        if failing {
            return Err(AppError::query("injected failure", datalog));
        }
        self.inner.execute_query(datalog).await
    }
}

fn engine<E: QueryExecutor>(executor: E) -> PageTree<E> {
    PageTree::new(executor, TreeConfig::default(), Glyphs::default())
}

fn add_placeholder(doc: &mut Document, prop: &str, direction: Option<&str>) -> ElementId {
    let div = doc.create_element("div");
    doc.set_attribute(div, ATTR_TREE_PROP, prop).unwrap();
    if let Some(direction) = direction {
        doc.set_attribute(div, ATTR_TREE_DIRECTION, direction).unwrap();
    }
    doc.append_child(doc.root(), div).unwrap();
    div
}

fn control_of<E: QueryExecutor>(tree: &PageTree<E>, doc: &Document, page: &str) -> ElementId {
    let controls = tree.find_controls(doc, page);
    assert_eq!(controls.len(), 1, "expected one node for {}", page);
    controls[0]
}

fn state_of<E: QueryExecutor>(tree: &PageTree<E>, doc: &Document, page: &str) -> NodeState {
    tree.node(control_of(tree, doc, page)).unwrap().state
}

/// Display names of the node children directly under `container`.
fn child_pages(doc: &Document, container: ElementId) -> Vec<String> {
    doc.children(container)
        .iter()
        .filter(|c| doc.get(**c).unwrap().has_class(CLASS_NODE))
        .map(|node| {
            let link = doc.children(*node)[1];
            doc.text(link).unwrap().to_string()
        })
        .collect()
}

fn fruit_store() -> MemoryStore {
    MemoryStore::builder()
        .property("Apple", "tags", ["Fruit"])
        .property("Pear", "tags", ["Fruit"])
        .build()
}

/// P00 <- P01 <- ... <- P{len-1}, each page tagging its predecessor.
fn chain_store(len: usize) -> MemoryStore {
    let mut builder = MemoryStore::builder().page("P00");
    for i in 1..len {
        builder = builder.property(&format!("P{:02}", i), "tags", [format!("P{:02}", i - 1)]);
    }
    builder.build()
}

/// A `Hub` page with `n` children.
fn hub_store(n: usize) -> MemoryStore {
    let mut builder = MemoryStore::builder().page("Hub");
    for i in 1..=n {
        builder = builder.property(&format!("C{:02}", i), "tags", ["Hub"]);
    }
    builder.build()
}

#[tokio::test]
async fn test_mount_renders_outline() {
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(fruit_store());

    let batch = doc.take_mutations();
    assert_eq!(tree.handle_mutations(&mut doc, &batch).await.unwrap(), 1);

    assert_eq!(
        doc.render_outline(div),
        "[-] Tree from tags:\n  [-] Fruit\n    [ ] Apple\n    [ ] Pear\n"
    );
    assert!(doc.get(div).unwrap().has_class("pagetree"));

    let links = doc.query_class(div, "page-ref");
    assert_eq!(doc.attribute(links[0], "href"), Some("#/page/fruit"));
}

#[tokio::test]
async fn test_mount_is_idempotent() {
    let store = RecordingStore::new(fruit_store());
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(Arc::clone(&store));

    let batch = doc.take_mutations();
    assert_eq!(tree.handle_mutations(&mut doc, &batch).await.unwrap(), 1);
    let queries = store.queries().len();
    let nodes = tree.node_count();

    assert_eq!(tree.handle_mutations(&mut doc, &batch).await.unwrap(), 0);
    assert_eq!(store.queries().len(), queries);
    assert_eq!(tree.node_count(), nodes);

    let buttons = doc
        .children(div)
        .iter()
        .filter(|c| doc.get(**c).unwrap().tag == "button")
        .count();
    assert_eq!(buttons, 1);
    assert!(doc.attribute(div, ATTR_TREE_PROP).is_none());

    assert!(matches!(
        tree.mount(&mut doc, div).await,
        Err(AppError::MalformedConfiguration(_))
    ));
}

#[tokio::test]
async fn test_depth_bound_defers_seventeenth_level() {
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(chain_store(30));
    tree.mount(&mut doc, div).await.unwrap();

    // Root control is level one; P00..P14 fill levels two to sixteen.
    for i in 0..15 {
        assert_eq!(
            state_of(&tree, &doc, &format!("P{:02}", i)),
            NodeState::ExpandedEager { open: true },
            "P{:02} should be eager",
            i
        );
    }
    assert_eq!(state_of(&tree, &doc, "P15"), NodeState::Collapsed);
    assert_eq!(doc.text(control_of(&tree, &doc, "P15")).unwrap(), "…");
    assert!(tree.find_controls(&doc, "P16").is_empty());

    let p15 = control_of(&tree, &doc, "P15");
    assert_eq!(tree.node(p15).unwrap().depth_remaining, 1);
    assert!(!tree.node(p15).unwrap().resolved());
}

#[tokio::test]
async fn test_manual_expansion_resets_depth_budget() {
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(chain_store(30));
    tree.mount(&mut doc, div).await.unwrap();

    let p15 = control_of(&tree, &doc, "P15");
    let state = tree.activate(&mut doc, p15).await.unwrap();
    assert_eq!(state, Some(NodeState::ExpandedDeferred { open: true }));
    assert_eq!(doc.text(p15).unwrap(), "-");

    // Fresh budget of 16 covers the 14 remaining pages.
    for i in 16..29 {
        assert_eq!(
            state_of(&tree, &doc, &format!("P{:02}", i)),
            NodeState::ExpandedEager { open: true }
        );
    }
    assert_eq!(state_of(&tree, &doc, "P29"), NodeState::Leaf);
}

#[tokio::test]
async fn test_sibling_bound_defers_wide_parent() {
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(hub_store(20));
    tree.mount(&mut doc, div).await.unwrap();

    assert_eq!(state_of(&tree, &doc, "Hub"), NodeState::Collapsed);
    assert!(tree.find_controls(&doc, "C01").is_empty());

    let hub = control_of(&tree, &doc, "Hub");
    tree.activate(&mut doc, hub).await.unwrap();
    let container = doc.parent(hub).unwrap();
    assert_eq!(child_pages(&doc, container).len(), 20);
    for i in 1..=20 {
        assert_eq!(state_of(&tree, &doc, &format!("C{:02}", i)), NodeState::Leaf);
    }
}

#[tokio::test]
async fn test_sibling_ceiling_is_inclusive() {
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(hub_store(16));
    tree.mount(&mut doc, div).await.unwrap();

    assert_eq!(
        state_of(&tree, &doc, "Hub"),
        NodeState::ExpandedEager { open: true }
    );
    assert_eq!(tree.find_controls(&doc, "C16").len(), 1);
}

#[tokio::test]
async fn test_configured_bounds_apply() {
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let config = TreeConfig {
        max_siblings: 2,
        ..TreeConfig::default()
    };
    let mut tree = PageTree::new(hub_store(3), config, Glyphs::default());
    tree.mount(&mut doc, div).await.unwrap();

    assert_eq!(tree.config().max_siblings, 2);
    assert_eq!(state_of(&tree, &doc, "Hub"), NodeState::Collapsed);
    assert!(tree.client().executor().query_count() > 0);
}

#[tokio::test]
async fn test_direction_symmetry() {
    let client = GraphQueryClient::new(
        MemoryStore::builder()
            .property("A", "relates-to", ["B"])
            .build(),
    );

    let from = client
        .run_query(Direction::From, QueryKind::Children { parent: "B" }, "relates-to")
        .await
        .unwrap();
    let to = client
        .run_query(Direction::To, QueryKind::Children { parent: "A" }, "relates-to")
        .await
        .unwrap();
    assert_eq!(from.iter().map(|p| p.original_name.as_str()).collect::<Vec<_>>(), ["A"]);
    assert_eq!(to.iter().map(|p| p.original_name.as_str()).collect::<Vec<_>>(), ["B"]);

    let roots_from = client
        .run_query(Direction::From, QueryKind::Roots, "relates-to")
        .await
        .unwrap();
    let roots_to = client
        .run_query(Direction::To, QueryKind::Roots, "relates-to")
        .await
        .unwrap();
    assert_eq!(roots_from[0].original_name, "B");
    assert_eq!(roots_to[0].original_name, "A");
}

#[tokio::test]
async fn test_children_render_in_collation_order() {
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let store = MemoryStore::builder()
        .property("banana", "tags", ["Fruit"])
        .property("Apple", "tags", ["Fruit"])
        .property("cherry", "tags", ["Fruit"])
        .build();
    let mut tree = engine(store);
    tree.mount(&mut doc, div).await.unwrap();

    let fruit = doc.parent(control_of(&tree, &doc, "Fruit")).unwrap();
    assert_eq!(child_pages(&doc, fruit), ["Apple", "banana", "cherry"]);
}

#[tokio::test]
async fn test_deferred_expansion_queries_once() {
    let store = RecordingStore::new(hub_store(20));
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(Arc::clone(&store));
    tree.mount(&mut doc, div).await.unwrap();

    let hub_children = r#":block/name "hub""#;
    let hub = control_of(&tree, &doc, "Hub");
    let before = store.count_mentioning(hub_children);

    tree.activate(&mut doc, hub).await.unwrap();
    assert_eq!(store.count_mentioning(hub_children), before + 1);
    let after_expand = store.queries().len();

    let state = tree.activate(&mut doc, hub).await.unwrap();
    assert_eq!(state, Some(NodeState::ExpandedDeferred { open: false }));
    assert_eq!(doc.text(hub).unwrap(), "+");
    let c01 = doc.parent(control_of(&tree, &doc, "C01")).unwrap();
    assert!(!doc.is_visible(c01));

    let state = tree.activate(&mut doc, hub).await.unwrap();
    assert_eq!(state, Some(NodeState::ExpandedDeferred { open: true }));
    assert!(doc.is_visible(c01));
    assert_eq!(store.queries().len(), after_expand);
}

#[tokio::test]
async fn test_leaf_and_unknown_activation_are_noops() {
    let store = RecordingStore::new(fruit_store());
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(Arc::clone(&store));
    tree.mount(&mut doc, div).await.unwrap();
    let queries = store.queries().len();

    let apple = control_of(&tree, &doc, "Apple");
    assert_eq!(
        tree.activate(&mut doc, apple).await.unwrap(),
        Some(NodeState::Leaf)
    );
    assert_eq!(tree.activate(&mut doc, div).await.unwrap(), None);
    assert_eq!(store.queries().len(), queries);
}

#[tokio::test]
async fn test_root_control_toggles_top_level() {
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(fruit_store());
    let root = tree.mount(&mut doc, div).await.unwrap();

    tree.activate(&mut doc, root).await.unwrap();
    assert_eq!(doc.render_outline(div), "[+] Tree from tags:\n");

    tree.activate(&mut doc, root).await.unwrap();
    assert!(doc.render_outline(div).contains("Fruit"));
}

#[tokio::test]
async fn test_failed_child_query_renders_leaf() {
    let store = MemoryStore::builder()
        .property("Apple", "tags", ["Fruit"])
        .property("Carrot", "tags", ["Veg"])
        .build();
    let failing = RecordingStore::failing_on(store, r#":block/name "fruit""#);
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(failing);
    tree.mount(&mut doc, div).await.unwrap();

    let fruit = control_of(&tree, &doc, "Fruit");
    assert_eq!(tree.node(fruit).unwrap().state, NodeState::Leaf);
    assert_eq!(doc.text(fruit).unwrap(), " ");
    assert!(doc.attribute(fruit, "disabled").is_some());

    assert_eq!(
        state_of(&tree, &doc, "Veg"),
        NodeState::ExpandedEager { open: true }
    );
    assert_eq!(tree.find_controls(&doc, "Carrot").len(), 1);
}

#[tokio::test]
async fn test_failed_deferred_resolution_makes_node_inert() {
    let store = RecordingStore::new(hub_store(20));
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(Arc::clone(&store));
    tree.mount(&mut doc, div).await.unwrap();

    let hub = control_of(&tree, &doc, "Hub");
    assert_eq!(tree.node(hub).unwrap().state, NodeState::Collapsed);

    store.fail_from_now_on(r#":block/name "hub""#);
    let state = tree.activate(&mut doc, hub).await.unwrap();
    assert_eq!(state, Some(NodeState::Leaf));
    assert_eq!(doc.text(hub).unwrap(), " ");
    assert!(doc.attribute(hub, "disabled").is_some());
    assert!(tree.find_controls(&doc, "C01").is_empty());

    let queries = store.queries().len();
    assert_eq!(
        tree.activate(&mut doc, hub).await.unwrap(),
        Some(NodeState::Leaf)
    );
    assert_eq!(store.queries().len(), queries);
}

#[tokio::test]
async fn test_offline_store_renders_empty_tree() {
    let store = fruit_store();
    store.set_available(false);
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", Some("to"));
    let mut tree = engine(store);

    let root = tree.mount(&mut doc, div).await.unwrap();
    assert_eq!(doc.text(root).unwrap(), "Ø");
    assert_eq!(tree.node(root).unwrap().state, NodeState::Leaf);
    assert_eq!(doc.render_outline(div), "[Ø] Tree to tags:\n");
    assert!(doc.attribute(div, ATTR_TREE_PROP).is_none());
}

#[tokio::test]
async fn test_malformed_placeholder_retried_on_next_batch() {
    let mut doc = Document::new();
    let div = add_placeholder(&mut doc, "tags", None);
    let mut tree = engine(fruit_store());

    let batch = doc.take_mutations();
    assert_eq!(tree.handle_mutations(&mut doc, &batch).await.unwrap(), 0);
    assert_eq!(doc.attribute(div, ATTR_TREE_PROP), Some("tags"));

    doc.set_attribute(div, ATTR_TREE_DIRECTION, "from").unwrap();
    let sibling = doc.create_element("p");
    doc.append_child(doc.root(), sibling).unwrap();
    let batch = doc.take_mutations();
    assert_eq!(tree.handle_mutations(&mut doc, &batch).await.unwrap(), 1);
    assert!(doc.attribute(div, ATTR_TREE_PROP).is_none());
}

#[tokio::test]
async fn test_placeholders_mounted_in_document_order() {
    let store = RecordingStore::new(fruit_store());
    let mut doc = Document::new();
    let first = add_placeholder(&mut doc, "tags", Some("to"));
    let second = add_placeholder(&mut doc, "tags", Some("from"));
    let mut tree = engine(Arc::clone(&store));

    let batch = doc.take_mutations();
    assert_eq!(tree.handle_mutations(&mut doc, &batch).await.unwrap(), 2);

    let roots: Vec<String> = store
        .queries()
        .into_iter()
        .filter(|q| !q.contains(":block/name"))
        .collect();
    assert_eq!(roots.len(), 2);
    assert!(roots[0].contains("(not\n     [?block"));
    assert!(doc.render_outline(first).starts_with("[-] Tree to tags:"));
    assert!(doc.render_outline(second).starts_with("[-] Tree from tags:"));
}
